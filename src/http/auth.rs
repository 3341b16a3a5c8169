//! Email/password and Google sign-in (JWT access + rotating refresh)

use actix_web::{get, post, web, HttpResponse};
use redis::Client as RedisClient;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::{
    auth::{
        google::{self, GoogleOAuth},
        password,
        session,
        tokens::TokenKeys,
    },
    config::Settings,
    db::{
        is_unique_violation,
        user_repo::{self, NewUser},
    },
    domain::{
        roles::{AuthProvider, Roles, UserRole},
        validate,
    },
    error::{ApiError, ApiResult},
    http::users::UserResponse,
    presence,
};

//////////////////////////////////////////////////
// Data structs
//////////////////////////////////////////////////

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub roles: Option<Vec<UserRole>>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct GoogleLoginRequest {
    pub code: String,
    pub redirect_uri: String,
}

#[derive(Deserialize)]
pub struct GoogleUrlQuery {
    pub redirect_uri: String,
}

#[derive(Serialize)]
pub struct GoogleUrlResponse {
    pub url: String,
    pub state: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

//////////////////////////////////////////////////
// ───────────  Bearer extractors  ───────────
//////////////////////////////////////////////////

pub mod extractor {
    use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
    use futures_util::future::{ready, FutureExt, LocalBoxFuture, Ready};
    use sqlx::PgPool;
    use uuid::Uuid;

    use crate::{
        auth::tokens::{TokenKeys, TokenType},
        db::{models::User, user_repo},
        error::ApiError,
    };

    /// Validated access-token claims. No database round trip.
    #[derive(Debug, Clone)]
    pub struct JwtAuth {
        pub user_id: Uuid,
    }

    impl FromRequest for JwtAuth {
        type Error = ApiError;
        type Future = Ready<Result<Self, Self::Error>>;

        fn from_request(req: &HttpRequest, _pl: &mut Payload) -> Self::Future {
            let res = (|| -> Result<Self, ApiError> {
                // Expect:  Authorization: Bearer <JWT>
                let token = req
                    .headers()
                    .get("Authorization")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.strip_prefix("Bearer "))
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

                let keys = req.app_data::<web::Data<TokenKeys>>().ok_or_else(|| {
                    ApiError::Internal(anyhow::anyhow!("token keys not registered"))
                })?;
                let claims = keys.verify(token, TokenType::Access)?;
                Ok(JwtAuth {
                    user_id: claims.sub,
                })
            })();

            ready(res)
        }
    }

    /// The authenticated, active account behind the bearer token.
    #[derive(Debug, Clone)]
    pub struct CurrentUser(pub User);

    impl FromRequest for CurrentUser {
        type Error = ApiError;
        type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

        fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
            let auth = JwtAuth::from_request(req, pl).into_inner();
            let db = req.app_data::<web::Data<PgPool>>().cloned();

            async move {
                let auth = auth?;
                let db = db.ok_or_else(|| {
                    ApiError::Internal(anyhow::anyhow!("database pool not registered"))
                })?;
                let user = user_repo::find(&db, auth.user_id)
                    .await?
                    .ok_or_else(|| ApiError::unauthorized("User not found"))?;
                if !user.is_active {
                    return Err(ApiError::forbidden("User account is inactive"));
                }
                Ok::<_, ApiError>(CurrentUser(user))
            }
            .boxed_local()
        }
    }

    /// A [`CurrentUser`] holding the superuser flag.
    #[derive(Debug, Clone)]
    pub struct AdminUser(pub User);

    impl FromRequest for AdminUser {
        type Error = ApiError;
        type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

        fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
            let current = CurrentUser::from_request(req, pl);
            async move {
                let CurrentUser(user) = current.await?;
                if !user.is_superuser {
                    return Err(ApiError::forbidden("Superuser access required"));
                }
                Ok::<_, ApiError>(AdminUser(user))
            }
            .boxed_local()
        }
    }
}
pub use extractor::{AdminUser, CurrentUser, JwtAuth};

//////////////////////////////////////////////////
// POST /auth/register
//////////////////////////////////////////////////
#[post("/register")]
pub async fn register(
    body: web::Json<RegisterRequest>,
    db: web::Data<PgPool>,
    keys: web::Data<TokenKeys>,
    redis: web::Data<RedisClient>,
    settings: web::Data<Settings>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let email = validate::email(&body.email)?;
    validate::password(&body.password)?;

    if user_repo::find_by_email(&db, &email).await?.is_some() {
        return Err(ApiError::conflict("Email already registered"));
    }

    let roles = Roles::new(body.roles.unwrap_or_else(|| vec![UserRole::Player]));
    let hashed = password::hash_password_blocking(body.password).await?;
    let inserted = user_repo::insert(
        &db,
        NewUser {
            email: &email,
            full_name: body.full_name.as_deref(),
            hashed_password: Some(&hashed),
            avatar_url: None,
            roles: &roles,
            auth_provider: AuthProvider::Email,
            provider_id: None,
            is_verified: false,
        },
    )
    .await;
    let user = match inserted {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::conflict("Email already registered"))
        }
        Err(e) => return Err(e.into()),
    };

    log::info!("registered user {} ({})", user.id, user.email);
    let tokens = session::issue_pair(&db, &keys, user.id).await?;
    presence::touch(&redis, user.id, settings.presence_ttl).await;
    Ok(HttpResponse::Created().json(tokens))
}

//////////////////////////////////////////////////
// POST /auth/login
//////////////////////////////////////////////////
#[post("/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    db: web::Data<PgPool>,
    keys: web::Data<TokenKeys>,
    redis: web::Data<RedisClient>,
    settings: web::Data<Settings>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let bad_credentials = || ApiError::unauthorized("Incorrect email or password");

    let user = user_repo::find_by_email(&db, body.email.trim())
        .await?
        .ok_or_else(bad_credentials)?;
    // OAuth-only accounts have no password to check
    let hash = user.hashed_password.clone().ok_or_else(bad_credentials)?;
    if !password::verify_password_blocking(body.password, hash).await? {
        return Err(bad_credentials());
    }
    if !user.is_active {
        return Err(ApiError::forbidden("User account is inactive"));
    }

    user_repo::touch_last_login(&db, user.id).await?;
    let tokens = session::issue_pair(&db, &keys, user.id).await?;
    presence::touch(&redis, user.id, settings.presence_ttl).await;
    Ok(HttpResponse::Ok().json(tokens))
}

//////////////////////////////////////////////////
// POST /auth/google
//////////////////////////////////////////////////
#[post("/google")]
pub async fn google_login(
    body: web::Json<GoogleLoginRequest>,
    google: Option<web::Data<GoogleOAuth>>,
    db: web::Data<PgPool>,
    keys: web::Data<TokenKeys>,
    redis: web::Data<RedisClient>,
    settings: web::Data<Settings>,
) -> ApiResult<HttpResponse> {
    let google = google.ok_or_else(|| ApiError::Unavailable("Google OAuth is not configured".into()))?;

    let tokens = google.exchange_code(&body.code, &body.redirect_uri).await?;
    let profile = google.user_info(&tokens.access_token).await?;
    let email = validate::email(&profile.email)?;

    let user = match user_repo::find_by_email(&db, &email).await? {
        Some(user) => {
            if user.auth_provider != AuthProvider::Google {
                return Err(ApiError::bad_request(
                    "Email already registered with a different sign-in method",
                ));
            }
            if !user.is_active {
                return Err(ApiError::forbidden("User account is inactive"));
            }
            user_repo::touch_last_login(&db, user.id).await?;
            user
        }
        None => {
            let roles = Roles::new(vec![UserRole::Player]);
            let user = user_repo::insert(
                &db,
                NewUser {
                    email: &email,
                    full_name: profile.name.as_deref(),
                    hashed_password: None,
                    avatar_url: profile.picture.as_deref(),
                    roles: &roles,
                    auth_provider: AuthProvider::Google,
                    provider_id: Some(&profile.id),
                    is_verified: true,
                },
            )
            .await?;
            log::info!("registered google user {} ({})", user.id, user.email);
            user
        }
    };

    let pair = session::issue_pair(&db, &keys, user.id).await?;
    presence::touch(&redis, user.id, settings.presence_ttl).await;
    Ok(HttpResponse::Ok().json(pair))
}

//////////////////////////////////////////////////
// GET /auth/google/url
//////////////////////////////////////////////////
#[get("/google/url")]
pub async fn google_url(
    query: web::Query<GoogleUrlQuery>,
    google: Option<web::Data<GoogleOAuth>>,
) -> ApiResult<HttpResponse> {
    let google = google.ok_or_else(|| ApiError::Unavailable("Google OAuth is not configured".into()))?;
    let state = google::new_state();
    let url = google.authorization_url(&query.redirect_uri, &state)?;
    Ok(HttpResponse::Ok().json(GoogleUrlResponse { url, state }))
}

//////////////////////////////////////////////////
// POST /auth/refresh
//////////////////////////////////////////////////
#[post("/refresh")]
pub async fn refresh(
    body: web::Json<RefreshRequest>,
    db: web::Data<PgPool>,
    keys: web::Data<TokenKeys>,
    redis: web::Data<RedisClient>,
    settings: web::Data<Settings>,
) -> ApiResult<HttpResponse> {
    let (user_id, tokens) = session::rotate(&db, &keys, &body.refresh_token).await?;
    presence::touch(&redis, user_id, settings.presence_ttl).await;
    Ok(HttpResponse::Ok().json(tokens))
}

//////////////////////////////////////////////////
// POST /auth/logout
//////////////////////////////////////////////////
#[post("/logout")]
pub async fn logout(
    auth: JwtAuth,
    body: web::Json<RefreshRequest>,
    db: web::Data<PgPool>,
    keys: web::Data<TokenKeys>,
    redis: web::Data<RedisClient>,
) -> ApiResult<HttpResponse> {
    session::revoke(&db, &keys, auth.user_id, &body.refresh_token).await?;
    presence::clear(&redis, auth.user_id).await;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Successfully logged out" })))
}

//////////////////////////////////////////////////
// GET /auth/me
//////////////////////////////////////////////////
#[get("/me")]
pub async fn me(CurrentUser(user): CurrentUser) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

//////////////////////////////////////////////////
// Mount
//////////////////////////////////////////////////
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(register)
            .service(login)
            .service(google_url)
            .service(google_login)
            .service(refresh)
            .service(logout)
            .service(me),
    );
}
