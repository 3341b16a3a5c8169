//! Two-party chat: inbox, history (polled), send, unread badge

use actix_web::{get, post, web, HttpResponse};
use chrono::{DateTime, Utc};
use redis::Client as RedisClient;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    config::Settings,
    db::{
        chat_repo::{self, ConversationSummary},
        models::{ChatMessage, Conversation, User},
        user_repo,
    },
    domain::validate::{self, Page},
    error::{ApiError, ApiResult},
    http::auth::CurrentUser,
    presence,
};

//////////////////////////////////////////////////
// DTOs
//////////////////////////////////////////////////

#[derive(Debug, Serialize)]
pub struct Participant {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConversationView {
    pub id: Uuid,
    pub other_user: Participant,
    pub last_message: Option<ChatMessage>,
    pub unread_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ConversationSummary> for ConversationView {
    fn from(s: ConversationSummary) -> Self {
        let last_message = match (
            s.last_message_id,
            s.last_message_sender_id,
            s.last_message_content,
            s.last_message_at,
        ) {
            (Some(id), Some(sender_id), Some(content), Some(created_at)) => Some(ChatMessage {
                id,
                conversation_id: s.id,
                sender_id,
                content,
                is_read: s.last_message_is_read.unwrap_or(false),
                created_at,
            }),
            _ => None,
        };
        ConversationView {
            id: s.id,
            other_user: Participant {
                id: s.other_user_id,
                full_name: s.other_full_name,
                avatar_url: s.other_avatar_url,
            },
            last_message,
            unread_count: s.unread_count,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Deserialize)]
pub struct OpenQuery {
    pub other_user_id: String,
}

#[derive(Deserialize)]
pub struct SendReq {
    pub content: String,
}

#[derive(Serialize)]
pub struct UnreadCount {
    pub unread_count: i64,
}

//////////////////////////////////////////////////
// Helpers
//////////////////////////////////////////////////

/// Loads a conversation `user` takes part in: 404 when unknown, 403 for outsiders.
async fn joined(db: &PgPool, conversation_id: Uuid, user: &User) -> ApiResult<Conversation> {
    let conv = chat_repo::find(db, conversation_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Conversation not found"))?;
    if !conv.has_participant(user.id) {
        return Err(ApiError::forbidden("Not a participant in this conversation"));
    }
    Ok(conv)
}

//////////////////////////////////////////////////
// GET /chat/conversations
//////////////////////////////////////////////////
#[get("/conversations")]
pub async fn list_conversations(
    CurrentUser(user): CurrentUser,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let rows = chat_repo::summaries(&db, user.id, None).await?;
    Ok(HttpResponse::Ok().json(
        rows.into_iter()
            .map(ConversationView::from)
            .collect::<Vec<_>>(),
    ))
}

//////////////////////////////////////////////////
// POST /chat/conversations?other_user_id=
//////////////////////////////////////////////////
#[post("/conversations")]
pub async fn open_conversation(
    CurrentUser(user): CurrentUser,
    query: web::Query<OpenQuery>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let other = Uuid::parse_str(query.other_user_id.trim())
        .map_err(|_| ApiError::unprocessable("other_user_id must be a valid UUID"))?;
    if other == user.id {
        return Err(ApiError::bad_request("Cannot start a conversation with yourself"));
    }
    user_repo::find(&db, other)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let conv = chat_repo::get_or_create(&**db, user.id, other).await?;
    let view = chat_repo::summaries(&db, user.id, Some(conv.id))
        .await?
        .into_iter()
        .next()
        .map(ConversationView::from)
        .ok_or_else(|| ApiError::not_found("Conversation not found"))?;
    Ok(HttpResponse::Ok().json(view))
}

//////////////////////////////////////////////////
// GET /chat/conversations/{id}/messages?skip=0&limit=50
//////////////////////////////////////////////////
#[get("/conversations/{conversation_id}/messages")]
pub async fn history(
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    page: web::Query<Page>,
    db: web::Data<PgPool>,
    redis: web::Data<RedisClient>,
    settings: web::Data<Settings>,
) -> ApiResult<HttpResponse> {
    let page = page.into_inner().checked()?;
    let conv = joined(&db, path.into_inner(), &user).await?;

    chat_repo::mark_read(&db, conv.id, user.id).await?;
    let rows = chat_repo::messages(&db, conv.id, page.skip, page.limit).await?;
    // polling this endpoint is what keeps a user "online"
    presence::touch(&redis, user.id, settings.presence_ttl).await;

    Ok(HttpResponse::Ok().json(rows))
}

//////////////////////////////////////////////////
// POST /chat/conversations/{id}/messages
//////////////////////////////////////////////////
#[post("/conversations/{conversation_id}/messages")]
pub async fn send(
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    body: web::Json<SendReq>,
    db: web::Data<PgPool>,
    redis: web::Data<RedisClient>,
    settings: web::Data<Settings>,
) -> ApiResult<HttpResponse> {
    let content = validate::message_content(&body.content)?;
    let conv = joined(&db, path.into_inner(), &user).await?;

    let msg = chat_repo::insert_message(&db, conv.id, user.id, &content).await?;
    presence::touch(&redis, user.id, settings.presence_ttl).await;
    Ok(HttpResponse::Created().json(msg))
}

//////////////////////////////////////////////////
// GET /chat/unread-count
//////////////////////////////////////////////////
#[get("/unread-count")]
pub async fn unread_count(
    CurrentUser(user): CurrentUser,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let unread_count = chat_repo::unread_total(&db, user.id).await?;
    Ok(HttpResponse::Ok().json(UnreadCount { unread_count }))
}

//////////////////////////////////////////////////
// Mount
//////////////////////////////////////////////////
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/chat")
            .service(list_conversations)
            .service(open_conversation)
            .service(history)
            .service(send)
            .service(unread_count),
    );
}
