// tests/recruitment_tests.rs
//
// Needs a disposable Postgres: DATABASE_URL in .env, then
//   cargo test --test recruitment_tests -- --ignored

use chrono::{Duration, Utc};
use dotenvy::dotenv;
use mycricmate_server::{
    db::{
        self,
        models::{Team, User},
        recruitment_repo, team_repo,
        user_repo::{self, NewUser},
    },
    domain::{
        roles::{AuthProvider, Roles, UserRole},
        status::{ApplicationStatus, InvitationStatus},
    },
    error::ApiError,
    sweeper,
};
use sqlx::PgPool;
use uuid::Uuid;

async fn pool() -> PgPool {
    dotenv().ok();
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in .env for tests");
    let pool = PgPool::connect(&url).await.expect("DB connection failed");
    db::MIGRATOR.run(&pool).await.expect("migrations");
    pool
}

async fn user(pool: &PgPool, role: UserRole) -> User {
    let email = format!("{}@test.mycricmate.local", Uuid::new_v4());
    user_repo::insert(
        pool,
        NewUser {
            email: &email,
            full_name: Some("Test Player"),
            hashed_password: None,
            avatar_url: None,
            roles: &Roles::new(vec![role]),
            auth_provider: AuthProvider::Email,
            provider_id: None,
            is_verified: false,
        },
    )
    .await
    .expect("insert user")
}

async fn team(pool: &PgPool, captain: &User, max_players: i32) -> Team {
    team_repo::insert(
        pool,
        captain.id,
        team_repo::NewTeam {
            name: "Test XI",
            description: None,
            city: Some("Pune"),
            home_ground: None,
            established_date: None,
            logo_url: None,
            preferred_formats: &["T20".to_string()],
            max_players,
        },
    )
    .await
    .expect("insert team")
}

#[tokio::test]
#[ignore]
async fn withdrawn_application_leaves_players_list_but_not_teams() {
    let pool = pool().await;
    let captain = user(&pool, UserRole::Captain).await;
    let player = user(&pool, UserRole::Player).await;
    let team = team(&pool, &captain, 15).await;

    let app = recruitment_repo::apply(&pool, team.id, player.id, Some("keen opener"))
        .await
        .expect("apply");
    assert_eq!(app.status, ApplicationStatus::Pending);

    let again = recruitment_repo::apply(&pool, team.id, player.id, None).await;
    assert!(matches!(again, Err(ApiError::Conflict(_))));

    let withdrawn = recruitment_repo::withdraw(&pool, app.id, player.id)
        .await
        .expect("withdraw");
    assert_eq!(withdrawn.status, ApplicationStatus::Withdrawn);

    let mine = recruitment_repo::my_applications(&pool, player.id).await.unwrap();
    assert!(mine.iter().all(|a| a.id != app.id));
    let teams = recruitment_repo::team_applications(&pool, team.id).await.unwrap();
    assert!(teams.iter().any(|a| a.id == app.id && a.status == ApplicationStatus::Withdrawn));

    // a second withdraw is a state error, not a silent no-op
    let twice = recruitment_repo::withdraw(&pool, app.id, player.id).await;
    assert!(matches!(twice, Err(ApiError::BadRequest(_))));
}

#[tokio::test]
#[ignore]
async fn approving_the_last_slot_closes_the_squad() {
    let pool = pool().await;
    let captain = user(&pool, UserRole::Captain).await;
    let first = user(&pool, UserRole::Player).await;
    let second = user(&pool, UserRole::Player).await;
    let team = team(&pool, &captain, 1).await;

    let app = recruitment_repo::apply(&pool, team.id, first.id, None).await.unwrap();
    let pending = recruitment_repo::apply(&pool, team.id, second.id, None).await.unwrap();

    let outsider = recruitment_repo::decide_application(&pool, app.id, first.id, true).await;
    assert!(matches!(outsider, Err(ApiError::Forbidden(_))));

    let approved = recruitment_repo::decide_application(&pool, app.id, captain.id, true)
        .await
        .unwrap();
    assert_eq!(approved.status, ApplicationStatus::Accepted);

    let team = team_repo::find(&pool, team.id).await.unwrap().unwrap();
    assert_eq!(team.current_player_count, 1);
    assert!(team.is_squad_full);

    let blocked = recruitment_repo::decide_application(&pool, pending.id, captain.id, true).await;
    assert!(matches!(blocked, Err(ApiError::BadRequest(_))));

    // rejecting still works on a full squad
    let rejected = recruitment_repo::decide_application(&pool, pending.id, captain.id, false)
        .await
        .unwrap();
    assert_eq!(rejected.status, ApplicationStatus::Rejected);
}

#[tokio::test]
#[ignore]
async fn invitations_expire_on_late_answer_and_by_sweep() {
    let pool = pool().await;
    let captain = user(&pool, UserRole::Captain).await;
    let late = user(&pool, UserRole::Player).await;
    let idle = user(&pool, UserRole::Player).await;
    let team = team(&pool, &captain, 15).await;
    let past = Utc::now() - Duration::hours(1);

    let inv = recruitment_repo::invite(&pool, team.id, captain.id, late.id, None, past)
        .await
        .unwrap();
    let answer =
        recruitment_repo::respond_invitation(&pool, inv.id, late.id, InvitationStatus::Accepted, Utc::now()).await;
    assert!(matches!(answer, Err(ApiError::BadRequest(_))));
    let stored: String = sqlx::query_scalar("SELECT status FROM team_invitations WHERE id = $1")
        .bind(inv.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stored, "expired");

    let stale = recruitment_repo::invite(&pool, team.id, captain.id, idle.id, None, past)
        .await
        .unwrap();
    assert!(recruitment_repo::my_invitations(&pool, idle.id).await.unwrap().is_empty());

    let (expired, _) = sweeper::tick(&pool).await.unwrap();
    assert!(expired >= 1);
    let stored: String = sqlx::query_scalar("SELECT status FROM team_invitations WHERE id = $1")
        .bind(stale.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stored, "expired");
}

#[tokio::test]
#[ignore]
async fn accepted_invitation_admits_the_player() {
    let pool = pool().await;
    let captain = user(&pool, UserRole::Captain).await;
    let player = user(&pool, UserRole::Player).await;
    let team = team(&pool, &captain, 15).await;
    let expires = Utc::now() + Duration::days(7);

    let inv = recruitment_repo::invite(&pool, team.id, captain.id, player.id, Some("join us"), expires)
        .await
        .unwrap();
    let dup = recruitment_repo::invite(&pool, team.id, captain.id, player.id, None, expires).await;
    assert!(matches!(dup, Err(ApiError::Conflict(_))));

    let accepted =
        recruitment_repo::respond_invitation(&pool, inv.id, player.id, InvitationStatus::Accepted, Utc::now())
            .await
            .unwrap();
    assert_eq!(accepted.status, InvitationStatus::Accepted);
    let team = team_repo::find(&pool, team.id).await.unwrap().unwrap();
    assert_eq!(team.current_player_count, 1);

    let again =
        recruitment_repo::respond_invitation(&pool, inv.id, player.id, InvitationStatus::Rejected, Utc::now()).await;
    assert!(matches!(again, Err(ApiError::BadRequest(_))));
}
