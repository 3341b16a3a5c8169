use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use crate::domain::{
    roles::{AuthProvider, PlayingRole, Roles, SkillLevel},
    schedule::WeeklySchedule,
    squad::Squad,
    status::{ApplicationStatus, InvitationStatus},
};

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub hashed_password: Option<String>,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub discovery_radius: i32,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    #[sqlx(try_from = "Vec<String>")]
    pub roles: Roles,
    pub batting_style: Option<String>,
    pub bowling_style: Option<String>,
    pub playing_role: Option<String>,
    pub experience_years: Option<i32>,
    pub preferred_formats: Vec<String>,
    pub availability_schedule: Json<WeeklySchedule>,
    #[sqlx(try_from = "String")]
    pub auth_provider: AuthProvider,
    pub provider_id: Option<String>,
    pub is_verified: bool,
    pub is_active: bool,
    pub is_superuser: bool,
    pub is_available: bool,
    pub profile_visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub is_revoked: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub captain_id: Uuid,
    pub city: Option<String>,
    pub home_ground: Option<String>,
    pub established_date: Option<NaiveDate>,
    pub logo_url: Option<String>,
    pub preferred_formats: Vec<String>,
    pub is_active: bool,
    pub max_players: i32,
    pub current_player_count: i32,
    pub is_squad_full: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Team {
    pub fn squad(&self) -> Squad {
        Squad {
            current_player_count: self.current_player_count,
            max_players: self.max_players,
            is_squad_full: self.is_squad_full,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Tournament {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub organizer_id: Uuid,
    pub format: String,
    pub city: Option<String>,
    pub venue: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub registration_deadline: NaiveDate,
    pub max_teams: i32,
    pub entry_fee: i32,
    pub prize_pool: i32,
    pub logo_url: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tournament {
    /// Drafts are private to their organizer.
    pub fn visible_to(&self, user_id: Uuid) -> bool {
        self.is_published || self.organizer_id == user_id
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TeamApplication {
    pub id: Uuid,
    pub team_id: Uuid,
    pub player_id: Uuid,
    #[sqlx(try_from = "String")]
    pub status: ApplicationStatus,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TeamInvitation {
    pub id: Uuid,
    pub team_id: Uuid,
    pub player_id: Uuid,
    pub invited_by: Uuid,
    #[sqlx(try_from = "String")]
    pub status: InvitationStatus,
    pub message: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PlayerAvailability {
    pub id: Uuid,
    pub player_id: Uuid,
    pub date: NaiveDate,
    pub is_available: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PlayerRequirement {
    pub id: Uuid,
    pub team_id: Uuid,
    #[sqlx(try_from = "String")]
    pub required_role: PlayingRole,
    #[sqlx(try_from = "Option<String>")]
    pub skill_level: OptionalSkill,
    pub min_experience_years: Option<i32>,
    pub max_experience_years: Option<i32>,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
    pub preferred_formats: Vec<String>,
    pub availability_start_date: Option<NaiveDate>,
    pub availability_end_date: Option<NaiveDate>,
    pub positions_available: i32,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Nullable `skill_level` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OptionalSkill(pub Option<SkillLevel>);

impl TryFrom<Option<String>> for OptionalSkill {
    type Error = crate::domain::roles::UnknownVariant;

    fn try_from(raw: Option<String>) -> Result<Self, Self::Error> {
        raw.map(|s| s.parse()).transpose().map(OptionalSkill)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TeamTournamentParticipation {
    pub id: Uuid,
    pub team_id: Uuid,
    pub tournament_id: Uuid,
    pub placement: Option<i32>,
    pub registration_date: DateTime<Utc>,
    pub is_confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PlayerTournament {
    pub id: Uuid,
    pub player_id: Uuid,
    pub tournament_id: Uuid,
    pub team_id: Option<Uuid>,
    pub placement: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// A past tournament as shown on a player profile.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PastTournament {
    pub id: Uuid,
    pub name: String,
    pub format: String,
    pub placement: Option<i32>,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub user_a_id: Uuid,
    pub user_b_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.user_a_id == user_id || self.user_b_id == user_id
    }

    pub fn other_participant(&self, user_id: Uuid) -> Uuid {
        if self.user_a_id == user_id {
            self.user_b_id
        } else {
            self.user_a_id
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ChatMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
