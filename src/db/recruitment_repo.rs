//! Applications (player → team) and invitations (team → player).
//!
//! Every decision that can move a squad counter runs in one transaction
//! holding row locks on the request and on the team.

use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    is_unique_violation,
    models::{TeamApplication, TeamInvitation},
    team_repo, user_repo,
};
use crate::{
    domain::{
        roles::UserRole,
        status::{ApplicationStatus, InvitationStatus, TransitionError},
    },
    error::{ApiError, ApiResult},
};

const ALREADY_APPLIED: &str = "You have already applied to this team";
const ALREADY_INVITED: &str = "Player already has a pending invitation";

// ---------------------------------------------------------------------------
// applications
// ---------------------------------------------------------------------------

pub async fn apply(
    db: &PgPool,
    team_id: Uuid,
    player_id: Uuid,
    message: Option<&str>,
) -> ApiResult<TeamApplication> {
    let team = team_repo::find(db, team_id)
        .await?
        .filter(|t| t.is_active)
        .ok_or_else(|| ApiError::not_found("Team not found"))?;
    team.squad().ensure_open()?;

    let pending: bool = sqlx::query_scalar(
        "SELECT EXISTS(
             SELECT 1 FROM team_applications
              WHERE team_id = $1 AND player_id = $2 AND status = 'pending')",
    )
    .bind(team_id)
    .bind(player_id)
    .fetch_one(db)
    .await
    .context("checking for a pending application")?;
    if pending {
        return Err(ApiError::conflict(ALREADY_APPLIED));
    }

    let inserted = sqlx::query_as::<_, TeamApplication>(
        "INSERT INTO team_applications (team_id, player_id, message)
         VALUES ($1, $2, $3)
         RETURNING *",
    )
    .bind(team_id)
    .bind(player_id)
    .bind(message)
    .fetch_one(db)
    .await
    .context("inserting application");

    match inserted {
        Ok(app) => Ok(app),
        // lost a race against a concurrent apply
        Err(e) if is_unique_violation(&e) => Err(ApiError::conflict(ALREADY_APPLIED)),
        Err(e) => Err(e.into()),
    }
}

/// The applicant's view: newest first, withdrawn ones hidden.
pub async fn my_applications(db: &PgPool, player_id: Uuid) -> anyhow::Result<Vec<TeamApplication>> {
    sqlx::query_as::<_, TeamApplication>(
        "SELECT * FROM team_applications
          WHERE player_id = $1 AND status <> 'withdrawn'
          ORDER BY created_at DESC",
    )
    .bind(player_id)
    .fetch_all(db)
    .await
    .context("listing player's applications")
}

/// The team's view keeps the full history.
pub async fn team_applications(db: &PgPool, team_id: Uuid) -> anyhow::Result<Vec<TeamApplication>> {
    sqlx::query_as::<_, TeamApplication>(
        "SELECT * FROM team_applications
          WHERE team_id = $1
          ORDER BY created_at DESC",
    )
    .bind(team_id)
    .fetch_all(db)
    .await
    .context("listing team's applications")
}

async fn lock_application(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> ApiResult<TeamApplication> {
    sqlx::query_as::<_, TeamApplication>("SELECT * FROM team_applications WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .context("locking application")?
        .ok_or_else(|| ApiError::not_found("Application not found"))
}

async fn store_application_status(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    status: ApplicationStatus,
) -> ApiResult<TeamApplication> {
    Ok(sqlx::query_as::<_, TeamApplication>(
        "UPDATE team_applications SET status = $2, updated_at = NOW()
          WHERE id = $1
      RETURNING *",
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_one(&mut **tx)
    .await
    .context("updating application status")?)
}

pub async fn withdraw(db: &PgPool, id: Uuid, player_id: Uuid) -> ApiResult<TeamApplication> {
    let mut tx = db.begin().await?;
    let app = lock_application(&mut tx, id).await?;
    if app.player_id != player_id {
        return Err(ApiError::not_found("Application not found"));
    }
    let next = app.status.withdraw()?;
    let app = store_application_status(&mut tx, id, next).await?;
    tx.commit().await?;
    Ok(app)
}

/// Captain's approve/reject. Approval admits the applicant to the squad.
pub async fn decide_application(
    db: &PgPool,
    id: Uuid,
    captain_id: Uuid,
    approve: bool,
) -> ApiResult<TeamApplication> {
    let mut tx = db.begin().await?;
    let app = lock_application(&mut tx, id).await?;

    let team = team_repo::lock(&mut tx, app.team_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Team not found"))?;
    if team.captain_id != captain_id {
        let verb = if approve { "approve" } else { "reject" };
        return Err(ApiError::forbidden(format!(
            "Only team captain can {verb} applications"
        )));
    }

    let next = if approve {
        app.status.approve()?
    } else {
        app.status.reject()?
    };

    if approve {
        let mut squad = team.squad();
        squad.admit()?;
        team_repo::store_squad(&mut tx, team.id, squad).await?;
    }

    let app = store_application_status(&mut tx, id, next).await?;
    tx.commit().await?;
    log::info!(
        "application {} for team {} {}",
        app.id,
        app.team_id,
        app.status
    );
    Ok(app)
}

// ---------------------------------------------------------------------------
// invitations
// ---------------------------------------------------------------------------

pub async fn invite(
    db: &PgPool,
    team_id: Uuid,
    captain_id: Uuid,
    player_id: Uuid,
    message: Option<&str>,
    expires_at: DateTime<Utc>,
) -> ApiResult<TeamInvitation> {
    let team = team_repo::find(db, team_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Team not found"))?;
    if team.captain_id != captain_id {
        return Err(ApiError::forbidden("Only team captain can invite players"));
    }
    team.squad().ensure_open()?;

    user_repo::find(db, player_id)
        .await?
        .filter(|u| u.roles.contains(UserRole::Player))
        .ok_or_else(|| ApiError::not_found("Player not found"))?;

    let pending: bool = sqlx::query_scalar(
        "SELECT EXISTS(
             SELECT 1 FROM team_invitations
              WHERE team_id = $1 AND player_id = $2 AND status = 'pending')",
    )
    .bind(team_id)
    .bind(player_id)
    .fetch_one(db)
    .await
    .context("checking for a pending invitation")?;
    if pending {
        return Err(ApiError::conflict(ALREADY_INVITED));
    }

    let inserted = sqlx::query_as::<_, TeamInvitation>(
        "INSERT INTO team_invitations (team_id, player_id, invited_by, message, expires_at)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(team_id)
    .bind(player_id)
    .bind(captain_id)
    .bind(message)
    .bind(expires_at)
    .fetch_one(db)
    .await
    .context("inserting invitation");

    match inserted {
        Ok(inv) => Ok(inv),
        Err(e) if is_unique_violation(&e) => Err(ApiError::conflict(ALREADY_INVITED)),
        Err(e) => Err(e.into()),
    }
}

/// Open invitations only: pending and not yet past `expires_at`.
pub async fn my_invitations(db: &PgPool, player_id: Uuid) -> anyhow::Result<Vec<TeamInvitation>> {
    sqlx::query_as::<_, TeamInvitation>(
        "SELECT * FROM team_invitations
          WHERE player_id = $1
            AND status = 'pending'
            AND expires_at > NOW()
          ORDER BY created_at DESC",
    )
    .bind(player_id)
    .fetch_all(db)
    .await
    .context("listing player's invitations")
}

async fn store_invitation_status(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    status: InvitationStatus,
) -> ApiResult<TeamInvitation> {
    Ok(sqlx::query_as::<_, TeamInvitation>(
        "UPDATE team_invitations SET status = $2, updated_at = NOW()
          WHERE id = $1
      RETURNING *",
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_one(&mut **tx)
    .await
    .context("updating invitation status")?)
}

/// A player's answer. Acceptance admits them to the squad; answering too
/// late closes the invitation as expired and reports the error.
pub async fn respond_invitation(
    db: &PgPool,
    id: Uuid,
    player_id: Uuid,
    answer: InvitationStatus,
    now: DateTime<Utc>,
) -> ApiResult<TeamInvitation> {
    let mut tx = db.begin().await?;
    let inv = sqlx::query_as::<_, TeamInvitation>(
        "SELECT * FROM team_invitations WHERE id = $1 AND player_id = $2 FOR UPDATE",
    )
    .bind(id)
    .bind(player_id)
    .fetch_optional(&mut *tx)
    .await
    .context("locking invitation")?
    .ok_or_else(|| ApiError::not_found("Invitation not found"))?;

    let next = match inv.status.respond(answer, inv.expires_at, now) {
        Ok(next) => next,
        Err(TransitionError::InvitationExpired) => {
            store_invitation_status(&mut tx, id, InvitationStatus::Expired).await?;
            tx.commit().await?;
            return Err(TransitionError::InvitationExpired.into());
        }
        Err(e) => return Err(e.into()),
    };

    if next == InvitationStatus::Accepted {
        let team = team_repo::lock(&mut tx, inv.team_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Team not found"))?;
        let mut squad = team.squad();
        squad.admit()?;
        team_repo::store_squad(&mut tx, team.id, squad).await?;
    }

    let inv = store_invitation_status(&mut tx, id, next).await?;
    tx.commit().await?;
    Ok(inv)
}

/// Sweeper hook: closes pending invitations nobody answered in time.
pub async fn expire_stale_invitations(db: &PgPool) -> anyhow::Result<u64> {
    Ok(sqlx::query(
        "UPDATE team_invitations
            SET status = 'expired', updated_at = NOW()
          WHERE status = 'pending' AND expires_at < NOW()",
    )
    .execute(db)
    .await
    .context("expiring stale invitations")?
    .rows_affected())
}
