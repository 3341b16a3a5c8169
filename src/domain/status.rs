//! Application / invitation lifecycles.
//!
//! Both records start `pending` and leave it exactly once; every other move
//! is refused so handlers never have to re-derive the rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::roles::string_enum;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Can only {action} pending applications")]
    ApplicationNotPending { action: &'static str },
    #[error("Invitation has already been responded to")]
    InvitationNotPending,
    #[error("Invitation has expired")]
    InvitationExpired,
    #[error("Invitations can only be accepted or rejected")]
    InvalidResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

string_enum!(ApplicationStatus, "application status" {
    Pending => "pending",
    Accepted => "accepted",
    Rejected => "rejected",
    Withdrawn => "withdrawn",
});

impl ApplicationStatus {
    fn leave_pending(self, to: ApplicationStatus, action: &'static str) -> Result<Self, TransitionError> {
        match self {
            ApplicationStatus::Pending => Ok(to),
            _ => Err(TransitionError::ApplicationNotPending { action }),
        }
    }

    pub fn approve(self) -> Result<Self, TransitionError> {
        self.leave_pending(ApplicationStatus::Accepted, "approve")
    }

    pub fn reject(self) -> Result<Self, TransitionError> {
        self.leave_pending(ApplicationStatus::Rejected, "reject")
    }

    pub fn withdraw(self) -> Result<Self, TransitionError> {
        self.leave_pending(ApplicationStatus::Withdrawn, "withdraw")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    #[serde(alias = "declined")]
    Rejected,
    Expired,
}

string_enum!(InvitationStatus, "invitation status" {
    Pending => "pending",
    Accepted => "accepted",
    Rejected => "rejected" | "declined",
    Expired => "expired",
});

impl InvitationStatus {
    /// Outcome of a player answering an invitation at `now`.
    ///
    /// An expired invitation yields `Err(InvitationExpired)`; the caller is
    /// expected to persist [`InvitationStatus::Expired`] before reporting it.
    pub fn respond(
        self,
        answer: InvitationStatus,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Self, TransitionError> {
        if self != InvitationStatus::Pending {
            return Err(TransitionError::InvitationNotPending);
        }
        if !matches!(answer, InvitationStatus::Accepted | InvitationStatus::Rejected) {
            return Err(TransitionError::InvalidResponse);
        }
        if expires_at < now {
            return Err(TransitionError::InvitationExpired);
        }
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn only_pending_applications_move() {
        assert_eq!(
            ApplicationStatus::Pending.approve(),
            Ok(ApplicationStatus::Accepted)
        );
        assert_eq!(
            ApplicationStatus::Pending.withdraw(),
            Ok(ApplicationStatus::Withdrawn)
        );
        assert_eq!(
            ApplicationStatus::Rejected.withdraw(),
            Err(TransitionError::ApplicationNotPending { action: "withdraw" })
        );
        assert!(ApplicationStatus::Withdrawn.approve().is_err());
    }

    #[test]
    fn not_pending_message_names_the_action() {
        let err = ApplicationStatus::Accepted.withdraw().unwrap_err();
        assert_eq!(err.to_string(), "Can only withdraw pending applications");
    }

    #[test]
    fn invitation_answers() {
        let now = Utc::now();
        let later = now + Duration::days(1);
        assert_eq!(
            InvitationStatus::Pending.respond(InvitationStatus::Accepted, later, now),
            Ok(InvitationStatus::Accepted)
        );
        assert_eq!(
            InvitationStatus::Pending.respond(InvitationStatus::Expired, later, now),
            Err(TransitionError::InvalidResponse)
        );
        assert_eq!(
            InvitationStatus::Accepted.respond(InvitationStatus::Rejected, later, now),
            Err(TransitionError::InvitationNotPending)
        );
    }

    #[test]
    fn expired_invitation_cannot_be_answered() {
        let now = Utc::now();
        let earlier = now - Duration::minutes(1);
        assert_eq!(
            InvitationStatus::Pending.respond(InvitationStatus::Accepted, earlier, now),
            Err(TransitionError::InvitationExpired)
        );
    }

    #[test]
    fn declined_is_read_as_rejected() {
        let s: InvitationStatus = serde_json::from_str(r#""declined""#).unwrap();
        assert_eq!(s, InvitationStatus::Rejected);
        assert_eq!("DECLINED".parse::<InvitationStatus>().unwrap(), InvitationStatus::Rejected);
    }
}
