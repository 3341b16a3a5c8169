//! Role tags, auth providers and cricket vocabulary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Generates `as_str`, `Display`, `FromStr` and `TryFrom<String>` for a
/// string-backed enum so the same spelling is used in JSON and in Postgres.
macro_rules! string_enum {
    ($ty:ident, $kind:literal { $($variant:ident => $text:literal $(| $alias:literal)*),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl ::std::fmt::Display for $ty {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $ty {
            type Err = $crate::domain::roles::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($text $(| $alias)* => Ok($ty::$variant),)+
                    _ => Err($crate::domain::roles::UnknownVariant { kind: $kind, value: s.to_string() }),
                }
            }
        }

        impl TryFrom<String> for $ty {
            type Error = $crate::domain::roles::UnknownVariant;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

pub(crate) use string_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Player,
    Captain,
    Organizer,
    Staff,
}

string_enum!(UserRole, "role" {
    Player => "player",
    Captain => "captain",
    Organizer => "organizer",
    Staff => "staff",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Email,
    Google,
}

string_enum!(AuthProvider, "auth provider" {
    Email => "email",
    Google => "google",
});

/// A user's role tags: sorted, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<UserRole>", into = "Vec<UserRole>")]
pub struct Roles(Vec<UserRole>);

impl Roles {
    pub fn new(mut roles: Vec<UserRole>) -> Self {
        roles.sort();
        roles.dedup();
        Roles(roles)
    }

    pub fn contains(&self, role: UserRole) -> bool {
        self.0.contains(&role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[UserRole] {
        &self.0
    }

    /// Column representation (`TEXT[]`).
    pub fn to_db(&self) -> Vec<String> {
        self.0.iter().map(|r| r.as_str().to_string()).collect()
    }
}

impl From<Vec<UserRole>> for Roles {
    fn from(roles: Vec<UserRole>) -> Self {
        Roles::new(roles)
    }
}

impl From<Roles> for Vec<UserRole> {
    fn from(roles: Roles) -> Self {
        roles.0
    }
}

impl TryFrom<Vec<String>> for Roles {
    type Error = UnknownVariant;

    fn try_from(raw: Vec<String>) -> Result<Self, Self::Error> {
        raw.iter()
            .map(|r| r.parse::<UserRole>())
            .collect::<Result<Vec<_>, _>>()
            .map(Roles::new)
    }
}

/// On-field specialism a team may recruit for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayingRole {
    Batsman,
    Bowler,
    #[serde(alias = "all-rounder", alias = "allrounder")]
    AllRounder,
    #[serde(alias = "wicket-keeper", alias = "wicketkeeper")]
    WicketKeeper,
}

string_enum!(PlayingRole, "playing role" {
    Batsman => "batsman" | "batter",
    Bowler => "bowler",
    AllRounder => "all_rounder" | "all-rounder" | "allrounder",
    WicketKeeper => "wicket_keeper" | "wicket-keeper" | "wicketkeeper",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
    Professional,
}

string_enum!(SkillLevel, "skill level" {
    Beginner => "beginner",
    Intermediate => "intermediate",
    Advanced => "advanced",
    Professional => "professional",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_deduplicated_and_sorted() {
        let roles = Roles::new(vec![UserRole::Staff, UserRole::Player, UserRole::Staff]);
        assert_eq!(roles.as_slice(), &[UserRole::Player, UserRole::Staff]);
    }

    #[test]
    fn roles_parse_from_column_case_insensitively() {
        let roles = Roles::try_from(vec!["PLAYER".to_string(), "captain".to_string()]).unwrap();
        assert!(roles.contains(UserRole::Player));
        assert!(roles.contains(UserRole::Captain));
        assert!(!roles.contains(UserRole::Organizer));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = Roles::try_from(vec!["umpire".to_string()]).unwrap_err();
        assert_eq!(err.kind, "role");
    }

    #[test]
    fn playing_role_accepts_hyphenated_spelling() {
        assert_eq!(
            "Wicket-Keeper".parse::<PlayingRole>().unwrap(),
            PlayingRole::WicketKeeper
        );
        let parsed: PlayingRole = serde_json::from_str(r#""all-rounder""#).unwrap();
        assert_eq!(parsed, PlayingRole::AllRounder);
        assert_eq!(parsed.as_str(), "all_rounder");
    }
}
