use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::BadgeError;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Display, EnumString, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Moderator,
    #[default]
    Member,
}

/// Actions gated by role.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
pub enum Permission {
    CheckOwnBadges,
    CheckAnyBadges,
    AwardBadges,
    PublishContent,
}

impl UserRole {
    pub fn can(&self, permission: Permission) -> bool {
        match permission {
            Permission::CheckOwnBadges | Permission::PublishContent => true,
            Permission::CheckAnyBadges => matches!(self, UserRole::Admin | UserRole::Moderator),
            Permission::AwardBadges => matches!(self, UserRole::Admin),
        }
    }
}

/// The one place role checks are made.
pub fn authorize(role: UserRole, permission: Permission) -> Result<(), BadgeError> {
    if role.can(permission) {
        Ok(())
    } else {
        Err(BadgeError::Authorization(format!("{} may not {}", role, permission)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn only_admins_award() {
        assert!(authorize(UserRole::Admin, Permission::AwardBadges).is_ok());
        assert!(matches!(
            authorize(UserRole::Moderator, Permission::AwardBadges),
            Err(BadgeError::Authorization(_))
        ));
        assert!(authorize(UserRole::Member, Permission::AwardBadges).is_err());
    }

    #[test]
    fn moderators_check_anyone() {
        assert!(authorize(UserRole::Moderator, Permission::CheckAnyBadges).is_ok());
        assert!(authorize(UserRole::Member, Permission::CheckAnyBadges).is_err());
        assert!(authorize(UserRole::Member, Permission::CheckOwnBadges).is_ok());
    }

    #[test]
    fn role_round_trips_through_text() {
        assert_eq!(UserRole::Moderator.to_string(), "MODERATOR");
        assert_eq!(UserRole::from_str("ADMIN").unwrap(), UserRole::Admin);
    }
}
