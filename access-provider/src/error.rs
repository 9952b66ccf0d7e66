use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Identity, RoleId};

#[derive(Clone, Debug, Eq, PartialEq, Error, Serialize, Deserialize)]
pub enum AccessError {
    #[error("InvalidAddress({0})")]
    InvalidAddress(Identity),

    #[error("NotRootOwner({0})")]
    NotRootOwner(Identity),

    #[error("Role name '{0}' already exists")]
    ExistRoleName(String),

    #[error("Role name '{0}' doesn't exist")]
    NotExistRoleName(String),

    #[error("Role name '{0}' cannot be removed")]
    ProtectedRoleName(String),

    #[error("AccessControl: account {0} is missing role {1}")]
    MissingRole(Identity, RoleId),

    #[error("'{0}' is not a valid identity")]
    InvalidIdentity(String),

    #[error("'{0}' is not a valid role identifier")]
    InvalidRoleId(String),

    #[error("{0}")]
    SnapshotError(String),

    #[error("{0}")]
    ExternalStorageError(String),
}

impl From<serde_json::Error> for AccessError {
    fn from(e: serde_json::Error) -> Self {
        AccessError::SnapshotError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_role_message() {
        let caller: Identity = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8".parse().unwrap();
        let e = AccessError::MissingRole(caller, RoleId::root_owner());
        assert_eq!(
            e.to_string(),
            format!(
                "AccessControl: account 0x70997970c51812dc3a010c7d01b50e0d17dc79c8 is missing role {}",
                RoleId::root_owner()
            )
        );
    }
}
