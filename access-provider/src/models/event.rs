use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{Identity, RoleId};

/**
 * Notification emitted by every committed mutation, in commit order
 */
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum AccessEvent {
    #[serde(rename_all = "camelCase")]
    RoleNameAdd { caller: Identity, name: String },

    #[serde(rename_all = "camelCase")]
    RoleNameRemove { caller: Identity, name: String },

    /// `sender` is the admin who granted the role
    #[serde(rename_all = "camelCase")]
    RoleGranted {
        role: RoleId,
        account: Identity,
        sender: Identity,
    },

    /// `sender` is the revoking admin, or `account` itself when the role was renounced
    #[serde(rename_all = "camelCase")]
    RoleRevoked {
        role: RoleId,
        account: Identity,
        sender: Identity,
    },
}

impl AccessEvent {
    /// Identity that triggered the event
    pub fn caller(&self) -> &Identity {
        match self {
            AccessEvent::RoleNameAdd { caller, .. } => caller,
            AccessEvent::RoleNameRemove { caller, .. } => caller,
            AccessEvent::RoleGranted { sender, .. } => sender,
            AccessEvent::RoleRevoked { sender, .. } => sender,
        }
    }
}

impl Display for AccessEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessEvent::RoleNameAdd { caller, name } => {
                write!(f, "RoleNameAdd({}, {})", caller, name)
            }
            AccessEvent::RoleNameRemove { caller, name } => {
                write!(f, "RoleNameRemove({}, {})", caller, name)
            }
            AccessEvent::RoleGranted {
                role,
                account,
                sender,
            } => write!(f, "RoleGranted({}, {}, {})", role, account, sender),
            AccessEvent::RoleRevoked {
                role,
                account,
                sender,
            } => write!(f, "RoleRevoked({}, {}, {})", role, account, sender),
        }
    }
}
