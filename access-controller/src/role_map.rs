use std::collections::{HashMap, HashSet};

use access_provider::{Identity, RoleId, RoleMembership};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub(crate) struct RoleData {
    pub(crate) members: HashSet<Identity>,

    // `None` means the role is administered by the default admin role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) admin_role: Option<RoleId>,
}

/**
 * Role identifier to members and admin link
 */
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RoleMap {
    default_admin_role: RoleId,
    roles: HashMap<RoleId, RoleData>,
}

impl Default for RoleMap {
    fn default() -> Self {
        Self::new(RoleId::root_owner())
    }
}

impl RoleMap {
    pub fn new(default_admin_role: RoleId) -> Self {
        Self {
            default_admin_role,
            roles: Default::default(),
        }
    }

    pub fn default_admin_role(&self) -> RoleId {
        self.default_admin_role
    }

    pub(crate) fn members(&self, role: &RoleId) -> Option<&HashSet<Identity>> {
        self.roles.get(role).map(|data| &data.members)
    }
}

impl RoleMembership for RoleMap {
    fn has_role(&self, role: &RoleId, account: &Identity) -> bool {
        self.roles
            .get(role)
            .map(|data| data.members.contains(account))
            .unwrap_or(false)
    }

    fn get_role_admin(&self, role: &RoleId) -> RoleId {
        self.roles
            .get(role)
            .and_then(|data| data.admin_role)
            .unwrap_or(self.default_admin_role)
    }

    fn grant(&mut self, role: RoleId, account: Identity) -> bool {
        self.roles
            .entry(role)
            .or_insert_with(RoleData::default)
            .members
            .insert(account)
    }

    fn revoke(&mut self, role: &RoleId, account: &Identity) -> bool {
        self.roles
            .get_mut(role)
            .map(|data| data.members.remove(account))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use common_utils::set;

    use super::*;

    fn account(n: u8) -> Identity {
        Identity::new([n; 20])
    }

    #[test]
    fn grant_and_revoke() {
        let minter = RoleId::from_name("MINTER");
        let mut map = RoleMap::default();
        assert!(!map.has_role(&minter, &account(1)));

        assert!(map.grant(minter, account(1)));
        assert!(!map.grant(minter, account(1)));
        assert!(map.has_role(&minter, &account(1)));
        assert!(!map.has_role(&minter, &account(2)));
        assert_eq!(map.members(&minter), Some(&set![account(1)]));

        assert!(map.revoke(&minter, &account(1)));
        assert!(!map.revoke(&minter, &account(1)));
        assert!(!map.has_role(&minter, &account(1)));
    }

    #[test]
    fn revoke_unknown_role() {
        let mut map = RoleMap::default();
        assert!(!map.revoke(&RoleId::from_name("NOBODY"), &account(1)));
        assert_eq!(map.members(&RoleId::from_name("NOBODY")), None);
    }

    #[test]
    fn default_admin() {
        let map = RoleMap::default();
        assert_eq!(
            map.get_role_admin(&RoleId::from_name("MINTER")),
            RoleId::root_owner()
        );
        assert_eq!(map.get_role_admin(&RoleId::root_owner()), RoleId::root_owner());
        assert_eq!(map.get_role_admin(&RoleId::ZERO), RoleId::root_owner());
    }

    #[test]
    fn admin_gate() {
        let mut map = RoleMap::default();
        map.grant(RoleId::root_owner(), account(1));
        let minter = RoleId::from_name("MINTER");
        assert!(map.check_admin(&minter, &account(1)).is_ok());
        assert_eq!(
            map.check_admin(&minter, &account(2)),
            Err(access_provider::AccessError::MissingRole(
                account(2),
                RoleId::root_owner()
            ))
        );
    }

    #[test]
    fn explicit_admin_link() {
        let minter = RoleId::from_name("MINTER");
        let minter_admin = RoleId::from_name("MINTER_ADMIN");
        let mut map = RoleMap::default();
        map.roles.insert(
            minter,
            RoleData {
                members: Default::default(),
                admin_role: Some(minter_admin),
            },
        );
        assert_eq!(map.get_role_admin(&minter), minter_admin);
        map.grant(minter_admin, account(3));
        assert!(map.check_admin(&minter, &account(3)).is_ok());
    }

    #[test]
    fn renounce_leaves_others() {
        let minter = RoleId::from_name("MINTER");
        let mut map = RoleMap::default();
        map.grant(minter, account(1));
        map.grant(minter, account(2));
        assert!(map.renounce(&minter, &account(1)));
        assert!(!map.renounce(&minter, &account(1)));
        assert_eq!(map.members(&minter), Some(&set![account(2)]));
    }
}
