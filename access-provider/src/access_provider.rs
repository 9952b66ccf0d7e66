use std::str::FromStr;

use async_trait::async_trait;
use log::debug;

use crate::{AccessError, Identity, RoleId};

/**
 * The role hierarchy primitive.
 * Maps every role identifier to its member set and its admin role, no caller checks happen here.
 */
pub trait RoleMembership {
    fn has_role(&self, role: &RoleId, account: &Identity) -> bool;

    /**
     * Admin role of `role`, roles without an explicit link are administered by `ROOT_OWNER`
     */
    fn get_role_admin(&self, role: &RoleId) -> RoleId;

    /**
     * Add `account` to `role`, returns `false` if it was already a member
     */
    fn grant(&mut self, role: RoleId, account: Identity) -> bool;

    /**
     * Remove `account` from `role`, returns `false` if it wasn't a member
     */
    fn revoke(&mut self, role: &RoleId, account: &Identity) -> bool;

    // Provided implementations

    /**
     * `account` leaves `role` on its own, same state change as `revoke`
     */
    fn renounce(&mut self, role: &RoleId, account: &Identity) -> bool {
        self.revoke(role, account)
    }

    fn check_role(&self, role: &RoleId, account: &Identity) -> Result<(), AccessError> {
        if self.has_role(role, account) {
            Ok(())
        } else {
            Err(AccessError::MissingRole(*account, *role))
        }
    }

    /**
     * `caller` must hold the admin role of `role`
     */
    fn check_admin(&self, role: &RoleId, caller: &Identity) -> Result<(), AccessError> {
        self.check_role(&self.get_role_admin(role), caller)
    }
}

/**
 * Name table of the roles, mutable by the owner only
 */
#[async_trait]
pub trait RoleRegistry: Send + Sync {
    /**
     * The identity set at construction
     */
    fn owner(&self) -> Identity;

    /**
     * Identifier of a registered role name, `RoleId::ZERO` if the name is not registered
     */
    fn role_bytes_by_role_name(&self, name: &str) -> RoleId;

    fn is_role_name_registered(&self, name: &str) -> bool;

    /**
     * All registered names, sorted
     */
    fn role_names(&self) -> Vec<String>;

    async fn add_role(&mut self, caller: &Identity, name: &str) -> Result<(), AccessError>;

    async fn remove_role(&mut self, caller: &Identity, name: &str) -> Result<(), AccessError>;

    // Provided implementations

    fn check_owner(&self, caller: &Identity) -> Result<(), AccessError> {
        if caller == &self.owner() {
            Ok(())
        } else {
            Err(AccessError::NotRootOwner(*caller))
        }
    }

    /**
     * Accepts either a `0x`-prefixed role identifier or a role name
     */
    fn role_id_by_name_or_id(&self, name_or_id: &str) -> RoleId {
        match RoleId::from_str(name_or_id) {
            Ok(id) => id,
            Err(_) => {
                debug!("'{}' is not an identifier, resolving as name", name_or_id);
                self.role_bytes_by_role_name(name_or_id)
            }
        }
    }
}

/**
 * Grant, revoke and renounce on top of the role hierarchy.
 * Every operation has an identifier surface and a name surface, the latter resolves the name
 * through the registry and delegates.
 */
#[async_trait]
pub trait MembershipController: RoleRegistry {
    fn has_role_by_id(&self, role: &RoleId, account: &Identity) -> bool;

    fn get_role_admin(&self, role: &RoleId) -> RoleId;

    /**
     * Current members of `role`, sorted
     */
    fn role_members(&self, role: &RoleId) -> Vec<Identity>;

    async fn grant_role_by_id(
        &mut self,
        caller: &Identity,
        role: RoleId,
        account: Identity,
    ) -> Result<(), AccessError>;

    async fn revoke_role_by_id(
        &mut self,
        caller: &Identity,
        role: RoleId,
        account: Identity,
    ) -> Result<(), AccessError>;

    async fn renounce_role_by_id(
        &mut self,
        caller: &Identity,
        role: RoleId,
    ) -> Result<(), AccessError>;

    // Provided implementations

    fn has_role_by_name(&self, name: &str, account: &Identity) -> bool {
        self.has_role_by_id(&self.role_bytes_by_role_name(name), account)
    }

    async fn grant_role_by_name(
        &mut self,
        caller: &Identity,
        name: &str,
        account: Identity,
    ) -> Result<(), AccessError> {
        let role = self.role_bytes_by_role_name(name);
        self.grant_role_by_id(caller, role, account).await
    }

    async fn revoke_role_by_name(
        &mut self,
        caller: &Identity,
        name: &str,
        account: Identity,
    ) -> Result<(), AccessError> {
        let role = self.role_bytes_by_role_name(name);
        self.revoke_role_by_id(caller, role, account).await
    }

    async fn renounce_role_by_name(
        &mut self,
        caller: &Identity,
        name: &str,
    ) -> Result<(), AccessError> {
        let role = self.role_bytes_by_role_name(name);
        self.renounce_role_by_id(caller, role).await
    }
}
