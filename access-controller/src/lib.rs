mod controller;
mod role_map;
mod storage;

use access_provider::{
    AccessError, Identity, MembershipController, RoleId, RoleMembership, RoleRegistry, ROOT_OWNER,
};
use async_trait::async_trait;
use common_utils::Logged;
use log::debug;

pub use controller::{AccessController, ExternalStorage};
pub use role_map::RoleMap;
pub use storage::{
    attach_storage, journal_storage, load_controller, save_controller, JournalError,
    JournalRecord, JournalStorage,
};

#[async_trait]
impl RoleRegistry for AccessController {
    fn owner(&self) -> Identity {
        self.owner
    }

    #[tracing::instrument(level = "trace", skip(self))]
    fn role_bytes_by_role_name(&self, name: &str) -> RoleId {
        self.role_names.get(name).copied().unwrap_or(RoleId::ZERO)
    }

    fn is_role_name_registered(&self, name: &str) -> bool {
        self.role_names.contains_key(name)
    }

    fn role_names(&self) -> Vec<String> {
        // BTreeMap keys are already sorted
        self.role_names.keys().cloned().collect()
    }

    async fn add_role(&mut self, caller: &Identity, name: &str) -> Result<(), AccessError> {
        self.check_owner(caller).log()?;
        if self.is_role_name_registered(name) {
            return Err(AccessError::ExistRoleName(name.to_string()));
        }
        self.insert_role_name(caller, name).await
    }

    async fn remove_role(&mut self, caller: &Identity, name: &str) -> Result<(), AccessError> {
        self.check_owner(caller).log()?;
        if !self.is_role_name_registered(name) {
            return Err(AccessError::NotExistRoleName(name.to_string()));
        }
        if name == ROOT_OWNER {
            return Err(AccessError::ProtectedRoleName(name.to_string()));
        }
        self.delete_role_name(caller, name).await
    }
}

#[async_trait]
impl MembershipController for AccessController {
    fn has_role_by_id(&self, role: &RoleId, account: &Identity) -> bool {
        self.roles.has_role(role, account)
    }

    fn get_role_admin(&self, role: &RoleId) -> RoleId {
        self.roles.get_role_admin(role)
    }

    fn role_members(&self, role: &RoleId) -> Vec<Identity> {
        let mut members: Vec<Identity> = self
            .roles
            .members(role)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    async fn grant_role_by_id(
        &mut self,
        caller: &Identity,
        role: RoleId,
        account: Identity,
    ) -> Result<(), AccessError> {
        self.roles.check_admin(&role, caller).log()?;

        // Role already granted, no need to do anything
        if self.roles.has_role(&role, &account) {
            debug!("{} already has role {}", account, role);
            return Ok(());
        }

        self.insert_member(role, account, *caller).await
    }

    async fn revoke_role_by_id(
        &mut self,
        caller: &Identity,
        role: RoleId,
        account: Identity,
    ) -> Result<(), AccessError> {
        self.roles.check_admin(&role, caller).log()?;

        // Role not granted, no need to do anything
        if !self.roles.has_role(&role, &account) {
            debug!("{} doesn't have role {}", account, role);
            return Ok(());
        }

        self.delete_member(role, account, *caller).await
    }

    async fn renounce_role_by_id(
        &mut self,
        caller: &Identity,
        role: RoleId,
    ) -> Result<(), AccessError> {
        if !self.roles.has_role(&role, caller) {
            debug!("{} doesn't have role {}", caller, role);
            return Ok(());
        }

        self.delete_member(role, *caller, *caller).await
    }
}
