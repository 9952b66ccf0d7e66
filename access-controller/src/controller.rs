use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use access_provider::*;
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::role_map::RoleMap;

/**
 * The external storage interface
 * Controller stages every change here before it is applied to the in-memory state, an error
 * returned while staging aborts the operation. Staged changes become durable on `commit`.
 */
#[async_trait]
pub trait ExternalStorage: Sync + Send + Debug {
    /**
     * Function will be called when a role name is registered
     */
    async fn add_role_name(
        &mut self,
        caller: &Identity,
        name: &str,
        role: RoleId,
    ) -> Result<(), AccessError>;

    /**
     * Function will be called when a role name is removed
     */
    async fn remove_role_name(&mut self, caller: &Identity, name: &str)
        -> Result<(), AccessError>;

    /**
     * Function will be called when `account` joins `role`
     */
    async fn grant_role(
        &mut self,
        role: RoleId,
        account: &Identity,
        sender: &Identity,
    ) -> Result<(), AccessError>;

    /**
     * Function will be called when `account` leaves `role`, `sender == account` on renouncement
     */
    async fn revoke_role(
        &mut self,
        role: RoleId,
        account: &Identity,
        sender: &Identity,
    ) -> Result<(), AccessError>;

    /**
     * Make every staged change durable
     */
    async fn commit(&mut self) -> Result<(), AccessError> {
        Ok(())
    }

    /**
     * Discard the change staged last, called when another storage rejected the same operation
     */
    async fn rollback(&mut self) {}
}

/**
 * Persisted part of the controller
 */
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct AccessState {
    pub(crate) owner: Identity,
    pub(crate) role_names: BTreeMap<String, RoleId>,
    pub(crate) roles: RoleMap,
}

#[derive(Debug)]
pub struct AccessController {
    // Set once at construction
    pub(crate) owner: Identity,

    // Registered role names, `ROOT_OWNER` is always present
    pub(crate) role_names: BTreeMap<String, RoleId>,

    // Memberships and admin links, keyed by identifier so they outlive the names
    pub(crate) roles: RoleMap,

    // Committed events, grows until drained by `take_events`
    pub(crate) events: Vec<AccessEvent>,

    pub external_storage: Vec<Arc<RwLock<dyn ExternalStorage>>>,
}

impl AccessController {
    /**
     * Create a controller owned by `owner`
     * `owner` is registered as the only member of `ROOT_OWNER`
     */
    pub fn new(owner: Identity) -> Result<Self, AccessError> {
        let mut ret = Self::genesis(owner)?;
        let root_owner = RoleId::root_owner();
        // No admin exists yet, grant directly
        ret.roles.grant(root_owner, owner);
        ret.emit(AccessEvent::RoleGranted {
            role: root_owner,
            account: owner,
            sender: owner,
        });
        info!("Access controller created, owner {}", owner);
        Ok(ret)
    }

    /**
     * Same as `new`, the `ROOT_OWNER` grant of `owner` is staged to `external_storage` too
     */
    pub async fn with_storage(
        owner: Identity,
        external_storage: Vec<Arc<RwLock<dyn ExternalStorage>>>,
    ) -> Result<Self, AccessError> {
        let mut ret = Self::genesis(owner)?;
        ret.external_storage = external_storage;
        ret.insert_member(RoleId::root_owner(), owner, owner).await?;
        info!(
            "Access controller created, owner {}, {} external storages",
            owner,
            ret.external_storage.len()
        );
        Ok(ret)
    }

    fn genesis(owner: Identity) -> Result<Self, AccessError> {
        if owner.is_zero() {
            return Err(AccessError::InvalidAddress(owner));
        }
        let root_owner = RoleId::root_owner();
        let mut ret = Self {
            owner,
            role_names: Default::default(),
            roles: RoleMap::new(root_owner),
            events: Default::default(),
            external_storage: Default::default(),
        };
        ret.role_names.insert(ROOT_OWNER.to_string(), root_owner);
        Ok(ret)
    }

    /**
     * Rebuild a controller from a snapshot taken by `take_snapshot`
     */
    pub fn from_snapshot(data: &[u8]) -> Result<Self, AccessError> {
        let state = Self::parse_snapshot(data)?;
        Ok(Self {
            owner: state.owner,
            role_names: state.role_names,
            roles: state.roles,
            events: Default::default(),
            external_storage: Default::default(),
        })
    }

    /**
     * Events committed since construction, load or the last `take_events`, oldest first
     * The log is unbounded, long-lived callers should drain it with `take_events`.
     */
    pub fn events(&self) -> &[AccessEvent] {
        &self.events
    }

    /**
     * Drain the event log
     */
    pub fn take_events(&mut self) -> Vec<AccessEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn emit(&mut self, event: AccessEvent) {
        info!("{}", event);
        self.events.push(event);
    }

    /**
     * Make the changes staged to every external storage durable
     */
    pub async fn commit_storage(&self) -> Result<(), AccessError> {
        for storage in self.external_storage.iter() {
            storage.write().await.commit().await?;
        }
        Ok(())
    }

    /**
     * Stage `event` to every external storage, a rejection rolls back the storages staged before
     */
    async fn stage(&self, event: &AccessEvent) -> Result<(), AccessError> {
        for (i, storage) in self.external_storage.iter().enumerate() {
            let result = {
                let mut storage = storage.write().await;
                match event {
                    AccessEvent::RoleNameAdd { caller, name } => {
                        storage
                            .add_role_name(caller, name, RoleId::from_name(name))
                            .await
                    }
                    AccessEvent::RoleNameRemove { caller, name } => {
                        storage.remove_role_name(caller, name).await
                    }
                    AccessEvent::RoleGranted {
                        role,
                        account,
                        sender,
                    } => storage.grant_role(*role, account, sender).await,
                    AccessEvent::RoleRevoked {
                        role,
                        account,
                        sender,
                    } => storage.revoke_role(*role, account, sender).await,
                }
            };
            if let Err(e) = result {
                warn!("External storage rejected {}: {}", event, e);
                for staged in self.external_storage[..i].iter() {
                    staged.write().await.rollback().await;
                }
                return Err(e);
            }
        }
        Ok(())
    }

    pub(crate) async fn insert_role_name(
        &mut self,
        caller: &Identity,
        name: &str,
    ) -> Result<(), AccessError> {
        let event = AccessEvent::RoleNameAdd {
            caller: *caller,
            name: name.to_string(),
        };
        self.stage(&event).await?;
        let role = RoleId::from_name(name);
        debug!("Role name '{}' registered as {}", name, role);
        self.role_names.insert(name.to_string(), role);
        self.emit(event);
        Ok(())
    }

    pub(crate) async fn delete_role_name(
        &mut self,
        caller: &Identity,
        name: &str,
    ) -> Result<(), AccessError> {
        let event = AccessEvent::RoleNameRemove {
            caller: *caller,
            name: name.to_string(),
        };
        self.stage(&event).await?;
        // Memberships are keyed by identifier and stay in place
        self.role_names.remove(name);
        self.emit(event);
        Ok(())
    }

    pub(crate) async fn insert_member(
        &mut self,
        role: RoleId,
        account: Identity,
        sender: Identity,
    ) -> Result<(), AccessError> {
        let event = AccessEvent::RoleGranted {
            role,
            account,
            sender,
        };
        self.stage(&event).await?;
        self.roles.grant(role, account);
        self.emit(event);
        Ok(())
    }

    pub(crate) async fn delete_member(
        &mut self,
        role: RoleId,
        account: Identity,
        sender: Identity,
    ) -> Result<(), AccessError> {
        let event = AccessEvent::RoleRevoked {
            role,
            account,
            sender,
        };
        self.stage(&event).await?;
        if account == sender {
            self.roles.renounce(&role, &account);
        } else {
            self.roles.revoke(&role, &account);
        }
        self.emit(event);
        Ok(())
    }

    fn parse_snapshot(data: &[u8]) -> Result<AccessState, AccessError> {
        let state: AccessState = serde_json::from_slice(data)?;
        if state.owner.is_zero() {
            return Err(AccessError::InvalidAddress(state.owner));
        }
        if state.role_names.get(ROOT_OWNER) != Some(&RoleId::root_owner()) {
            return Err(AccessError::SnapshotError(format!(
                "Snapshot doesn't contain role name '{}'",
                ROOT_OWNER
            )));
        }
        Ok(state)
    }
}

impl<'de> SerializableRegistry<'de> for AccessController {
    fn take_snapshot(&self) -> Result<Vec<u8>, AccessError> {
        let state = AccessState {
            owner: self.owner,
            role_names: self.role_names.clone(),
            roles: self.roles.clone(),
        };
        Ok(serde_json::to_vec_pretty(&state)?)
    }

    /**
     * Replace existing content with input snapshot, attached storages are kept
     */
    fn load_snapshot(&mut self, data: &'de [u8]) -> Result<(), AccessError> {
        let state = Self::parse_snapshot(data)?;
        self.owner = state.owner;
        self.role_names = state.role_names;
        self.roles = state.roles;
        self.events.clear();
        Ok(())
    }
}
