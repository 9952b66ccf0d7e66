use std::path::Path;
use std::sync::Arc;

use access_provider::SerializableRegistry;
use anyhow::Context;
use log::{debug, info};
use tokio::sync::RwLock;

use crate::{AccessController, ExternalStorage};

mod journal;

pub use journal::{JournalError, JournalRecord, JournalStorage};

const JOURNAL_PATH_VAR: &str = "ACCESS_JOURNAL_PATH";

fn journal_path() -> Option<String> {
    std::env::var(JOURNAL_PATH_VAR)
        .ok()
        .filter(|p| !p.trim().is_empty())
}

/**
 * The event journal at `ACCESS_JOURNAL_PATH`, if set
 */
pub fn journal_storage() -> Option<Arc<RwLock<dyn ExternalStorage>>> {
    journal_path().map(|path| {
        debug!("Using journal '{}'", path);
        Arc::new(RwLock::new(JournalStorage::new(path))) as Arc<RwLock<dyn ExternalStorage>>
    })
}

/**
 * Attach the event journal if `ACCESS_JOURNAL_PATH` is set
 */
pub fn attach_storage(controller: &mut AccessController) {
    controller.external_storage.extend(journal_storage());
}

/**
 * Load a controller from a snapshot file
 */
pub async fn load_controller<P: AsRef<Path>>(path: P) -> anyhow::Result<AccessController> {
    let path = path.as_ref();
    debug!("Loading state from '{}'", path.to_string_lossy());
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Unable to read state file '{}'", path.to_string_lossy()))?;
    let controller = AccessController::from_snapshot(&data)?;
    info!(
        "State loaded, owner {}, {} role names",
        controller.owner,
        controller.role_names.len()
    );
    Ok(controller)
}

/**
 * Write the snapshot next to `path` first, then move it in place
 */
pub async fn save_controller<P: AsRef<Path>>(
    controller: &AccessController,
    path: P,
) -> anyhow::Result<()> {
    let path = path.as_ref();
    let data = controller.take_snapshot()?;
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, &data)
        .await
        .with_context(|| format!("Unable to write '{}'", tmp.to_string_lossy()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Unable to replace '{}'", path.to_string_lossy()))?;
    debug!("State saved to '{}'", path.to_string_lossy());
    Ok(())
}

#[cfg(test)]
mod tests {
    use access_provider::{Identity, MembershipController, RoleRegistry};

    use super::*;

    #[tokio::test]
    async fn save_and_load() {
        let path = std::env::temp_dir().join(format!(
            "access-state-{}-{}.json",
            std::process::id(),
            rand::random::<u64>()
        ));
        let owner = Identity::new([1; 20]);
        let addr1 = Identity::new([2; 20]);
        let mut c = AccessController::new(owner).unwrap();
        c.add_role(&owner, "MINTER").await.unwrap();
        c.grant_role_by_name(&owner, "MINTER", addr1).await.unwrap();
        save_controller(&c, &path).await.unwrap();

        let loaded = load_controller(&path).await.unwrap();
        assert_eq!(loaded.owner(), owner);
        assert!(loaded.has_role_by_name("MINTER", &addr1));
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn load_missing_file() {
        let path = std::env::temp_dir().join("access-state-does-not-exist.json");
        assert!(load_controller(&path).await.is_err());
    }
}
