use std::path::{Path, PathBuf};

use access_provider::{AccessError, AccessEvent, Identity, RoleId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::ExternalStorage;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("Failed to write journal '{0}': {1}")]
    Io(String, #[source] std::io::Error),

    #[error(transparent)]
    Encode(#[from] serde_json::Error),
}

impl From<JournalError> for AccessError {
    fn from(e: JournalError) -> Self {
        AccessError::ExternalStorageError(e.to_string())
    }
}

/**
 * One line of the journal
 */
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    pub time: DateTime<Utc>,
    #[serde(flatten)]
    pub event: AccessEvent,
}

/**
 * Append-only JSON-lines journal of committed events
 * Records are staged in memory and appended to the file on `commit`, so an operation that is
 * rejected later never leaves a line behind.
 */
#[derive(Debug)]
pub struct JournalStorage {
    path: PathBuf,
    staged: Vec<String>,
}

impl JournalStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_owned(),
            staged: Default::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /**
     * Number of records waiting for `commit`
     */
    pub fn staged(&self) -> usize {
        self.staged.len()
    }

    async fn open(&self) -> Result<tokio::fs::File, JournalError> {
        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| JournalError::Io(self.path.to_string_lossy().to_string(), e))
    }

    async fn stage(&mut self, event: AccessEvent) -> Result<(), JournalError> {
        // An unwritable journal rejects the operation instead of failing on commit
        self.open().await?;
        let record = JournalRecord {
            time: Utc::now(),
            event,
        };
        self.staged.push(serde_json::to_string(&record)?);
        debug!("Journal record staged: {}", record.event);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), JournalError> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let mut data = String::new();
        for line in self.staged.iter() {
            data.push_str(line);
            data.push('\n');
        }
        let path = self.path.to_string_lossy().to_string();
        let mut file = self.open().await?;
        file.write_all(data.as_bytes())
            .await
            .map_err(|e| JournalError::Io(path.clone(), e))?;
        file.flush().await.map_err(|e| JournalError::Io(path, e))?;
        debug!("{} journal records appended", self.staged.len());
        self.staged.clear();
        Ok(())
    }

    /**
     * Read all records back, oldest first
     * Lines that cannot be decoded, e.g. the tail of an interrupted append, are skipped.
     */
    pub async fn read_records(&self) -> Result<Vec<JournalRecord>, JournalError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(JournalError::Io(self.path.to_string_lossy().to_string(), e)),
        };
        Ok(content
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .filter_map(|(n, l)| match serde_json::from_str(l) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(
                        "Skipping journal '{}' line {}: {}",
                        self.path.to_string_lossy(),
                        n + 1,
                        e
                    );
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl ExternalStorage for JournalStorage {
    async fn add_role_name(
        &mut self,
        caller: &Identity,
        name: &str,
        _role: RoleId,
    ) -> Result<(), AccessError> {
        Ok(self
            .stage(AccessEvent::RoleNameAdd {
                caller: *caller,
                name: name.to_string(),
            })
            .await?)
    }

    async fn remove_role_name(
        &mut self,
        caller: &Identity,
        name: &str,
    ) -> Result<(), AccessError> {
        Ok(self
            .stage(AccessEvent::RoleNameRemove {
                caller: *caller,
                name: name.to_string(),
            })
            .await?)
    }

    async fn grant_role(
        &mut self,
        role: RoleId,
        account: &Identity,
        sender: &Identity,
    ) -> Result<(), AccessError> {
        Ok(self
            .stage(AccessEvent::RoleGranted {
                role,
                account: *account,
                sender: *sender,
            })
            .await?)
    }

    async fn revoke_role(
        &mut self,
        role: RoleId,
        account: &Identity,
        sender: &Identity,
    ) -> Result<(), AccessError> {
        Ok(self
            .stage(AccessEvent::RoleRevoked {
                role,
                account: *account,
                sender: *sender,
            })
            .await?)
    }

    async fn commit(&mut self) -> Result<(), AccessError> {
        Ok(self.flush().await?)
    }

    async fn rollback(&mut self) {
        self.staged.pop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use access_provider::{MembershipController, RoleRegistry};
    use tokio::sync::RwLock;

    use super::*;
    use crate::AccessController;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "access-journal-{}-{}-{}.jsonl",
            name,
            std::process::id(),
            rand::random::<u64>()
        ))
    }

    #[tokio::test]
    async fn journal_records_events() {
        let path = temp_path("records");
        let owner = Identity::new([1; 20]);
        let addr1 = Identity::new([2; 20]);
        let journal = Arc::new(RwLock::new(JournalStorage::new(&path)));

        let mut c = AccessController::new(owner).unwrap();
        c.external_storage.push(journal.clone());
        c.add_role(&owner, "MINTER").await.unwrap();
        c.grant_role_by_name(&owner, "MINTER", addr1).await.unwrap();
        c.renounce_role_by_name(&addr1, "MINTER").await.unwrap();
        // Nothing reaches the file before commit
        assert!(journal.read().await.read_records().await.unwrap().is_empty());
        assert_eq!(journal.read().await.staged(), 3);
        c.commit_storage().await.unwrap();
        assert_eq!(journal.read().await.staged(), 0);

        let events: Vec<AccessEvent> = journal
            .read()
            .await
            .read_records()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.event)
            .collect();
        // Construction happens before the journal is attached
        assert_eq!(events, c.events()[1..].to_vec());
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn missing_journal_is_empty() {
        let journal = JournalStorage::new(temp_path("missing"));
        assert!(journal.read_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unwritable_journal_rejects_operation() {
        let dir = temp_path("dir");
        std::fs::create_dir_all(&dir).unwrap();
        let owner = Identity::new([1; 20]);
        let mut c = AccessController::new(owner).unwrap();
        // A directory cannot be opened for appending
        c.external_storage
            .push(Arc::new(RwLock::new(JournalStorage::new(&dir))));
        assert!(matches!(
            c.add_role(&owner, "MINTER").await,
            Err(AccessError::ExternalStorageError(_))
        ));
        assert!(!c.is_role_name_registered("MINTER"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn torn_line_is_skipped() {
        let path = temp_path("torn");
        let owner = Identity::new([1; 20]);
        let journal = Arc::new(RwLock::new(JournalStorage::new(&path)));
        let mut c = AccessController::new(owner).unwrap();
        c.external_storage.push(journal.clone());
        c.add_role(&owner, "MINTER").await.unwrap();
        c.commit_storage().await.unwrap();

        // Interrupted append, then more records after a restart
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("{\"time\":\"2022-01-01T00:00:00Z\",\"event\":\"roleNa\n");
        std::fs::write(&path, content).unwrap();
        c.add_role(&owner, "BURNER").await.unwrap();
        c.commit_storage().await.unwrap();

        let records = journal.read().await.read_records().await.unwrap();
        assert_eq!(
            records.into_iter().map(|r| r.event).collect::<Vec<_>>(),
            vec![
                AccessEvent::RoleNameAdd {
                    caller: owner,
                    name: "MINTER".to_string()
                },
                AccessEvent::RoleNameAdd {
                    caller: owner,
                    name: "BURNER".to_string()
                },
            ]
        );
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn rollback_drops_last_staged_record() {
        let path = temp_path("rollback");
        let owner = Identity::new([1; 20]);
        let mut journal = JournalStorage::new(&path);
        journal.add_role_name(&owner, "MINTER", RoleId::from_name("MINTER")).await.unwrap();
        journal.add_role_name(&owner, "BURNER", RoleId::from_name("BURNER")).await.unwrap();
        journal.rollback().await;
        journal.commit().await.unwrap();

        let records = journal.read_records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].event,
            AccessEvent::RoleNameAdd {
                caller: owner,
                name: "MINTER".to_string()
            }
        );
        std::fs::remove_file(&path).ok();
    }
}
