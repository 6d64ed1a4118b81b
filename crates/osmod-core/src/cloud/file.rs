// # File Cloud
//
// File-backed implementation of CloudClient with crash recovery.
//
// ## Purpose
//
// Lets separate `osmod` invocations (one process per task) observe each
// other's changes, so a playbook can be replayed offline and its
// idempotency checked.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Automatic backup: Keeps .backup of last known good state
// - Recovery: Falls back to backup if the main file does not parse
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "cloud": {
//     "resources": {
//       "zone": [
//         {"body": {"id": "...", "name": "example.net.", "status": "ACTIVE"}, "pending_polls": 0}
//       ]
//     }
//   }
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use super::memory::CloudState;
use crate::Error;
use crate::config::CloudConfig;
use crate::traits::{CloudClient, CloudClientFactory, Filters, ResourceKind};

/// State file format version
const STATE_FILE_VERSION: &str = "1.0";

/// Serializable state file format
#[derive(Debug, Serialize, Deserialize)]
struct StateFileFormat {
    version: String,
    cloud: CloudState,
}

/// File-backed cloud client
///
/// Every mutation, and every `get` that advances a pending status, is
/// written to disk before the call returns. Changes are applied to a copy
/// of the state and only become visible once the write succeeded.
///
/// # Example
///
/// ```rust,no_run
/// use osmod_core::cloud::FileCloud;
/// use osmod_core::traits::{CloudClient, Filters, ResourceKind};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let cloud = FileCloud::new("/var/lib/osmod/cloud.json").await?;
///     let zones = cloud.list(ResourceKind::Zone, &Filters::new()).await?;
///     println!("{} zones", zones.len());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileCloud {
    path: PathBuf,
    settle_polls: u32,
    state: Arc<RwLock<CloudState>>,
}

impl FileCloud {
    /// Create or load a file cloud
    ///
    /// This will:
    /// 1. Try to load the existing state file
    /// 2. If it does not parse, try to load from backup
    /// 3. If both fail, start with an empty cloud
    /// 4. Create parent directories if needed
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create state directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let state = Self::load_state_with_recovery(&path).await?;

        Ok(Self {
            path,
            settle_polls: 1,
            state: Arc::new(RwLock::new(state)),
        })
    }

    /// Number of `get` calls before a pending resource settles
    pub fn with_settle_polls(mut self, settle_polls: u32) -> Self {
        self.settle_polls = settle_polls;
        self
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_state_with_recovery(path: &Path) -> Result<CloudState, Error> {
        match Self::load_state(path).await {
            Ok(state) => {
                tracing::debug!("Loaded cloud state: {} resources", state.count());
                Ok(state)
            }
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Cloud state file appears corrupted: {}. Attempting recovery from backup.",
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with an empty cloud.");
                    return Ok(CloudState::default());
                }

                match Self::load_state(&backup_path).await {
                    Ok(state) => {
                        tracing::info!("Recovered cloud state from backup: {} resources", state.count());
                        if let Err(restore_err) = fs::copy(&backup_path, path).await {
                            tracing::error!(
                                "Failed to restore state file from backup: {}",
                                restore_err
                            );
                        }
                        Ok(state)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also corrupted: {}. Starting with an empty cloud.",
                            backup_err
                        );
                        Ok(CloudState::default())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn load_state(path: &Path) -> Result<CloudState, Error> {
        if !path.exists() {
            tracing::debug!("Cloud state file does not exist: {}", path.display());
            return Ok(CloudState::default());
        }

        let content = fs::read_to_string(path).await?;
        let state_file: StateFileFormat = serde_json::from_str(&content)?;

        if state_file.version != STATE_FILE_VERSION {
            tracing::warn!(
                "Cloud state version mismatch: expected {}, got {}. Attempting to load anyway.",
                STATE_FILE_VERSION,
                state_file.version
            );
        }

        Ok(state_file.cloud)
    }

    /// Write state to file atomically
    async fn write_state(&self, state: &CloudState) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(&StateFileFormat {
            version: STATE_FILE_VERSION.to_string(),
            cloud: state.clone(),
        })?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::cloud(
                    self.cloud_name(),
                    format!("Failed to create temp file {}: {}", temp_path.display(), e),
                )
            })?;
            file.write_all(json.as_bytes()).await?;
            file.flush().await?;
        }

        if self.path.exists() {
            if let Err(e) = fs::copy(&self.path, Self::backup_path(&self.path)).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::cloud(
                self.cloud_name(),
                format!(
                    "Failed to rename {} to {}: {}",
                    temp_path.display(),
                    self.path.display(),
                    e
                ),
            )
        })?;

        tracing::trace!("Cloud state written to {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }

    fn not_found(&self, kind: ResourceKind, id: &str) -> Error {
        Error::cloud(self.cloud_name(), format!("{} {} not found", kind, id))
    }
}

#[async_trait]
impl CloudClient for FileCloud {
    async fn list(&self, kind: ResourceKind, filters: &Filters) -> Result<Vec<Value>, Error> {
        Ok(self.state.read().await.list(kind, filters))
    }

    async fn get(&self, kind: ResourceKind, id: &str) -> Result<Option<Value>, Error> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let (snapshot, advanced) = next.get(kind, id);
        if advanced {
            self.write_state(&next).await?;
            *state = next;
        }
        Ok(snapshot)
    }

    async fn create(&self, kind: ResourceKind, body: Map<String, Value>) -> Result<Value, Error> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let snapshot = next.create(kind, body, self.settle_polls);
        self.write_state(&next).await?;
        *state = next;
        Ok(snapshot)
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<Value, Error> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let snapshot = next
            .update(kind, id, patch, self.settle_polls)
            .ok_or_else(|| self.not_found(kind, id))?;
        self.write_state(&next).await?;
        *state = next;
        Ok(snapshot)
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<(), Error> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        if !next.delete(kind, id) {
            return Err(self.not_found(kind, id));
        }
        self.write_state(&next).await?;
        *state = next;
        Ok(())
    }

    fn cloud_name(&self) -> &str {
        "file"
    }
}

/// Factory for creating file clouds
pub struct FileCloudFactory;

#[async_trait]
impl CloudClientFactory for FileCloudFactory {
    async fn create(&self, config: &CloudConfig) -> Result<Box<dyn CloudClient>, Error> {
        match config {
            CloudConfig::File { path, settle_polls } => {
                let cloud = FileCloud::new(path).await?.with_settle_polls(*settle_polls);
                Ok(Box::new(cloud))
            }
            _ => Err(Error::config("Invalid config for file cloud")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_file_cloud_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cloud.json");

        let cloud = FileCloud::new(&path).await.unwrap();
        let created = cloud
            .create(ResourceKind::Keypair, obj(json!({"name": "deploy"})))
            .await
            .unwrap();
        assert!(path.exists());

        let reopened = FileCloud::new(&path).await.unwrap();
        let found = reopened
            .get(ResourceKind::Keypair, "deploy")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found["public_key"], created["public_key"]);
    }

    #[tokio::test]
    async fn test_pending_polls_survive_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cloud.json");

        let cloud = FileCloud::new(&path).await.unwrap().with_settle_polls(2);
        let created = cloud
            .create(ResourceKind::LoadBalancer, obj(json!({"name": "lb"})))
            .await
            .unwrap();
        let id = created["id"].as_str().unwrap();
        cloud.get(ResourceKind::LoadBalancer, id).await.unwrap();

        let reopened = FileCloud::new(&path).await.unwrap();
        let settled = reopened
            .get(ResourceKind::LoadBalancer, id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(settled["provisioning_status"], json!("ACTIVE"));
    }

    #[tokio::test]
    async fn test_corruption_recovery() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cloud.json");

        let cloud = FileCloud::new(&path).await.unwrap();
        cloud
            .create(ResourceKind::Network, obj(json!({"name": "first"})))
            .await
            .unwrap();
        cloud
            .create(ResourceKind::Network, obj(json!({"name": "second"})))
            .await
            .unwrap();
        assert!(FileCloud::backup_path(&path).exists());

        fs::write(&path, b"corrupted json data").await.unwrap();

        // The backup holds the state before the last write
        let recovered = FileCloud::new(&path).await.unwrap();
        let networks = recovered
            .list(ResourceKind::Network, &Filters::new())
            .await
            .unwrap();
        assert_eq!(networks.len(), 1);
        assert_eq!(networks[0]["name"], json!("first"));
    }

    #[tokio::test]
    async fn test_missing_resource_errors() {
        let dir = tempdir().unwrap();
        let cloud = FileCloud::new(dir.path().join("cloud.json")).await.unwrap();
        let err = cloud
            .update(ResourceKind::Volume, "nope", Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cloud { .. }));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_state_unchanged() {
        let dir = tempdir().unwrap();
        let state_dir = dir.path().join("state");
        let cloud = FileCloud::new(state_dir.join("cloud.json")).await.unwrap();
        let created = cloud
            .create(ResourceKind::Network, obj(json!({"name": "kept"})))
            .await
            .unwrap();
        let id = created["id"].as_str().unwrap();

        fs::remove_dir_all(&state_dir).await.unwrap();

        let err = cloud
            .create(ResourceKind::Network, obj(json!({"name": "lost"})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cloud { .. }));
        assert!(cloud.delete(ResourceKind::Network, id).await.is_err());
        assert!(
            cloud
                .update(ResourceKind::Network, id, obj(json!({"mtu": 9000})))
                .await
                .is_err()
        );

        let networks = cloud
            .list(ResourceKind::Network, &Filters::new())
            .await
            .unwrap();
        assert_eq!(networks.len(), 1);
        assert_eq!(networks[0]["name"], json!("kept"));
        assert!(networks[0].get("mtu").is_none());
    }
}
