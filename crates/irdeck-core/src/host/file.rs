// File-backed accessory host.
//
// Keeps registered accessories in memory and mirrors them to a JSON
// cache file after every lifecycle call. The cache is read once at open
// and handed back for restoration.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::AccessoryHost;
use crate::error::CoreError;
use crate::model::{Accessory, AccessoryId};

/// [`AccessoryHost`] that persists to a single JSON file.
pub struct FileHost {
    path: PathBuf,
    accessories: Mutex<BTreeMap<AccessoryId, Accessory>>,
    characteristics: DashMap<AccessoryId, bool>,
}

impl FileHost {
    /// Open (or start) the cache at `path`.
    ///
    /// Returns the host together with the accessories it already knew,
    /// which the caller passes to [`Bridge::restore`](crate::Bridge::restore).
    pub async fn open(path: impl Into<PathBuf>) -> Result<(Self, Vec<Accessory>), CoreError> {
        let path = path.into();
        let cached = read_cache(&path).await?;
        info!(path = %path.display(), count = cached.len(), "accessory cache loaded");

        let accessories = cached.iter().map(|a| (a.id, a.clone())).collect();
        let host = Self {
            path,
            accessories: Mutex::new(accessories),
            characteristics: DashMap::new(),
        };
        Ok((host, cached))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accessories currently registered, in id order.
    pub async fn registered(&self) -> Vec<Accessory> {
        self.accessories.lock().await.values().cloned().collect()
    }

    /// Last value pushed with [`AccessoryHost::notify_on`].
    pub fn characteristic(&self, accessory: &AccessoryId) -> Option<bool> {
        self.characteristics.get(accessory).map(|v| *v)
    }

    /// Write the full set atomically: temp file, then rename.
    async fn persist(&self, accessories: &BTreeMap<AccessoryId, Accessory>) -> Result<(), CoreError> {
        let list: Vec<&Accessory> = accessories.values().collect();
        let json = serde_json::to_vec_pretty(&list)
            .map_err(|e| CoreError::Internal(format!("failed to encode accessory cache: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("create cache directory", parent, &e))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| io_error("write", &tmp, &e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io_error("replace", &self.path, &e))?;

        debug!(path = %self.path.display(), count = list.len(), "accessory cache saved");
        Ok(())
    }
}

#[async_trait]
impl AccessoryHost for FileHost {
    async fn register(&self, accessories: &[Accessory]) -> Result<(), CoreError> {
        let mut guard = self.accessories.lock().await;
        let mut next = guard.clone();
        for accessory in accessories {
            if next.contains_key(&accessory.id) {
                return Err(CoreError::host(format!(
                    "accessory {} is already registered",
                    accessory.id
                )));
            }
            next.insert(accessory.id, accessory.clone());
        }
        self.persist(&next).await?;
        *guard = next;
        Ok(())
    }

    async fn update(&self, accessories: &[Accessory]) -> Result<(), CoreError> {
        let mut guard = self.accessories.lock().await;
        let mut next = guard.clone();
        for accessory in accessories {
            next.insert(accessory.id, accessory.clone());
        }
        self.persist(&next).await?;
        *guard = next;
        Ok(())
    }

    async fn unregister(&self, accessories: &[Accessory]) -> Result<(), CoreError> {
        let mut guard = self.accessories.lock().await;
        let mut next = guard.clone();
        for accessory in accessories {
            next.remove(&accessory.id);
        }
        self.persist(&next).await?;
        *guard = next;
        for accessory in accessories {
            self.characteristics.remove(&accessory.id);
        }
        Ok(())
    }

    fn notify_on(&self, accessory: AccessoryId, on: bool) {
        debug!(%accessory, on, "characteristic pushed");
        self.characteristics.insert(accessory, on);
    }
}

/// Read an accessory cache file. A missing file is an empty cache.
pub async fn read_cache(path: &Path) -> Result<Vec<Accessory>, CoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
            CoreError::host(format!("corrupt accessory cache {}: {e}", path.display()))
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(io_error("read", path, &e)),
    }
}

fn io_error(action: &str, path: &Path, err: &std::io::Error) -> CoreError {
    CoreError::host(format!("failed to {action} {}: {err}", path.display()))
}
