// ── Remote registry ──
//
// The core's data authority: one `Remote` per derived accessory id,
// reconciled against every fresh catalogue fetch.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::collection::EntityCollection;
use crate::backend::RemoteClient;
use crate::config::ButtonRefresh;
use crate::model::{AccessoryId, ButtonMap, Remote, RemoteRecord};

/// What one [`RemoteRegistry::reconcile`] call changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    /// New remotes left out this pass because their buttons failed to load.
    pub skipped: usize,
}

impl ReconcileSummary {
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.updated == 0 && self.removed == 0
    }
}

/// Known remotes keyed by [`AccessoryId`].
///
/// Mutated only from [`reconcile`](Self::reconcile); callers serialize
/// passes. Readers may run concurrently and always see whole remotes.
pub struct RemoteRegistry {
    remotes: EntityCollection<AccessoryId, Remote>,
}

impl Default for RemoteRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteRegistry {
    pub fn new() -> Self {
        Self {
            remotes: EntityCollection::new(),
        }
    }

    /// Bring the registry in line with a freshly fetched catalogue.
    ///
    /// Known remotes get their name, device and (when available) buttons
    /// replaced under the same id. Unknown remotes are created; if their
    /// buttons cannot be loaded they are skipped until the next pass.
    /// Remotes missing from `fetched` are dropped. Calling this twice
    /// with the same input changes nothing the second time.
    pub async fn reconcile(
        &self,
        fetched: Vec<RemoteRecord>,
        client: &dyn RemoteClient,
        refresh: ButtonRefresh,
    ) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();
        let mut seen: HashSet<AccessoryId> = HashSet::with_capacity(fetched.len());

        for mut record in fetched {
            let key = record.accessory_id();
            seen.insert(key);

            if let Some(existing) = self.remotes.get(&key) {
                if existing.tag != record.tag {
                    debug!(
                        remote_id = %record.id,
                        current = %existing.tag,
                        fetched = %record.tag,
                        "ignoring tag change on known remote"
                    );
                }

                let buttons = match record.buttons {
                    Some(buttons) => Some(buttons),
                    None => refreshed_buttons(&existing, client, refresh).await,
                };
                let next = existing.updated(record.name, record.device_id, buttons);

                if next != *existing {
                    info!(remote_id = %next.id, name = %next.name, "remote updated");
                    self.remotes.upsert(key, next);
                    summary.updated += 1;
                }
                continue;
            }

            let buttons = match record.buttons.take() {
                Some(buttons) => buttons,
                None => match client.list_buttons(&record.id).await {
                    Ok(buttons) => buttons,
                    Err(e) => {
                        warn!(
                            remote_id = %record.id,
                            error = %e,
                            "failed to load buttons, skipping remote this pass"
                        );
                        summary.skipped += 1;
                        continue;
                    }
                },
            };

            let remote = Remote::new(record, buttons);
            info!(
                remote_id = %remote.id,
                name = %remote.name,
                tag = %remote.tag,
                buttons = remote.buttons.len(),
                "remote added"
            );
            self.remotes.upsert(key, remote);
            summary.added += 1;
        }

        // Orphan sweep: decide first, then remove.
        let orphans: Vec<AccessoryId> = self
            .remotes
            .keys()
            .into_iter()
            .filter(|key| !seen.contains(key))
            .collect();

        for key in orphans {
            if let Some(removed) = self.remotes.remove(&key) {
                info!(remote_id = %removed.id, name = %removed.name, "remote removed");
                summary.removed += 1;
            }
        }

        summary
    }

    // ── Lookups ──────────────────────────────────────────────────────

    pub fn get(&self, id: &AccessoryId) -> Option<Arc<Remote>> {
        self.remotes.get(id)
    }

    pub fn contains(&self, id: &AccessoryId) -> bool {
        self.remotes.contains(id)
    }

    /// Find a remote by backend id, falling back to a case-insensitive
    /// name match.
    pub fn find(&self, query: &str) -> Option<Arc<Remote>> {
        let snapshot = self.remotes.snapshot();
        snapshot
            .iter()
            .find(|r| r.id.as_str() == query)
            .or_else(|| snapshot.iter().find(|r| r.name.eq_ignore_ascii_case(query)))
            .cloned()
    }

    /// All remotes, sorted by name.
    pub fn remotes(&self) -> Vec<Arc<Remote>> {
        let mut remotes: Vec<Arc<Remote>> = self.remotes.snapshot().iter().cloned().collect();
        remotes.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        remotes
    }

    pub fn snapshot(&self) -> Arc<Vec<Arc<Remote>>> {
        self.remotes.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<Remote>>>> {
        self.remotes.subscribe()
    }

    pub fn len(&self) -> usize {
        self.remotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remotes.is_empty()
    }

    /// Bumped on every insert, replace and removal.
    pub fn version(&self) -> u64 {
        self.remotes.version()
    }
}

/// Buttons for a known remote whose listing did not embed them.
/// `None` keeps the current map.
async fn refreshed_buttons(
    existing: &Remote,
    client: &dyn RemoteClient,
    refresh: ButtonRefresh,
) -> Option<ButtonMap> {
    match refresh {
        ButtonRefresh::OnCreate => None,
        ButtonRefresh::Always => match client.list_buttons(&existing.id).await {
            Ok(buttons) => Some(buttons),
            Err(e) => {
                warn!(
                    remote_id = %existing.id,
                    error = %e,
                    "failed to refresh buttons, keeping previous map"
                );
                None
            }
        },
    }
}
