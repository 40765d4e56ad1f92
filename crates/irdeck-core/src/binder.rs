// ── Accessory binder ──
//
// Keeps the host's exposed accessories in line with the registry. Each
// pass plans every create/update/remove against a snapshot first, then
// applies the plan through the host.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::controls::{ControlContext, SwitchControl, attach};
use crate::host::AccessoryHost;
use crate::model::{Accessory, AccessoryId};
use crate::store::{EntityCollection, RemoteRegistry};

/// What one [`AccessoryBinder::reconcile`] call changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BindSummary {
    pub registered: usize,
    pub updated: usize,
    pub unregistered: usize,
    /// Cached accessories whose state machine was attached this pass.
    pub attached: usize,
    /// Remotes left unexposed because of an unrecognized tag.
    pub unexposed: usize,
    /// Host calls that failed; retried next pass.
    pub failed: usize,
}

/// An accessory the binder tracks, with its behaviour once attached.
#[derive(Clone)]
pub struct TrackedAccessory {
    pub accessory: Accessory,
    control: Option<Arc<dyn SwitchControl>>,
}

impl TrackedAccessory {
    pub fn control(&self) -> Option<&Arc<dyn SwitchControl>> {
        self.control.as_ref()
    }
}

#[derive(Default)]
struct BindPlan {
    register: Vec<TrackedAccessory>,
    /// (next, previous)
    update: Vec<(TrackedAccessory, Accessory)>,
    attach_only: Vec<TrackedAccessory>,
    remove: Vec<Arc<TrackedAccessory>>,
    unexposed: usize,
}

/// Owns the set of accessories exposed through an [`AccessoryHost`].
pub struct AccessoryBinder {
    host: Arc<dyn AccessoryHost>,
    tracked: EntityCollection<AccessoryId, TrackedAccessory>,
}

impl AccessoryBinder {
    pub fn new(host: Arc<dyn AccessoryHost>) -> Self {
        Self {
            host,
            tracked: EntityCollection::new(),
        }
    }

    /// Track accessories the host recovered from its cache. They are not
    /// registered again; behaviour is attached on the next reconcile,
    /// once their remote is known.
    pub fn restore(&self, cached: Vec<Accessory>) {
        for accessory in cached {
            debug!(accessory = %accessory.id, name = %accessory.display_name, "restored from cache");
            self.tracked.upsert(
                accessory.id,
                TrackedAccessory {
                    accessory,
                    control: None,
                },
            );
        }
    }

    /// Bring exposed accessories in line with `registry`.
    pub async fn reconcile(&self, registry: &RemoteRegistry, ctx: &ControlContext) -> BindSummary {
        let plan = self.plan(registry, ctx);
        self.apply(plan).await
    }

    fn plan(&self, registry: &RemoteRegistry, ctx: &ControlContext) -> BindPlan {
        let mut plan = BindPlan::default();
        let mut live: HashSet<AccessoryId> = HashSet::new();

        for remote in registry.snapshot().iter() {
            let id = remote.accessory_id();

            if let Some(existing) = self.tracked.get(&id) {
                let control = existing
                    .control
                    .clone()
                    .or_else(|| attach(&remote.tag, id, ctx));
                let Some(control) = control else {
                    // Cached under a tag that no longer maps to a control.
                    continue;
                };
                live.insert(id);

                let accessory = existing.accessory.rebound(remote);
                let next = TrackedAccessory {
                    accessory,
                    control: Some(control),
                };

                if next.accessory != existing.accessory {
                    plan.update.push((next, existing.accessory.clone()));
                } else if existing.control.is_none() {
                    plan.attach_only.push(next);
                }
                continue;
            }

            match attach(&remote.tag, id, ctx) {
                Some(control) => {
                    live.insert(id);
                    plan.register.push(TrackedAccessory {
                        accessory: Accessory::for_remote(remote),
                        control: Some(control),
                    });
                }
                None => {
                    debug!(remote_id = %remote.id, tag = %remote.tag, "unrecognized tag, not exposing");
                    plan.unexposed += 1;
                }
            }
        }

        plan.remove = self
            .tracked
            .snapshot()
            .iter()
            .filter(|t| !live.contains(&t.accessory.id))
            .cloned()
            .collect();

        plan
    }

    async fn apply(&self, plan: BindPlan) -> BindSummary {
        let mut summary = BindSummary {
            unexposed: plan.unexposed,
            ..BindSummary::default()
        };

        // Registrations one by one: a rejected accessory is simply not
        // tracked, so the next pass tries again.
        for tracked in plan.register {
            let accessory = &tracked.accessory;
            match self.host.register(std::slice::from_ref(accessory)).await {
                Ok(()) => {
                    info!(
                        accessory = %accessory.id,
                        name = %accessory.display_name,
                        tag = %accessory.context.tag,
                        "accessory registered"
                    );
                    self.tracked.upsert(accessory.id, tracked.clone());
                    summary.registered += 1;
                }
                Err(e) => {
                    warn!(accessory = %accessory.id, error = %e, "failed to register accessory");
                    if let Some(control) = &tracked.control {
                        control.shutdown();
                    }
                    summary.failed += 1;
                }
            }
        }

        for tracked in plan.attach_only {
            debug!(accessory = %tracked.accessory.id, "control attached to cached accessory");
            self.tracked.upsert(tracked.accessory.id, tracked);
            summary.attached += 1;
        }

        if !plan.update.is_empty() {
            let batch: Vec<Accessory> = plan.update.iter().map(|(t, _)| t.accessory.clone()).collect();
            match self.host.update(&batch).await {
                Ok(()) => {
                    for (tracked, _) in plan.update {
                        info!(
                            accessory = %tracked.accessory.id,
                            name = %tracked.accessory.display_name,
                            "accessory updated"
                        );
                        self.tracked.upsert(tracked.accessory.id, tracked);
                        summary.updated += 1;
                    }
                }
                Err(e) => {
                    warn!(count = batch.len(), error = %e, "failed to update accessories");
                    summary.failed += batch.len();
                    // Keep the old host-side state but still make them
                    // controllable.
                    for (tracked, previous) in plan.update {
                        self.tracked.upsert(
                            previous.id,
                            TrackedAccessory {
                                accessory: previous,
                                control: tracked.control,
                            },
                        );
                    }
                }
            }
        }

        if !plan.remove.is_empty() {
            let batch: Vec<Accessory> = plan.remove.iter().map(|t| t.accessory.clone()).collect();
            match self.host.unregister(&batch).await {
                Ok(()) => {
                    for accessory in &batch {
                        if let Some(removed) = self.tracked.remove(&accessory.id) {
                            if let Some(control) = &removed.control {
                                control.shutdown();
                            }
                            info!(
                                accessory = %accessory.id,
                                name = %accessory.display_name,
                                "accessory unregistered"
                            );
                            summary.unregistered += 1;
                        }
                    }
                }
                Err(e) => {
                    warn!(count = batch.len(), error = %e, "failed to unregister accessories");
                    summary.failed += batch.len();
                }
            }
        }

        summary
    }

    // ── Lookups ──────────────────────────────────────────────────────

    /// Behaviour bound to an accessory, if it is exposed and attached.
    pub fn control(&self, id: &AccessoryId) -> Option<Arc<dyn SwitchControl>> {
        self.tracked.get(id).and_then(|t| t.control.clone())
    }

    pub fn get(&self, id: &AccessoryId) -> Option<Arc<TrackedAccessory>> {
        self.tracked.get(id)
    }

    pub fn contains(&self, id: &AccessoryId) -> bool {
        self.tracked.contains(id)
    }

    /// Tracked accessories, sorted by display name.
    pub fn accessories(&self) -> Vec<Accessory> {
        let mut accessories: Vec<Accessory> = self
            .tracked
            .snapshot()
            .iter()
            .map(|t| t.accessory.clone())
            .collect();
        accessories.sort_by(|a, b| a.display_name.cmp(&b.display_name).then_with(|| a.id.cmp(&b.id)));
        accessories
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// Cancel every control's pending timers.
    pub fn shutdown_controls(&self) {
        for tracked in self.tracked.snapshot().iter() {
            if let Some(control) = &tracked.control {
                control.shutdown();
            }
        }
    }
}
