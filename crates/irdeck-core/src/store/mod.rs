// ── Storage ──

mod collection;
mod registry;

pub(crate) use collection::EntityCollection;
pub use registry::{ReconcileSummary, RemoteRegistry};
