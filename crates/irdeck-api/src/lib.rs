// irdeck-api: Async Rust client for the irdeck backend services (aim + pirem)

pub mod aim;
mod connect;
pub mod error;
pub mod feed;
pub mod models;
pub mod pirem;
pub mod transport;

pub use aim::AimClient;
pub use error::Error;
pub use feed::{ChangeFeed, FeedBackoff};
pub use models::{ButtonResponse, IrData, RemoteChange, RemoteResponse};
pub use pirem::PiremClient;
pub use transport::{TlsMode, TransportConfig};
