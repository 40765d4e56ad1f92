// ── Identity types ──
//
// Backend ids are opaque strings; each gets its own newtype so a button
// id can never be passed where a remote id is expected. `AccessoryId` is
// the derived join key between the registry and exposed accessories.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_id!(
    /// Backend-assigned remote id. Stable for the lifetime of the remote.
    RemoteId
);
string_id!(
    /// Backend-assigned button id.
    ButtonId
);
string_id!(
    /// Physical transmitter a remote's signals are sent through.
    DeviceId
);

// ── AccessoryId ─────────────────────────────────────────────────────

/// Namespace for deriving accessory ids. Changing it orphans every
/// accessory in every existing cache.
const ACCESSORY_NAMESPACE: Uuid = Uuid::from_u128(0x5c0e_7a1d_93b2_4e6f_a8d4_1f27_c3e9_b640);

/// Derived identifier of the accessory exposing a remote.
///
/// A UUIDv5 of the remote id, so the same remote maps to the same
/// accessory across polls and across process restarts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AccessoryId(Uuid);

impl AccessoryId {
    pub fn for_remote(remote_id: &RemoteId) -> Self {
        Self(Uuid::new_v5(&ACCESSORY_NAMESPACE, remote_id.as_str().as_bytes()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for AccessoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccessoryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}
