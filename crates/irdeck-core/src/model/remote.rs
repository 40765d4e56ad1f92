// ── Remote domain types ──

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::ids::{AccessoryId, ButtonId, DeviceId, RemoteId};
use crate::backend::SignalDispatch;
use crate::error::CoreError;

/// Button display name -> backend button id.
pub type ButtonMap = HashMap<String, ButtonId>;

// ── ControlTag ──────────────────────────────────────────────────────

/// Control semantics of a remote, selected once when its accessory is
/// created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ControlTag {
    /// Momentary press that reverts on its own.
    Button,
    /// Sticky on/off.
    Toggle,
    /// Any other tag. Remotes carrying it are not exposed.
    Unrecognized(String),
}

impl ControlTag {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Button => "button",
            Self::Toggle => "toggle",
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl From<String> for ControlTag {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "button" => Self::Button,
            "toggle" => Self::Toggle,
            _ => Self::Unrecognized(raw),
        }
    }
}

impl From<&str> for ControlTag {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_owned())
    }
}

impl From<ControlTag> for String {
    fn from(tag: ControlTag) -> Self {
        match tag {
            ControlTag::Unrecognized(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for ControlTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── RemoteRecord ────────────────────────────────────────────────────

/// A remote exactly as fetched from the backend, before reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    pub id: RemoteId,
    pub name: String,
    pub device_id: DeviceId,
    pub tag: ControlTag,
    /// Present only when the backend embeds buttons in the listing.
    pub buttons: Option<ButtonMap>,
}

impl RemoteRecord {
    pub fn accessory_id(&self) -> AccessoryId {
        AccessoryId::for_remote(&self.id)
    }
}

/// A change to the catalogue reported by the backend's change feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteChange {
    Added(RemoteRecord),
    Removed(RemoteId),
    Updated(RemoteRecord),
}

impl RemoteChange {
    pub fn remote_id(&self) -> &RemoteId {
        match self {
            Self::Added(r) | Self::Updated(r) => &r.id,
            Self::Removed(id) => id,
        }
    }
}

// ── Remote ──────────────────────────────────────────────────────────

/// A controllable device known to the registry.
///
/// Values are immutable once stored: an update builds a new `Remote`
/// and swaps it in under the same [`AccessoryId`], so a concurrent
/// press sees either the old or the new remote in full.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Remote {
    pub id: RemoteId,
    pub name: String,
    pub device_id: DeviceId,
    pub tag: ControlTag,
    pub buttons: ButtonMap,
}

impl Remote {
    pub fn new(record: RemoteRecord, buttons: ButtonMap) -> Self {
        Self {
            id: record.id,
            name: record.name,
            device_id: record.device_id,
            tag: record.tag,
            buttons,
        }
    }

    pub fn accessory_id(&self) -> AccessoryId {
        AccessoryId::for_remote(&self.id)
    }

    pub fn has_button(&self, name: &str) -> bool {
        self.buttons.contains_key(name)
    }

    /// Button names, sorted for display.
    pub fn button_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.buttons.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Copy with the mutable fields replaced. The tag never changes once
    /// a remote is known; `None` keeps the current button map.
    pub(crate) fn updated(
        &self,
        name: String,
        device_id: DeviceId,
        buttons: Option<ButtonMap>,
    ) -> Self {
        Self {
            id: self.id.clone(),
            name,
            device_id,
            tag: self.tag.clone(),
            buttons: buttons.unwrap_or_else(|| self.buttons.clone()),
        }
    }

    /// Resolve `button_name` and transmit it to this remote's device.
    ///
    /// An unknown button name, or a button the backend no longer knows,
    /// is a silent no-op. Transport failures are returned to the caller
    /// and never retried here.
    pub async fn send_signal(
        &self,
        dispatch: &dyn SignalDispatch,
        button_name: &str,
    ) -> Result<(), CoreError> {
        let Some(button_id) = self.buttons.get(button_name) else {
            debug!(remote_id = %self.id, button = button_name, "no such button, ignoring");
            return Ok(());
        };

        match dispatch
            .resolve_and_send(&self.id, &self.device_id, button_id)
            .await
        {
            Ok(()) => {
                debug!(
                    remote_id = %self.id,
                    device_id = %self.device_id,
                    button = button_name,
                    "signal sent"
                );
                Ok(())
            }
            Err(CoreError::NotFound { identifier, .. }) => {
                warn!(
                    remote_id = %self.id,
                    %button_id,
                    reason = %identifier,
                    "button unknown to backend, ignoring"
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record(id: &str, tag: &str) -> RemoteRecord {
        RemoteRecord {
            id: RemoteId::from(id),
            name: "TV".into(),
            device_id: DeviceId::from("pirem-1"),
            tag: ControlTag::from(tag),
            buttons: None,
        }
    }

    #[test]
    fn tag_recognition() {
        assert_eq!(ControlTag::from("button"), ControlTag::Button);
        assert_eq!(ControlTag::from("toggle"), ControlTag::Toggle);
        let other = ControlTag::from("thermostat");
        assert!(!other.is_recognized());
        assert_eq!(other.to_string(), "thermostat");
        // Matching is exact.
        assert!(!ControlTag::from("Button").is_recognized());
    }

    #[test]
    fn tag_serializes_as_plain_string() {
        assert_eq!(serde_json::to_string(&ControlTag::Toggle).unwrap(), "\"toggle\"");
        let tag: ControlTag = serde_json::from_str("\"fan\"").unwrap();
        assert_eq!(tag, ControlTag::Unrecognized("fan".into()));
    }

    #[test]
    fn updated_keeps_identity_and_tag() {
        let mut buttons = ButtonMap::new();
        buttons.insert("push".into(), ButtonId::from("b1"));
        let remote = Remote::new(record("r1", "button"), buttons.clone());

        let next = remote.updated("Bedroom TV".into(), DeviceId::from("pirem-2"), None);
        assert_eq!(next.id, remote.id);
        assert_eq!(next.tag, ControlTag::Button);
        assert_eq!(next.name, "Bedroom TV");
        assert_eq!(next.buttons, buttons);
        assert_eq!(next.accessory_id(), remote.accessory_id());
    }

    #[test]
    fn button_names_are_sorted() {
        let mut buttons = ButtonMap::new();
        buttons.insert("off".into(), ButtonId::from("b2"));
        buttons.insert("on".into(), ButtonId::from("b1"));
        let remote = Remote::new(record("r1", "toggle"), buttons);
        assert_eq!(remote.button_names(), vec!["off", "on"]);
        assert!(remote.has_button("on"));
        assert!(!remote.has_button("push"));
    }
}
