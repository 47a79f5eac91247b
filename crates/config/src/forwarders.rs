//! Forwarder declarations
//!
//! ```toml
//! [[forwarders]]
//! name = "native-log"
//! event_type = "log"
//! ```

use satellite_protocol::EventType;
use serde::Deserialize;

/// Closed set of forwarder implementations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForwarderKind {
    /// Sends to the `[upstream]` collector over RPC
    #[default]
    Grpc,
    /// Acknowledges and discards
    Null,
}

impl ForwarderKind {
    pub const ALL: &'static [ForwarderKind] = &[Self::Grpc, Self::Null];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grpc => "grpc",
            Self::Null => "null",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Grpc => "Forwards batches and sync calls to the upstream collector",
            Self::Null => "Discards every batch, for tests and muting a kind",
        }
    }

    /// Whether this kind can answer synchronous calls
    pub fn supports_sync(&self) -> bool {
        matches!(self, Self::Grpc)
    }

    /// TOML snippet declaring a forwarder of this kind for `event_type`
    pub fn default_config(&self, event_type: EventType) -> String {
        format!(
            "[[forwarders]]\nname = \"{}-{}\"\nkind = \"{}\"\nevent_type = \"{}\"\n",
            self.as_str(),
            event_type.as_str().replace('_', "-"),
            self.as_str(),
            event_type
        )
    }
}

impl std::fmt::Display for ForwarderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `[[forwarders]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct ForwarderConfig {
    pub name: String,

    #[serde(default)]
    pub kind: ForwarderKind,

    /// The single event type this forwarder carries
    pub event_type: EventType,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl ForwarderConfig {
    pub fn new(name: impl Into<String>, kind: ForwarderKind, event_type: EventType) -> Self {
        Self {
            name: name.into(),
            kind,
            event_type,
            enabled: true,
        }
    }
}

fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        forwarders: Vec<ForwarderConfig>,
    }

    #[test]
    fn test_kind_defaults_to_grpc() {
        let toml = "[[forwarders]]\nname = \"segments\"\nevent_type = \"segment\"\n";
        let wrapper: Wrapper = toml::from_str(toml).unwrap();
        assert_eq!(wrapper.forwarders[0].kind, ForwarderKind::Grpc);
        assert_eq!(wrapper.forwarders[0].event_type, EventType::Segment);
        assert!(wrapper.forwarders[0].enabled);
    }

    #[test]
    fn test_unknown_event_type_rejected() {
        let toml = "[[forwarders]]\nname = \"x\"\nevent_type = \"smoke_signal\"\n";
        assert!(toml::from_str::<Wrapper>(toml).is_err());
    }

    #[test]
    fn test_default_config_parses_back() {
        let snippet = ForwarderKind::Null.default_config(EventType::EnvoyAlsV3);
        let wrapper: Wrapper = toml::from_str(&snippet).unwrap();
        assert_eq!(wrapper.forwarders[0].name, "null-envoy-als-v3");
        assert_eq!(wrapper.forwarders[0].kind, ForwarderKind::Null);
        assert_eq!(wrapper.forwarders[0].event_type, EventType::EnvoyAlsV3);
    }
}
