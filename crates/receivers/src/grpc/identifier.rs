//! Envoy stream identifiers
//!
//! Envoy sends its node identifier on the first message of a stream only.
//! The cache remembers it for the life of the stream and stamps it on
//! every later message that arrives without one.

use satellite_protocol::Payload;
use satellite_protocol::proto::{Identified, Identifier};

#[derive(Debug, Default)]
pub(crate) struct IdentifierCache {
    current: Option<Identifier>,
}

impl IdentifierCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a carried identifier, or stamp the remembered one
    pub fn stamp<M: Identified>(&mut self, message: &mut M) {
        match message.identifier() {
            Some(identifier) => self.current = Some(identifier.clone()),
            None => {
                if let Some(identifier) = &self.current {
                    message.set_identifier(identifier.clone());
                }
            }
        }
    }

    /// Stamp every message of an Envoy payload; other payloads are untouched
    pub fn stamp_payload(&mut self, payload: &mut Payload) {
        match payload {
            Payload::EnvoyAlsV2(messages) | Payload::EnvoyAlsV3(messages) => {
                messages.iter_mut().for_each(|m| self.stamp(m));
            }
            Payload::EnvoyMetricsV2(messages) | Payload::EnvoyMetricsV3(messages) => {
                messages.iter_mut().for_each(|m| self.stamp(m));
            }
            _ => {}
        }
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<&Identifier> {
        self.current.as_ref()
    }
}
