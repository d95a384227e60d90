//! MIDI output contracts
//!
//! The sequencer only produces byte blocks. Platform backends implement
//! [`Output`] to deliver them and [`MidiAccess`] to enumerate and open ports.

#[cfg(feature = "midir")]
pub mod midir_backend;

#[cfg(feature = "midir")]
pub use midir_backend::{MidirAccess, MidirOutput};

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Description of a MIDI port
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortInfo {
    /// Stable identifier used to open the port
    pub id: String,
    /// Human readable name
    pub name: String,
    /// Manufacturer, when the platform reports one
    pub manufacturer: String,
    /// Driver or device version, when the platform reports one
    pub version: String,
}

impl PortInfo {
    /// Port with an id and name only
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        PortInfo {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

impl fmt::Display for PortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Connection state of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Ready for traffic
    Open,
    /// Closed; sends fail
    Closed,
    /// Being opened
    Pending,
}

/// Common capabilities of every port
pub trait Port {
    /// Port description
    fn details(&self) -> &PortInfo;

    /// Current connection state
    fn connection_state(&self) -> ConnectionState;

    /// Release the port. Closing twice is not an error.
    fn close(&mut self) -> Result<()>;
}

/// A port that accepts MIDI bytes.
pub trait Output: Port {
    /// Send one short message or one complete SysEx block (status byte
    /// through closing 0xF7).
    ///
    /// `timestamp` is a backend-specific scheduling hint; 0 means "now".
    fn send(&mut self, bytes: &[u8], timestamp: u64) -> Result<()>;
}

/// Port enumeration and opening
pub trait MidiAccess {
    /// Output type this backend opens
    type Output: Output;

    /// Available output ports
    fn list_ports(&self) -> Result<Vec<PortInfo>>;

    /// Open the output port with the given id
    fn open_output(&self, port_id: &str) -> Result<Self::Output>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_info_display_and_serde() {
        let info = PortInfo::new("hw:1", "Synth");
        assert_eq!(info.to_string(), "Synth (hw:1)");
        let json = serde_json::to_string(&info).unwrap();
        let back: PortInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
    }
}
