//! Output ports backed by the `midir` crate

use super::{ConnectionState, MidiAccess, Output, Port, PortInfo};
use crate::error::{Error, Result};
use crate::event::{decode_events, Event};
use midir::{MidiOutput, MidiOutputConnection};

const CLIENT_NAME: &str = "smfseq";

/// Enumerates and opens system MIDI outputs through `midir`
#[derive(Debug, Clone)]
pub struct MidirAccess {
    client_name: String,
}

impl Default for MidirAccess {
    fn default() -> Self {
        Self::new(CLIENT_NAME)
    }
}

impl MidirAccess {
    /// Access object registering as `client_name` with the system
    pub fn new(client_name: impl Into<String>) -> Self {
        MidirAccess {
            client_name: client_name.into(),
        }
    }

    fn client(&self) -> Result<MidiOutput> {
        MidiOutput::new(&self.client_name)
            .map_err(|e| Error::Output(format!("failed to create MIDI client: {}", e)))
    }
}

impl MidiAccess for MidirAccess {
    type Output = MidirOutput;

    fn list_ports(&self) -> Result<Vec<PortInfo>> {
        let client = self.client()?;
        let ports = client.ports();
        let mut infos = Vec::with_capacity(ports.len());
        for (index, port) in ports.iter().enumerate() {
            let name = client
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown Port {}", index));
            infos.push(PortInfo::new(port.id(), name));
        }
        Ok(infos)
    }

    fn open_output(&self, port_id: &str) -> Result<MidirOutput> {
        let client = self.client()?;
        let port = client
            .find_port_by_id(port_id.to_string())
            .ok_or_else(|| Error::Output(format!("no MIDI output with id {}", port_id)))?;
        let name = client
            .port_name(&port)
            .unwrap_or_else(|_| port_id.to_string());
        let connection = client
            .connect(&port, &self.client_name)
            .map_err(|e| Error::Output(format!("failed to connect to {}: {}", name, e)))?;
        log::debug!("opened MIDI output {}", name);

        Ok(MidirOutput {
            info: PortInfo::new(port_id, name),
            connection: Some(connection),
        })
    }
}

/// An open `midir` output connection
pub struct MidirOutput {
    info: PortInfo,
    connection: Option<MidiOutputConnection>,
}

impl Port for MidirOutput {
    fn details(&self) -> &PortInfo {
        &self.info
    }

    fn connection_state(&self) -> ConnectionState {
        if self.connection.is_some() {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(connection) = self.connection.take() {
            connection.close();
            log::debug!("closed MIDI output {}", self.info.name);
        }
        Ok(())
    }
}

impl Output for MidirOutput {
    fn send(&mut self, bytes: &[u8], _timestamp: u64) -> Result<()> {
        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| Error::Output(format!("{} is closed", self.info.name)))?;

        // midir wants one message per call.
        let mut wire = Vec::with_capacity(bytes.len());
        for event in decode_events(bytes) {
            let event: Event = event?;
            if event.write_wire_bytes(&mut wire) {
                connection
                    .send(&wire)
                    .map_err(|e| Error::Output(format!("send failed: {}", e)))?;
            }
        }
        Ok(())
    }
}

impl Drop for MidirOutput {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
