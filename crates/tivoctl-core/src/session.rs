// ── Session ──
//
// Explicit ownership of "the appliance we are talking to": at most one
// protocol client, bound to one device.

use tivoctl_api::CommandRequest;
use tracing::info;

use crate::client::{ConnectionState, ProtocolClient};
use crate::config::ClientConfig;
use crate::error::CoreError;
use crate::model::{ChannelChange, Device, RemoteButton};
use crate::stream::ResponseStream;

/// Owns at most one [`ProtocolClient`] and the [`Device`] it talks to.
pub struct Session {
    config: ClientConfig,
    device: Option<Device>,
    client: Option<ProtocolClient>,
}

impl Session {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            device: None,
            client: None,
        }
    }

    /// Switch to `device`, closing any previous connection first.
    ///
    /// Returns the new connection's response stream. The connection is
    /// still being established when this returns.
    pub async fn connect(&mut self, device: Device) -> Result<ResponseStream, CoreError> {
        self.disconnect().await;

        let mut client = ProtocolClient::connect(device.address.clone(), self.config.clone())?;
        let responses = client
            .responses()
            .ok_or_else(|| CoreError::Internal("response stream already taken".into()))?;

        info!(device = %device, "session bound to appliance");
        self.client = Some(client);
        self.device = Some(device);
        Ok(responses)
    }

    /// Wait for the current connection attempt to finish.
    pub async fn wait_connected(&self) -> Result<(), CoreError> {
        self.client()?.wait_connected().await
    }

    pub async fn send(&self, request: &CommandRequest) -> Result<(), CoreError> {
        self.client()?.send(request).await
    }

    pub async fn press(&self, button: RemoteButton) -> Result<(), CoreError> {
        self.send(&button.request()).await
    }

    pub async fn change_channel(&self, change: ChannelChange) -> Result<(), CoreError> {
        self.send(&change.into_request()).await
    }

    /// Close the current connection, if any.
    pub async fn disconnect(&mut self) {
        if let Some(mut client) = self.client.take() {
            client.close().await;
        }
        self.device = None;
    }

    pub fn device(&self) -> Option<&Device> {
        self.device.as_ref()
    }

    /// State of the current connection; `Closed` when there is none.
    pub fn state(&self) -> ConnectionState {
        self.client
            .as_ref()
            .map_or(ConnectionState::Closed, ProtocolClient::state)
    }

    fn client(&self) -> Result<&ProtocolClient, CoreError> {
        self.client.as_ref().ok_or(CoreError::NotConnected {
            state: ConnectionState::Closed,
        })
    }
}
