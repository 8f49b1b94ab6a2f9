use crate::activity::descriptor::{ActivityDescriptor, DedupKey, build_descriptor};
use crate::activity::update::ActivityUpdate;
use crate::config::PresenceDefaults;
use crate::error::ipc::IpcError;
use crate::ipc::IpcChannel;

use log::{debug, info};
use tokio::io::{AsyncRead, AsyncWrite};

/// Owns the IPC channel and the key of the last presence sent through it.
///
/// The key is private to this type; nothing else can observe or reset it
/// except through [`clear`](Self::clear).
pub struct ActivityStateManager<S> {
    channel: IpcChannel<S>,
    pid: u32,
    defaults: PresenceDefaults,
    current: Option<DedupKey>,
}

impl<S> ActivityStateManager<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// `pid` is the process Discord attributes the activity to (the host).
    pub fn new(channel: IpcChannel<S>, pid: u32, defaults: PresenceDefaults) -> Self {
        Self {
            channel,
            pid,
            defaults,
            current: None,
        }
    }

    pub fn build(&self, update: &ActivityUpdate) -> ActivityDescriptor {
        build_descriptor(update, &self.defaults)
    }

    pub fn current_key(&self) -> Option<&DedupKey> {
        self.current.as_ref()
    }

    /// Send `descriptor` unless it matches the last one sent.
    ///
    /// Returns whether a command went out.
    pub async fn apply(&mut self, descriptor: &ActivityDescriptor) -> Result<bool, IpcError> {
        let key = DedupKey::of(descriptor);
        if self.current.as_ref() == Some(&key) {
            debug!("Presence unchanged, skipping update");
            return Ok(false);
        }

        self.channel.send_activity(self.pid, Some(descriptor)).await?;
        info!("Presence set: {} / {}", descriptor.details, descriptor.state);
        self.current = Some(key);
        Ok(true)
    }

    pub async fn set_idle(&mut self) -> Result<bool, IpcError> {
        let idle = ActivityDescriptor::idle(&self.defaults);
        self.apply(&idle).await
    }

    /// Remove the presence. Always sends, regardless of the stored key.
    pub async fn clear(&mut self) -> Result<(), IpcError> {
        self.current = None;
        self.channel.send_activity(self.pid, None).await?;
        info!("Presence cleared");
        Ok(())
    }

    /// Close the underlying IPC channel.
    pub async fn close(self) -> Result<(), IpcError> {
        self.channel.close().await
    }
}
