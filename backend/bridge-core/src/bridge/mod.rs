//! The bridge lifecycle.
//!
//! ```text
//! INIT -> CONNECT_IPC -> IPC_HANDSHAKE -> SET_IDLE -> CONNECT_WS -> WS_HANDSHAKE
//!      -> EVENT_LOOP -> CLEANUP -> TERMINATED
//! ```
//!
//! Any failure before `EVENT_LOOP` ends the run immediately, closing the IPC
//! channel if it was already open. Everything that ends the event loop
//! (parent death, `windowClose`, a broken connection on either side) goes
//! through `CLEANUP`, which clears the presence before closing the channel.
//!
//! Nothing is retried: presence is a nice-to-have for the host, so a failed
//! run simply ends.

mod dispatch;
mod phase;

pub use dispatch::Dispatch;
pub use phase::{BridgePhase, ExitReason};

use crate::activity::ActivityStateManager;
use crate::config::{BridgeOptions, StartupConfig};
use crate::error::CoreError;
use crate::error::ws::WsError;
use crate::ipc::{self, IpcChannel};
use crate::watchdog::Liveness;
use crate::ws::{ReadLimits, WsEventClient};

use std::future::Future;

use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::sleep;

pub struct Bridge<'a, L> {
    config: &'a StartupConfig,
    options: &'a BridgeOptions,
    liveness: L,
    parent_pid: u32,
    phase: BridgePhase,
}

impl<'a, L> Bridge<'a, L>
where
    L: Liveness,
{
    /// `parent_pid` is both the watchdog target and the pid presence is attributed to.
    pub fn new(
        config: &'a StartupConfig,
        options: &'a BridgeOptions,
        liveness: L,
        parent_pid: u32,
    ) -> Self {
        Self {
            config,
            options,
            liveness,
            parent_pid,
            phase: BridgePhase::Init,
        }
    }

    /// Discover Discord, connect to the host's event server, and forward
    /// events until the loop ends.
    ///
    /// # Errors
    ///
    /// Returns the [`CoreError`] of whichever step failed before the event
    /// loop started. Once the loop runs, the result is always `Ok`.
    pub async fn run(mut self) -> Result<ExitReason, CoreError> {
        self.enter(BridgePhase::ConnectIpc);
        let path = ipc::discover().map_err(|e| self.abort(e.into()))?;
        let channel = match ipc::connect(&path).await {
            Ok(channel) => channel,
            Err(e) => return Err(self.abort(e.into())),
        };

        self.run_with(channel, |host, port, limits| async move {
            WsEventClient::connect(&host, port, limits).await
        })
        .await
    }

    /// Run from an already connected IPC channel.
    ///
    /// `connect_events` opens the event-server transport given the host,
    /// port and read limits.
    pub async fn run_with<S, W, F, Fut>(
        mut self,
        channel: IpcChannel<S>,
        connect_events: F,
    ) -> Result<ExitReason, CoreError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
        W: AsyncRead + AsyncWrite + Unpin,
        F: FnOnce(String, u16, ReadLimits) -> Fut,
        Fut: Future<Output = Result<WsEventClient<W>, WsError>>,
    {
        let options = self.options;
        let config = self.config;

        self.enter(BridgePhase::IpcHandshake);
        let mut channel = channel.with_response_timeout(options.handshake_timeout);
        if let Err(e) = channel.handshake(&options.client_id).await {
            if let Err(close_err) = channel.close().await {
                debug!("Closing IPC after failed handshake: {close_err}");
            }
            return Err(self.abort(e.into()));
        }

        sleep(options.settle_delay).await;

        self.enter(BridgePhase::SetIdle);
        let mut presence =
            ActivityStateManager::new(channel, self.parent_pid, options.presence.clone());
        if let Err(e) = presence.set_idle().await {
            return Err(self.abort_with(presence, e.into()).await);
        }

        self.enter(BridgePhase::ConnectWs);
        let limits = ReadLimits::from(options);
        let mut events =
            match connect_events(options.event_host.clone(), config.port, limits).await {
                Ok(events) => events,
                Err(e) => return Err(self.abort_with(presence, e.into()).await),
            };

        self.enter(BridgePhase::WsHandshake);
        if let Err(e) = events
            .handshake(
                &options.event_host,
                config.port,
                &config.extension_id,
                &config.connect_token,
            )
            .await
        {
            return Err(self.abort_with(presence, e.into()).await);
        }

        self.enter(BridgePhase::EventLoop);
        let reason = loop {
            if let Some(reason) = self.step(&mut presence, &mut events).await {
                break reason;
            }
        };
        info!("Event loop ended: {reason:?}");

        self.enter(BridgePhase::Cleanup);
        if let Err(e) = presence.clear().await {
            warn!("Could not clear presence during cleanup: {e}");
        }
        sleep(options.cleanup_grace).await;
        if let Err(e) = presence.close().await {
            warn!("Could not close IPC channel during cleanup: {e}");
        }

        self.enter(BridgePhase::Terminated);
        Ok(reason)
    }

    /// One loop iteration: watchdog, at most one event, dispatch.
    async fn step<S, W>(
        &mut self,
        presence: &mut ActivityStateManager<S>,
        events: &mut WsEventClient<W>,
    ) -> Option<ExitReason>
    where
        S: AsyncRead + AsyncWrite + Unpin,
        W: AsyncRead + AsyncWrite + Unpin,
    {
        if !self.liveness.is_alive(self.parent_pid) {
            info!("Parent process {} is gone", self.parent_pid);
            return Some(ExitReason::ParentExited {
                pid: self.parent_pid,
            });
        }

        let event = match events.read_event().await {
            Ok(Some(event)) => event,
            Ok(None) => return None,
            Err(e) => return Some(ExitReason::EventSourceFailed(e)),
        };

        let outcome = match Dispatch::from(&event) {
            Dispatch::Update(update) => {
                let descriptor = presence.build(&update);
                presence.apply(&descriptor).await.map(|_| ())
            }
            Dispatch::Clear => presence.clear().await,
            Dispatch::Close => return Some(ExitReason::WindowClosed),
            Dispatch::Ignore => {
                debug!("Ignoring event '{}'", event.event);
                Ok(())
            }
        };

        outcome.err().map(ExitReason::PresenceFailed)
    }

    fn enter(&mut self, next: BridgePhase) {
        debug!("{} -> {}", self.phase, next);
        self.phase = next;
    }

    fn abort(&mut self, error: CoreError) -> CoreError {
        warn!("Bridge failed during {}: {error}", self.phase);
        self.enter(BridgePhase::Terminated);
        error
    }

    async fn abort_with<S>(&mut self, presence: ActivityStateManager<S>, error: CoreError) -> CoreError
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        if let Err(close_err) = presence.close().await {
            debug!("Closing IPC after failure: {close_err}");
        }
        self.abort(error)
    }
}
