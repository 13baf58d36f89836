//! Connection supervisor and the [`TelemetryClient`] facade.
//!
//! The supervisor owns the connect/retry/teardown lifecycle: it probes for
//! the simulator's shared memory, sleeps out a fixed cancellable delay
//! between failed probes, hands a live mapping to the telemetry pump, and
//! reopens the mapping when the pump reports a stale generation. The pump's
//! blocking event wait runs on the blocking thread pool; cancellation
//! force-wakes it through the mapping's stop event.

use crate::options::SdkOptions;
use crate::pump::{EventHandler, HandlerList, TelemetryEvent};
use crate::{Result, SdkError};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Live telemetry client.
///
/// Register handlers with [`on_event`](Self::on_event), then call
/// [`start`](Self::start) from within a tokio runtime. [`stop`](Self::stop)
/// tears the session down and releases the mapping; a stopped client cannot
/// be restarted.
pub struct TelemetryClient {
    options: SdkOptions,
    handlers: HandlerList,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
    stopped: bool,
}

impl TelemetryClient {
    /// Create a client with the given options. Nothing is opened until
    /// [`start`](Self::start).
    pub fn new(options: SdkOptions) -> Self {
        Self {
            options,
            handlers: Arc::new(Mutex::new(Vec::new())),
            cancel: None,
            task: None,
            stopped: false,
        }
    }

    /// Register an event handler.
    ///
    /// Handlers run synchronously on the pump loop, in registration order.
    /// A slow handler delays subsequent handlers and the next wake.
    pub fn on_event(
        &mut self,
        handler: impl FnMut(TelemetryEvent<'_>) + Send + 'static,
    ) -> Result<()> {
        if self.stopped {
            return Err(SdkError::lifecycle("register handler"));
        }
        let boxed: EventHandler = Box::new(handler);
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner).push(boxed);
        Ok(())
    }

    /// Spawn the connection supervisor. Idempotent while running.
    ///
    /// Must be called from within a tokio runtime. Returns a lifecycle error
    /// after [`stop`](Self::stop), and an unsupported-platform error where
    /// the simulator's shared memory cannot exist.
    pub fn start(&mut self) -> Result<()> {
        if self.stopped {
            return Err(SdkError::lifecycle("start"));
        }
        if self.task.is_some() {
            return Ok(());
        }

        #[cfg(windows)]
        {
            let cancel = CancellationToken::new();
            let task = tokio::spawn(supervise(
                self.options.clone(),
                Arc::clone(&self.handlers),
                cancel.clone(),
            ));
            self.cancel = Some(cancel);
            self.task = Some(task);
            Ok(())
        }

        #[cfg(not(windows))]
        {
            Err(SdkError::unsupported_platform("live telemetry", "Windows"))
        }
    }

    /// Whether the supervisor is currently running.
    pub fn is_started(&self) -> bool {
        self.task.is_some()
    }

    /// The options this client was created with.
    pub fn options(&self) -> &SdkOptions {
        &self.options
    }

    /// Stop the supervisor and release the mapping. Idempotent.
    ///
    /// Cancels the session, force-wakes any in-flight event wait, and awaits
    /// the supervisor so all handles are released before returning. After
    /// this the client is disposed; [`start`](Self::start) will fail.
    pub async fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        self.stopped = true;
    }
}

impl Drop for TelemetryClient {
    fn drop(&mut self) {
        // Best effort: let the supervisor unwind on its own if the client is
        // dropped without an explicit stop.
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
    }
}

/// Discovery, pump, and teardown loop.
///
/// Non-retryable open failures (an unsupported header version, a region that
/// will not decode) are deliberately not terminal: the faulted mapping is
/// released and the loop waits out the same fixed delay, because the
/// producer may be replaced by a compatible one at any time and there is no
/// other way to observe that. They are logged at `error!` where an absent
/// simulator is only `debug!`.
#[cfg(windows)]
async fn supervise(options: SdkOptions, handlers: HandlerList, cancel: CancellationToken) {
    use crate::pump::{self, PumpExit};
    use crate::schema::HeaderView;
    use crate::windows::Mapping;
    use tracing::{debug, error, info};

    info!("Connection supervisor started");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        match Mapping::open(&options) {
            Ok(mapping) => {
                let mapping = Arc::new(mapping);

                // Reject an unsupported layout up front rather than letting
                // the pump trip over it on the first wake.
                let accepted = match HeaderView::new(mapping.region().as_bytes())
                    .and_then(|header| header.validate())
                {
                    Ok(()) => true,
                    Err(error) => {
                        error!(%error, "Shared memory rejected");
                        false
                    }
                };

                if accepted {
                    info!("Shared memory mapped, watching for telemetry");

                    let pump_mapping = Arc::clone(&mapping);
                    let pump_handlers = Arc::clone(&handlers);
                    let pump_cancel = cancel.clone();
                    let decoder = options.decoder;
                    let mut pump = tokio::task::spawn_blocking(move || {
                        pump::run(&pump_mapping, &pump_handlers, decoder, &pump_cancel)
                    });

                    let exit = tokio::select! {
                        _ = cancel.cancelled() => {
                            mapping.wake_pump();
                            pump.await
                        }
                        exit = &mut pump => exit,
                    };

                    match exit {
                        Ok(PumpExit::Shutdown) => break,
                        Ok(PumpExit::StaleMapping) => {
                            debug!("Reacquiring shared memory after stale mapping");
                            continue;
                        }
                        Err(error) => {
                            error!(%error, "Telemetry pump panicked");
                            break;
                        }
                    }
                }
            }
            Err(error) if error.is_retryable() => {
                debug!(%error, "Simulator not running, will retry");
            }
            Err(error) => {
                error!(%error, "Failed to open shared memory");
            }
        }

        // Fixed retry delay, interruptible by cancellation.
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(options.retry_delay) => {}
        }
    }

    info!("Connection supervisor exited");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TelemetryClient {
        TelemetryClient::new(SdkOptions::default())
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let mut client = client();
        client.stop().await;
        client.stop().await;
        assert!(!client.is_started());
    }

    #[tokio::test]
    async fn start_after_stop_is_a_lifecycle_error() {
        let mut client = client();
        client.stop().await;
        assert!(matches!(client.start(), Err(SdkError::Lifecycle { .. })));
    }

    #[tokio::test]
    async fn handlers_cannot_register_after_stop() {
        let mut client = client();
        client.stop().await;
        let result = client.on_event(|_| {});
        assert!(matches!(result, Err(SdkError::Lifecycle { .. })));
    }

    #[tokio::test]
    async fn handlers_register_before_start() {
        let mut client = client();
        assert!(client.on_event(|_| {}).is_ok());
        assert!(!client.is_started());
    }

    #[cfg(not(windows))]
    #[tokio::test]
    async fn start_requires_windows() {
        let mut client = client();
        assert!(matches!(client.start(), Err(SdkError::UnsupportedPlatform { .. })));
    }
}
