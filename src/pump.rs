//! Telemetry pump: the per-wake loop and its notification state machine.
//!
//! The pump runs only while the supervisor holds a live mapping. Each
//! iteration blocks on the simulator's data-valid event with no timeout; a
//! private stop event is waited alongside it so cancellation force-wakes the
//! wait instead of waiting out another signal. On every wake the pump
//! re-reads the header's connected bit — disconnect detection is per wake,
//! not per outer pass — and [`LinkState`] turns the observation into the
//! ordered notifications of a connected period:
//!
//! - first connected wake: `Connected` then `DataUpdated`
//! - steady connected wake: `DataUpdated`
//! - first disconnected wake: `Disconnected`
//! - steady disconnected wake: nothing (spurious)
//!
//! Notifications are dispatched synchronously, one handler at a time, on the
//! pump's own loop. A wake the consumer misses is simply not redelivered;
//! the reader handed out is always bound to the freshest buffer.

use crate::reader::DataReader;
use std::sync::{Arc, Mutex, PoisonError};

/// Notification delivered to registered event handlers.
#[derive(Debug, Clone, Copy)]
pub enum TelemetryEvent<'a> {
    /// The simulator started publishing telemetry.
    Connected,
    /// A new snapshot is available; the reader is bound to the active buffer.
    DataUpdated(DataReader<'a>),
    /// The simulator stopped publishing telemetry.
    Disconnected,
}

/// Callback invoked from the pump loop.
pub type EventHandler = Box<dyn FnMut(TelemetryEvent<'_>) + Send + 'static>;

pub(crate) type HandlerList = Arc<Mutex<Vec<EventHandler>>>;

#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn dispatch(handlers: &HandlerList, event: TelemetryEvent<'_>) {
    let mut handlers = handlers.lock().unwrap_or_else(PoisonError::into_inner);
    for handler in handlers.iter_mut() {
        handler(event);
    }
}

/// Which notifications a wake produced, in dispatch order.
#[cfg_attr(not(windows), allow(dead_code))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Notice {
    Connected,
    DataUpdated,
    Disconnected,
}

/// Connected/disconnected edge tracker for the pump loop.
///
/// Guarantees the alternation contract: `Connected` is never produced twice
/// without an intervening `Disconnected`, and the first `DataUpdated` of a
/// connected period always follows its `Connected`.
#[derive(Debug, Default)]
pub(crate) struct LinkState {
    connected: bool,
}

#[cfg_attr(not(windows), allow(dead_code))]
impl LinkState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fold one wake's connectivity observation into notifications.
    pub(crate) fn observe(&mut self, connected: bool) -> &'static [Notice] {
        match (self.connected, connected) {
            (false, true) => {
                self.connected = true;
                &[Notice::Connected, Notice::DataUpdated]
            }
            (true, true) => &[Notice::DataUpdated],
            (true, false) => {
                self.connected = false;
                &[Notice::Disconnected]
            }
            // Spurious wake while the producer is down.
            (false, false) => &[],
        }
    }
}

/// Close out a connected period when the pump abandons its mapping.
///
/// A pump that exits on a stale mapping while the link is up must tell
/// subscribers the producer went away, otherwise the replacement pump's
/// first wake would emit a second `Connected` with no `Disconnected`
/// in between. A no-op when the link is already down.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn close_link(link: &mut LinkState, handlers: &HandlerList) {
    if !link.observe(false).is_empty() {
        tracing::info!("Disconnected from the simulator");
        dispatch(handlers, TelemetryEvent::Disconnected);
    }
}

/// Why the pump loop returned.
#[cfg(windows)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PumpExit {
    /// Cancellation was observed at a checkpoint.
    Shutdown,
    /// The mapping no longer matches the catalog generation; the supervisor
    /// must reopen it and rebuild the catalog.
    StaleMapping,
}

#[cfg(windows)]
pub(crate) fn run(
    mapping: &crate::windows::Mapping,
    handlers: &HandlerList,
    decoder: crate::text::TextDecoder,
    cancel: &tokio_util::sync::CancellationToken,
) -> PumpExit {
    use crate::schema::HeaderView;
    use crate::windows::SignalWait;
    use tracing::{debug, info, trace, warn};

    let mut link = LinkState::new();
    debug!("Telemetry pump started");

    loop {
        // Cooperative checkpoint: the stop event wakes the wait below, then
        // this check exits without completing another iteration.
        if cancel.is_cancelled() {
            debug!("Telemetry pump cancelled");
            return PumpExit::Shutdown;
        }

        match mapping.wait() {
            Ok(SignalWait::Data) => {}
            Ok(SignalWait::Stop) => continue,
            Err(error) => {
                warn!(%error, "Signal wait failed");
                std::thread::sleep(std::time::Duration::from_millis(100));
                continue;
            }
        }

        let memory = mapping.region().as_bytes();
        let Ok(header) = HeaderView::new(memory) else {
            warn!("Mapped region shrank below the header size");
            close_link(&mut link, handlers);
            return PumpExit::StaleMapping;
        };

        let connected = header.is_connected();
        trace!(connected, "Data-valid signal");

        let catalog = if connected {
            match mapping.catalog(&decoder) {
                Ok(catalog) if !catalog.matches_generation(&header) => {
                    info!("Producer relaunched with a new variable table, remapping");
                    close_link(&mut link, handlers);
                    return PumpExit::StaleMapping;
                }
                Ok(catalog) => Some(catalog),
                Err(error) => {
                    warn!(%error, "Mapping no longer decodes, remapping");
                    close_link(&mut link, handlers);
                    return PumpExit::StaleMapping;
                }
            }
        } else {
            None
        };

        for notice in link.observe(connected) {
            match notice {
                Notice::Connected => {
                    info!("Connected to the simulator");
                    dispatch(handlers, TelemetryEvent::Connected);
                }
                Notice::DataUpdated => {
                    if let Some(catalog) = catalog.as_deref() {
                        let reader = DataReader::latest(&header, catalog, decoder);
                        dispatch(handlers, TelemetryEvent::DataUpdated(reader));
                    }
                }
                Notice::Disconnected => {
                    info!("Disconnected from the simulator");
                    dispatch(handlers, TelemetryEvent::Disconnected);
                }
            }
        }
    }
}
