//! Windows shared-memory transport.
//!
//! Everything here is per-mapping: the supervisor opens a [`Mapping`] when
//! the simulator appears, the pump drives it until shutdown or until the
//! producer relaunches, and dropping it releases the signal handles first,
//! then the view, then the section handle.

mod region;
mod signal;

pub(crate) use region::wide_string;
pub(crate) use signal::SignalWait;

use crate::options::SdkOptions;
use crate::schema::{HeaderView, VariableCatalog};
use crate::text::TextDecoder;
use crate::Result;
use region::SharedMemoryRegion;
use signal::DataSignal;
use std::sync::{Arc, OnceLock};

/// One acquired generation of the producer's shared memory.
pub(crate) struct Mapping {
    // Field order is drop order: signal handles, then the mapped view.
    signal: DataSignal,
    region: SharedMemoryRegion,
    catalog: OnceLock<Arc<VariableCatalog>>,
}

impl Mapping {
    /// Open the section and the data-valid event named in `options`.
    pub(crate) fn open(options: &SdkOptions) -> Result<Self> {
        let region = SharedMemoryRegion::open(&options.mem_map_name)?;
        let signal = DataSignal::open(&options.data_event_name)?;
        Ok(Self { signal, region, catalog: OnceLock::new() })
    }

    pub(crate) fn region(&self) -> &SharedMemoryRegion {
        &self.region
    }

    /// Block until the producer signals or [`wake_pump`](Self::wake_pump).
    pub(crate) fn wait(&self) -> Result<SignalWait> {
        self.signal.wait()
    }

    /// Force any blocked [`wait`](Self::wait) awake.
    pub(crate) fn wake_pump(&self) {
        self.signal.wake();
    }

    /// The variable catalog for this mapping, decoded at most once.
    pub(crate) fn catalog(&self, decoder: &TextDecoder) -> Result<Arc<VariableCatalog>> {
        if let Some(catalog) = self.catalog.get() {
            return Ok(Arc::clone(catalog));
        }

        let header = HeaderView::new(self.region.as_bytes())?;
        header.validate()?;
        let built = Arc::new(VariableCatalog::build(&header, decoder)?);
        let _ = self.catalog.set(Arc::clone(&built));
        Ok(Arc::clone(self.catalog.get().unwrap_or(&built)))
    }
}
