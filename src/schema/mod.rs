//! Shared-memory layout decoding: the control header and the variable table.

pub mod catalog;
pub mod header;

pub use catalog::{CatalogGeneration, VariableCatalog, VariableDescriptor};
pub use header::{HeaderView, STATUS_CONNECTED, SUPPORTED_VERSION};
