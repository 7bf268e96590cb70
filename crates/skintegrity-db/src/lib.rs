//! Result row persistence
//!
//! The inference service writes its verdict into `analysis_results`; clients
//! using the row strategy create a pending row before triggering, poll it, and
//! delete it once the analysis is terminal.

pub mod memory;
pub mod results;
pub mod setup;

pub use memory::{InMemoryResultStore, Settlement};
pub use results::{AnalysisResultRepository, ResultStore};
pub use setup::{setup_database, MIGRATOR};
