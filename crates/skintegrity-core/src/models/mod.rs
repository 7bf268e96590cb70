//! Data models for the application
//!
//! `analysis` holds the classification result and the tagged outcome every
//! upstream shape is normalized into; `result_record` is the polled database
//! row; `requests` holds the HTTP request envelopes.

mod analysis;
mod requests;
mod result_record;

pub use analysis::*;
pub use requests::*;
pub use result_record::*;
