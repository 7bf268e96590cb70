//! Skintegrity client
//!
//! Drives one analysis end to end: validate the selected video, upload it,
//! trigger the scanner API, poll for a terminal result and clean up the blob
//! and result row. [`AnalysisSession`] is the entry point; the `skintegrity`
//! binary is a thin CLI over it.

pub mod api;
pub mod error;
pub mod poller;
pub mod session;
pub mod validate;
pub mod view;

pub use api::{GatewayError, InferenceGateway, ScannerApiClient};
pub use error::{ClientError, PollError};
pub use poller::{poll_until_terminal, HttpPollSource, PollPolicy, PollSource, RowPollSource};
pub use session::{AnalysisSession, PollStrategy, SelectedVideo, SessionState};
pub use validate::{ValidationError, VideoValidator};
pub use view::{format_confidence, format_file_size, ResultView};

/// Initialize tracing for the CLI binary.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("skintegrity=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
