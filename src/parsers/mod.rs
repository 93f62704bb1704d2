//! Importers for conversation sources that are not raw exports.
//!
//! - [`SessionParser`] - agent session logs, one JSON record per line

pub mod session;

pub use session::{SessionParser, SessionTranscript};
