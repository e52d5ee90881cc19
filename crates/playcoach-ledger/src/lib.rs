//! Processed-video ledger.
//!
//! A single JSON document mapping each video filename to its
//! [`AnalysisRecord`](playcoach_models::AnalysisRecord). It is the source of
//! truth for "already processed".

pub mod error;
pub mod ledger;

pub use error::{LedgerError, LedgerResult};
pub use ledger::{Ledger, LedgerMap};
