//! Merge Nessus v2 scan reports into one document.
//!
//! Reports are streamed element by element: the policy block of the first
//! report and the first copy of every host record are appended to the
//! output as they close, so memory stays bounded by document depth.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod report;
pub mod stream;

pub use engine::{MergeOptions, ReportAssembler};
pub use error::{MergeError, Result};
pub use report::summary::{FileOutcome, MergeSummary};
