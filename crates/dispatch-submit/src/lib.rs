//! Submission pipeline for dispatch orders
//!
//! Validates a draft, persists it through an [`OrderStore`], then uploads
//! every pending image through an [`ImageTransport`] one at a time.
//! A failed image never stops the remaining uploads.
//!
//! [`OrderStore`]: dispatch_core::OrderStore
//! [`ImageTransport`]: dispatch_core::ImageTransport

pub mod cancel;
pub mod error;
pub mod orchestrator;
pub mod progress;
pub mod queue;

pub use cancel::CancelFlag;
pub use error::{Result, SubmitError};
pub use orchestrator::{SubmissionReport, SubmitOutcome, Submitter};
pub use progress::{ImageStatus, SubmitEvent, SubmitState, overall_progress};
pub use queue::{UploadFailure, UploadQueue, UploadResult, UploadTask, UploadedRecord};
