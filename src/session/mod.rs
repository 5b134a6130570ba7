/*!
 * Job sessions: one media and/or subtitle input in, one list of cues out.
 *
 * This module provides:
 * - Job requests, modes, events and outcomes (`models`)
 * - The controller that runs the pipeline for a job (`controller`)
 */

pub mod controller;
pub mod models;

// Re-export main types
pub use controller::SessionController;
pub use models::{
    CancellationFlag, EventCallback, JobEvent, JobMode, JobOutcome, JobRequest, JobStatus, JobSummary,
};
