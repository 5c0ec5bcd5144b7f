//! Candidate selection and the export / delete / re-add sequence.

mod executor;
mod selector;

pub use executor::{ReseedExecutor, ReseedFailure, ReseedOptions, ReseedOutcome};
pub use selector::CandidateFilter;
