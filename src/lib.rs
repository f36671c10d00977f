//! Awaits the completion of a GitHub Actions workflow run.
//!
//! The crate polls the workflow run state on a fixed interval until the run
//! reaches a terminal state or an overall deadline elapses, then resolves the
//! observed conclusion into a definitive verdict. Conditional requests keep
//! repeat polls cheap against the API's shared rate budget.

pub mod await_run;
pub mod config;
pub mod github;
pub mod models;
pub mod retry;
