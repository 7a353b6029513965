//! Diagnostic HTTPS check against the guest trust bundle.

pub mod domain;
pub mod tester;

pub use domain::normalize_domain;
pub use tester::{ConnectivityTester, TestOutcome, Verbosity};
