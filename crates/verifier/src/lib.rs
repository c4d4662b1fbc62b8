//! ABI verifier for the stable pexe IR subset.
//!
//! Given an in-memory module, decides whether every construct lies within
//! the stable subset downstream translators are guaranteed to accept.
//! Anything outside the subset is reported as a diagnostic; a module with
//! any diagnostic is rejected. The verifier never repairs, rewrites or
//! executes IR.

pub mod config;
pub mod diagnostic;
pub mod intrinsics;
pub mod report;
pub mod types;
mod verify;

pub use config::VerifierConfig;
pub use diagnostic::{Diagnostic, Location, Severity};
pub use report::VerificationReport;
pub use verify::{
    verify_function, verify_module, verify_module_into, verify_module_only,
    verify_module_or_panic,
};
