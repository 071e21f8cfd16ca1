//! pomo-core - Shared functionality for the pomo focus timer
//!
//! Standard locations, human-readable formatting and platform
//! probing used by both the library and the binary.

pub mod format;
pub mod paths;
pub mod process;

pub use paths::Paths;
