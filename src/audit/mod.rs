// src/audit/mod.rs
// =============================================================================
// This module runs the audit pipeline.
//
// Submodules:
// - barrier: download-phase synchronization between repository workers
// - processor: fetch -> extract -> validate for one repository
// - fleet: one concurrent processor per repository
// =============================================================================

mod barrier;
mod fleet;
mod processor;

pub use fleet::FleetCoordinator;
pub use processor::{RepositoryReport, RepositoryState};

#[cfg(test)]
pub use barrier::PhaseBarrier;
#[cfg(test)]
pub use processor::{FileReport, NO_BROKEN_LINKS};
