//! Operations-portal reference scenarios.
//!
//! Each scenario wires real WARDEN components (decision engine, mutator,
//! journal, verifier) to the reference catalog and fixture principals and
//! demonstrates one part of the authorization model.

pub mod batch_toggle;
pub mod catalog_drift;
pub mod legacy_migration;
