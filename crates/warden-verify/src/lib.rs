//! # warden-verify
//!
//! Offline consistency verification for WARDEN.
//!
//! [`harness::ConsistencyVerifier`] enumerates every catalog leaf for a set of
//! representative principals, decides each one through any
//! [`warden_core::traits::AccessPolicy`], and compares the result with an
//! [`expectations::ExpectationTable`]. A reverse pass then checks that every
//! stored grant still names a live leaf, so catalog/grant drift shows up as
//! orphan findings rather than as silent denials.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use warden_verify::{ConsistencyVerifier, ExpectationTable};
//!
//! let expectations = ExpectationTable::new()
//!     .expect_default("root", true)
//!     .expect_default("alice", false)
//!     .expect("alice", "north.hr.single", true);
//!
//! let report = ConsistencyVerifier::new(&engine, engine.catalog())
//!     .run(&[root, alice], &expectations);
//! assert!(report.is_clean());
//! ```

pub mod expectations;
pub mod harness;

pub use expectations::ExpectationTable;
pub use harness::ConsistencyVerifier;

// ── Tests ─────────────────────────────────────────────────────────────────────
