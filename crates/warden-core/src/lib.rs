//! # warden-core
//!
//! The trait seams and the batch mutation engine for WARDEN.
//!
//! This crate provides:
//! - The three core traits (`AccessPolicy`, `GrantWriter`, `MutationJournal`)
//! - The `GrantMutator` that applies capability, unit and tenant grant changes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use warden_core::{GrantMutator, traits::GrantWriter};
//!
//! let mutator = GrantMutator::new(catalog.clone());
//! mutator.set_unit(&admin, &mut clerk, "north", "hr", true, Consistency::Atomic)?;
//! ```

pub mod mutator;
pub mod traits;

pub use mutator::GrantMutator;
