//! # warden-contracts
//!
//! Shared types, the permission key codec, and the error taxonomy for the
//! WARDEN authorization engine.
//!
//! All crates in the workspace import from here. Beyond the key codec,
//! catalog lookups and grant-store normalization, no decision logic lives in
//! this crate.

pub mod catalog;
pub mod decision;
pub mod error;
pub mod grant;
pub mod key;
pub mod mutation;
pub mod principal;
pub mod verify;
