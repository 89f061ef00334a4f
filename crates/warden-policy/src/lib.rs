//! # warden-policy
//!
//! A catalog-backed, deny-by-default access decision engine for WARDEN.
//!
//! ## Overview
//!
//! This crate provides [`CatalogAccessEngine`], which implements the
//! [`AccessPolicy`](warden_core::traits::AccessPolicy) trait. The catalog
//! and engine settings are declared in a TOML file ([`PortalConfig`]).
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use warden_policy::CatalogAccessEngine;
//! use warden_core::traits::AccessPolicy;
//!
//! let engine = CatalogAccessEngine::from_file(Path::new("config/portal.toml"))?;
//! let allowed = engine.is_granted(&principal, "north", "hr", "single");
//! ```
//!
//! ## Grant encodings
//!
//! Grants are read from the flat `tenant.unit.capability` map first and from
//! the legacy nested map second. When both hold a value for the same key,
//! the flat value wins.

pub mod config;
pub mod engine;

pub use config::{EngineSettings, PortalConfig, TenantVisibility};
pub use engine::CatalogAccessEngine;

// ── Tests ─────────────────────────────────────────────────────────────────────
