//! Petshop Core - Shared rule-targeting types.
//!
//! This crate provides the pieces of the marketing rule engine that need no
//! I/O, shared by every rule kind (discounts, free shipping, banners, promos):
//! - `admin` - REST backend that stores and edits rules
//! - `cli` - Command-line tools for migrations and rule inspection
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no database
//! access, no HTTP clients. Storage layers consume the registry and the
//! reconcile planner and apply the resulting writes themselves.
//!
//! # Modules
//!
//! - [`types`] - IDs, closed discriminator enums, tagged associations, status
//! - [`registry`] - Discriminator to storage bindings
//! - [`reconcile`] - Minimal-write association diffing

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod reconcile;
pub mod registry;
pub mod types;

pub use types::*;
