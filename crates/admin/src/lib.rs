//! Petshop Admin library.
//!
//! REST backend for the marketing rule engine: discounts, free-shipping
//! policies, banners and promos. Exposed as a library so the CLI and the
//! integration tests can reuse the repositories and the rule service.
//!
//! # Security
//!
//! This crate writes storefront pricing rules. Only deploy it behind the
//! internal network boundary.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
