//! Business logic services for the rules admin.
//!
//! # Services
//!
//! - `rules` - Create, read, update, delete and override rules of every kind
//! - `storage` - Object storage for banner and promo images

pub mod rules;
pub mod storage;

pub use rules::{RuleError, RuleService, UpdateOutcome};
pub use storage::{HttpObjectStorage, ImageUpload, ObjectStorage, StorageError, replace_image};
