//! Core types for the rule targeting engine.
//!
//! This module provides type-safe wrappers for rule identity, discriminators,
//! associations and lifecycle status.

pub mod association;
pub mod discriminator;
pub mod external_id;
pub mod id;
pub mod status;

pub use association::{Eligibility, EligibilitySet, Target, TargetSet};
pub use discriminator::{
    ApplyType, CustomerRole, DiscountValueType, EligibilityType, MinimumType, RuleKind, UnknownTag,
};
pub use external_id::{ExternalId, ExternalIdError};
pub use id::*;
pub use status::*;
