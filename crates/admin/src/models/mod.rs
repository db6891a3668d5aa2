//! Domain models for the rules admin.

pub mod forms;
pub mod rule;
pub mod validation;

pub use forms::{
    BannerForm, DiscountForm, FreeShippingForm, ListQuery, OverrideForm, PromoForm, RuleForm,
};
pub use rule::{
    BannerDetails, DiscountDetails, FreeShippingDetails, PromoDetails, Rule, RuleDetails,
    RuleFilter, RuleInput, RuleLimits, RuleSchedule, RuleSummary, RuleView,
};
pub use validation::FieldErrors;
