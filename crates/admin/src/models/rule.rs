//! Marketing rule domain models.
//!
//! A rule is the shared targeting envelope (schedule, limits, target set,
//! eligibility set) plus the fields of exactly one kind, carried by
//! [`RuleDetails`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use petshop_core::{
    ApplyType, DiscountValueType, EligibilitySet, EligibilityType, MinimumType, RuleId, RuleKind,
    RuleStatus, TargetSet,
};

/// Fields of a discount rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountDetails {
    pub title: String,
    /// Checkout code. Unique when present.
    pub code: Option<String>,
    pub value_type: DiscountValueType,
    pub value: Decimal,
}

/// Fields of a free-shipping rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeShippingDetails {
    /// Unique display name.
    pub name: String,
}

/// Fields of a storefront banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerDetails {
    pub title: String,
    pub link_url: Option<String>,
    /// Object storage key of the banner image.
    pub image_key: Option<String>,
}

/// Fields of a storefront promo tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoDetails {
    pub title: String,
    pub description: Option<String>,
    /// Object storage key of the promo image.
    pub image_key: Option<String>,
}

/// Kind-specific fields of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleDetails {
    Discount(DiscountDetails),
    FreeShipping(FreeShippingDetails),
    Banner(BannerDetails),
    Promo(PromoDetails),
}

impl RuleDetails {
    /// The rule kind these details belong to.
    #[must_use]
    pub const fn kind(&self) -> RuleKind {
        match self {
            Self::Discount(_) => RuleKind::Discount,
            Self::FreeShipping(_) => RuleKind::FreeShipping,
            Self::Banner(_) => RuleKind::Banner,
            Self::Promo(_) => RuleKind::Promo,
        }
    }

    /// Object storage key of the rule's image, if the kind has one and it is set.
    #[must_use]
    pub fn image_key(&self) -> Option<&str> {
        match self {
            Self::Banner(banner) => banner.image_key.as_deref(),
            Self::Promo(promo) => promo.image_key.as_deref(),
            Self::Discount(_) | Self::FreeShipping(_) => None,
        }
    }

    /// Replace the image key. No-op for kinds without an image.
    pub fn set_image_key(&mut self, key: Option<String>) {
        match self {
            Self::Banner(banner) => banner.image_key = key,
            Self::Promo(promo) => promo.image_key = key,
            Self::Discount(_) | Self::FreeShipping(_) => {}
        }
    }

    /// Human-readable label: the title, or the name for free-shipping rules.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Discount(DiscountDetails { title, .. })
            | Self::Banner(BannerDetails { title, .. })
            | Self::Promo(PromoDetails { title, .. }) => title,
            Self::FreeShipping(FreeShippingDetails { name }) => name,
        }
    }
}

/// Minimum purchase and usage limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleLimits {
    pub minimum_type: MinimumType,
    /// Item count or subtotal, depending on `minimum_type`. `None` for nothing.
    pub minimum: Option<Decimal>,
    pub max_total_use: Option<i32>,
    pub max_user_once: bool,
}

impl Default for RuleLimits {
    fn default() -> Self {
        Self {
            minimum_type: MinimumType::Nothing,
            minimum: None,
            max_total_use: None,
            max_user_once: false,
        }
    }
}

/// Time window and admin override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSchedule {
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    /// `Some(true)` forces active, `Some(false)` forces expired.
    pub active_override: Option<bool>,
}

impl RuleSchedule {
    /// Derive the lifecycle status at `now`.
    #[must_use]
    pub fn status(&self, now: DateTime<Utc>) -> RuleStatus {
        RuleStatus::derive(now, self.active_override, self.start_at, self.end_at)
    }
}

/// A validated create or update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleInput {
    pub details: RuleDetails,
    pub targets: TargetSet,
    pub eligibility: EligibilitySet,
    pub limits: RuleLimits,
    pub schedule: RuleSchedule,
    /// Version the client last read. Updates fail with a conflict when stale.
    pub expected_version: Option<i32>,
}

impl RuleInput {
    #[must_use]
    pub const fn kind(&self) -> RuleKind {
        self.details.kind()
    }
}

/// A stored rule without its associations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub id: RuleId,
    pub details: RuleDetails,
    pub apply_type: ApplyType,
    pub eligibility_type: EligibilityType,
    pub limits: RuleLimits,
    pub schedule: RuleSchedule,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rule {
    #[must_use]
    pub const fn kind(&self) -> RuleKind {
        self.details.kind()
    }
}

/// Full read model of a rule, as returned by `GET /{kind}/{id}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleView {
    pub id: RuleId,
    #[serde(flatten)]
    pub details: RuleDetails,
    pub apply_type: ApplyType,
    /// Target identifiers under `apply_type`.
    pub apply: Vec<String>,
    pub eligibility_type: EligibilityType,
    /// Roles or customer identifiers under `eligibility_type`. Empty for all.
    pub eligibility: Vec<String>,
    #[serde(flatten)]
    pub limits: RuleLimits,
    #[serde(flatten)]
    pub schedule: RuleSchedule,
    pub status: RuleStatus,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RuleView {
    /// Assemble the view of a rule and its loaded associations at `now`.
    #[must_use]
    pub fn new(
        rule: Rule,
        targets: &TargetSet,
        eligibility: &EligibilitySet,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: rule.id,
            status: rule.schedule.status(now),
            details: rule.details,
            apply_type: rule.apply_type,
            apply: targets
                .ids()
                .iter()
                .map(|id| id.as_str().to_owned())
                .collect(),
            eligibility_type: rule.eligibility_type,
            eligibility: eligibility.values().map(str::to_owned).collect(),
            limits: rule.limits,
            schedule: rule.schedule,
            version: rule.version,
            created_at: rule.created_at,
            updated_at: rule.updated_at,
        }
    }
}

/// Row of the `GET /{kind}` listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSummary {
    pub id: RuleId,
    pub kind: RuleKind,
    pub label: String,
    pub apply_type: ApplyType,
    pub eligibility_type: EligibilityType,
    #[serde(flatten)]
    pub schedule: RuleSchedule,
    pub status: RuleStatus,
    pub version: i32,
    pub updated_at: DateTime<Utc>,
}

impl RuleSummary {
    #[must_use]
    pub fn new(rule: &Rule, now: DateTime<Utc>) -> Self {
        Self {
            id: rule.id,
            kind: rule.kind(),
            label: rule.details.label().to_owned(),
            apply_type: rule.apply_type,
            eligibility_type: rule.eligibility_type,
            schedule: rule.schedule,
            status: rule.schedule.status(now),
            version: rule.version,
            updated_at: rule.updated_at,
        }
    }
}

/// Listing parameters for `GET /{kind}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleFilter {
    pub status: Option<RuleStatus>,
    pub limit: i64,
    pub offset: i64,
}

impl RuleFilter {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 200;
}

impl Default for RuleFilter {
    fn default() -> Self {
        Self {
            status: None,
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};
    use petshop_core::{CustomerRole, ExternalId};
    use serde_json::json;

    use super::*;

    fn sample_rule() -> Rule {
        let start = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        Rule {
            id: RuleId::new(7),
            details: RuleDetails::Banner(BannerDetails {
                title: "Spring treats".to_owned(),
                link_url: Some("https://petshop.example/spring".to_owned()),
                image_key: Some("rules/abc.png".to_owned()),
            }),
            apply_type: ApplyType::Pets,
            eligibility_type: EligibilityType::Role,
            limits: RuleLimits::default(),
            schedule: RuleSchedule {
                start_at: start,
                end_at: Some(start + Duration::days(30)),
                active_override: None,
            },
            version: 3,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn test_details_kind_and_image() {
        let mut details = sample_rule().details;
        assert_eq!(details.kind(), RuleKind::Banner);
        assert_eq!(details.image_key(), Some("rules/abc.png"));

        details.set_image_key(None);
        assert_eq!(details.image_key(), None);

        let mut shipping = RuleDetails::FreeShipping(FreeShippingDetails {
            name: "Over 50".to_owned(),
        });
        shipping.set_image_key(Some("ignored".to_owned()));
        assert_eq!(shipping.image_key(), None);
        assert_eq!(shipping.label(), "Over 50");
    }

    #[test]
    fn test_view_serializes_flat_camel_case() {
        let rule = sample_rule();
        let now = rule.schedule.start_at + Duration::days(1);
        let targets = TargetSet::new(
            ApplyType::Pets,
            [ExternalId::parse("dog").unwrap(), ExternalId::parse("cat").unwrap()],
        );
        let eligibility = EligibilitySet::roles([CustomerRole::Member]);

        let json = serde_json::to_value(RuleView::new(rule, &targets, &eligibility, now)).unwrap();

        assert_eq!(json["id"], json!(7));
        assert_eq!(json["kind"], json!("banner"));
        assert_eq!(json["title"], json!("Spring treats"));
        assert_eq!(json["imageKey"], json!("rules/abc.png"));
        assert_eq!(json["applyType"], json!("pets"));
        assert_eq!(json["apply"], json!(["cat", "dog"]));
        assert_eq!(json["eligibilityType"], json!("role"));
        assert_eq!(json["eligibility"], json!(["member"]));
        assert_eq!(json["minimumType"], json!("nothing"));
        assert_eq!(json["maxUserOnce"], json!(false));
        assert_eq!(json["activeOverride"], json!(null));
        assert_eq!(json["status"], json!("active"));
        assert_eq!(json["version"], json!(3));
    }

    #[test]
    fn test_summary_derives_status() {
        let mut rule = sample_rule();
        rule.schedule.active_override = Some(false);
        let summary = RuleSummary::new(&rule, rule.schedule.start_at);
        assert_eq!(summary.status, RuleStatus::Expired);
        assert_eq!(summary.label, "Spring treats");
        assert_eq!(summary.kind, RuleKind::Banner);
    }
}
