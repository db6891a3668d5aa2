//! Request bodies for the rule endpoints and their validation.
//!
//! Forms deserialize loosely (tags as strings, numbers as raw JSON) so that
//! every problem can be reported against its field in one response. Validation
//! turns a form into a typed [`RuleInput`] or a [`FieldErrors`] map; nothing
//! reaches the database until it succeeds.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use petshop_core::{
    ApplyType, CustomerRole, DiscountValueType, EligibilitySet, EligibilityType, ExternalId,
    MinimumType, RuleKind, RuleStatus, TargetSet,
};

use super::rule::{
    BannerDetails, DiscountDetails, FreeShippingDetails, PromoDetails, RuleDetails, RuleFilter,
    RuleInput, RuleLimits, RuleSchedule,
};
use super::validation::FieldErrors;

const MAX_TITLE_LENGTH: usize = 200;
const MAX_CODE_LENGTH: usize = 64;
const MAX_DESCRIPTION_LENGTH: usize = 2000;
const MAX_URL_LENGTH: usize = 2048;
/// Exclusive bound of the `NUMERIC(12, 2)` columns holding minimums and values.
const NUMERIC_LIMIT: i64 = 10_000_000_000;

/// A create/update body for one rule kind.
pub trait RuleForm: DeserializeOwned + Send + 'static {
    /// The kind this form creates and updates.
    const KIND: RuleKind;

    /// Validate the form into a typed input.
    ///
    /// # Errors
    ///
    /// Returns every field that failed validation.
    fn validate(self) -> Result<RuleInput, FieldErrors>;
}

/// Fields shared by every rule kind.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonForm {
    pub apply_type: Option<String>,
    #[serde(default)]
    pub apply: Vec<String>,
    pub eligibility_type: Option<String>,
    #[serde(default)]
    pub eligibility: Vec<String>,
    pub minimum_type: Option<String>,
    pub minimum: Option<Value>,
    pub max_total_use: Option<i64>,
    pub max_user_once: Option<bool>,
    pub start_at: Option<String>,
    pub end_at: Option<String>,
    pub active_override: Option<bool>,
    pub expected_version: Option<i32>,
}

struct Common {
    targets: TargetSet,
    eligibility: EligibilitySet,
    limits: RuleLimits,
    schedule: RuleSchedule,
}

impl CommonForm {
    fn validate(&self, errors: &mut FieldErrors) -> Option<Common> {
        let targets = self.validate_targets(errors);
        let eligibility = self.validate_eligibility(errors);
        let limits = self.validate_limits(errors);
        let schedule = self.validate_schedule(errors);

        Some(Common {
            targets: targets?,
            eligibility: eligibility?,
            limits: limits?,
            schedule: schedule?,
        })
    }

    fn validate_targets(&self, errors: &mut FieldErrors) -> Option<TargetSet> {
        let apply_type = match self.apply_type.as_deref() {
            None => {
                errors.add("applyType", "is required");
                None
            }
            Some(tag) => errors.check("applyType", tag.parse::<ApplyType>()),
        };

        if self.apply.is_empty() {
            errors.add("apply", "must contain at least one target");
            return None;
        }
        let ids = parse_ids("apply", &self.apply, errors)?;

        Some(TargetSet::new(apply_type?, ids))
    }

    fn validate_eligibility(&self, errors: &mut FieldErrors) -> Option<EligibilitySet> {
        let eligibility_type = errors.check(
            "eligibilityType",
            EligibilityType::parse_optional(self.eligibility_type.as_deref()),
        )?;

        match eligibility_type {
            EligibilityType::All => Some(EligibilitySet::all()),
            EligibilityType::Role => {
                if self.eligibility.is_empty() {
                    errors.add("eligibility", "must contain at least one role");
                    return None;
                }
                let roles = self
                    .eligibility
                    .iter()
                    .map(|value| value.trim().parse::<CustomerRole>())
                    .collect::<Result<Vec<_>, _>>();
                errors
                    .check("eligibility", roles)
                    .map(EligibilitySet::roles)
            }
            EligibilityType::User => {
                if self.eligibility.is_empty() {
                    errors.add("eligibility", "must contain at least one customer");
                    return None;
                }
                parse_ids("eligibility", &self.eligibility, errors).map(EligibilitySet::users)
            }
        }
    }

    fn validate_limits(&self, errors: &mut FieldErrors) -> Option<RuleLimits> {
        let minimum_type = match self.minimum_type.as_deref() {
            None => Some(MinimumType::Nothing),
            Some(tag) => errors.check("minimumType", tag.parse::<MinimumType>()),
        };

        let minimum = match (minimum_type, &self.minimum) {
            (None | Some(MinimumType::Nothing), _) => None,
            (Some(_), None | Some(Value::Null)) => {
                errors.add("minimum", "is required for this minimum type");
                None
            }
            (Some(MinimumType::Quantity), Some(value)) => {
                errors.check("minimum", parse_decimal(value).and_then(check_quantity))
            }
            (Some(MinimumType::Amount), Some(value)) => {
                errors.check("minimum", parse_decimal(value).and_then(check_amount))
            }
        };

        let max_total_use = match self.max_total_use {
            None => Some(None),
            Some(n) if n < 1 => {
                errors.add("maxTotalUse", "must be at least 1");
                None
            }
            Some(n) => errors.check(
                "maxTotalUse",
                i32::try_from(n)
                    .map(Some)
                    .map_err(|_| "is too large".to_owned()),
            ),
        };

        let minimum_type = minimum_type?;
        let minimum = if minimum_type == MinimumType::Nothing {
            None
        } else {
            Some(minimum?)
        };

        Some(RuleLimits {
            minimum_type,
            minimum,
            max_total_use: max_total_use?,
            max_user_once: self.max_user_once.unwrap_or(false),
        })
    }

    fn validate_schedule(&self, errors: &mut FieldErrors) -> Option<RuleSchedule> {
        let start_at = match self.start_at.as_deref() {
            None => {
                errors.add("startAt", "is required");
                None
            }
            Some(value) => errors.check("startAt", parse_timestamp(value)),
        };

        let end_at = match self.end_at.as_deref() {
            None => Some(None),
            Some(value) => errors.check("endAt", parse_timestamp(value).map(Some)),
        };

        Some(RuleSchedule {
            start_at: start_at?,
            end_at: end_at?,
            active_override: self.active_override,
        })
    }
}

fn finish(
    common: &CommonForm,
    details: Option<RuleDetails>,
    mut errors: FieldErrors,
) -> Result<RuleInput, FieldErrors> {
    let validated = common.validate(&mut errors);

    match (validated, details) {
        (Some(validated), Some(details)) if errors.is_empty() => Ok(RuleInput {
            details,
            targets: validated.targets,
            eligibility: validated.eligibility,
            limits: validated.limits,
            schedule: validated.schedule,
            expected_version: common.expected_version,
        }),
        _ => Err(errors),
    }
}

/// Body of `POST /discounts` and `PUT /discounts/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountForm {
    #[serde(flatten)]
    pub common: CommonForm,
    pub title: Option<String>,
    pub code: Option<String>,
    pub value_type: Option<String>,
    pub value: Option<Value>,
}

impl RuleForm for DiscountForm {
    const KIND: RuleKind = RuleKind::Discount;

    fn validate(self) -> Result<RuleInput, FieldErrors> {
        let mut errors = FieldErrors::new();

        let title = required_text("title", self.title.as_deref(), MAX_TITLE_LENGTH, &mut errors);
        let code = optional_text("code", self.code.as_deref(), MAX_CODE_LENGTH, &mut errors);
        if let Some(Some(code)) = &code
            && code.chars().any(char::is_whitespace)
        {
            errors.add("code", "must not contain whitespace");
        }

        let value_type = match self.value_type.as_deref() {
            None => {
                errors.add("valueType", "is required");
                None
            }
            Some(tag) => errors.check("valueType", tag.parse::<DiscountValueType>()),
        };

        let value = match &self.value {
            None | Some(Value::Null) => {
                errors.add("value", "is required");
                None
            }
            Some(raw) => errors.check(
                "value",
                parse_decimal(raw).and_then(|value| check_discount_value(value, value_type)),
            ),
        };

        let details = match (title, code, value_type, value) {
            (Some(title), Some(code), Some(value_type), Some(value)) => {
                Some(RuleDetails::Discount(DiscountDetails {
                    title,
                    code,
                    value_type,
                    value,
                }))
            }
            _ => None,
        };

        finish(&self.common, details, errors)
    }
}

/// Body of `POST /free-shipping` and `PUT /free-shipping/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeShippingForm {
    #[serde(flatten)]
    pub common: CommonForm,
    pub name: Option<String>,
}

impl RuleForm for FreeShippingForm {
    const KIND: RuleKind = RuleKind::FreeShipping;

    fn validate(self) -> Result<RuleInput, FieldErrors> {
        let mut errors = FieldErrors::new();

        let details = required_text("name", self.name.as_deref(), MAX_TITLE_LENGTH, &mut errors)
            .map(|name| RuleDetails::FreeShipping(FreeShippingDetails { name }));

        finish(&self.common, details, errors)
    }
}

/// Body (or `payload` part) of `POST /banners` and `PUT /banners/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerForm {
    #[serde(flatten)]
    pub common: CommonForm,
    pub title: Option<String>,
    pub link_url: Option<String>,
}

impl RuleForm for BannerForm {
    const KIND: RuleKind = RuleKind::Banner;

    fn validate(self) -> Result<RuleInput, FieldErrors> {
        let mut errors = FieldErrors::new();

        let title = required_text("title", self.title.as_deref(), MAX_TITLE_LENGTH, &mut errors);
        let link_url =
            optional_text("linkUrl", self.link_url.as_deref(), MAX_URL_LENGTH, &mut errors)
                .and_then(|link| match link {
                    None => Some(None),
                    Some(link) => {
                        errors.check("linkUrl", check_link_url(&link).map(|()| Some(link)))
                    }
                });

        let details = match (title, link_url) {
            (Some(title), Some(link_url)) => Some(RuleDetails::Banner(BannerDetails {
                title,
                link_url,
                image_key: None,
            })),
            _ => None,
        };

        finish(&self.common, details, errors)
    }
}

/// Body (or `payload` part) of `POST /promos` and `PUT /promos/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoForm {
    #[serde(flatten)]
    pub common: CommonForm,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl RuleForm for PromoForm {
    const KIND: RuleKind = RuleKind::Promo;

    fn validate(self) -> Result<RuleInput, FieldErrors> {
        let mut errors = FieldErrors::new();

        let title = required_text("title", self.title.as_deref(), MAX_TITLE_LENGTH, &mut errors);
        let description = optional_text(
            "description",
            self.description.as_deref(),
            MAX_DESCRIPTION_LENGTH,
            &mut errors,
        );

        let details = match (title, description) {
            (Some(title), Some(description)) => Some(RuleDetails::Promo(PromoDetails {
                title,
                description,
                image_key: None,
            })),
            _ => None,
        };

        finish(&self.common, details, errors)
    }
}

/// Body of `PUT /{kind}/{id}/override`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideForm {
    /// Outer `None` when the field is missing, inner `None` for an explicit null.
    #[serde(default, deserialize_with = "present")]
    pub active_override: Option<Option<bool>>,
    pub expected_version: Option<i32>,
}

impl OverrideForm {
    /// The requested override.
    ///
    /// # Errors
    ///
    /// Returns a field error if `activeOverride` is missing.
    pub fn validate(&self) -> Result<Option<bool>, FieldErrors> {
        self.active_override.ok_or_else(|| {
            let mut errors = FieldErrors::new();
            errors.add("activeOverride", "is required (use null to clear)");
            errors
        })
    }
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<bool>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<bool>::deserialize(deserializer).map(Some)
}

/// Query string of `GET /{kind}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListQuery {
    /// Validate into a listing filter.
    ///
    /// # Errors
    ///
    /// Returns field errors for an unknown status or out-of-range paging.
    pub fn validate(&self) -> Result<RuleFilter, FieldErrors> {
        let mut errors = FieldErrors::new();

        let status = match self.status.as_deref() {
            None | Some("") => Some(None),
            Some(value) => errors.check("status", value.parse::<RuleStatus>().map(Some)),
        };

        let limit = self.limit.unwrap_or(RuleFilter::DEFAULT_LIMIT);
        if !(1..=RuleFilter::MAX_LIMIT).contains(&limit) {
            errors.add(
                "limit",
                format!("must be between 1 and {}", RuleFilter::MAX_LIMIT),
            );
        }

        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            errors.add("offset", "must not be negative");
        }

        match status {
            Some(status) if errors.is_empty() => Ok(RuleFilter {
                status,
                limit,
                offset,
            }),
            _ => Err(errors),
        }
    }
}

fn parse_ids(field: &str, values: &[String], errors: &mut FieldErrors) -> Option<Vec<ExternalId>> {
    let mut ids = Vec::with_capacity(values.len());
    for (index, value) in values.iter().enumerate() {
        match ExternalId::parse(value) {
            Ok(id) => ids.push(id),
            Err(e) => {
                errors.add(field, format!("item {index}: {e}"));
                return None;
            }
        }
    }
    Some(ids)
}

fn required_text(
    field: &str,
    value: Option<&str>,
    max: usize,
    errors: &mut FieldErrors,
) -> Option<String> {
    match value.map(str::trim) {
        None | Some("") => {
            errors.add(field, "is required");
            None
        }
        Some(text) if text.chars().count() > max => {
            errors.add(field, format!("must be at most {max} characters"));
            None
        }
        Some(text) => Some(text.to_owned()),
    }
}

/// `Some(None)` when absent or blank, `None` when invalid.
fn optional_text(
    field: &str,
    value: Option<&str>,
    max: usize,
    errors: &mut FieldErrors,
) -> Option<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Some(None),
        Some(text) if text.chars().count() > max => {
            errors.add(field, format!("must be at most {max} characters"));
            None
        }
        Some(text) => Some(Some(text.to_owned())),
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| "must be an RFC 3339 timestamp".to_owned())
}

fn parse_decimal(value: &Value) -> Result<Decimal, String> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_owned(),
        _ => return Err("must be a number".to_owned()),
    };
    text.parse::<Decimal>().map_err(|_| "must be a number".to_owned())
}

fn check_storable(value: Decimal) -> Result<Decimal, String> {
    if value.abs() >= Decimal::from(NUMERIC_LIMIT) {
        return Err(format!("must be less than {NUMERIC_LIMIT}"));
    }
    Ok(value)
}

fn check_quantity(value: Decimal) -> Result<Decimal, String> {
    if !value.fract().is_zero() {
        return Err("must be a whole number".to_owned());
    }
    if value < Decimal::ONE {
        return Err("must be at least 1".to_owned());
    }
    check_storable(value)
}

fn check_amount(value: Decimal) -> Result<Decimal, String> {
    if value <= Decimal::ZERO {
        return Err("must be greater than 0".to_owned());
    }
    if value.normalize().scale() > 2 {
        return Err("must have at most 2 decimal places".to_owned());
    }
    check_storable(value)
}

fn check_discount_value(
    value: Decimal,
    value_type: Option<DiscountValueType>,
) -> Result<Decimal, String> {
    let value = check_amount(value)?;
    if value_type == Some(DiscountValueType::Percentage) && value > Decimal::ONE_HUNDRED {
        return Err("must be at most 100 for a percentage".to_owned());
    }
    Ok(value)
}

fn check_link_url(link: &str) -> Result<(), String> {
    let url = url::Url::parse(link).map_err(|_| "must be an absolute URL".to_owned())?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{other}'")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn common() -> Value {
        json!({
            "applyType": "categories",
            "apply": ["cat-1", "cat-2"],
            "startAt": "2026-06-01T00:00:00Z",
        })
    }

    fn with(base: Value, extra: Value) -> Value {
        let mut base = base;
        let (Value::Object(target), Value::Object(extra)) = (&mut base, extra) else {
            panic!("objects expected");
        };
        target.extend(extra);
        base
    }

    fn discount(extra: Value) -> Result<RuleInput, FieldErrors> {
        let body = with(
            with(common(), json!({"title": "Spring", "valueType": "percentage", "value": 15})),
            extra,
        );
        serde_json::from_value::<DiscountForm>(body).unwrap().validate()
    }

    #[test]
    fn test_valid_discount() {
        let input = discount(json!({"code": " SPRING15 "})).unwrap();

        assert_eq!(input.kind(), RuleKind::Discount);
        assert_eq!(input.targets.apply_type(), ApplyType::Categories);
        assert_eq!(input.targets.len(), 2);
        assert_eq!(input.eligibility, EligibilitySet::all());
        assert_eq!(input.limits.minimum_type, MinimumType::Nothing);
        assert!(input.schedule.end_at.is_none());
        let RuleDetails::Discount(details) = input.details else {
            panic!("discount expected");
        };
        assert_eq!(details.code.as_deref(), Some("SPRING15"));
        assert_eq!(details.value, Decimal::from(15));
    }

    #[test]
    fn test_null_eligibility_type_means_all_and_ignores_values() {
        let input = discount(json!({"eligibilityType": null, "eligibility": ["u-1"]})).unwrap();
        assert_eq!(input.eligibility, EligibilitySet::all());
    }

    #[test]
    fn test_unknown_tags_are_field_errors() {
        let errors = discount(json!({
            "applyType": "brands",
            "eligibilityType": "everyone",
            "valueType": "bogo",
        }))
        .unwrap_err();

        assert_eq!(errors.get("applyType"), Some("unknown apply type 'brands'"));
        assert_eq!(
            errors.get("eligibilityType"),
            Some("unknown eligibility type 'everyone'")
        );
        assert_eq!(
            errors.get("valueType"),
            Some("unknown discount value type 'bogo'")
        );
    }

    #[test]
    fn test_empty_target_set_is_rejected() {
        let errors = discount(json!({"apply": []})).unwrap_err();
        assert_eq!(errors.get("apply"), Some("must contain at least one target"));
    }

    #[test]
    fn test_blank_target_id_is_rejected() {
        let errors = discount(json!({"apply": ["ok", "  "]})).unwrap_err();
        assert!(errors.get("apply").unwrap().starts_with("item 1:"));
    }

    #[test]
    fn test_role_eligibility_is_closed() {
        let input = discount(json!({
            "eligibilityType": "role",
            "eligibility": ["member", "wholesale"],
        }))
        .unwrap();
        assert_eq!(
            input.eligibility,
            EligibilitySet::roles([CustomerRole::Member, CustomerRole::Wholesale])
        );

        let errors =
            discount(json!({"eligibilityType": "role", "eligibility": ["admin"]})).unwrap_err();
        assert_eq!(
            errors.get("eligibility"),
            Some("unknown customer role 'admin'")
        );

        let errors = discount(json!({"eligibilityType": "user", "eligibility": []})).unwrap_err();
        assert_eq!(
            errors.get("eligibility"),
            Some("must contain at least one customer")
        );
    }

    #[test]
    fn test_percentage_above_hundred_is_rejected() {
        let errors = discount(json!({"value": "100.01"})).unwrap_err();
        assert_eq!(
            errors.get("value"),
            Some("must be at most 100 for a percentage")
        );

        let input = discount(json!({"valueType": "fixed", "value": "250.00"})).unwrap();
        let RuleDetails::Discount(details) = input.details else {
            panic!("discount expected");
        };
        assert_eq!(details.value_type, DiscountValueType::Fixed);
    }

    #[test]
    fn test_non_positive_value_is_rejected() {
        let errors = discount(json!({"value": 0})).unwrap_err();
        assert_eq!(errors.get("value"), Some("must be greater than 0"));
    }

    #[test]
    fn test_minimum_rules() {
        let errors = discount(json!({"minimumType": "quantity"})).unwrap_err();
        assert_eq!(
            errors.get("minimum"),
            Some("is required for this minimum type")
        );

        let errors = discount(json!({"minimumType": "quantity", "minimum": 2.5})).unwrap_err();
        assert_eq!(errors.get("minimum"), Some("must be a whole number"));

        let input = discount(json!({"minimumType": "amount", "minimum": "49.99"})).unwrap();
        assert_eq!(input.limits.minimum, Some("49.99".parse().unwrap()));

        let input = discount(json!({"minimumType": "nothing", "minimum": 10})).unwrap();
        assert_eq!(input.limits.minimum, None);
    }

    #[test]
    fn test_amounts_must_fit_numeric_column() {
        let errors =
            discount(json!({"valueType": "fixed", "value": "100000000000"})).unwrap_err();
        assert_eq!(errors.get("value"), Some("must be less than 10000000000"));

        let errors =
            discount(json!({"minimumType": "amount", "minimum": "9999999999.5"})).unwrap_err();
        assert_eq!(errors.get("minimum"), Some("must be less than 10000000000"));

        let errors = discount(json!({"minimumType": "quantity", "minimum": 10_000_000_000_u64}))
            .unwrap_err();
        assert_eq!(errors.get("minimum"), Some("must be less than 10000000000"));

        let form: FreeShippingForm = serde_json::from_value(with(
            common(),
            json!({"name": "Big orders", "minimumType": "amount", "minimum": "99999999999.5"}),
        ))
        .unwrap();
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("minimum"), Some("must be less than 10000000000"));

        let input = discount(json!({
            "valueType": "fixed",
            "value": "9999999999.99",
            "minimumType": "amount",
            "minimum": "9999999999.99",
        }))
        .unwrap();
        assert_eq!(input.limits.minimum, Some("9999999999.99".parse().unwrap()));
    }

    #[test]
    fn test_max_total_use_bounds() {
        let errors = discount(json!({"maxTotalUse": 0})).unwrap_err();
        assert_eq!(errors.get("maxTotalUse"), Some("must be at least 1"));

        let errors = discount(json!({"maxTotalUse": 5_000_000_000_i64})).unwrap_err();
        assert_eq!(errors.get("maxTotalUse"), Some("is too large"));
    }

    #[test]
    fn test_schedule_parsing() {
        let errors = discount(json!({"startAt": "tomorrow"})).unwrap_err();
        assert_eq!(errors.get("startAt"), Some("must be an RFC 3339 timestamp"));

        let input = discount(json!({
            "endAt": "2026-05-01T00:00:00+02:00",
            "activeOverride": false,
        }))
        .unwrap();
        assert!(input.schedule.end_at.unwrap() < input.schedule.start_at);
        assert_eq!(input.schedule.active_override, Some(false));
    }

    #[test]
    fn test_missing_required_fields_reported_together() {
        let errors = serde_json::from_value::<DiscountForm>(json!({}))
            .unwrap()
            .validate()
            .unwrap_err();

        for field in ["title", "valueType", "value", "applyType", "apply", "startAt"] {
            assert!(errors.get(field).is_some(), "missing error for {field}");
        }
    }

    #[test]
    fn test_free_shipping_requires_name() {
        let form: FreeShippingForm = serde_json::from_value(common()).unwrap();
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("name"), Some("is required"));

        let form: FreeShippingForm =
            serde_json::from_value(with(common(), json!({"name": "Orders over 50"}))).unwrap();
        assert_eq!(form.validate().unwrap().kind(), RuleKind::FreeShipping);
    }

    #[test]
    fn test_banner_link_must_be_http() {
        let form: BannerForm = serde_json::from_value(with(
            common(),
            json!({"title": "Sale", "linkUrl": "javascript:alert(1)"}),
        ))
        .unwrap();
        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors.get("linkUrl"),
            Some("unsupported scheme 'javascript'")
        );

        let form: BannerForm = serde_json::from_value(with(
            common(),
            json!({"title": "Sale", "linkUrl": "https://petshop.example/sale"}),
        ))
        .unwrap();
        let input = form.validate().unwrap();
        assert_eq!(input.details.image_key(), None);
    }

    #[test]
    fn test_promo_blank_description_is_none() {
        let form: PromoForm = serde_json::from_value(with(
            common(),
            json!({"title": "Kitten week", "description": "  "}),
        ))
        .unwrap();
        let RuleDetails::Promo(details) = form.validate().unwrap().details else {
            panic!("promo expected");
        };
        assert_eq!(details.description, None);
    }

    #[test]
    fn test_override_form_distinguishes_null_from_missing() {
        let form: OverrideForm = serde_json::from_value(json!({"activeOverride": null})).unwrap();
        assert_eq!(form.validate().unwrap(), None);

        let form: OverrideForm = serde_json::from_value(json!({"activeOverride": true})).unwrap();
        assert_eq!(form.validate().unwrap(), Some(true));

        let form: OverrideForm = serde_json::from_value(json!({})).unwrap();
        assert!(form.validate().unwrap_err().get("activeOverride").is_some());
    }

    #[test]
    fn test_list_query_bounds() {
        let filter = ListQuery::default().validate().unwrap();
        assert_eq!(filter.limit, RuleFilter::DEFAULT_LIMIT);
        assert_eq!(filter.offset, 0);
        assert_eq!(filter.status, None);

        let query = ListQuery {
            status: Some("scheduled".to_owned()),
            limit: Some(10),
            offset: Some(20),
        };
        assert_eq!(
            query.validate().unwrap().status,
            Some(RuleStatus::Scheduled)
        );

        let query = ListQuery {
            status: Some("paused".to_owned()),
            limit: Some(500),
            offset: Some(-1),
        };
        let errors = query.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
