//! Closed tag enums for marketing rules.
//!
//! Every enum here is a closed set. Parsing an unknown tag is an error, never
//! a fallback to some default variant.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A tag that does not belong to the closed set it was parsed against.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownTag {
    /// Which tag set was being parsed (e.g. "apply type").
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl UnknownTag {
    /// Create a new error for the given tag set and rejected input.
    #[must_use]
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Defines a closed tag enum with its wire tag, `Display`, `FromStr` and `ALL`.
macro_rules! closed_tag {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $tag:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $tag)] $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &[Self] = &[$(Self::$variant),+];

            /// The tag used on the wire and in the database.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $tag ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownTag;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $tag => Ok(Self::$variant), )+
                    _ => Err(UnknownTag::new($label, s)),
                }
            }
        }
    };
}

closed_tag! {
    /// The four kinds of marketing rule sharing the targeting engine.
    RuleKind, "rule kind" {
        /// Percentage or fixed-amount discount.
        Discount => "discount",
        /// Free-shipping policy.
        FreeShipping => "free_shipping",
        /// Storefront banner.
        Banner => "banner",
        /// Storefront promo tile.
        Promo => "promo",
    }
}

impl RuleKind {
    /// URL path segment for this kind's REST resource.
    #[must_use]
    pub const fn path_segment(self) -> &'static str {
        match self {
            Self::Discount => "discounts",
            Self::FreeShipping => "free-shipping",
            Self::Banner => "banners",
            Self::Promo => "promos",
        }
    }

    /// Whether rules of this kind carry an image in object storage.
    #[must_use]
    pub const fn has_image(self) -> bool {
        matches!(self, Self::Banner | Self::Promo)
    }
}

closed_tag! {
    /// What a rule applies to. Discriminator of the target dimension.
    ApplyType, "apply type" {
        /// Product categories.
        Categories => "categories",
        /// Suppliers.
        Suppliers => "suppliers",
        /// Pet species.
        Pets => "pets",
        /// Individual product variants.
        Products => "products",
    }
}

closed_tag! {
    /// Who a rule applies to. Discriminator of the eligibility dimension.
    EligibilityType, "eligibility type" {
        /// Customers holding one of the listed roles.
        Role => "role",
        /// Specific customers.
        User => "user",
        /// Everyone. No eligibility rows are stored.
        All => "all",
    }
}

impl EligibilityType {
    /// Parse an optional tag, treating a missing tag as [`EligibilityType::All`].
    ///
    /// # Errors
    ///
    /// Returns [`UnknownTag`] if a tag is present but not recognized.
    pub fn parse_optional(tag: Option<&str>) -> Result<Self, UnknownTag> {
        tag.map_or(Ok(Self::All), str::parse::<Self>)
    }
}

closed_tag! {
    /// Customer roles a rule can be restricted to.
    CustomerRole, "customer role" {
        /// Regular registered customer.
        Customer => "customer",
        /// Paid loyalty member.
        Member => "member",
        /// Wholesale account.
        Wholesale => "wholesale",
    }
}

closed_tag! {
    /// Minimum purchase requirement of a rule.
    MinimumType, "minimum type" {
        /// No minimum.
        Nothing => "nothing",
        /// Minimum number of items in the cart.
        Quantity => "quantity",
        /// Minimum cart subtotal.
        Amount => "amount",
    }
}

closed_tag! {
    /// How a discount's value is interpreted.
    DiscountValueType, "discount value type" {
        /// Percentage off, `0 < value <= 100`.
        Percentage => "percentage",
        /// Fixed amount off.
        Fixed => "fixed",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_type_round_trips_through_tag() {
        for apply_type in ApplyType::ALL {
            let parsed: ApplyType = apply_type.as_str().parse().unwrap();
            assert_eq!(parsed, *apply_type);
        }
    }

    #[test]
    fn test_unknown_apply_type_is_rejected() {
        let err = "brands".parse::<ApplyType>().unwrap_err();
        assert_eq!(err.kind, "apply type");
        assert_eq!(err.value, "brands");
        assert_eq!(err.to_string(), "unknown apply type 'brands'");
    }

    #[test]
    fn test_tags_are_case_sensitive() {
        assert!("Categories".parse::<ApplyType>().is_err());
        assert!("ROLE".parse::<EligibilityType>().is_err());
    }

    #[test]
    fn test_missing_eligibility_type_means_all() {
        assert_eq!(
            EligibilityType::parse_optional(None).unwrap(),
            EligibilityType::All
        );
        assert_eq!(
            EligibilityType::parse_optional(Some("user")).unwrap(),
            EligibilityType::User
        );
        assert!(EligibilityType::parse_optional(Some("everyone")).is_err());
    }

    #[test]
    fn test_customer_role_is_closed_three_element_set() {
        assert_eq!(CustomerRole::ALL.len(), 3);
        assert!("admin".parse::<CustomerRole>().is_err());
    }

    #[test]
    fn test_rule_kind_path_segments() {
        assert_eq!(RuleKind::Discount.path_segment(), "discounts");
        assert_eq!(RuleKind::FreeShipping.path_segment(), "free-shipping");
        assert_eq!(RuleKind::Banner.path_segment(), "banners");
        assert_eq!(RuleKind::Promo.path_segment(), "promos");
        assert!(RuleKind::Banner.has_image());
        assert!(!RuleKind::Discount.has_image());
    }

    #[test]
    fn test_serde_uses_wire_tags() {
        let json = serde_json::to_string(&RuleKind::FreeShipping).unwrap();
        assert_eq!(json, "\"free_shipping\"");
        let parsed: MinimumType = serde_json::from_str("\"amount\"").unwrap();
        assert_eq!(parsed, MinimumType::Amount);
    }
}
