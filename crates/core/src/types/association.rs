//! Target and eligibility associations as tagged unions.
//!
//! A rule targets exactly one kind of entity at a time and restricts
//! eligibility in exactly one way at a time. The sets below carry their
//! discriminator alongside their members, so a set can never mix kinds.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::discriminator::{ApplyType, CustomerRole, EligibilityType};
use super::external_id::ExternalId;

/// A single thing a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Target {
    Category(ExternalId),
    Supplier(ExternalId),
    Pet(ExternalId),
    Product(ExternalId),
}

impl Target {
    /// Build the target of the given apply type.
    #[must_use]
    pub const fn new(apply_type: ApplyType, id: ExternalId) -> Self {
        match apply_type {
            ApplyType::Categories => Self::Category(id),
            ApplyType::Suppliers => Self::Supplier(id),
            ApplyType::Pets => Self::Pet(id),
            ApplyType::Products => Self::Product(id),
        }
    }

    /// The apply type this target belongs to.
    #[must_use]
    pub const fn apply_type(&self) -> ApplyType {
        match self {
            Self::Category(_) => ApplyType::Categories,
            Self::Supplier(_) => ApplyType::Suppliers,
            Self::Pet(_) => ApplyType::Pets,
            Self::Product(_) => ApplyType::Products,
        }
    }

    /// The identifier of the targeted entity.
    #[must_use]
    pub const fn id(&self) -> &ExternalId {
        match self {
            Self::Category(id) | Self::Supplier(id) | Self::Pet(id) | Self::Product(id) => id,
        }
    }
}

/// A single eligibility restriction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Eligibility {
    Role(CustomerRole),
    User(ExternalId),
}

impl Eligibility {
    /// The eligibility type this restriction belongs to.
    #[must_use]
    pub const fn eligibility_type(&self) -> EligibilityType {
        match self {
            Self::Role(_) => EligibilityType::Role,
            Self::User(_) => EligibilityType::User,
        }
    }

    /// The stored value: the role tag or the customer identifier.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Role(role) => role.as_str(),
            Self::User(id) => id.as_str(),
        }
    }
}

/// The full target set of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSet {
    apply_type: ApplyType,
    ids: BTreeSet<ExternalId>,
}

impl TargetSet {
    /// Create a target set. Duplicate identifiers collapse.
    pub fn new(apply_type: ApplyType, ids: impl IntoIterator<Item = ExternalId>) -> Self {
        Self {
            apply_type,
            ids: ids.into_iter().collect(),
        }
    }

    #[must_use]
    pub const fn apply_type(&self) -> ApplyType {
        self.apply_type
    }

    #[must_use]
    pub const fn ids(&self) -> &BTreeSet<ExternalId> {
        &self.ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterate the members as tagged targets.
    pub fn targets(&self) -> impl Iterator<Item = Target> + '_ {
        self.ids
            .iter()
            .map(|id| Target::new(self.apply_type, id.clone()))
    }
}

/// The full eligibility set of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilitySet {
    eligibility_type: EligibilityType,
    members: BTreeSet<Eligibility>,
}

impl EligibilitySet {
    /// Everyone is eligible.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            eligibility_type: EligibilityType::All,
            members: BTreeSet::new(),
        }
    }

    /// Customers holding any of the given roles.
    pub fn roles(roles: impl IntoIterator<Item = CustomerRole>) -> Self {
        Self {
            eligibility_type: EligibilityType::Role,
            members: roles.into_iter().map(Eligibility::Role).collect(),
        }
    }

    /// The given customers.
    pub fn users(ids: impl IntoIterator<Item = ExternalId>) -> Self {
        Self {
            eligibility_type: EligibilityType::User,
            members: ids.into_iter().map(Eligibility::User).collect(),
        }
    }

    /// Build a set from already decoded members.
    ///
    /// # Errors
    ///
    /// Returns the first member whose type is not `eligibility_type`.
    pub fn from_members(
        eligibility_type: EligibilityType,
        members: impl IntoIterator<Item = Eligibility>,
    ) -> Result<Self, Eligibility> {
        let members: BTreeSet<Eligibility> = members.into_iter().collect();

        if let Some(stray) = members
            .iter()
            .find(|member| member.eligibility_type() != eligibility_type)
        {
            return Err(stray.clone());
        }

        Ok(Self {
            eligibility_type,
            members,
        })
    }

    #[must_use]
    pub const fn eligibility_type(&self) -> EligibilityType {
        self.eligibility_type
    }

    #[must_use]
    pub const fn members(&self) -> &BTreeSet<Eligibility> {
        &self.members
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Stored values of the members, sorted.
    pub fn values(&self) -> impl Iterator<Item = &str> + '_ {
        self.members.iter().map(Eligibility::value)
    }
}

impl Default for EligibilitySet {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn id(s: &str) -> ExternalId {
        ExternalId::parse(s).unwrap()
    }

    #[test]
    fn test_target_kind_follows_apply_type() {
        for apply_type in ApplyType::ALL {
            let target = Target::new(*apply_type, id("x"));
            assert_eq!(target.apply_type(), *apply_type);
            assert_eq!(target.id().as_str(), "x");
        }
    }

    #[test]
    fn test_same_id_under_different_kinds_is_different_target() {
        assert_ne!(
            Target::new(ApplyType::Categories, id("x")),
            Target::new(ApplyType::Products, id("x"))
        );
    }

    #[test]
    fn test_target_set_deduplicates() {
        let set = TargetSet::new(ApplyType::Pets, [id("dog"), id("cat"), id("dog")]);
        assert_eq!(set.len(), 2);
        let targets: Vec<_> = set.targets().collect();
        assert_eq!(targets, vec![Target::Pet(id("cat")), Target::Pet(id("dog"))]);
    }

    #[test]
    fn test_eligibility_all_is_empty() {
        let set = EligibilitySet::all();
        assert!(set.is_empty());
        assert_eq!(set.eligibility_type(), EligibilityType::All);
        assert_eq!(EligibilitySet::default(), set);
    }

    #[test]
    fn test_eligibility_values() {
        let roles = EligibilitySet::roles([CustomerRole::Wholesale, CustomerRole::Member]);
        let values: Vec<_> = roles.values().collect();
        assert_eq!(values, vec!["member", "wholesale"]);

        let users = EligibilitySet::users([id("u-2"), id("u-1")]);
        assert_eq!(users.eligibility_type(), EligibilityType::User);
        let values: Vec<_> = users.values().collect();
        assert_eq!(values, vec!["u-1", "u-2"]);
    }

    #[test]
    fn test_from_members_rejects_mixed_types() {
        let set = EligibilitySet::from_members(
            EligibilityType::Role,
            [Eligibility::Role(CustomerRole::Member)],
        )
        .unwrap();
        assert_eq!(set, EligibilitySet::roles([CustomerRole::Member]));

        let stray = EligibilitySet::from_members(
            EligibilityType::Role,
            [
                Eligibility::Role(CustomerRole::Member),
                Eligibility::User(id("u-1")),
            ],
        )
        .unwrap_err();
        assert_eq!(stray, Eligibility::User(id("u-1")));

        assert!(
            EligibilitySet::from_members(EligibilityType::All, [])
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_target_serializes_as_tagged_union() {
        let json = serde_json::to_value(Target::Supplier(id("acme"))).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "supplier", "id": "acme"}));
    }
}
