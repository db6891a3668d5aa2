//! Discriminator registry.
//!
//! Maps each apply type and eligibility type to where its association rows
//! live and how a stored row is turned back into a typed association. Every
//! lookup is an exhaustive match over a closed enum; a tag read back from
//! storage that no variant claims is an error, not a default.

use crate::types::{
    ApplyType, CustomerRole, Eligibility, EligibilityType, ExternalId, ExternalIdError, Target,
    UnknownTag,
};

/// Physical layout of one association dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociationTable {
    /// Fully qualified table name.
    pub table: &'static str,
    /// Column holding the row kind tag.
    pub kind_column: &'static str,
    /// Column holding the target identifier or eligibility value.
    pub value_column: &'static str,
}

/// Rows linking rules to the entities they apply to.
pub const TARGET_TABLE: AssociationTable = AssociationTable {
    table: "admin.rule_targets",
    kind_column: "target_kind",
    value_column: "target_id",
};

/// Rows restricting who a rule applies to.
pub const ELIGIBILITY_TABLE: AssociationTable = AssociationTable {
    table: "admin.rule_eligibility",
    kind_column: "eligibility_kind",
    value_column: "value",
};

/// A stored association row that could not be decoded.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    /// The row's value does not belong to the closed set for its kind.
    #[error(transparent)]
    UnknownTag(#[from] UnknownTag),

    /// The row's identifier is malformed.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] ExternalIdError),
}

/// Everything needed to read and write one discriminator's rows.
#[derive(Debug)]
pub struct Binding<T> {
    /// Table the rows live in.
    pub table: &'static AssociationTable,
    /// Value of the kind column for rows of this discriminator.
    pub row_tag: &'static str,
    build: fn(&str) -> Result<T, RowError>,
}

impl<T> Binding<T> {
    /// Decode a stored value into a typed association.
    ///
    /// # Errors
    ///
    /// Returns [`RowError`] if the value is not valid for this discriminator.
    pub fn extract(&self, value: &str) -> Result<T, RowError> {
        (self.build)(value)
    }
}

/// Binding for the target rows of an apply type.
#[must_use]
pub fn target_binding(apply_type: ApplyType) -> Binding<Target> {
    let (row_tag, build): (&'static str, fn(&str) -> Result<Target, RowError>) = match apply_type
    {
        ApplyType::Categories => ("category", |v| Ok(Target::Category(ExternalId::parse(v)?))),
        ApplyType::Suppliers => ("supplier", |v| Ok(Target::Supplier(ExternalId::parse(v)?))),
        ApplyType::Pets => ("pet", |v| Ok(Target::Pet(ExternalId::parse(v)?))),
        ApplyType::Products => ("product", |v| Ok(Target::Product(ExternalId::parse(v)?))),
    };

    Binding {
        table: &TARGET_TABLE,
        row_tag,
        build,
    }
}

/// Binding for the eligibility rows of an eligibility type.
///
/// Returns `None` for [`EligibilityType::All`], which stores no rows.
#[must_use]
pub fn eligibility_binding(eligibility_type: EligibilityType) -> Option<Binding<Eligibility>> {
    let (row_tag, build): (&'static str, fn(&str) -> Result<Eligibility, RowError>) =
        match eligibility_type {
            EligibilityType::Role => ("role", |v| {
                Ok(Eligibility::Role(v.parse::<CustomerRole>()?))
            }),
            EligibilityType::User => ("user", |v| Ok(Eligibility::User(ExternalId::parse(v)?))),
            EligibilityType::All => return None,
        };

    Some(Binding {
        table: &ELIGIBILITY_TABLE,
        row_tag,
        build,
    })
}

/// Resolve a stored target row kind back to its apply type.
///
/// # Errors
///
/// Returns [`UnknownTag`] for a kind no apply type writes.
pub fn apply_type_for_row_tag(row_tag: &str) -> Result<ApplyType, UnknownTag> {
    ApplyType::ALL
        .iter()
        .copied()
        .find(|apply_type| target_binding(*apply_type).row_tag == row_tag)
        .ok_or_else(|| UnknownTag::new("target row kind", row_tag))
}
