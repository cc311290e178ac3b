//! Dimension model and reference resolution.
//!
//! A dimension is one axis of the usage data (platform, date, a custom
//! report-type slot). References come in two kinds:
//!
//! * *implicit* — a well-known built-in name (`platform`, `date`, ...);
//!   everything about it is deduced from a static table.
//! * *explicit* — a `dim<N>` reference into the owning report type's
//!   sorted slot list; metadata comes from the slot record.
//!
//! An explicit reference can only be resolved when exactly one report type
//! is in play. With zero or several active report types the slot definition
//! is ambiguous and resolution yields a bare dimension carrying just the
//! reference, which callers render as a fallback label.

use std::collections::HashMap;

use crate::report_type::{DimensionSlot, ReportType};
use crate::types::DbId;

/// Reference prefix of explicit dimensions.
const EXPLICIT_PREFIX: &str = "dim";

/// Slot value-type code whose raw values are ids needing label translation.
pub const TYPE_CODE_MAPPED: i32 = 2;

/// Built-in implicit dimensions as `(short_name, translation key)` pairs.
pub const IMPLICIT_DIMENSIONS: &[(&str, &str)] = &[
    ("organization", "organization"),
    ("platform", "labels.platform"),
    ("target", "labels.title"),
    ("metric", "labels.metric"),
    ("date", "labels.year_and_month"),
    ("date__year", "labels.year"),
];

/// True iff `name` is an explicit slot reference (`dim` + digits).
pub fn is_name_explicit(name: &str) -> bool {
    match name.strip_prefix(EXPLICIT_PREFIX) {
        Some(rest) => !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Zero-based slot index of an explicit reference (`dim1` → 0).
///
/// Returns `None` for implicit references and for `dim0`, which has no
/// corresponding slot.
pub fn explicit_index(name: &str) -> Option<usize> {
    let rest = name.strip_prefix(EXPLICIT_PREFIX)?;
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let slot: usize = rest.parse().ok()?;
    slot.checked_sub(1)
}

/// One resolved (or bare) dimension.
///
/// Immutable once constructed; each report owns its dimensions exclusively.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    /// How the dimension is referred to in report configs and queries.
    pub ref_name: String,
    pub short_name: String,
    /// Translation key for the display name (implicit dimensions only).
    pub name_key: Option<String>,
    /// Slot value-type code (explicit dimensions only).
    pub type_code: Option<i32>,
    /// Backing record id (explicit dimensions only).
    pub pk: Option<DbId>,
    /// Localized names keyed by locale (explicit dimensions only).
    pub names: HashMap<String, String>,
}

impl Dimension {
    /// A bare dimension carrying only its reference. Produced when an
    /// explicit reference cannot be disambiguated or an implicit name is
    /// unknown.
    pub fn bare(ref_name: &str) -> Self {
        Self {
            ref_name: ref_name.to_string(),
            short_name: String::new(),
            name_key: None,
            type_code: None,
            pk: None,
            names: HashMap::new(),
        }
    }

    /// Build from the static built-in table. Unknown names yield a
    /// dimension with `ref_name`/`short_name` set but no translation key.
    pub fn from_implicit(ref_name: &str) -> Self {
        let name_key = IMPLICIT_DIMENSIONS
            .iter()
            .find(|(short, _)| *short == ref_name)
            .map(|(_, key)| (*key).to_string());
        Self {
            ref_name: ref_name.to_string(),
            short_name: ref_name.to_string(),
            name_key,
            type_code: None,
            pk: None,
            names: HashMap::new(),
        }
    }

    /// Build from a report type's slot record.
    pub fn from_slot(ref_name: &str, slot: &DimensionSlot) -> Self {
        Self {
            ref_name: ref_name.to_string(),
            short_name: slot.short_name.clone(),
            name_key: None,
            type_code: slot.type_code,
            pk: Some(slot.pk),
            names: slot.localized_names(),
        }
    }

    pub fn is_explicit(&self) -> bool {
        is_name_explicit(&self.ref_name)
    }

    /// Whether raw values of this dimension are ids that must go through
    /// the id-to-label translator.
    ///
    /// Explicit dimensions are mapped when their slot type code is the
    /// mapped code (2). Implicit dimensions are mapped unless they are
    /// date-based.
    pub fn is_mapped(&self) -> bool {
        if self.is_explicit() {
            self.type_code == Some(TYPE_CODE_MAPPED)
        } else {
            !self.ref_name.starts_with("date")
        }
    }

    /// Display name for a locale.
    ///
    /// Prefers an exact localized name, then the translated `name_key`,
    /// and falls back to `short_name`.
    pub fn display_name(&self, locale: &str, translate: impl Fn(&str) -> String) -> String {
        if let Some(name) = self.names.get(locale) {
            return name.clone();
        }
        if let Some(key) = &self.name_key {
            return translate(key);
        }
        self.short_name.clone()
    }
}

/// Resolve an explicit `dim<N>` reference against the active report types.
///
/// Requires exactly one active report type with a slot at the referenced
/// index; with zero or several report types the slot definition is
/// ambiguous and the result is a bare dimension.
pub fn resolve_explicit(ref_name: &str, report_types: &[ReportType]) -> Dimension {
    if let Some(index) = explicit_index(ref_name) {
        if let [report_type] = report_types {
            if let Some(slot) = report_type.slot(index) {
                return Dimension::from_slot(ref_name, slot);
            }
        }
    }
    Dimension::bare(ref_name)
}

/// Resolve a dimension reference, dispatching on the `dim<N>` naming
/// convention.
pub fn resolve(ref_name: &str, report_types: &[ReportType]) -> Dimension {
    if is_name_explicit(ref_name) {
        resolve_explicit(ref_name, report_types)
    } else {
        Dimension::from_implicit(ref_name)
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
