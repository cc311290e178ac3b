//! Wire records for backend report types.
//!
//! A report type describes the schema of one class of usage report: which
//! explicit dimension slots (`dim1`..`dimN`) exist, and what each slot is
//! called per locale. Slot records carry their localized names as flat
//! `name_<locale>` fields, which are collected from the flattened remainder
//! of the payload.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::DbId;

/// Field prefix under which a slot record carries its localized names.
const NAME_FIELD_PREFIX: &str = "name_";

/// One explicit dimension slot of a report type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DimensionSlot {
    pub pk: DbId,
    pub short_name: String,

    /// Value-type code of the slot. Code 2 marks values that must be
    /// translated through the id-to-label lookup.
    #[serde(rename = "type")]
    pub type_code: Option<i32>,

    /// Remaining payload fields, including the `name_<locale>` entries.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl DimensionSlot {
    /// Extract the locale→name map from the `name_<locale>` fields.
    ///
    /// Non-string values under a `name_` key are skipped.
    pub fn localized_names(&self) -> HashMap<String, String> {
        self.extra
            .iter()
            .filter_map(|(key, value)| {
                let locale = key.strip_prefix(NAME_FIELD_PREFIX)?;
                let name = value.as_str()?;
                Some((locale.to_string(), name.to_string()))
            })
            .collect()
    }
}

/// A backend report-type record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportType {
    pub pk: DbId,
    pub short_name: String,
    #[serde(default)]
    pub name: Option<String>,

    /// Explicit dimension slots in slot order (`dim1` is index 0).
    #[serde(default)]
    pub dimensions_sorted: Vec<DimensionSlot>,
}

impl ReportType {
    /// Slot record at a zero-based explicit index, if the slot exists.
    pub fn slot(&self, index: usize) -> Option<&DimensionSlot> {
        self.dimensions_sorted.get(index)
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
