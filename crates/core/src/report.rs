//! Flexible report model: the query specification a user builds over the
//! usage data.
//!
//! A report aggregates a primary dimension, a set of report types (acting
//! as an implicit filter), value/date/tag filters, grouping, ordering, and
//! tag-rollup options. It is populated either interactively or from a
//! persisted config blob via [`FlexiReport::apply_config`], and serialized
//! into the query-parameter object the reporting endpoints consume via
//! [`FlexiReport::url_params`].
//!
//! Loading a persisted config is split in two: extracting and fetching the
//! referenced report types is async work that lives in the client crate;
//! everything after that point is pure and happens here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::dimension::{resolve, Dimension};
use crate::report_type::ReportType;
use crate::serialization::encode;
use crate::types::DbId;

/// Reserved filter dimension name carrying the report-type id list.
pub const REPORT_TYPE_FILTER: &str = "report_type";

/// Filter-map key prefix for tag filters.
pub const TAG_FILTER_PREFIX: &str = "tag__";

/* --------------------------------------------------------------------------
Stored config blob
-------------------------------------------------------------------------- */

/// One filter entry of a persisted report config.
///
/// An entry carries exactly one of `values`, `start`/`end`, or `tag_ids`;
/// the deserializer tolerates records where the unused fields are absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoredFilter {
    pub dimension: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<Vec<DbId>>,
}

/// Persisted report configuration as stored by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReportConfig {
    #[serde(default)]
    pub filters: Vec<StoredFilter>,
    pub primary_dimension: String,
    #[serde(default)]
    pub group_by: Vec<String>,
    /// Already in wire form (`-` prefix for descending).
    #[serde(default)]
    pub order_by: Vec<String>,
    /// Storage allows a list; only the first element is used.
    #[serde(default)]
    pub split_by: Vec<String>,
    #[serde(default)]
    pub zero_rows: bool,
    #[serde(default)]
    pub tag_roll_up: bool,
    #[serde(default)]
    pub tag_class: Option<DbId>,
}

impl ReportConfig {
    /// Ids listed by the reserved `report_type` filter entry, if present.
    ///
    /// These must be resolved to report-type records before any explicit
    /// dimension reference in the config can be decoded.
    pub fn report_type_ids(&self) -> Vec<DbId> {
        self.filters
            .iter()
            .find(|f| f.dimension == REPORT_TYPE_FILTER)
            .and_then(|f| f.values.as_ref())
            .map(|values| values.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default()
    }
}

/* --------------------------------------------------------------------------
Filters and ordering
-------------------------------------------------------------------------- */

/// The value side of a resolved filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterPayload {
    /// A plain list of accepted values.
    Values(Vec<Value>),
    /// A date range.
    Range {
        start: Option<String>,
        end: Option<String>,
    },
    /// A set of tag ids; rolled up separately from plain values.
    Tags(Vec<DbId>),
}

/// A resolved filter: dimension plus its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterEntry {
    pub dimension: Dimension,
    pub payload: FilterPayload,
}

impl FilterEntry {
    fn from_stored(stored: &StoredFilter, report_types: &[ReportType]) -> Self {
        let payload = if let Some(values) = &stored.values {
            FilterPayload::Values(values.clone())
        } else if stored.start.is_some() || stored.end.is_some() {
            FilterPayload::Range {
                start: stored.start.clone(),
                end: stored.end.clone(),
            }
        } else if let Some(tag_ids) = &stored.tag_ids {
            FilterPayload::Tags(tag_ids.clone())
        } else {
            FilterPayload::Values(Vec::new())
        };
        Self {
            dimension: resolve(&stored.dimension, report_types),
            payload,
        }
    }
}

/// One ordering term: a field name plus direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl OrderBy {
    /// Parse the wire form (`-date` is descending by date).
    pub fn parse(term: &str) -> Self {
        match term.strip_prefix('-') {
            Some(field) => Self {
                field: field.to_string(),
                descending: true,
            },
            None => Self {
                field: term.to_string(),
                descending: false,
            },
        }
    }

    /// Wire form of the term.
    pub fn to_wire(&self) -> String {
        if self.descending {
            format!("-{}", self.field)
        } else {
            self.field.clone()
        }
    }
}

/* --------------------------------------------------------------------------
Access control
-------------------------------------------------------------------------- */

/// Derived access level of a report. Exactly one holds at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    /// Owned by a single user.
    User,
    /// Owned by an organization.
    Org,
    /// System-wide (no owner).
    Sys,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::User => "user",
            AccessLevel::Org => "org",
            AccessLevel::Sys => "sys",
        }
    }

    /// Display icon for the level.
    pub fn icon(&self) -> &'static str {
        match self {
            AccessLevel::User => "fa-user",
            AccessLevel::Org => "fa-university",
            AccessLevel::Sys => "fa-globe",
        }
    }
}

/// The caller identity `can_edit` evaluates against.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    pub pk: DbId,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub is_from_master_organization: bool,
}

/// Per-organization membership flags of the caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganizationRole {
    #[serde(default)]
    pub is_admin: bool,
}

/* --------------------------------------------------------------------------
FlexiReport
-------------------------------------------------------------------------- */

/// A user-defined, persisted query specification over usage data.
#[derive(Debug, Clone, Default)]
pub struct FlexiReport {
    /// Backend id; `None` until first saved.
    pub pk: Option<DbId>,
    pub name: String,
    pub owner: Option<DbId>,
    pub owner_organization: Option<DbId>,

    pub primary_dimension: Option<Dimension>,
    /// Resolved report types; also act as an implicit filter.
    pub report_types: Vec<ReportType>,
    pub filters: Vec<FilterEntry>,
    pub group_by: Vec<Dimension>,
    pub order_by: Vec<OrderBy>,
    /// A single split dimension; storage allows a list but only the first
    /// element is honored.
    pub split_by: Option<Dimension>,

    pub include_zero_rows: bool,
    pub tag_roll_up: bool,
    pub tag_class: Option<DbId>,
}

impl FlexiReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derived access level: owner wins over owning organization, and a
    /// report with neither is system-wide.
    pub fn access_level(&self) -> AccessLevel {
        if self.owner.is_some() {
            AccessLevel::User
        } else if self.owner_organization.is_some() {
            AccessLevel::Org
        } else {
            AccessLevel::Sys
        }
    }

    /// Whether `user` may edit this report.
    ///
    /// True for the owner, for superusers and master-organization users,
    /// and for admins of the owning organization, checked in that order.
    pub fn can_edit(&self, user: &User, organizations: &HashMap<DbId, OrganizationRole>) -> bool {
        if self.owner == Some(user.pk) {
            return true;
        }
        if user.is_superuser || user.is_from_master_organization {
            return true;
        }
        if let Some(org_id) = self.owner_organization {
            if let Some(role) = organizations.get(&org_id) {
                return role.is_admin;
            }
        }
        false
    }

    /// Apply a persisted config. The report types referenced by the
    /// config's reserved filter must already be resolved; explicit
    /// dimension lookup depends on them.
    pub fn apply_config(&mut self, config: &ReportConfig, report_types: Vec<ReportType>) {
        self.report_types = report_types;
        self.primary_dimension = Some(resolve(&config.primary_dimension, &self.report_types));
        self.filters = config
            .filters
            .iter()
            .filter(|f| f.dimension != REPORT_TYPE_FILTER)
            .map(|f| FilterEntry::from_stored(f, &self.report_types))
            .collect();
        self.group_by = config
            .group_by
            .iter()
            .map(|name| resolve(name, &self.report_types))
            .collect();
        self.order_by = config.order_by.iter().map(|t| OrderBy::parse(t)).collect();
        self.split_by = config
            .split_by
            .first()
            .map(|name| resolve(name, &self.report_types));
        self.include_zero_rows = config.zero_rows;
        self.tag_roll_up = config.tag_roll_up;
        self.tag_class = config.tag_class;
    }

    /// The filters map keyed by dimension reference, with the resolved
    /// report-type ids force-set under the reserved key.
    fn filters_map(&self, filter_override: Option<&Map<String, Value>>) -> Map<String, Value> {
        let mut filters = Map::new();
        for entry in &self.filters {
            let ref_name = &entry.dimension.ref_name;
            match &entry.payload {
                FilterPayload::Values(values) => {
                    filters.insert(ref_name.clone(), Value::Array(values.clone()));
                }
                FilterPayload::Range { start, end } => {
                    filters.insert(ref_name.clone(), json!({"start": start, "end": end}));
                }
                FilterPayload::Tags(tag_ids) => {
                    filters.insert(format!("{TAG_FILTER_PREFIX}{ref_name}"), json!(tag_ids));
                }
            }
        }
        let report_type_ids: Vec<DbId> = self.report_types.iter().map(|rt| rt.pk).collect();
        filters.insert(REPORT_TYPE_FILTER.to_string(), json!(report_type_ids));
        if let Some(overrides) = filter_override {
            for (key, value) in overrides {
                filters.insert(key.clone(), value.clone());
            }
        }
        filters
    }

    /// Produce the query-parameter object the reporting endpoints consume.
    ///
    /// `filters`, `groups`, and `split_by` travel as codec-encoded tokens;
    /// `primary_dimension` and `order_by` are plain strings; the scalar
    /// extras pass verbatim. An optional `filter_override` is shallow-merged
    /// on top of the filters map, override winning key-for-key.
    pub fn url_params(&self, filter_override: Option<&Map<String, Value>>) -> Map<String, Value> {
        let filters = self.filters_map(filter_override);
        let groups: Vec<&str> = self
            .group_by
            .iter()
            .map(|d| d.ref_name.as_str())
            .collect();
        let order_by: Vec<String> = self.order_by.iter().map(OrderBy::to_wire).collect();

        let mut params = Map::new();
        params.insert(
            "primary_dimension".to_string(),
            self.primary_dimension
                .as_ref()
                .map(|d| Value::String(d.ref_name.clone()))
                .unwrap_or(Value::Null),
        );
        params.insert(
            "filters".to_string(),
            Value::String(encode(&Value::Object(filters))),
        );
        params.insert("groups".to_string(), Value::String(encode(&json!(groups))));
        params.insert(
            "split_by".to_string(),
            self.split_by
                .as_ref()
                .map(|d| Value::String(encode(&json!(d.ref_name))))
                .unwrap_or(Value::Null),
        );
        params.insert("order_by".to_string(), json!(order_by.join(";")));
        params.insert("zero_rows".to_string(), json!(self.include_zero_rows));
        params.insert("tag_roll_up".to_string(), json!(self.tag_roll_up));
        params.insert("tag_class".to_string(), json!(self.tag_class));
        params
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
