//! Reshapes raw remote records into a `RowSet`:
//! list collapse, post rules, required/extra partition, required-field validation.

use std::collections::{BTreeMap, HashSet};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{IngestError, IngestResult};
use crate::fetch::RawRecord;
use crate::rows::{NormalizedRow, RowSet, DEFAULT_EXTRA_FIELD};
use crate::rules::{apply_rules, PostRule};

#[derive(Clone, Debug, PartialEq)]
pub struct NormalizeOptions {
    /// Output columns, in order. Every name must be carried by at least one record.
    pub required: Vec<String>,
    /// When set, only these non-required fields are kept in the extra bag.
    pub extra_allow: Option<Vec<String>>,
    pub rules: Vec<PostRule>,
    /// Merge the remote record id into the fields under this name before anything else.
    pub record_id_field: Option<String>,
    pub extra_field: String,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self { required: Vec::new(), extra_allow: None, rules: Vec::new(), record_id_field: None, extra_field: DEFAULT_EXTRA_FIELD.to_string() }
    }
}

impl NormalizeOptions {
    pub fn new<I, S>(required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { required: required.into_iter().map(Into::into).collect(), ..Self::default() }
    }

    pub fn with_extra_allow(mut self, allow: Vec<String>) -> Self { self.extra_allow = Some(allow); self }

    pub fn with_rules(mut self, rules: Vec<PostRule>) -> Self { self.rules = rules; self }

    pub fn with_record_id<S: Into<String>>(mut self, field: S) -> Self { self.record_id_field = Some(field.into()); self }

    pub fn with_extra_field<S: Into<String>>(mut self, field: S) -> Self { self.extra_field = field.into(); self }
}

#[derive(Default)]
struct ColumnShape {
    all_lists: bool,
    max_len: usize,
}

/// Collapse columns whose every non-null value is a list of at most one element.
/// The decision is made once per column over the whole set, so a column keeps one shape.
/// Returns the collapsed column names.
pub fn collapse_list_columns(records: &mut [Map<String, Value>]) -> Vec<String> {
    let mut shapes: BTreeMap<&str, ColumnShape> = BTreeMap::new();
    for rec in records.iter() {
        for (k, v) in rec.iter() {
            let shape = shapes.entry(k.as_str()).or_insert(ColumnShape { all_lists: true, max_len: 0 });
            match v {
                Value::Null => {}
                Value::Array(items) => shape.max_len = shape.max_len.max(items.len()),
                _ => shape.all_lists = false,
            }
        }
    }
    let collapse: Vec<String> = shapes
        .into_iter()
        .filter(|(_, s)| s.all_lists && s.max_len <= 1)
        .map(|(k, _)| k.to_string())
        .collect();

    for rec in records.iter_mut() {
        for name in &collapse {
            if let Some(Value::Array(items)) = rec.get_mut(name) {
                let single = items.pop().unwrap_or(Value::Null);
                rec.insert(name.clone(), single);
            }
        }
    }
    collapse
}

/// Each output column must be named once: no repeats in `required`, and the extra field
/// must not double as a required one.
fn check_columns(opts: &NormalizeOptions) -> IngestResult<()> {
    let mut names: HashSet<&str> = HashSet::new();
    let mut clashes: Vec<String> = Vec::new();
    for name in opts.required.iter().chain(std::iter::once(&opts.extra_field)) {
        if !names.insert(name.as_str()) && !clashes.contains(name) {
            clashes.push(name.clone());
        }
    }
    if clashes.is_empty() { Ok(()) } else { Err(IngestError::DuplicateColumns(clashes)) }
}

/// Turn fetched records into validated rows. All-or-nothing: on any error no rows come back.
pub fn normalize(records: Vec<RawRecord>, opts: &NormalizeOptions) -> IngestResult<RowSet> {
    check_columns(opts)?;

    let mut maps: Vec<Map<String, Value>> = records
        .into_iter()
        .map(|r| {
            let mut fields = r.fields;
            if let Some(id_field) = &opts.record_id_field {
                fields.insert(id_field.clone(), Value::String(r.id));
            }
            fields
        })
        .collect();

    let collapsed = collapse_list_columns(&mut maps);
    if !collapsed.is_empty() {
        debug!(target: "mesonet_ingest::normalize", columns=?collapsed, "collapsed single-valued list columns");
    }

    for m in maps.iter_mut() {
        apply_rules(&opts.rules, m)?;
    }

    let required: HashSet<&str> = opts.required.iter().map(|s| s.as_str()).collect();
    let allow: Option<HashSet<&str>> = opts.extra_allow.as_ref().map(|a| a.iter().map(|s| s.as_str()).collect());
    let mut seen: HashSet<&str> = HashSet::new();

    let mut rows: Vec<NormalizedRow> = Vec::with_capacity(maps.len());
    for mut m in maps {
        let mut values = Vec::with_capacity(opts.required.len());
        for name in &opts.required {
            match m.remove(name) {
                Some(v) => {
                    seen.insert(name.as_str());
                    values.push(v);
                }
                None => values.push(Value::Null),
            }
        }
        let extra: Map<String, Value> = m
            .into_iter()
            .filter(|(k, _)| !required.contains(k.as_str()))
            .filter(|(k, _)| allow.as_ref().map_or(true, |a| a.contains(k.as_str())))
            .collect();
        rows.push(NormalizedRow { values, extra });
    }

    let missing: Vec<String> = opts.required.iter().filter(|n| !seen.contains(n.as_str())).cloned().collect();
    if !missing.is_empty() {
        return Err(IngestError::MissingRequiredFields(missing));
    }

    debug!(target: "mesonet_ingest::normalize", rows=rows.len(), columns=opts.required.len() + 1, "normalized");
    Ok(RowSet::new(opts.required.clone(), opts.extra_field.clone(), rows))
}
