//! Built-in mesonet reference tables: which fields to request, which are required,
//! and the cleanup each table needs after collapse.

use crate::catalog::TableAlias;
use crate::normalize::NormalizeOptions;
use crate::pipeline::IngestRequest;
use crate::rules::PostRule;

pub const REQ_STATION_FIELDS: [&str; 7] = ["station", "name", "status", "date_installed", "latitude", "longitude", "elevation"];

pub const ELEMENT_FIELDS: [&str; 9] = [
    "element", "public", "description", "description_short", "zentra_name", "ace_name", "base_units", "us_units", "usace_units",
];

pub const DEPLOYMENT_FIELDS: [&str; 8] = ["station_key", "serial_number", "model", "port", "sdi12_address", "elevation_cm", "date_start", "date_end"];

pub const MODEL_ELEMENT_FIELDS: [&str; 11] = [
    "model", "element", "range_min", "range_max", "step_size", "persistence_delta", "spatial_sd", "flag_min", "flag_max", "shared_sensor", "like_element",
];

pub const BUILTIN_TABLES: [&str; 4] = ["stations", "elements", "deployments", "model_elements"];

/// Request and normalization settings for one logical table.
#[derive(Clone, Debug, PartialEq)]
pub struct TableProfile {
    pub table: String,
    /// Field allow-list sent to the server; `None` retrieves every field.
    pub fields: Option<Vec<String>>,
    pub normalize: NormalizeOptions,
}

fn owned(names: &[&str]) -> Vec<String> { names.iter().map(|s| s.to_string()).collect() }

impl TableProfile {
    /// Stations keep their core columns; `additional` fields are fetched alongside and are the
    /// only ones kept in the extra bag. Without them, every field is fetched and kept.
    pub fn stations(additional: Option<Vec<String>>) -> Self {
        let required = owned(&REQ_STATION_FIELDS);
        let (fields, normalize) = match additional {
            Some(extra) => {
                let mut fields = required.clone();
                fields.extend(extra.iter().cloned());
                (Some(fields), NormalizeOptions::new(required).with_extra_allow(extra))
            }
            None => (None, NormalizeOptions::new(required)),
        };
        Self { table: "stations".into(), fields, normalize }
    }

    pub fn elements() -> Self {
        let fields = owned(&ELEMENT_FIELDS);
        let rules = vec![
            PostRule::strip("element", "_{elevation_cm}"),
            PostRule::strip("description_short", "@ {elevation_cm}"),
            PostRule::strip("description", "at {elevation_cm}"),
        ];
        Self { table: "elements".into(), normalize: NormalizeOptions::new(fields.clone()).with_rules(rules), fields: Some(fields) }
    }

    pub fn deployments() -> Self {
        let fields = owned(&DEPLOYMENT_FIELDS);
        let rules = vec![PostRule::date("date_start"), PostRule::date("date_end")];
        Self { table: "deployments".into(), normalize: NormalizeOptions::new(fields.clone()).with_rules(rules), fields: Some(fields) }
    }

    pub fn model_elements() -> Self {
        let fields = owned(&MODEL_ELEMENT_FIELDS);
        let rules = vec![PostRule::strip("element", "_{elevation_cm}")];
        Self { table: "model_elements".into(), normalize: NormalizeOptions::new(fields.clone()).with_rules(rules), fields: Some(fields) }
    }

    /// Look up a built-in profile by logical name. `additional` only applies to stations.
    pub fn builtin(table: &str, additional: Option<Vec<String>>) -> Option<Self> {
        match table {
            "stations" => Some(Self::stations(additional)),
            "elements" => Some(Self::elements()),
            "deployments" => Some(Self::deployments()),
            "model_elements" => Some(Self::model_elements()),
            _ => None,
        }
    }

    /// Built-in profile for a catalog entry, matched on its name, then short name, then id.
    pub fn for_alias(alias: &TableAlias, additional: Option<Vec<String>>) -> Option<Self> {
        [&alias.name, &alias.short_name, &alias.id]
            .into_iter()
            .find(|k| BUILTIN_TABLES.contains(&k.as_str()))
            .and_then(|k| Self::builtin(k, additional))
    }

    pub fn into_request(self, formula: Option<String>) -> IngestRequest {
        IngestRequest { table: self.table, fields: self.fields, formula, normalize: self.normalize }
    }
}
