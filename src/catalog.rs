//! Schema catalog: the alias table mapping logical table names to the physical
//! identifiers the remote API uses, plus the API base URL and base (container) id.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IngestError, IngestResult};

/// Three synonyms for one physical table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableAlias {
    pub name: String,
    pub short_name: String,
    pub id: String,
}

impl TableAlias {
    #[inline]
    fn matches(&self, key: &str) -> bool {
        self.name == key || self.short_name == key || self.id == key
    }
}

/// Immutable catalog built once per pipeline invocation from a descriptor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchemaCatalog {
    #[serde(rename = "api_url")]
    api_base_url: String,
    #[serde(rename = "base_id")]
    container_id: String,
    tables: Vec<TableAlias>,
}

/// Where one physical table lives on the remote API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableLocation {
    pub api_base_url: String,
    pub container_id: String,
    pub table_id: String,
}

impl TableLocation {
    pub fn new<A: Into<String>, B: Into<String>, C: Into<String>>(api_base_url: A, container_id: B, table_id: C) -> Self {
        Self { api_base_url: api_base_url.into(), container_id: container_id.into(), table_id: table_id.into() }
    }

    /// `{api_base_url}{container_id}/{table_id}`; the base URL carries its own trailing slash.
    pub fn url(&self) -> String {
        format!("{}{}/{}", self.api_base_url, self.container_id, self.table_id)
    }
}

impl SchemaCatalog {
    pub fn new<A: Into<String>, B: Into<String>>(api_base_url: A, container_id: B, tables: Vec<TableAlias>) -> IngestResult<Self> {
        let catalog = Self { api_base_url: api_base_url.into(), container_id: container_id.into(), tables };
        catalog.validate("<inline>")?;
        Ok(catalog)
    }

    pub fn from_json_str(text: &str) -> IngestResult<Self> {
        Self::parse(text, "<inline>")
    }

    /// Read a descriptor file. The path is always explicit; there is no default location here.
    pub fn load(path: &Path) -> IngestResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| IngestError::descriptor(path.display(), e.to_string()))?;
        let catalog = Self::parse(&text, &path.display().to_string())?;
        debug!(target: "mesonet_ingest::catalog", path=%path.display(), tables=catalog.tables.len(), "schema catalog loaded");
        Ok(catalog)
    }

    fn parse(text: &str, origin: &str) -> IngestResult<Self> {
        let catalog: SchemaCatalog = serde_json::from_str(text)
            .map_err(|e| IngestError::descriptor(origin, e.to_string()))?;
        catalog.validate(origin)?;
        Ok(catalog)
    }

    fn validate(&self, origin: &str) -> IngestResult<()> {
        if self.tables.is_empty() {
            return Err(IngestError::descriptor(origin, "descriptor lists no tables"));
        }
        Ok(())
    }

    /// First alias (in catalog order) whose name, short name or id equals `key` wins.
    pub fn alias(&self, key: &str) -> IngestResult<&TableAlias> {
        self.tables.iter().find(|t| t.matches(key)).ok_or_else(|| IngestError::AliasNotFound(key.to_string()))
    }

    pub fn resolve(&self, key: &str) -> IngestResult<&str> {
        self.alias(key).map(|t| t.id.as_str())
    }

    pub fn location(&self, key: &str) -> IngestResult<TableLocation> {
        let id = self.resolve(key)?;
        Ok(TableLocation::new(self.api_base_url.as_str(), self.container_id.as_str(), id))
    }

    pub fn api_base_url(&self) -> &str { &self.api_base_url }

    pub fn container_id(&self) -> &str { &self.container_id }

    pub fn aliases(&self) -> &[TableAlias] { &self.tables }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alias(name: &str, short: &str, id: &str) -> TableAlias {
        TableAlias { name: name.into(), short_name: short.into(), id: id.into() }
    }

    fn sample() -> SchemaCatalog {
        SchemaCatalog::new(
            "https://x/",
            "base1",
            vec![alias("stations", "st", "tbl1"), alias("elements", "el", "tbl2"), alias("deployments", "dep", "tbl3")],
        )
        .unwrap()
    }

    #[test]
    fn resolves_every_synonym() {
        let cat = sample();
        for t in cat.aliases() {
            for key in [&t.name, &t.short_name, &t.id] {
                assert_eq!(cat.resolve(key).unwrap(), t.id);
            }
        }
    }

    #[test]
    fn alias_returns_the_whole_entry() {
        let cat = sample();
        let a = cat.alias("el").unwrap();
        assert_eq!(a, &alias("elements", "el", "tbl2"));
        assert_eq!(cat.alias("tbl3").unwrap().name, "deployments");
        assert_eq!(cat.alias("nope").unwrap_err().code_str(), "alias_not_found");
    }

    #[test]
    fn unknown_key_reports_searched_value() {
        let cat = sample();
        let err = cat.resolve("sensors").unwrap_err();
        match &err {
            IngestError::AliasNotFound(k) => assert_eq!(k, "sensors"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("sensors"));
    }

    #[test]
    fn exact_match_only() {
        let cat = sample();
        assert!(cat.resolve("Stations").is_err());
        assert!(cat.resolve("station").is_err());
        assert!(cat.resolve("").is_err());
    }

    #[test]
    fn first_structural_match_wins() {
        // "dup" is the short name of the first alias and the name of the second
        let cat = SchemaCatalog::new("https://x/", "b", vec![alias("a", "dup", "id_a"), alias("dup", "d", "id_b")]).unwrap();
        assert_eq!(cat.resolve("dup").unwrap(), "id_a");
    }

    #[test]
    fn parses_descriptor_and_builds_location() {
        let text = r#"{
            "api_url": "https://api.airtable.com/v0/",
            "base_id": "appXYZ",
            "tables": [{"name": "stations", "short_name": "st", "id": "tblS"}]
        }"#;
        let cat = SchemaCatalog::from_json_str(text).unwrap();
        assert_eq!(cat.api_base_url(), "https://api.airtable.com/v0/");
        assert_eq!(cat.container_id(), "appXYZ");
        let loc = cat.location("st").unwrap();
        assert_eq!(loc.url(), "https://api.airtable.com/v0/appXYZ/tblS");
    }

    #[test]
    fn rejects_empty_and_malformed_descriptors() {
        let empty = r#"{"api_url": "https://x/", "base_id": "b", "tables": []}"#;
        assert_eq!(SchemaCatalog::from_json_str(empty).unwrap_err().code_str(), "descriptor");

        let missing = r#"{"api_url": "https://x/", "tables": []}"#;
        assert_eq!(SchemaCatalog::from_json_str(missing).unwrap_err().code_str(), "descriptor");
    }

    #[test]
    fn load_names_the_file_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("at_schema.json");
        let err = SchemaCatalog::load(&path).unwrap_err();
        assert!(err.to_string().contains("at_schema.json"));

        std::fs::write(&path, r#"{"api_url":"https://x/","base_id":"b","tables":[{"name":"n","short_name":"s","id":"i"}]}"#).unwrap();
        let cat = SchemaCatalog::load(&path).unwrap();
        assert_eq!(cat.resolve("s").unwrap(), "i");
    }
}
