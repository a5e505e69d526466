//! Ingestion entry point: resolve → fetch every page → normalize.

use std::path::Path;

use tracing::info;

use crate::catalog::SchemaCatalog;
use crate::error::IngestResult;
use crate::fetch::fetch_all;
use crate::normalize::{normalize, NormalizeOptions};
use crate::rows::RowSet;
use crate::transport::PageTransport;

#[derive(Clone, Debug, PartialEq)]
pub struct IngestRequest {
    /// Logical table name: any of an alias's name, short name or id.
    pub table: String,
    pub fields: Option<Vec<String>>,
    pub formula: Option<String>,
    pub normalize: NormalizeOptions,
}

impl IngestRequest {
    pub fn new<S: Into<String>>(table: S, normalize: NormalizeOptions) -> Self {
        Self { table: table.into(), fields: None, formula: None, normalize }
    }

    pub fn with_fields(mut self, fields: Vec<String>) -> Self { self.fields = Some(fields); self }

    pub fn with_formula<S: Into<String>>(mut self, formula: S) -> Self { self.formula = Some(formula.into()); self }
}

/// Run one ingestion. Either the full validated row set comes back or an error does.
pub async fn ingest<T: PageTransport>(
    catalog: &SchemaCatalog,
    transport: &T,
    credential: &str,
    req: &IngestRequest,
) -> IngestResult<RowSet> {
    let location = catalog.location(&req.table)?;
    let records = fetch_all(transport, &location, credential, req.fields.as_deref(), req.formula.as_deref()).await?;
    let fetched = records.len();
    let rows = normalize(records, &req.normalize)?;
    info!(target: "mesonet_ingest::pipeline", table=%req.table, physical=%location.table_id, fetched, rows=rows.len(), "ingest complete");
    Ok(rows)
}

/// Same as [`ingest`], loading a fresh catalog from `descriptor` for this call only.
pub async fn ingest_from_descriptor<T: PageTransport>(
    descriptor: &Path,
    transport: &T,
    credential: &str,
    req: &IngestRequest,
) -> IngestResult<RowSet> {
    let catalog = SchemaCatalog::load(descriptor)?;
    ingest(&catalog, transport, credential, req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TableAlias;
    use crate::error::IngestError;
    use crate::transport::{PageRequest, TransportError};
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves fixed pages keyed by the `offset` parameter and counts requests.
    struct TwoPages {
        calls: Mutex<Vec<String>>,
    }

    impl PageTransport for TwoPages {
        async fn get_page(&self, req: &PageRequest) -> Result<String, TransportError> {
            self.calls.lock().unwrap().push(req.full_url());
            let body = match req.params.values("offset").next() {
                None => json!({"records": [
                    {"id": "r1", "fields": {"a": 1, "b": "x"}},
                    {"id": "r2", "fields": {"a": 2, "b": "y"}}
                ], "offset": "off1"}),
                Some("off1") => json!({"records": [{"id": "r3", "fields": {"a": 3, "b": "z"}}]}),
                Some(other) => return Err(TransportError::Other(format!("unknown offset {other}"))),
            };
            Ok(body.to_string())
        }
    }

    fn catalog() -> SchemaCatalog {
        SchemaCatalog::new("https://x/", "base1", vec![TableAlias { name: "Stations".into(), short_name: "st".into(), id: "tbl1".into() }]).unwrap()
    }

    #[tokio::test]
    async fn two_page_scenario() {
        let t = TwoPages { calls: Mutex::new(Vec::new()) };
        let req = IngestRequest::new("st", NormalizeOptions::new(["a"]));
        let rows = ingest(&catalog(), &t, "tok", &req).await.unwrap();

        assert_eq!(
            serde_json::to_value(&rows).unwrap(),
            json!([
                {"a": 1, "extra_data": {"b": "x"}},
                {"a": 2, "extra_data": {"b": "y"}},
                {"a": 3, "extra_data": {"b": "z"}}
            ])
        );
        let calls = t.calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["https://x/base1/tbl1".to_string(), "https://x/base1/tbl1?offset=off1".to_string()]);
    }

    #[tokio::test]
    async fn formula_is_sent_on_first_page_only() {
        let t = TwoPages { calls: Mutex::new(Vec::new()) };
        let req = IngestRequest::new("st", NormalizeOptions::new(["a"])).with_formula("{a}>0");
        assert_eq!(req.formula.as_deref(), Some("{a}>0"));
        let rows = ingest(&catalog(), &t, "tok", &req).await.unwrap();
        assert_eq!(rows.len(), 3);

        let calls = t.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], "https://x/base1/tbl1?filterByFormula=%7Ba%7D%3E0");
        assert_eq!(calls[1], "https://x/base1/tbl1?offset=off1");
    }

    #[tokio::test]
    async fn unknown_table_never_touches_transport() {
        let t = TwoPages { calls: Mutex::new(Vec::new()) };
        let req = IngestRequest::new("sensors", NormalizeOptions::new(["a"]));
        let err = ingest(&catalog(), &t, "tok", &req).await.unwrap_err();
        assert!(matches!(err, IngestError::AliasNotFound(ref k) if k == "sensors"));
        assert!(t.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_required_field_fails_whole_ingest() {
        let t = TwoPages { calls: Mutex::new(Vec::new()) };
        let req = IngestRequest::new("tbl1", NormalizeOptions::new(["a", "name"]));
        let err = ingest(&catalog(), &t, "tok", &req).await.unwrap_err();
        assert!(matches!(err, IngestError::MissingRequiredFields(ref n) if n == &vec!["name".to_string()]));
    }
}
