//! Cursor-driven retrieval of a complete remote record set.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::catalog::TableLocation;
use crate::error::{IngestError, IngestResult};
use crate::request::build_params;
use crate::transport::{PageRequest, PageTransport};

/// A record as the remote API returns it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default, rename = "createdTime", skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecordPage {
    records: Vec<RawRecord>,
    #[serde(default)]
    offset: Option<String>,
}

/// Identifies which page request failed: 1-based position and the cursor it was sent with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageAttempt {
    pub index: usize,
    pub cursor: Option<String>,
}

impl Display for PageAttempt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cursor {
            Some(c) => write!(f, "page {} (offset={})", self.index, c),
            None => write!(f, "page {}", self.index),
        }
    }
}

/// Retrieve every record of a table, following continuation cursors until the server stops
/// sending one. Records come back in server order. Any failing page aborts the whole call.
///
/// There is no page cap: a server that never ends the cursor chain keeps this running, so
/// callers that need a bound should wrap the future in a timeout.
pub async fn fetch_all<T: PageTransport>(
    transport: &T,
    location: &TableLocation,
    credential: &str,
    fields: Option<&[String]>,
    formula: Option<&str>,
) -> IngestResult<Vec<RawRecord>> {
    let url = location.url();
    let mut records: Vec<RawRecord> = Vec::new();
    let mut cursor: Option<String> = None;
    let mut index = 0usize;

    loop {
        index += 1;
        let page = PageAttempt { index, cursor: cursor.clone() };
        let req = PageRequest {
            url: url.clone(),
            credential: credential.to_string(),
            params: build_params(fields, formula, cursor.as_deref()),
        };

        let body = transport
            .get_page(&req)
            .await
            .map_err(|source| IngestError::TransportFailure { page: page.clone(), source })?;
        let parsed: RecordPage = serde_json::from_str(&body)
            .map_err(|e| IngestError::MalformedResponse { page: page.clone(), reason: e.to_string() })?;

        let next = parsed.offset.filter(|c| !c.is_empty());
        debug!(target: "mesonet_ingest::fetch", page=index, records=parsed.records.len(), more=next.is_some(), "page received");
        records.extend(parsed.records);

        match next {
            Some(c) => cursor = Some(c),
            None => break,
        }
    }

    info!(target: "mesonet_ingest::fetch", table=%location.table_id, pages=index, records=records.len(), "fetch complete");
    Ok(records)
}
