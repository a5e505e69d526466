pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod pipeline;
pub mod profiles;
pub mod request;
pub mod rows;
pub mod rules;
pub mod transport;

pub use catalog::{SchemaCatalog, TableAlias, TableLocation};
pub use error::{IngestError, IngestResult};
pub use fetch::{fetch_all, PageAttempt, RawRecord};
pub use normalize::{normalize, NormalizeOptions};
pub use pipeline::{ingest, ingest_from_descriptor, IngestRequest};
pub use profiles::TableProfile;
pub use rows::{NormalizedRow, RowSet};
pub use transport::{HttpTransport, PageRequest, PageTransport, TransportError};
