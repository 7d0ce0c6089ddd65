//! Record sinks.
//!
//! A sink accepts one record at a time and reflects it somewhere outside
//! the process:
//!
//! ```text
//! RecordConsumer
//! ├── SolrIndexer   POST <add><doc>…</doc></add>   to <index>/update
//! ├── SolrScrabber  POST <delete><id>…</id></delete> to <index>/update
//! └── FileWriter    <directory>/<id>.xml
//! ```
//!
//! Sinks are long-lived and reused sequentially across broadcasts; they
//! never modify the records they receive.

pub mod file;
pub mod index;
pub mod solr;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Record;

pub use file::FileWriter;
pub use index::{SolrIndexer, SolrScrabber};
pub use solr::{SolrUrlBuilder, SolrXmlBuilder};

/// Destination for harvested records.
#[async_trait]
pub trait RecordConsumer: Send + Sync {
    /// Short name used in logs and sink errors.
    fn name(&self) -> &str;

    /// Reflect one record in the destination.
    async fn consume(&self, record: &Record) -> Result<()>;
}
