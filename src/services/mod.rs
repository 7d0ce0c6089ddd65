//! Repository crawlers.
//!
//! Each crawler understands exactly one [`RepositoryType`]:
//! - THREDDS hierarchical catalogs (`ThreddsCrawler`)
//! - CAS RDF feeds (`CasCrawler`)
//! - OAI-PMH feeds (`OaiCrawler`)
//!
//! Crawlers know nothing about sinks. They hand every record they produce
//! to a [`RecordCallback`] and move on to the next one.

mod cas;
mod oai;
pub mod thredds;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Config, Record, RepositoryType};
use crate::utils::http::HttpClient;

pub use cas::CasCrawler;
pub use oai::OaiCrawler;
pub use thredds::ThreddsCrawler;

/// Receiver for records discovered during a crawl.
#[async_trait]
pub trait RecordCallback: Send + Sync {
    async fn on_record(&self, record: Record) -> Result<()>;
}

/// A harvester for one remote repository format.
#[async_trait]
pub trait MetadataRepositoryCrawler: Send + Sync {
    /// The single repository type this crawler handles.
    fn supports(&self) -> RepositoryType;

    /// Fetch the resource at `uri` and pass every record to `callback`.
    ///
    /// With `recursive` unset only the top-level resource is read.
    /// Transport and parse failures are returned unmodified; no retry.
    async fn crawl(&self, uri: &str, recursive: bool, callback: &dyn RecordCallback)
    -> Result<()>;
}

/// Build one crawler per supported repository type.
pub fn default_crawlers(
    client: &HttpClient,
    config: &Config,
) -> Vec<Arc<dyn MetadataRepositoryCrawler>> {
    vec![
        Arc::new(ThreddsCrawler::new(
            client.clone(),
            thredds::url_builder_for(config.thredds.url_strategy),
        )),
        Arc::new(CasCrawler::new(client.clone())),
        Arc::new(OaiCrawler::new(client.clone())),
    ]
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Callback that keeps every record it receives.
    #[derive(Default)]
    pub struct CollectingCallback {
        pub records: Mutex<Vec<Record>>,
    }

    impl CollectingCallback {
        pub fn ids(&self) -> Vec<String> {
            self.records
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.id().to_string())
                .collect()
        }
    }

    #[async_trait]
    impl RecordCallback for CollectingCallback {
        async fn on_record(&self, record: Record) -> Result<()> {
            self.records.lock().unwrap().push(record);
            Ok(())
        }
    }
}
