//! Search index sinks.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{IndexConfig, Record};
use crate::utils::http::HttpClient;

use super::{RecordConsumer, SolrUrlBuilder, SolrXmlBuilder};

/// Adds or replaces records in the index.
pub struct SolrIndexer {
    client: HttpClient,
    update_url: String,
}

impl SolrIndexer {
    pub const NAME: &'static str = "indexer";

    pub fn new(client: HttpClient, config: &IndexConfig) -> Self {
        Self {
            client,
            update_url: SolrUrlBuilder::new(&config.url).update_url(config.commit),
        }
    }
}

#[async_trait]
impl RecordConsumer for SolrIndexer {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn consume(&self, record: &Record) -> Result<()> {
        log::info!("Indexing record: {}", record.id());
        let xml = SolrXmlBuilder.add_message(record, false);
        let response = self.client.post_xml(Self::NAME, &self.update_url, xml).await?;
        log::debug!("Index response: {}", response.trim());
        Ok(())
    }
}

/// Removes records from the index by id.
pub struct SolrScrabber {
    client: HttpClient,
    update_url: String,
}

impl SolrScrabber {
    pub const NAME: &'static str = "scrabber";

    pub fn new(client: HttpClient, config: &IndexConfig) -> Self {
        Self {
            client,
            update_url: SolrUrlBuilder::new(&config.url).update_url(config.commit),
        }
    }
}

#[async_trait]
impl RecordConsumer for SolrScrabber {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn consume(&self, record: &Record) -> Result<()> {
        log::info!("Removing record: {}", record.id());
        let xml = SolrXmlBuilder.delete_message(record.id());
        let response = self.client.post_xml(Self::NAME, &self.update_url, xml).await?;
        log::debug!("Index response: {}", response.trim());
        Ok(())
    }
}
