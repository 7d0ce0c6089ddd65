//! Publishing facade.

use std::sync::Arc;

use crate::error::Result;
use crate::models::{Config, RepositoryType};
use crate::services::{MetadataRepositoryCrawler, default_crawlers};
use crate::storage::{FileWriter, RecordConsumer, SolrIndexer, SolrScrabber};
use crate::utils::http::{HttpClient, create_client};

use super::{CrawlerManager, MetadataDeletionService};

/// Publish, unpublish and retract operations over two crawler managers
/// and a deletion service.
///
/// The publishing manager feeds "add" sinks; the unpublishing manager and
/// the deletion service feed "remove" sinks. Crawl logic is shared.
pub struct PublishingService {
    publisher: CrawlerManager,
    unpublisher: CrawlerManager,
    deletion: MetadataDeletionService,
}

impl PublishingService {
    pub fn new(
        publisher: CrawlerManager,
        unpublisher: CrawlerManager,
        deletion: MetadataDeletionService,
    ) -> Self {
        Self {
            publisher,
            unpublisher,
            deletion,
        }
    }

    /// Wire crawlers and sinks from configuration.
    ///
    /// - publishing: index (if `index.enabled`) then file (if `output.enabled`)
    /// - unpublishing and deletion: index removal
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let client = create_client(&config.http)?;
        let crawlers = default_crawlers(&client, config);
        let add_sinks = publish_sinks(&client, config)?;
        let remove_sink: Arc<dyn RecordConsumer> =
            Arc::new(SolrScrabber::new(client.clone(), &config.index));

        Ok(Self::wire(crawlers, add_sinks, vec![remove_sink]))
    }

    /// Build the three collaborators over one crawler set.
    pub fn wire(
        crawlers: Vec<Arc<dyn MetadataRepositoryCrawler>>,
        add_sinks: Vec<Arc<dyn RecordConsumer>>,
        remove_sinks: Vec<Arc<dyn RecordConsumer>>,
    ) -> Self {
        let mut publisher = CrawlerManager::new(crawlers.iter().cloned());
        let mut unpublisher = CrawlerManager::new(crawlers);
        let mut deletion = MetadataDeletionService::new();

        for sink in add_sinks {
            publisher.subscribe(sink);
        }
        for sink in remove_sinks {
            unpublisher.subscribe(Arc::clone(&sink));
            deletion.subscribe(sink);
        }

        log::debug!(
            "Publishing sinks: {:?}; unpublishing sinks: {:?}",
            publisher.producer().consumer_names(),
            unpublisher.producer().consumer_names()
        );
        Self::new(publisher, unpublisher, deletion)
    }

    /// Harvest a repository and send every record to the publishing sinks.
    pub async fn publish(&self, uri: &str, recursive: bool, kind: RepositoryType) -> Result<usize> {
        log::info!("Publishing {} repository {}", kind, uri);
        self.publisher.crawl(uri, recursive, kind).await
    }

    /// Harvest a repository and remove every record it yields.
    pub async fn unpublish(
        &self,
        uri: &str,
        recursive: bool,
        kind: RepositoryType,
    ) -> Result<usize> {
        log::info!("Unpublishing {} repository {}", kind, uri);
        self.unpublisher.crawl(uri, recursive, kind).await
    }

    /// Remove individual records by id.
    pub async fn unpublish_records<S: AsRef<str>>(&self, ids: &[S]) -> Result<usize> {
        self.deletion.delete(ids).await
    }
}

fn publish_sinks(client: &HttpClient, config: &Config) -> Result<Vec<Arc<dyn RecordConsumer>>> {
    let mut sinks: Vec<Arc<dyn RecordConsumer>> = Vec::new();
    if config.index.enabled {
        sinks.push(Arc::new(SolrIndexer::new(client.clone(), &config.index)));
    }
    if config.output.enabled {
        sinks.push(Arc::new(FileWriter::new(config.output.resolved_directory())?));
    }
    if sinks.is_empty() {
        log::warn!("Neither index nor file output is enabled; published records go nowhere");
    }
    Ok(sinks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OutputConfig, Record};
    use crate::pipeline::testing::{Journal, RecordingSink};
    use crate::services::RecordCallback;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct StubCrawler;

    #[async_trait]
    impl MetadataRepositoryCrawler for StubCrawler {
        fn supports(&self) -> RepositoryType {
            RepositoryType::Thredds
        }

        async fn crawl(
            &self,
            _uri: &str,
            _recursive: bool,
            callback: &dyn RecordCallback,
        ) -> Result<()> {
            callback.on_record(Record::stub("ds1")?).await
        }
    }

    fn service(journal: &Journal) -> PublishingService {
        let crawler: Arc<dyn MetadataRepositoryCrawler> = Arc::new(StubCrawler);
        let indexer: Arc<dyn RecordConsumer> = RecordingSink::arc("indexer", journal);
        let file: Arc<dyn RecordConsumer> = RecordingSink::arc("file", journal);
        let scrabber: Arc<dyn RecordConsumer> = RecordingSink::arc("scrabber", journal);
        PublishingService::wire(vec![crawler], vec![indexer, file], vec![scrabber])
    }

    #[tokio::test]
    async fn test_publish_and_unpublish_use_disjoint_sinks() {
        let journal = Journal::default();
        let service = service(&journal);

        service
            .publish("http://host/catalog.xml", true, RepositoryType::Thredds)
            .await
            .unwrap();
        assert_eq!(journal.entries(), ["indexer:ds1", "file:ds1"]);

        service
            .unpublish("http://host/catalog.xml", true, RepositoryType::Thredds)
            .await
            .unwrap();
        assert_eq!(journal.entries(), ["indexer:ds1", "file:ds1", "scrabber:ds1"]);
    }

    #[tokio::test]
    async fn test_unpublish_records_goes_to_removal_sink() {
        let journal = Journal::default();
        let service = service(&journal);

        assert_eq!(service.unpublish_records(&["x", "y"]).await.unwrap(), 2);
        assert_eq!(journal.entries(), ["scrabber:x", "scrabber:y"]);
    }

    #[test]
    fn test_from_config_fails_fast_on_missing_output_directory() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.output = OutputConfig {
            directory: Some(tmp.path().join("missing")),
            enabled: true,
        };
        assert!(PublishingService::from_config(&config).is_err());
    }

    #[test]
    fn test_from_config_rejects_bad_removal_index_url() {
        let mut config = Config::default();
        config.index.enabled = false;
        config.index.url = "not a url".to_string();
        assert!(PublishingService::from_config(&config).is_err());
    }

    #[test]
    fn test_from_config_wires_enabled_sinks() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.output = OutputConfig {
            directory: Some(tmp.path().to_path_buf()),
            enabled: true,
        };

        let service = PublishingService::from_config(&config).unwrap();
        assert_eq!(
            service.publisher.producer().consumer_names(),
            ["indexer", "file"]
        );
        assert_eq!(
            service.unpublisher.producer().consumer_names(),
            ["scrabber"]
        );

        config.index.enabled = false;
        let service = PublishingService::from_config(&config).unwrap();
        assert_eq!(service.publisher.producer().consumer_names(), ["file"]);
    }
}
