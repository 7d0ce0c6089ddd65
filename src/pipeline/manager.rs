//! Crawler dispatch by repository type.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{Record, RepositoryType};
use crate::services::{MetadataRepositoryCrawler, RecordCallback};
use crate::storage::RecordConsumer;

use super::RecordProducer;

/// Runs the crawler matching a repository type and broadcasts every
/// record it produces to this manager's sinks.
pub struct CrawlerManager {
    crawlers: HashMap<RepositoryType, Arc<dyn MetadataRepositoryCrawler>>,
    producer: RecordProducer,
}

impl CrawlerManager {
    /// Build the type table. A later crawler for the same type replaces
    /// an earlier one.
    pub fn new(crawlers: impl IntoIterator<Item = Arc<dyn MetadataRepositoryCrawler>>) -> Self {
        let crawlers = crawlers
            .into_iter()
            .map(|crawler| (crawler.supports(), crawler))
            .collect();
        Self {
            crawlers,
            producer: RecordProducer::new(),
        }
    }

    pub fn subscribe(&mut self, consumer: Arc<dyn RecordConsumer>) {
        self.producer.subscribe(consumer);
    }

    pub async fn notify(&self, record: &Record) -> Result<()> {
        self.producer.notify(record).await
    }

    pub fn producer(&self) -> &RecordProducer {
        &self.producer
    }

    /// Crawl `uri` with the crawler registered for `kind`.
    ///
    /// Fails with [`AppError::UnsupportedType`] before any fetch when no
    /// crawler handles `kind`. Returns the number of records broadcast.
    pub async fn crawl(&self, uri: &str, recursive: bool, kind: RepositoryType) -> Result<usize> {
        let crawler = self
            .crawlers
            .get(&kind)
            .ok_or_else(|| AppError::UnsupportedType(kind.to_string()))?;

        log::info!("Crawling {} repository {} (recursive={})", kind, uri, recursive);
        let broadcast = Broadcast {
            producer: &self.producer,
            count: AtomicUsize::new(0),
        };
        crawler.crawl(uri, recursive, &broadcast).await?;

        let count = broadcast.count.into_inner();
        log::info!("Broadcast {} records from {}", count, uri);
        Ok(count)
    }
}

/// Callback handed to crawlers; forwards to the producer and counts.
struct Broadcast<'a> {
    producer: &'a RecordProducer,
    count: AtomicUsize,
}

#[async_trait]
impl RecordCallback for Broadcast<'_> {
    async fn on_record(&self, record: Record) -> Result<()> {
        self.producer.notify(&record).await?;
        self.count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
