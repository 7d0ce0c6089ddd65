//! THREDDS hierarchical catalog crawler.
//!
//! A crawl reads one catalog document, translates each top-level dataset
//! into records and, when recursive, follows every `catalogRef` found in
//! the document. Referenced catalogs are visited depth-first in document
//! order; a catalog already visited during the same crawl is skipped.

mod catalog;
mod translator;
mod url_builder;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::RepositoryType;
use crate::utils::http::HttpClient;

use super::{MetadataRepositoryCrawler, RecordCallback};

pub use catalog::{Catalog, CatalogRef, Dataset, parse_catalog};
pub use translator::{CF_VOCABULARY, CatalogTranslator, METADATA_FORMAT, encode_service_field};
pub use url_builder::{CatalogUrlBuilder, CatalogViewUrlBuilder, DatasetUrlBuilder, url_builder_for};

/// Crawler for THREDDS XML catalogs.
pub struct ThreddsCrawler {
    client: HttpClient,
    translator: CatalogTranslator,
}

impl ThreddsCrawler {
    pub fn new(client: HttpClient, url_builder: Arc<dyn DatasetUrlBuilder>) -> Self {
        Self {
            client,
            translator: CatalogTranslator::new(url_builder),
        }
    }

    /// Translate every top-level dataset of an already parsed catalog.
    async fn publish_catalog(&self, catalog: &Catalog, callback: &dyn RecordCallback) -> Result<usize> {
        let mut count = 0;
        for dataset in &catalog.datasets {
            if dataset.is_container() {
                log::debug!("Skipping container dataset {:?}", dataset.name);
                continue;
            }
            let records = self.translator.translate(&catalog.uri, dataset, &catalog.uri)?;
            for record in records {
                callback.on_record(record).await?;
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl MetadataRepositoryCrawler for ThreddsCrawler {
    fn supports(&self) -> RepositoryType {
        RepositoryType::Thredds
    }

    async fn crawl(
        &self,
        uri: &str,
        recursive: bool,
        callback: &dyn RecordCallback,
    ) -> Result<()> {
        let mut pending = vec![uri.to_string()];
        let mut visited = HashSet::new();

        while let Some(next) = pending.pop() {
            if !visited.insert(next.clone()) {
                log::debug!("Catalog {} already crawled", next);
                continue;
            }

            log::info!("Crawling catalog {}", next);
            let xml = self.client.get_text(&next).await?;
            let catalog = parse_catalog(&next, &xml)?;
            let count = self.publish_catalog(&catalog, callback).await?;
            log::info!("Catalog {} produced {} records", next, count);

            if recursive {
                // Reverse so the first reference is crawled first.
                let refs = catalog.all_catalog_refs();
                pending.extend(refs.into_iter().rev().map(|r| r.href.clone()));
            }
        }
        Ok(())
    }
}
