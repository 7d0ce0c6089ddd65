//! Strategies for the `url` field of a top-level dataset record.

use std::sync::Arc;

use crate::models::UrlStrategy;

/// Builds the landing URL of a dataset found in a catalog.
pub trait DatasetUrlBuilder: Send + Sync {
    fn build_url(&self, catalog_uri: &str, dataset_id: &str) -> String;
}

/// `<catalog uri>#<dataset id>`
#[derive(Debug, Default, Clone, Copy)]
pub struct CatalogUrlBuilder;

impl DatasetUrlBuilder for CatalogUrlBuilder {
    fn build_url(&self, catalog_uri: &str, dataset_id: &str) -> String {
        format!("{}#{}", catalog_uri, dataset_id)
    }
}

/// HTML view of the catalog, focused on the dataset.
#[derive(Debug, Default, Clone, Copy)]
pub struct CatalogViewUrlBuilder;

impl DatasetUrlBuilder for CatalogViewUrlBuilder {
    fn build_url(&self, catalog_uri: &str, dataset_id: &str) -> String {
        let base = catalog_uri.split(['?', '#']).next().unwrap_or(catalog_uri);
        let view = match base.strip_suffix(".xml") {
            Some(stem) => format!("{stem}.html"),
            None => base.to_string(),
        };
        let id: String = url::form_urlencoded::byte_serialize(dataset_id.as_bytes()).collect();
        format!("{view}?dataset={id}")
    }
}

/// Select the builder configured for this deployment.
pub fn url_builder_for(strategy: UrlStrategy) -> Arc<dyn DatasetUrlBuilder> {
    match strategy {
        UrlStrategy::CatalogUrl => Arc::new(CatalogUrlBuilder),
        UrlStrategy::CatalogView => Arc::new(CatalogViewUrlBuilder),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_url() {
        assert_eq!(
            CatalogUrlBuilder.build_url("http://host/thredds/catalog.xml", "ds1.v1"),
            "http://host/thredds/catalog.xml#ds1.v1"
        );
    }

    #[test]
    fn test_catalog_view() {
        assert_eq!(
            CatalogViewUrlBuilder.build_url("http://host/thredds/esgcet/1/catalog.xml", "ds1.v1"),
            "http://host/thredds/esgcet/1/catalog.html?dataset=ds1.v1"
        );
        assert_eq!(
            CatalogViewUrlBuilder.build_url("http://host/catalog", "a b"),
            "http://host/catalog?dataset=a+b"
        );
    }
}
