//! CAS RDF feed crawler.
//!
//! Every top-level element carrying `rdf:about` describes one dataset.
//! Its simple children become record fields named by their local name;
//! children pointing elsewhere through `rdf:resource` contribute the
//! referenced URI as value.

use async_trait::async_trait;
use roxmltree::Node;

use crate::error::{AppError, Result};
use crate::models::{Record, RecordBuilder, RecordType, RepositoryType, field};
use crate::utils::http::HttpClient;

use super::{MetadataRepositoryCrawler, RecordCallback};

const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

/// Value of the `metadata_format` field.
pub const METADATA_FORMAT: &str = "CAS";

/// Crawler for CAS RDF/XML documents.
pub struct CasCrawler {
    client: HttpClient,
}

impl CasCrawler {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetadataRepositoryCrawler for CasCrawler {
    fn supports(&self) -> RepositoryType {
        RepositoryType::Cas
    }

    async fn crawl(
        &self,
        uri: &str,
        _recursive: bool,
        callback: &dyn RecordCallback,
    ) -> Result<()> {
        log::info!("Crawling CAS feed {}", uri);
        let xml = self.client.get_text(uri).await?;
        let records = parse_rdf(uri, &xml)?;
        log::info!("CAS feed {} produced {} records", uri, records.len());

        for record in records {
            callback.on_record(record).await?;
        }
        Ok(())
    }
}

/// Translate an RDF/XML document read from `uri` into records.
pub fn parse_rdf(uri: &str, xml: &str) -> Result<Vec<Record>> {
    let doc = roxmltree::Document::parse(xml)?;
    let root = doc.root_element();
    if !root.has_tag_name((RDF_NS, "RDF")) {
        return Err(AppError::invalid_document(
            uri,
            format!("expected <rdf:RDF>, found <{}>", root.tag_name().name()),
        ));
    }

    root.children()
        .filter(|n| n.attribute((RDF_NS, "about")).is_some())
        .map(|n| parse_description(uri, n))
        .collect()
}

fn parse_description(uri: &str, node: Node) -> Result<Record> {
    let id = node
        .attribute((RDF_NS, "about"))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::missing("rdf:Description", "rdf:about"))?;

    let title = node
        .children()
        .find(|c| c.is_element() && c.tag_name().name().eq_ignore_ascii_case(field::TITLE))
        .and_then(|c| c.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::missing(format!("resource {id}"), field::TITLE))?;

    let mut record = RecordBuilder::new(id);
    record
        .add_field(field::TITLE, title)
        .add_field(field::TYPE, RecordType::Dataset.as_str())
        .add_field(field::METADATA_FORMAT, METADATA_FORMAT)
        .add_field(field::METADATA_URL, uri);

    for child in node.children().filter(Node::is_element) {
        let name = child.tag_name().name();
        if name.eq_ignore_ascii_case(field::TITLE) {
            continue;
        }
        if let Some(resource) = child.attribute((RDF_NS, "resource")) {
            record.add_field(name, resource);
        } else if let Some(text) = child.text().map(str::trim).filter(|t| !t.is_empty()) {
            record.add_field(name, text);
        }
    }

    log::trace!("CAS resource {}", id);
    record.build()
}
