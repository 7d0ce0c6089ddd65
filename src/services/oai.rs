//! OAI-PMH feed crawler.
//!
//! Reads `ListRecords` responses. Deleted records are skipped. When the
//! crawl is recursive the crawler keeps requesting pages for as long as the
//! repository hands out a non-empty resumption token.

use std::collections::HashSet;

use async_trait::async_trait;
use roxmltree::Node;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Record, RecordBuilder, RecordType, RepositoryType, field};
use crate::utils::http::HttpClient;

use super::{MetadataRepositoryCrawler, RecordCallback};

/// Value of the `metadata_format` field.
pub const METADATA_FORMAT: &str = "OAI";

/// Error code meaning an empty but valid result set.
const NO_RECORDS_MATCH: &str = "noRecordsMatch";

/// One page of an OAI-PMH `ListRecords` response.
#[derive(Debug, Default)]
pub struct OaiPage {
    pub records: Vec<Record>,
    /// Token for the next page, absent on the last page
    pub resumption_token: Option<String>,
}

/// Crawler for OAI-PMH repositories.
pub struct OaiCrawler {
    client: HttpClient,
}

impl OaiCrawler {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetadataRepositoryCrawler for OaiCrawler {
    fn supports(&self) -> RepositoryType {
        RepositoryType::Oai
    }

    async fn crawl(
        &self,
        uri: &str,
        recursive: bool,
        callback: &dyn RecordCallback,
    ) -> Result<()> {
        let mut page_uri = uri.to_string();
        let mut tokens = ResumptionTokens::default();

        loop {
            log::info!("Crawling OAI page {}", page_uri);
            let xml = self.client.get_text(&page_uri).await?;
            let page = parse_oai(&page_uri, &xml)?;
            log::info!("OAI page produced {} records", page.records.len());

            for record in page.records {
                callback.on_record(record).await?;
            }

            let token = match page.resumption_token {
                Some(token) if recursive => token,
                _ => break,
            };
            if !tokens.accept(&token) {
                log::warn!("Resumption token {} repeated, stopping", token);
                break;
            }
            page_uri = next_page_url(uri, &token)?;
        }
        Ok(())
    }
}

/// Tokens handed out during one crawl. A token seen before ends paging.
#[derive(Debug, Default)]
struct ResumptionTokens {
    seen: HashSet<String>,
}

impl ResumptionTokens {
    fn accept(&mut self, token: &str) -> bool {
        self.seen.insert(token.to_string())
    }
}

/// URL of the page following `token`, on the same endpoint as `uri`.
pub fn next_page_url(uri: &str, token: &str) -> Result<String> {
    let mut url = Url::parse(uri)?;
    url.set_query(None);
    url.set_fragment(None);
    url.query_pairs_mut()
        .append_pair("verb", "ListRecords")
        .append_pair("resumptionToken", token);
    Ok(url.to_string())
}

/// Translate one OAI-PMH response read from `uri`.
pub fn parse_oai(uri: &str, xml: &str) -> Result<OaiPage> {
    let doc = roxmltree::Document::parse(xml)?;
    let root = doc.root_element();
    if !root.has_tag_name("OAI-PMH") {
        return Err(AppError::invalid_document(
            uri,
            format!("expected <OAI-PMH>, found <{}>", root.tag_name().name()),
        ));
    }

    if let Some(error) = root.children().find(|c| c.has_tag_name("error")) {
        let code = error.attribute("code").unwrap_or_default();
        if code == NO_RECORDS_MATCH {
            return Ok(OaiPage::default());
        }
        let message = error.text().unwrap_or_default().trim();
        return Err(AppError::invalid_document(uri, format!("OAI error {code}: {message}")));
    }

    let Some(list) = root.children().find(|c| c.has_tag_name("ListRecords")) else {
        return Err(AppError::invalid_document(uri, "no <ListRecords> element"));
    };

    let mut records = Vec::new();
    for node in list.children().filter(|c| c.has_tag_name("record")) {
        if let Some(record) = parse_record(uri, node)? {
            records.push(record);
        }
    }

    let resumption_token = list
        .children()
        .find(|c| c.has_tag_name("resumptionToken"))
        .and_then(|t| t.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    Ok(OaiPage {
        records,
        resumption_token,
    })
}

fn parse_record(uri: &str, node: Node) -> Result<Option<Record>> {
    let header = node
        .children()
        .find(|c| c.has_tag_name("header"))
        .ok_or_else(|| AppError::missing("record", "header"))?;
    if header.attribute("status") == Some("deleted") {
        log::debug!("Skipping deleted OAI record");
        return Ok(None);
    }

    let id = header
        .children()
        .find(|c| c.has_tag_name("identifier"))
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::missing("record header", "identifier"))?;

    let metadata = node
        .children()
        .find(|c| c.has_tag_name("metadata"))
        .ok_or_else(|| AppError::missing(format!("record {id}"), "metadata"))?;

    let title_node = metadata
        .descendants()
        .find(|n| is_title(*n) && leaf_text(*n).is_some())
        .ok_or_else(|| AppError::missing(format!("record {id}"), field::TITLE))?;

    let mut record = RecordBuilder::new(id);
    record
        .add_field(field::TITLE, leaf_text(title_node).unwrap_or_default())
        .add_field(field::TYPE, RecordType::Dataset.as_str())
        .add_field(field::METADATA_FORMAT, METADATA_FORMAT)
        .add_field(field::METADATA_URL, uri);

    for leaf in metadata.descendants().filter(|n| *n != title_node) {
        if let Some(text) = leaf_text(leaf) {
            record.add_field(&leaf.tag_name().name().to_ascii_lowercase(), text);
        }
    }

    log::trace!("OAI record {}", id);
    record.build().map(Some)
}

fn is_title(node: Node) -> bool {
    let name = node.tag_name().name();
    name.eq_ignore_ascii_case("title") || name.eq_ignore_ascii_case("entry_title")
}

/// Trimmed text of an element without element children.
fn leaf_text<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    if !node.is_element() || node.children().any(|c| c.is_element()) {
        return None;
    }
    node.text().map(str::trim).filter(|t| !t.is_empty())
}
