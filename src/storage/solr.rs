//! Solr update message and URL construction.

use crate::models::{Record, field};
use crate::utils::escape_xml;

/// Serializes records into Solr XML update messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct SolrXmlBuilder;

impl SolrXmlBuilder {
    /// `<add><doc>` message holding the id and every field value.
    ///
    /// With `indent` set each element goes on its own line.
    pub fn add_message(&self, record: &Record, indent: bool) -> String {
        let (nl, doc_pad, field_pad) = if indent {
            ("\n", "  ", "    ")
        } else {
            ("", "", "")
        };

        let mut xml = String::new();
        xml.push_str("<add>");
        xml.push_str(nl);
        xml.push_str(doc_pad);
        xml.push_str("<doc>");
        xml.push_str(nl);

        let mut push_field = |name: &str, value: &str| {
            xml.push_str(field_pad);
            xml.push_str(&format!(
                "<field name=\"{}\">{}</field>",
                escape_xml(name),
                escape_xml(value)
            ));
            xml.push_str(nl);
        };
        push_field(field::ID, record.id());
        for (name, values) in record.fields() {
            for value in values {
                push_field(name, value.as_str());
            }
        }

        xml.push_str(doc_pad);
        xml.push_str("</doc>");
        xml.push_str(nl);
        xml.push_str("</add>");
        xml.push_str(nl);
        xml
    }

    /// `<delete>` message removing one document by id.
    pub fn delete_message(&self, id: &str) -> String {
        format!("<delete><id>{}</id></delete>", escape_xml(id))
    }
}

/// Builds URLs against one Solr core.
#[derive(Debug, Clone)]
pub struct SolrUrlBuilder {
    base: String,
}

impl SolrUrlBuilder {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// Update handler URL, optionally asking for an immediate commit.
    pub fn update_url(&self, commit: bool) -> String {
        if commit {
            format!("{}/update?commit=true", self.base)
        } else {
            format!("{}/update", self.base)
        }
    }
}
