//! Translation of a THREDDS dataset tree into flat search records.
//!
//! A top-level dataset produces one `Dataset` record, always first in the
//! output. Every descendant carrying a `file_id` property produces one `File`
//! record whose `parent_id` is the final id of the top-level record.
//! Descendants carrying an `aggregation_id` contribute their access entries
//! to the top-level record and produce nothing of their own.
//!
//! The walk is a pure function of the tree: each call returns the records,
//! access fields and byte count of its subtree, and callers concatenate in
//! traversal order.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{Record, RecordBuilder, RecordType, field};

use super::catalog::{Dataset, TimeCoverage};
use super::url_builder::DatasetUrlBuilder;

/// Catalog property names with special meaning.
pub mod property {
    /// Canonical dataset identifier, replaces the catalog `ID`
    pub const DATASET_ID: &str = "dataset_id";
    pub const FILE_ID: &str = "file_id";
    pub const AGGREGATION_ID: &str = "aggregation_id";
    pub const DATASET_VERSION: &str = "dataset_version";
    pub const SIZE: &str = "size";
    pub const TITLE: &str = "title";
}

/// Vocabulary whose variable descriptions are indexed as `cf_variable`.
pub const CF_VOCABULARY: &str = "CF-1.0";

/// Value of the `metadata_format` field.
pub const METADATA_FORMAT: &str = "THREDDS";

/// Datasets whose id contains this marker only contribute `service` fields.
const AGGREGATION_MARKER: &str = "aggregation";

/// Encode one access option as a single `service` field value.
pub fn encode_service_field(service_type: &str, description: &str, url: &str) -> String {
    format!("{service_type}|{description}|{url}")
}

/// Records and aggregates produced by one subtree.
#[derive(Debug, Default)]
struct Subtree {
    files: Vec<Record>,
    /// Access fields of aggregations, destined for the top-level record
    root_fields: Vec<(&'static str, String)>,
    size: u64,
}

impl Subtree {
    fn append(&mut self, other: Subtree) {
        self.files.extend(other.files);
        self.root_fields.extend(other.root_fields);
        self.size += other.size;
    }
}

/// Converts top-level catalog datasets into records.
#[derive(Clone)]
pub struct CatalogTranslator {
    url_builder: Arc<dyn DatasetUrlBuilder>,
}

impl CatalogTranslator {
    pub fn new(url_builder: Arc<dyn DatasetUrlBuilder>) -> Self {
        Self { url_builder }
    }

    /// Translate one top-level dataset of the catalog at `catalog_uri`.
    ///
    /// `metadata_url` is stamped on the top-level record as its source.
    pub fn translate(
        &self,
        catalog_uri: &str,
        dataset: &Dataset,
        metadata_url: &str,
    ) -> Result<Vec<Record>> {
        let id = required(dataset.id.as_deref(), "dataset", "ID")?;
        let name = required(dataset.name.as_deref(), &format!("dataset {id}"), "name")?;
        log::debug!("Parsing dataset: {}", id);

        let mut root = RecordBuilder::new(id);
        root.add_field(field::TITLE, name)
            .add_field(field::TYPE, RecordType::Dataset.as_str())
            .add_field(field::URL, self.url_builder.build_url(catalog_uri, id))
            .add_field(field::METADATA_FORMAT, METADATA_FORMAT)
            .add_field(field::METADATA_URL, metadata_url);

        add_documentation(dataset, &mut root);
        add_variables(dataset, &mut root);
        add_fields(&mut root, access_fields(dataset));
        add_properties(dataset, &mut root, Target::Root);
        add_geospatial_coverage(dataset, &mut root);
        add_time_coverage(dataset.time_coverage.as_ref(), &mut root);

        // The canonical id is settled now, before any child refers to it.
        let subtree = self.walk(dataset, root.id())?;
        add_fields(&mut root, subtree.root_fields);
        root.add_field(field::SIZE, subtree.size.to_string());

        let mut records = Vec::with_capacity(subtree.files.len() + 1);
        records.push(root.build()?);
        records.extend(subtree.files);

        for record in &records {
            log::trace!("{}", record);
        }
        Ok(records)
    }

    fn walk(&self, dataset: &Dataset, root_id: &str) -> Result<Subtree> {
        let mut subtree = Subtree::default();

        for child in &dataset.datasets {
            if child.has_property(property::FILE_ID) {
                let (record, size) = translate_file(child, root_id)?;
                subtree.files.push(record);
                subtree.size += size;
            } else if child.has_property(property::AGGREGATION_ID) {
                log::trace!("Merging aggregation {:?} into {}", child.id, root_id);
                subtree.root_fields.extend(access_fields(child));
            }

            // A file may itself contain datasets; descend regardless.
            subtree.append(self.walk(child, root_id)?);
        }

        Ok(subtree)
    }
}

/// Build the record of a file dataset and return it with its byte size.
fn translate_file(file: &Dataset, root_id: &str) -> Result<(Record, u64)> {
    let id = required(file.id.as_deref(), "file", "ID")?;
    let name = required(file.name.as_deref(), &format!("file {id}"), "name")?;
    log::trace!("Parsing file id={}", id);

    let mut record = RecordBuilder::new(id);
    record
        .add_field(field::TITLE, name)
        .add_field(field::TYPE, RecordType::File.as_str())
        .add_field(field::PARENT_ID, root_id);

    add_properties(file, &mut record, Target::File);
    let size = match record.field(field::SIZE).map(str::trim) {
        Some(raw) if !raw.is_empty() => raw.parse::<u64>().unwrap_or_else(|_| {
            log::warn!("File {} has unparsable size '{}', counting 0", id, raw);
            0
        }),
        _ => 0,
    };

    add_variables(file, &mut record);
    add_fields(&mut record, access_fields(file));
    add_documentation(file, &mut record);

    Ok((record.build()?, size))
}

fn required<'a>(value: Option<&'a str>, element: &str, attribute: &str) -> Result<&'a str> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::missing(element, attribute))
}

fn add_fields(record: &mut RecordBuilder, fields: Vec<(&'static str, String)>) {
    for (name, value) in fields {
        record.add_field(name, value);
    }
}

/// Kind of record a property list is copied into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Root,
    File,
}

fn add_properties(dataset: &Dataset, record: &mut RecordBuilder, target: Target) {
    for prop in &dataset.properties {
        log::trace!("Property: {}={}", prop.name, prop.value);
        match prop.name.as_str() {
            property::DATASET_ID => record.set_id(prop.value.as_str()),
            property::TITLE => {
                record.add_field(field::DESCRIPTION, prop.value.as_str());
            }
            property::DATASET_VERSION => {
                record.add_field(field::VERSION, prop.value.as_str());
            }
            // The root size is the sum over its files, set after the walk.
            property::SIZE if target == Target::Root => {
                log::debug!("Ignoring size={} declared on {}", prop.value, record.id());
            }
            property::SIZE => {
                record.add_field(field::SIZE, prop.value.as_str());
            }
            name => {
                record.add_field(name, prop.value.as_str());
            }
        }
    }
}

fn add_variables(dataset: &Dataset, record: &mut RecordBuilder) {
    for group in &dataset.variables {
        let is_cf = group.vocabulary == CF_VOCABULARY;
        for variable in &group.variables {
            record.add_field(field::VARIABLE, variable.name.as_str());
            if is_cf && !variable.description.is_empty() {
                record.add_field(field::CF_VARIABLE, variable.description.as_str());
            }
        }
    }
}

fn add_documentation(dataset: &Dataset, record: &mut RecordBuilder) {
    for text in &dataset.documentation {
        if !text.trim().is_empty() {
            record.add_field(field::DESCRIPTION, text.trim());
        }
    }
}

/// Fields describing every access endpoint of `dataset`.
fn access_fields(dataset: &Dataset) -> Vec<(&'static str, String)> {
    let is_aggregation = dataset
        .id
        .as_deref()
        .is_some_and(|id| id.contains(AGGREGATION_MARKER));

    let mut fields = Vec::new();
    for access in &dataset.access {
        if !is_aggregation {
            fields.push((field::URL, access.url.clone()));
            fields.push((field::SERVICE_TYPE, access.service_type.clone()));
        }
        fields.push((
            field::SERVICE,
            encode_service_field(&access.service_type, &access.service_description, &access.url),
        ));
    }
    fields
}

fn add_geospatial_coverage(dataset: &Dataset, record: &mut RecordBuilder) {
    if let Some(geo) = &dataset.geospatial_coverage {
        record
            .add_field(field::SOUTH, format_degrees(geo.north_south.start))
            .add_field(field::NORTH, format_degrees(geo.north_south.end()))
            .add_field(field::WEST, format_degrees(geo.east_west.start))
            .add_field(field::EAST, format_degrees(geo.east_west.end()));
    }
}

fn add_time_coverage(coverage: Option<&TimeCoverage>, record: &mut RecordBuilder) {
    if let Some(time) = coverage {
        record
            .add_field(field::DATETIME_START, format_iso(time.start))
            .add_field(field::DATETIME_STOP, format_iso(time.end));
    }
}

/// Decimal rendering that always keeps a fractional part (`90.0`, `-97.4888`).
fn format_degrees(value: f64) -> String {
    format!("{value:?}")
}

fn format_iso(time: chrono::DateTime<chrono::Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::thredds::catalog::{
        Access, GeospatialCoverage, Property, Range, Variable, VariableGroup, parse_date,
    };
    use crate::services::thredds::url_builder::CatalogUrlBuilder;

    const CATALOG_URI: &str = "http://host/thredds/catalog.xml";

    fn translator() -> CatalogTranslator {
        CatalogTranslator::new(Arc::new(CatalogUrlBuilder))
    }

    fn node(id: &str, name: &str, props: &[(&str, &str)]) -> Dataset {
        Dataset {
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            properties: props
                .iter()
                .map(|(n, v)| Property {
                    name: n.to_string(),
                    value: v.to_string(),
                })
                .collect(),
            ..Dataset::default()
        }
    }

    fn access(service_type: &str, url: &str) -> Access {
        Access {
            service_type: service_type.to_string(),
            service_description: format!("{service_type} service"),
            url_path: "p".to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn test_root_and_single_file() {
        let mut root = node("ds1", "Dataset One", &[]);
        root.datasets.push(node(
            "ds1.file1",
            "File One",
            &[("file_id", "ds1.file1"), ("size", "1024")],
        ));

        let records = translator().translate(CATALOG_URI, &root, CATALOG_URI).unwrap();
        assert_eq!(records.len(), 2);

        let ds = &records[0];
        assert_eq!(ds.id(), "ds1");
        assert_eq!(ds.field(field::TITLE), Some("Dataset One"));
        assert_eq!(ds.field(field::TYPE), Some("Dataset"));
        assert_eq!(ds.values(field::SIZE), ["1024"]);
        assert_eq!(ds.field(field::URL), Some("http://host/thredds/catalog.xml#ds1"));
        assert_eq!(ds.field(field::METADATA_FORMAT), Some("THREDDS"));
        assert_eq!(ds.field(field::METADATA_URL), Some(CATALOG_URI));

        let file = &records[1];
        assert_eq!(file.id(), "ds1.file1");
        assert_eq!(file.field(field::TITLE), Some("File One"));
        assert_eq!(file.field(field::TYPE), Some("File"));
        assert_eq!(file.field(field::PARENT_ID), Some("ds1"));
    }

    #[test]
    fn test_dataset_id_property_overrides_root_id() {
        let mut root = node("ds1", "Dataset One", &[("dataset_id", "ds1-canonical")]);
        root.datasets.push(node(
            "ds1.file1",
            "File One",
            &[("file_id", "ds1.file1"), ("size", "1024")],
        ));

        let records = translator().translate(CATALOG_URI, &root, CATALOG_URI).unwrap();
        assert_eq!(records[0].id(), "ds1-canonical");
        assert_eq!(records[1].field(field::PARENT_ID), Some("ds1-canonical"));
        // The landing URL is built from the structural id.
        assert_eq!(
            records[0].field(field::URL),
            Some("http://host/thredds/catalog.xml#ds1")
        );
    }

    #[test]
    fn test_nested_files_sum_sizes_and_point_to_root() {
        let mut group = node("ds1.group", "Group", &[]);
        group.datasets.push(node("f2", "F2", &[("file_id", "f2"), ("size", "10")]));
        group.datasets.push(node("f3", "F3", &[("file_id", "f3")]));
        group.datasets.push(node("f4", "F4", &[("file_id", "f4"), ("size", "n/a")]));

        let mut root = node("ds1", "Dataset One", &[]);
        root.datasets.push(node("f1", "F1", &[("file_id", "f1"), ("size", "5")]));
        root.datasets.push(group);

        let records = translator().translate(CATALOG_URI, &root, CATALOG_URI).unwrap();
        let ids: Vec<_> = records.iter().map(Record::id).collect();
        assert_eq!(ids, ["ds1", "f1", "f2", "f3", "f4"]);
        assert_eq!(records[0].field(field::SIZE), Some("15"));
        assert!(
            records[1..]
                .iter()
                .all(|r| r.field(field::PARENT_ID) == Some("ds1"))
        );
    }

    #[test]
    fn test_file_containing_files_is_emitted_before_children() {
        let mut outer = node("f1", "F1", &[("file_id", "f1"), ("size", "1")]);
        outer.datasets.push(node("f1.a", "F1a", &[("file_id", "f1.a"), ("size", "2")]));
        let mut root = node("ds1", "Dataset One", &[]);
        root.datasets.push(outer);

        let records = translator().translate(CATALOG_URI, &root, CATALOG_URI).unwrap();
        let ids: Vec<_> = records.iter().map(Record::id).collect();
        assert_eq!(ids, ["ds1", "f1", "f1.a"]);
        assert_eq!(records[0].field(field::SIZE), Some("3"));
    }

    #[test]
    fn test_aggregation_merges_into_root() {
        let mut agg = node("ds1.aggregation", "Aggregation", &[("aggregation_id", "a1")]);
        agg.access.push(access("OpenDAP", "http://host/dodsC/ds1.aggregation"));
        let mut plain_agg = node("ds1.agg2", "Agg2", &[("aggregation_id", "a2")]);
        plain_agg.access.push(access("WMS", "http://host/wms/ds1"));

        let mut root = node("ds1", "Dataset One", &[]);
        root.datasets.push(agg);
        root.datasets.push(plain_agg);

        let records = translator().translate(CATALOG_URI, &root, CATALOG_URI).unwrap();
        assert_eq!(records.len(), 1);

        let ds = &records[0];
        assert_eq!(
            ds.values(field::SERVICE),
            [
                "OpenDAP|OpenDAP service|http://host/dodsC/ds1.aggregation",
                "WMS|WMS service|http://host/wms/ds1",
            ]
        );
        // Ids containing "aggregation" contribute no url/service_type.
        assert_eq!(
            ds.values(field::URL),
            ["http://host/thredds/catalog.xml#ds1", "http://host/wms/ds1"]
        );
        assert_eq!(ds.values(field::SERVICE_TYPE), ["WMS"]);
        assert_eq!(ds.field(field::SIZE), Some("0"));
    }

    #[test]
    fn test_file_takes_precedence_over_aggregation() {
        let mut root = node("ds1", "Dataset One", &[]);
        let mut both = node("f1", "F1", &[("file_id", "f1"), ("aggregation_id", "a1")]);
        both.access.push(access("HTTPServer", "http://host/f1"));
        root.datasets.push(both);

        let records = translator().translate(CATALOG_URI, &root, CATALOG_URI).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].values(field::SERVICE).is_empty());
        assert_eq!(records[1].values(field::URL), ["http://host/f1"]);
    }

    #[test]
    fn test_root_size_property_is_replaced_by_file_total() {
        let mut root = node("ds1", "Dataset One", &[("size", "99")]);
        root.datasets.push(node("f1", "F1", &[("file_id", "f1"), ("size", "10")]));

        let records = translator().translate(CATALOG_URI, &root, CATALOG_URI).unwrap();
        assert_eq!(records[0].values(field::SIZE), ["10"]);
        assert_eq!(records[1].values(field::SIZE), ["10"]);
    }

    #[test]
    fn test_id_property_does_not_shadow_record_id() {
        let mut root = node("ds1", "Dataset One", &[("id", "bogus")]);
        root.datasets.push(node("f1", "F1", &[("file_id", "f1"), ("id", "bogus")]));

        let records = translator().translate(CATALOG_URI, &root, CATALOG_URI).unwrap();
        assert_eq!(records[0].id(), "ds1");
        assert!(records.iter().all(|r| !r.has_field(field::ID)));
        let xml = crate::storage::SolrXmlBuilder.add_message(&records[1], false);
        assert_eq!(xml.matches("<field name=\"id\">").count(), 1);
    }

    #[test]
    fn test_property_mapping() {
        let root = node(
            "ds1",
            "Dataset One",
            &[
                ("title", "Long title"),
                ("dataset_version", "2"),
                ("project", "CMIP5"),
            ],
        );
        let records = translator().translate(CATALOG_URI, &root, CATALOG_URI).unwrap();
        let ds = &records[0];
        assert_eq!(ds.field(field::TITLE), Some("Dataset One"));
        assert_eq!(ds.field(field::DESCRIPTION), Some("Long title"));
        assert_eq!(ds.field(field::VERSION), Some("2"));
        assert_eq!(ds.field("project"), Some("CMIP5"));
    }

    #[test]
    fn test_variables_documentation_and_coverage() {
        let mut root = node("ds1", "Dataset One", &[]);
        root.documentation = vec!["Summary".to_string(), "   ".to_string()];
        root.variables = vec![
            VariableGroup {
                vocabulary: "CF-1.0".to_string(),
                variables: vec![Variable {
                    name: "tas".to_string(),
                    vocabulary_name: Some("air_temperature".to_string()),
                    units: Some("K".to_string()),
                    description: "Air Temperature".to_string(),
                }],
            },
            VariableGroup {
                vocabulary: "GRIB-1".to_string(),
                variables: vec![Variable {
                    name: "var11".to_string(),
                    vocabulary_name: None,
                    units: None,
                    description: "Temperature".to_string(),
                }],
            },
        ];
        root.geospatial_coverage = Some(GeospatialCoverage {
            north_south: Range {
                start: 36.6058,
                size: 0.0,
            },
            east_west: Range {
                start: -180.0,
                size: 360.0,
            },
        });
        root.time_coverage = Some(TimeCoverage {
            start: parse_date("1999-11-16T12:00").unwrap(),
            end: parse_date("2009-11-16").unwrap(),
        });

        let records = translator().translate(CATALOG_URI, &root, CATALOG_URI).unwrap();
        let ds = &records[0];
        assert_eq!(ds.values(field::DESCRIPTION), ["Summary"]);
        assert_eq!(ds.values(field::VARIABLE), ["tas", "var11"]);
        assert_eq!(ds.values(field::CF_VARIABLE), ["Air Temperature"]);
        assert_eq!(ds.field(field::SOUTH), Some("36.6058"));
        assert_eq!(ds.field(field::NORTH), Some("36.6058"));
        assert_eq!(ds.field(field::WEST), Some("-180.0"));
        assert_eq!(ds.field(field::EAST), Some("180.0"));
        assert_eq!(ds.field(field::DATETIME_START), Some("1999-11-16T12:00:00Z"));
        assert_eq!(ds.field(field::DATETIME_STOP), Some("2009-11-16T00:00:00Z"));
    }

    #[test]
    fn test_files_skip_coverage() {
        let mut file = node("f1", "F1", &[("file_id", "f1")]);
        file.geospatial_coverage = Some(GeospatialCoverage {
            north_south: Range {
                start: 0.0,
                size: 1.0,
            },
            east_west: Range {
                start: 0.0,
                size: 1.0,
            },
        });
        let mut root = node("ds1", "Dataset One", &[]);
        root.datasets.push(file);

        let records = translator().translate(CATALOG_URI, &root, CATALOG_URI).unwrap();
        assert!(!records[1].has_field(field::SOUTH));
        assert!(!records[1].has_field(field::METADATA_URL));
    }

    #[test]
    fn test_missing_identity_is_fatal() {
        let mut root = node("ds1", "Dataset One", &[]);
        root.name = None;
        assert!(matches!(
            translator().translate(CATALOG_URI, &root, CATALOG_URI),
            Err(AppError::MissingField { .. })
        ));

        let mut root = node("ds1", "Dataset One", &[]);
        let mut file = node("f1", "F1", &[("file_id", "f1")]);
        file.id = None;
        root.datasets.push(file);
        assert!(matches!(
            translator().translate(CATALOG_URI, &root, CATALOG_URI),
            Err(AppError::MissingField { .. })
        ));
    }
}
