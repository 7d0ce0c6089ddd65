//! In-memory THREDDS catalog model.
//!
//! The XML is read once with `roxmltree` into owned structures. Element
//! names are matched by local name so that catalogs with or without the
//! InvCatalog namespace prefix are accepted.
//!
//! ```text
//! <catalog>
//! ├── <service name serviceType base>    (Compound services nest others)
//! ├── <catalogRef xlink:href>
//! └── <dataset name ID urlPath>
//!     ├── <property name value>
//!     ├── <access urlPath serviceName>
//!     ├── <documentation>, <variables>, <geospatialCoverage>, <timeCoverage>
//!     ├── <metadata inherited="true"> ... </metadata>
//!     └── <dataset> ...
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use roxmltree::Node;

use crate::error::{AppError, Result};
use crate::utils::resolve;

const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// A parsed THREDDS catalog document.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// URI the catalog was read from; relative references resolve against it
    pub uri: String,
    pub services: Vec<Service>,
    pub datasets: Vec<Dataset>,
    /// Top-level catalog references
    pub catalog_refs: Vec<CatalogRef>,
}

impl Catalog {
    /// Every catalog reference in the document, at any depth.
    pub fn all_catalog_refs(&self) -> Vec<&CatalogRef> {
        fn collect<'a>(dataset: &'a Dataset, out: &mut Vec<&'a CatalogRef>) {
            out.extend(dataset.catalog_refs.iter());
            for child in &dataset.datasets {
                collect(child, out);
            }
        }

        let mut refs: Vec<&CatalogRef> = self.catalog_refs.iter().collect();
        for dataset in &self.datasets {
            collect(dataset, &mut refs);
        }
        refs
    }
}

/// A data access service declared by the catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Service {
    pub name: String,
    pub service_type: String,
    pub base: String,
    pub description: Option<String>,
    /// Member services of a Compound service
    pub nested: Vec<Service>,
}

impl Service {
    fn is_compound(&self) -> bool {
        self.service_type.eq_ignore_ascii_case("compound")
    }

    /// Human-readable description, defaulting to the service name.
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.name)
    }
}

/// Link to another catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRef {
    pub title: Option<String>,
    /// Absolute URI of the referenced catalog
    pub href: String,
}

/// A `name`/`value` property pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: String,
}

/// One resolved way of reaching a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Access {
    pub service_type: String,
    pub service_description: String,
    pub url_path: String,
    /// Service base joined with the url path, resolved against the catalog
    pub url: String,
}

/// A variable declared in a `<variables>` block.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub vocabulary_name: Option<String>,
    pub units: Option<String>,
    pub description: String,
}

/// Variables sharing one vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableGroup {
    pub vocabulary: String,
    pub variables: Vec<Variable>,
}

/// A `start` + `size` coordinate range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub start: f64,
    pub size: f64,
}

impl Range {
    pub fn end(&self) -> f64 {
        self.start + self.size
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeospatialCoverage {
    pub north_south: Range,
    pub east_west: Range,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeCoverage {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A catalog dataset node and its subtree.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub id: Option<String>,
    pub name: Option<String>,
    pub url_path: Option<String>,
    pub properties: Vec<Property>,
    pub access: Vec<Access>,
    pub documentation: Vec<String>,
    pub variables: Vec<VariableGroup>,
    pub geospatial_coverage: Option<GeospatialCoverage>,
    pub time_coverage: Option<TimeCoverage>,
    pub datasets: Vec<Dataset>,
    pub catalog_refs: Vec<CatalogRef>,
}

impl Dataset {
    /// Value of the first property with this name.
    pub fn find_property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    /// True when the property exists with a non-blank value.
    pub fn has_property(&self, name: &str) -> bool {
        self.find_property(name)
            .is_some_and(|v| !v.trim().is_empty())
    }

    /// A dataset without identity that only groups catalog references.
    pub fn is_container(&self) -> bool {
        self.id.is_none()
            && self.properties.is_empty()
            && self.access.is_empty()
            && self.datasets.is_empty()
            && !self.catalog_refs.is_empty()
    }
}

/// Parse a THREDDS catalog document read from `uri`.
pub fn parse_catalog(uri: &str, xml: &str) -> Result<Catalog> {
    let doc = roxmltree::Document::parse(xml)?;
    let root = doc.root_element();
    if root.tag_name().name() != "catalog" {
        return Err(AppError::invalid_document(
            uri,
            format!("expected <catalog>, found <{}>", root.tag_name().name()),
        ));
    }

    let services: Vec<Service> = children(root, "service").map(parse_service).collect();
    let parser = CatalogParser {
        uri,
        services: &services,
    };

    let mut datasets = Vec::new();
    let mut catalog_refs = Vec::new();
    for child in root.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "dataset" => datasets.push(parser.parse_dataset(child, None)),
            "catalogRef" => catalog_refs.extend(parser.parse_catalog_ref(child)),
            _ => {}
        }
    }

    log::debug!(
        "Parsed catalog {}: {} services, {} datasets, {} catalog refs",
        uri,
        services.len(),
        datasets.len(),
        catalog_refs.len()
    );

    Ok(Catalog {
        uri: uri.to_string(),
        services,
        datasets,
        catalog_refs,
    })
}

struct CatalogParser<'a> {
    uri: &'a str,
    services: &'a [Service],
}

impl CatalogParser<'_> {
    fn parse_dataset(&self, node: Node, inherited_service: Option<&str>) -> Dataset {
        let own_service = node
            .attribute("serviceName")
            .map(str::to_string)
            .or_else(|| child_text(node, "serviceName"))
            .or_else(|| children(node, "metadata").find_map(|m| child_text(m, "serviceName")));
        let inheritable_service = children(node, "metadata")
            .filter(|m| m.attribute("inherited") == Some("true"))
            .find_map(|m| child_text(m, "serviceName"));
        let service_for_children = inheritable_service.as_deref().or(inherited_service);
        let effective_service = own_service.as_deref().or(service_for_children);

        let url_path = node.attribute("urlPath").map(str::to_string);

        let mut access = Vec::new();
        if let (Some(path), Some(service)) = (url_path.as_deref(), effective_service) {
            access.extend(self.resolve_access(service, path));
        }
        for entry in children(node, "access") {
            let Some(path) = entry.attribute("urlPath") else {
                continue;
            };
            match entry.attribute("serviceName").or(effective_service) {
                Some(service) => access.extend(self.resolve_access(service, path)),
                None => log::warn!("Access {} in {} names no service", path, self.uri),
            }
        }

        let mut datasets = Vec::new();
        let mut catalog_refs = Vec::new();
        for child in node.children().filter(Node::is_element) {
            match child.tag_name().name() {
                "dataset" => datasets.push(self.parse_dataset(child, service_for_children)),
                "catalogRef" => catalog_refs.extend(self.parse_catalog_ref(child)),
                _ => {}
            }
        }

        Dataset {
            id: node.attribute("ID").map(str::to_string),
            name: node.attribute("name").map(str::to_string),
            url_path,
            properties: scoped(node, "property")
                .filter_map(|p| {
                    Some(Property {
                        name: p.attribute("name")?.to_string(),
                        value: p.attribute("value").unwrap_or_default().to_string(),
                    })
                })
                .collect(),
            access,
            documentation: scoped(node, "documentation")
                .map(|d| inline_text(d).trim().to_string())
                .filter(|text| !text.is_empty())
                .collect(),
            variables: scoped(node, "variables").map(parse_variables).collect(),
            geospatial_coverage: scoped(node, "geospatialCoverage").find_map(parse_geospatial),
            time_coverage: scoped(node, "timeCoverage").find_map(parse_time_coverage),
            datasets,
            catalog_refs,
        }
    }

    fn parse_catalog_ref(&self, node: Node) -> Option<CatalogRef> {
        let href = node
            .attribute((XLINK_NS, "href"))
            .or_else(|| local_attribute(node, "href"))?;
        Some(CatalogRef {
            title: node
                .attribute((XLINK_NS, "title"))
                .or_else(|| local_attribute(node, "title"))
                .map(str::to_string),
            href: resolve(self.uri, href).unwrap_or_else(|| href.to_string()),
        })
    }

    /// Resolve a service name to concrete access entries, expanding Compound services.
    fn resolve_access(&self, service_name: &str, url_path: &str) -> Vec<Access> {
        let Some(service) = find_service(self.services, service_name) else {
            log::warn!("Unknown service '{}' in {}", service_name, self.uri);
            return Vec::new();
        };

        let members: Vec<&Service> = if service.is_compound() {
            service.nested.iter().collect()
        } else {
            vec![service]
        };

        members
            .into_iter()
            .map(|s| {
                let joined = format!("{}{}", s.base, url_path);
                Access {
                    service_type: s.service_type.clone(),
                    service_description: s.description().to_string(),
                    url_path: url_path.to_string(),
                    url: resolve(self.uri, &joined).unwrap_or(joined),
                }
            })
            .collect()
    }
}

fn find_service<'a>(services: &'a [Service], name: &str) -> Option<&'a Service> {
    services.iter().find_map(|s| {
        if s.name == name {
            Some(s)
        } else {
            find_service(&s.nested, name)
        }
    })
}

fn parse_service(node: Node) -> Service {
    Service {
        name: node.attribute("name").unwrap_or_default().to_string(),
        service_type: node.attribute("serviceType").unwrap_or_default().to_string(),
        base: node.attribute("base").unwrap_or_default().to_string(),
        description: node.attribute("desc").map(str::to_string),
        nested: children(node, "service").map(parse_service).collect(),
    }
}

fn parse_variables(node: Node) -> VariableGroup {
    VariableGroup {
        vocabulary: node.attribute("vocabulary").unwrap_or_default().to_string(),
        variables: children(node, "variable")
            .filter_map(|v| {
                Some(Variable {
                    name: v.attribute("name")?.to_string(),
                    vocabulary_name: v.attribute("vocabulary_name").map(str::to_string),
                    units: v.attribute("units").map(str::to_string),
                    description: inline_text(v).trim().to_string(),
                })
            })
            .collect(),
    }
}

fn parse_range(node: Node, name: &str) -> Option<Range> {
    let range = children(node, name).next()?;
    let number = |field: &str| child_text(range, field)?.trim().parse::<f64>().ok();
    Some(Range {
        start: number("start")?,
        size: number("size").unwrap_or(0.0),
    })
}

fn parse_geospatial(node: Node) -> Option<GeospatialCoverage> {
    let coverage = GeospatialCoverage {
        north_south: parse_range(node, "northsouth")?,
        east_west: parse_range(node, "eastwest")?,
    };
    Some(coverage)
}

fn parse_time_coverage(node: Node) -> Option<TimeCoverage> {
    let start = child_text(node, "start").and_then(|t| parse_date(&t));
    let end = child_text(node, "end").and_then(|t| parse_date(&t));
    let duration = child_text(node, "duration").and_then(|t| parse_duration(&t));

    let coverage = match (start, end, duration) {
        (Some(start), Some(end), _) => Some(TimeCoverage { start, end }),
        (Some(start), None, Some(d)) => start
            .checked_add_signed(d)
            .map(|end| TimeCoverage { start, end }),
        (None, Some(end), Some(d)) => end
            .checked_sub_signed(d)
            .map(|start| TimeCoverage { start, end }),
        _ => {
            log::debug!("Ignoring incomplete timeCoverage");
            return None;
        }
    };
    if coverage.is_none() {
        log::warn!("Ignoring timeCoverage whose duration leaves the supported date range");
    }
    coverage
}

/// Parse the date forms that appear in THREDDS `timeCoverage` blocks.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("present") {
        return Some(Utc::now());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    let text = text.strip_suffix('Z').unwrap_or(text);
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
    ];
    if let Some(dt) = FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    {
        return Some(dt.and_utc());
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Parse a udunits-style duration such as `10 days` or `6 hours`.
pub fn parse_duration(text: &str) -> Option<TimeDelta> {
    let mut parts = text.split_whitespace();
    let amount: f64 = parts.next()?.parse().ok()?;
    let unit = parts.next().unwrap_or("days").to_ascii_lowercase();
    let seconds_per_unit = match unit.trim_end_matches('s') {
        "sec" | "second" => 1.0,
        "min" | "minute" => 60.0,
        "hour" | "hr" => 3_600.0,
        "day" => 86_400.0,
        "week" => 604_800.0,
        "month" => 2_629_800.0,
        "year" => 31_557_600.0,
        _ => return None,
    };
    TimeDelta::try_seconds((amount * seconds_per_unit).round() as i64)
}

fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |c| c.has_tag_name(name))
}

/// Elements named `name` directly under `node` or under its `<metadata>` blocks.
fn scoped<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    children(node, name).chain(children(node, "metadata").flat_map(move |m| children(m, name)))
}

fn child_text(node: Node, name: &str) -> Option<String> {
    children(node, name)
        .next()
        .map(inline_text)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn inline_text(node: Node) -> String {
    node.descendants()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect()
}

fn local_attribute<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attributes()
        .find(|a| a.name() == name)
        .map(|a| a.value())
}
