//! Remote metadata repository references.

use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Supported remote repository formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryType {
    /// Hierarchical THREDDS catalog
    Thredds,
    /// Authentication-service RDF feed
    Cas,
    /// OAI-PMH harvest feed
    Oai,
}

impl RepositoryType {
    pub const ALL: [RepositoryType; 3] = [
        RepositoryType::Thredds,
        RepositoryType::Cas,
        RepositoryType::Oai,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RepositoryType::Thredds => "THREDDS",
            RepositoryType::Cas => "CAS",
            RepositoryType::Oai => "OAI",
        }
    }
}

impl fmt::Display for RepositoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepositoryType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::UnsupportedType(s.to_string()))
    }
}

/// A repository to harvest: location, format and traversal depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    pub uri: String,
    pub kind: RepositoryType,
    pub recursive: bool,
}

impl RepositoryRef {
    pub fn new(uri: impl Into<String>, kind: RepositoryType, recursive: bool) -> Self {
        Self {
            uri: uri.into(),
            kind,
            recursive,
        }
    }
}
