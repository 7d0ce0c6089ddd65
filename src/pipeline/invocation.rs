//! Command line operations.

use crate::error::{AppError, Result};
use crate::models::{RepositoryRef, RepositoryType};

use super::PublishingService;

/// Usage text printed for a malformed argument list.
pub const USAGE: &str = "\
Usage #1: to unpublish a single record:
          harvester <id>
Usage #2: to publish or unpublish a remote metadata repository:
          harvester <metadata repository URL> <metadata repository type> true|false
          where true: publish, false: unpublish
          and the type is one of THREDDS, CAS, OAI

Example: harvester nasa.jpl.tes.monthly
Example: harvester file:///data/catalogs/pcmdi.ipcc4.picntrl.mon.land.run1.v1.xml THREDDS true
Example: harvester http://pcmdi3.llnl.gov/thredds/esgcet/catalog.xml THREDDS false
Example: harvester file:///data/feeds/ORNL-oai_dif.xml OAI true
Example: harvester file:///data/feeds/cas_rdf.xml CAS true";

/// One operation requested on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Retract a single record by id
    UnpublishRecord { id: String },
    /// Publish a whole repository
    Publish(RepositoryRef),
    /// Unpublish a whole repository
    Unpublish(RepositoryRef),
}

impl Invocation {
    /// Interpret positional arguments.
    ///
    /// One argument is a record id. Three arguments are a repository URI,
    /// a type tag and a publish flag; repository operations always recurse.
    /// Any flag other than `true` (case-insensitive) means unpublish.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        match args {
            [id] => {
                let id = id.as_ref().trim();
                if id.is_empty() {
                    return Err(AppError::usage("record id is empty"));
                }
                Ok(Self::UnpublishRecord { id: id.to_string() })
            }
            [uri, kind, flag] => {
                let kind: RepositoryType = kind.as_ref().parse()?;
                let repository = RepositoryRef::new(uri.as_ref(), kind, true);
                if flag.as_ref().trim().eq_ignore_ascii_case("true") {
                    Ok(Self::Publish(repository))
                } else {
                    Ok(Self::Unpublish(repository))
                }
            }
            _ => Err(AppError::usage(format!(
                "expected 1 or 3 arguments, got {}",
                args.len()
            ))),
        }
    }

    /// Execute against the facade. Returns the number of records sent.
    pub async fn run(&self, service: &PublishingService) -> Result<usize> {
        match self {
            Self::UnpublishRecord { id } => service.unpublish_records(&[id.as_str()]).await,
            Self::Publish(repo) => service.publish(&repo.uri, repo.recursive, repo.kind).await,
            Self::Unpublish(repo) => service.unpublish(&repo.uri, repo.recursive, repo.kind).await,
        }
    }
}
