//! Filesystem sink writing one Solr add message per record.
//!
//! ```text
//! {directory}/
//! ├── ds1.xml
//! └── ds1.file1.xml
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::Record;

use super::{RecordConsumer, SolrXmlBuilder};

/// Writes the indented add message of every record to `<directory>/<id>.xml`.
#[derive(Debug, Clone)]
pub struct FileWriter {
    directory: PathBuf,
}

impl FileWriter {
    pub const NAME: &'static str = "file";

    /// Create a writer for an existing directory.
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        if !directory.is_dir() {
            return Err(AppError::config(format!(
                "Directory: {} does not exist",
                directory.display()
            )));
        }
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the file holding the record with this id.
    ///
    /// Ids differing only in unsafe characters share a path.
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.directory.join(format!("{}.xml", file_stem(id)))
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let tmp = path.with_extension("xml.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

/// Replace characters that are unsafe in file names.
fn file_stem(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl RecordConsumer for FileWriter {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn consume(&self, record: &Record) -> Result<()> {
        let path = self.path_for(record.id());
        if file_stem(record.id()) != record.id() {
            log::warn!(
                "Record id {} stored as {}, other ids may map to the same file",
                record.id(),
                path.display()
            );
        }
        log::info!("Indexing record: {} to file: {}", record.id(), path.display());
        let xml = SolrXmlBuilder.add_message(record, true);
        self.write_bytes(&path, xml.as_bytes())
            .await
            .map_err(|e| AppError::sink(Self::NAME, format!("{}: {}", path.display(), e)))
    }
}
