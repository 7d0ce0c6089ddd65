//! Retraction of individual records by id.

use std::sync::Arc;

use crate::error::Result;
use crate::models::Record;
use crate::storage::RecordConsumer;

use super::RecordProducer;

/// Broadcasts identifier-only stub records to removal sinks.
///
/// Nothing is fetched: this is how a single record is retracted without
/// crawling its repository.
#[derive(Default)]
pub struct MetadataDeletionService {
    producer: RecordProducer,
}

impl MetadataDeletionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, consumer: Arc<dyn RecordConsumer>) {
        self.producer.subscribe(consumer);
    }

    /// Broadcast one stub per id, in order. Returns the number of stubs sent.
    ///
    /// A blank id fails the call; stubs broadcast before it stay delivered.
    pub async fn delete<S: AsRef<str>>(&self, ids: &[S]) -> Result<usize> {
        for id in ids {
            let stub = Record::stub(id.as_ref())?;
            log::info!("Deleting record: {}", stub.id());
            self.producer.notify(&stub).await?;
        }
        Ok(ids.len())
    }
}
