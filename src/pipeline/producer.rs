//! Record fan-out to subscribed sinks.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Record;
use crate::services::RecordCallback;
use crate::storage::RecordConsumer;

/// Holds an ordered set of sinks and broadcasts records to them.
///
/// Sinks are attached once at wiring time. Subscribing the same sink
/// instance twice has no effect, so each distinct sink sees a record
/// exactly once per broadcast.
#[derive(Default, Clone)]
pub struct RecordProducer {
    consumers: Vec<Arc<dyn RecordConsumer>>,
}

impl RecordProducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a sink after those already subscribed.
    pub fn subscribe(&mut self, consumer: Arc<dyn RecordConsumer>) {
        let already = self
            .consumers
            .iter()
            .any(|c| std::ptr::addr_eq(Arc::as_ptr(c), Arc::as_ptr(&consumer)));
        if already {
            log::debug!("Sink '{}' already subscribed", consumer.name());
            return;
        }
        self.consumers.push(consumer);
    }

    /// Names of the subscribed sinks, in delivery order.
    pub fn consumer_names(&self) -> Vec<&str> {
        self.consumers.iter().map(|c| c.name()).collect()
    }

    /// Deliver `record` to every sink in subscription order.
    ///
    /// The first sink failure stops the broadcast and is returned; sinks
    /// that already consumed the record are not rolled back.
    pub async fn notify(&self, record: &Record) -> Result<()> {
        if self.consumers.is_empty() {
            log::warn!("No sink subscribed, dropping record {}", record.id());
        }
        for consumer in &self.consumers {
            log::debug!("Delivering {} to '{}'", record.id(), consumer.name());
            consumer.consume(record).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl RecordCallback for RecordProducer {
    async fn on_record(&self, record: Record) -> Result<()> {
        self.notify(&record).await
    }
}
