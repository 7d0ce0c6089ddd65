//! Publishing pipeline.
//!
//! - `RecordProducer`: fan-out of records to subscribed sinks
//! - `CrawlerManager`: crawler dispatch by repository type
//! - `MetadataDeletionService`: retraction by id
//! - `PublishingService`: facade over the three, wired from `Config`
//! - `Invocation`: command line arguments mapped onto the facade

pub mod deletion;
pub mod invocation;
pub mod manager;
pub mod producer;
pub mod publish;

pub use deletion::MetadataDeletionService;
pub use invocation::{Invocation, USAGE};
pub use manager::CrawlerManager;
pub use producer::RecordProducer;
pub use publish::PublishingService;
