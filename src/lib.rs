pub mod cli;
pub mod config;
pub mod docid;
pub mod frontier;
pub mod key_encoder;
pub mod logging;
pub mod models;
pub mod scheduler;
pub mod store;
pub mod url_utils;

// Re-export main types for library usage
pub use config::{Config, DurabilityMode, FrontierConfig};
pub use docid::{DocIdAssignment, DocIdRegistry, InMemoryDocIds};
pub use frontier::{Frontier, FrontierStats};
pub use key_encoder::FrontierKey;
pub use models::UrlRecord;
pub use scheduler::{schedule_links, schedule_seeds, DiscoveredLink, ScheduleReport};
pub use store::{CrawlStore, OrderedStore, StoreError};
pub use url_utils::{canonicalize, canonicalize_url};
