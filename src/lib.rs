pub mod core;
pub mod nlp;
pub mod scraping;
pub mod server;
pub mod tools;

// --- Primary core exports ---
pub use crate::core::error::{ProviderError, SearchError};
pub use crate::core::query::{parse_keywords, QueryContext};
pub use crate::core::types;
pub use crate::core::types::*;
pub use crate::core::AppState;

pub use tools::{analyze, crawl, iterative, pipeline, search};
