pub mod analyze;
pub mod crawl;
pub mod iterative;
pub mod pipeline;
pub mod search;
