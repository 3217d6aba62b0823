pub mod fetcher;
pub mod links;
pub mod transcript;
pub mod user_agent;

pub use fetcher::{ContentFetcher, FetchOutcome, FetchSettings, HttpFetcher};
pub use links::{extract_links, DomainMatch};
pub use transcript::{is_transcript_url, TranscriptFetcher, YoutubeTranscriptFetcher};
