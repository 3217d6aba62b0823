use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use super::fetcher::ContentFetcher;

/// URL shapes served by the transcript fetcher instead of the page fetcher.
const TRANSCRIPT_URL_MARKERS: &[&str] = &[
    "youtube.com/watch",
    "youtu.be/",
    "youtube.com/embed/",
    "youtube.com/v/",
];

pub const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";

/// `true` for video URLs whose content comes from a transcript.
pub fn is_transcript_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    TRANSCRIPT_URL_MARKERS.iter().any(|m| lower.contains(m))
}

static VIDEO_ID_RES: OnceLock<Vec<Regex>> = OnceLock::new();
static CAPTION_TRACK_RE: OnceLock<Regex> = OnceLock::new();
static TIMED_TEXT_RE: OnceLock<Regex> = OnceLock::new();

fn video_id_res() -> &'static [Regex] {
    VIDEO_ID_RES.get_or_init(|| {
        [
            r"youtu\.be/([A-Za-z0-9_-]{11})",
            r"[?&]v=([A-Za-z0-9_-]{11})",
            r"/(?:embed|v)/([A-Za-z0-9_-]{11})",
            r"^([A-Za-z0-9_-]{11})$",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid video id pattern"))
        .collect()
    })
}

fn caption_track_re() -> &'static Regex {
    CAPTION_TRACK_RE.get_or_init(|| {
        Regex::new(r#""captionTracks":\s*\[\s*\{\s*"baseUrl":\s*"([^"]+)""#)
            .expect("valid caption track pattern")
    })
}

fn timed_text_re() -> &'static Regex {
    TIMED_TEXT_RE.get_or_init(|| Regex::new(r"(?s)<text\b[^>]*>(.*?)</text>").expect("valid timed text pattern"))
}

/// Eleven-character video id from any supported URL shape, or a bare id.
pub fn extract_video_id(url: &str) -> Option<String> {
    let trimmed = url.trim();
    video_id_res()
        .iter()
        .find_map(|re| re.captures(trimmed))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn unescape_json_url(raw: &str) -> String {
    raw.replace("\\u0026", "&")
        .replace("\\u003d", "=")
        .replace("\\/", "/")
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

/// Plain text of every `<text>` cue in a timed-text document, space-joined.
pub fn timed_text_to_plain(xml: &str) -> String {
    timed_text_re()
        .captures_iter(xml)
        .filter_map(|c| c.get(1))
        .map(|m| decode_entities(&decode_entities(m.as_str())))
        .map(|cue| cue.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|cue| !cue.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Transcript source for a video URL. An empty string means no transcript.
#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    async fn fetch_transcript(&self, url: &str) -> String;
}

/// Best-effort caption scraper: watch page → first caption track → timed-text cues.
pub struct YoutubeTranscriptFetcher {
    fetcher: Arc<dyn ContentFetcher>,
    base_url: String,
}

impl YoutubeTranscriptFetcher {
    pub fn new(fetcher: Arc<dyn ContentFetcher>) -> Self {
        Self::with_base_url(fetcher, YOUTUBE_BASE_URL)
    }

    pub fn with_base_url(fetcher: Arc<dyn ContentFetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TranscriptFetcher for YoutubeTranscriptFetcher {
    async fn fetch_transcript(&self, url: &str) -> String {
        let Some(video_id) = extract_video_id(url) else {
            debug!("no video id in {}", url);
            return String::new();
        };

        let watch_url = format!("{}/watch?v={}", self.base_url, video_id);
        let page = self.fetcher.fetch(&watch_url).await.into_content();
        let Some(track_url) = caption_track_re()
            .captures(&page)
            .and_then(|c| c.get(1))
            .map(|m| unescape_json_url(m.as_str()))
        else {
            debug!("no caption track for video {}", video_id);
            return String::new();
        };

        let xml = self.fetcher.fetch(&track_url).await.into_content();
        timed_text_to_plain(&xml)
    }
}
