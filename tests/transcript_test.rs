use std::sync::Arc;

use siterank::scraping::{FetchSettings, HttpFetcher, TranscriptFetcher, YoutubeTranscriptFetcher};
use tokio::sync::Semaphore;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VIDEO: &str = "dQw4w9WgXcQ";

fn transcripts(server: &MockServer) -> YoutubeTranscriptFetcher {
    let fetcher = HttpFetcher::from_settings(&FetchSettings::default(), Arc::new(Semaphore::new(2)))
        .expect("client");
    YoutubeTranscriptFetcher::with_base_url(Arc::new(fetcher), server.uri())
}

#[tokio::test]
async fn follows_first_caption_track_to_plain_text() {
    let server = MockServer::start().await;
    let watch_page = format!(
        r#"<html><script>var ytInitialPlayerResponse = {{"captions":{{"playerCaptionsTracklistRenderer":{{"captionTracks":[{{"baseUrl":"{}/api/timedtext?v={}&lang=en","name":{{"simpleText":"English"}}}}]}}}}}};</script></html>"#,
        server.uri(),
        VIDEO
    );
    Mock::given(method("GET"))
        .and(path("/watch"))
        .and(query_param("v", VIDEO))
        .respond_with(ResponseTemplate::new(200).set_body_string(watch_page))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/timedtext"))
        .and(query_param("v", VIDEO))
        .and(query_param("lang", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<transcript><text start="0" dur="1.5">ISO standards</text><text start="1.5" dur="2">for &amp;amp; cameras</text></transcript>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let text = transcripts(&server)
        .fetch_transcript(&format!("https://youtu.be/{}", VIDEO))
        .await;

    assert_eq!(text, "ISO standards for & cameras");
}

#[tokio::test]
async fn video_without_captions_has_no_transcript() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/watch"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>no captions here</html>"))
        .mount(&server)
        .await;

    let text = transcripts(&server)
        .fetch_transcript(&format!("https://www.youtube.com/watch?v={}", VIDEO))
        .await;

    assert!(text.is_empty());
}

#[tokio::test]
async fn unrecognized_url_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let text = transcripts(&server)
        .fetch_transcript("https://www.youtube.com/@channel")
        .await;

    assert!(text.is_empty());
}
