use letterboxd_mirror::error::AppError;
use letterboxd_mirror::models::FeedConfig;
use letterboxd_mirror::services::{FeedSource, HttpFeedSource, normalize_all};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<rss version="2.0" xmlns:letterboxd="https://letterboxd.com">
  <channel>
    <title>Letterboxd - cinephile</title>
    <item>
      <title>Heat, 1995 - ★★★★½</title>
      <guid isPermaLink="false">letterboxd-review-101</guid>
      <letterboxd:watchedDate>2024-03-01</letterboxd:watchedDate>
      <letterboxd:filmTitle>Heat</letterboxd:filmTitle>
      <letterboxd:filmYear>1995</letterboxd:filmYear>
      <letterboxd:memberRating>4.5</letterboxd:memberRating>
      <description><![CDATA[<p><img src="https://a.ltrbxd.com/heat.jpg"/></p><p>Long.</p>]]></description>
    </item>
    <item>
      <title>No guid here</title>
    </item>
  </channel>
</rss>"#;

fn feed_config(server: &MockServer) -> FeedConfig {
    FeedConfig {
        user: "cinephile".into(),
        base_url: server.uri(),
    }
}

#[tokio::test]
async fn fetches_and_normalizes_member_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cinephile/rss/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(FEED, "application/rss+xml"))
        .expect(1)
        .mount(&server)
        .await;

    let source = HttpFeedSource::from_config(reqwest::Client::new(), &feed_config(&server));
    let items = source.fetch().await.expect("fetch ok");
    assert_eq!(items.len(), 2);

    let (entries, skipped) = normalize_all(&items);
    assert_eq!(skipped, 1);
    assert_eq!(entries[0].id, "letterboxd-review-101");
    assert_eq!(entries[0].display_title(), "Heat (1995) \u{2013} 4.5\u{2605}");
    assert_eq!(entries[0].body_html, "<p>Long.</p>");
}

#[tokio::test]
async fn http_failure_is_feed_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let source = HttpFeedSource::from_config(reqwest::Client::new(), &feed_config(&server));
    let err = source.fetch().await.unwrap_err();
    assert!(matches!(err, AppError::Feed(_)));
}

#[tokio::test]
async fn garbage_body_is_feed_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<rss><channel><item><guid>x</item></channel></rss>",
            "text/xml",
        ))
        .mount(&server)
        .await;

    let source = HttpFeedSource::from_config(reqwest::Client::new(), &feed_config(&server));
    let err = source.fetch().await.unwrap_err();
    assert!(matches!(err, AppError::Feed(_)));
}
