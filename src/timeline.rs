use std::sync::Arc;

use crate::cache::{TimelineCache, cache_key};
use crate::client::XClient;
use crate::config::{FetchConfig, FetchOptions, normalize_screen_name};
use crate::error::Result;
use crate::model::{EnrichedPost, RawPost};

/// Fetch, enrich and cache a user's timeline.
pub struct TimelineService {
    client: XClient,
    cache: Arc<dyn TimelineCache>,
}

impl TimelineService {
    pub fn new(client: XClient, cache: Arc<dyn TimelineCache>) -> Self {
        Self { client, cache }
    }

    /// Validate loose options, then behave as [`TimelineService::get_tweets`].
    /// Nothing is fetched when validation fails.
    pub async fn get_tweets_with(&self, options: FetchOptions) -> Result<Vec<EnrichedPost>> {
        let config = FetchConfig::from_options(options)?;
        self.get_tweets(&config).await
    }

    /// Latest posts for `config.screen_name()`, newest first as the API
    /// returns them.
    ///
    /// A live cache entry is returned as stored. On a miss the page is
    /// fetched and enriched, then cached, or, with caching disabled, any
    /// earlier entry for the account is dropped. Errors are never masked by
    /// stale cache contents.
    pub async fn get_tweets(&self, config: &FetchConfig) -> Result<Vec<EnrichedPost>> {
        let key = cache_key(config.screen_name());

        if config.cache_enabled() {
            if let Some(posts) = self.cache.get(&key).await {
                tracing::debug!(screen_name = config.screen_name(), "timeline cache hit");
                return Ok(posts);
            }
            tracing::debug!(screen_name = config.screen_name(), "timeline cache miss");
        }

        let body = self
            .client
            .fetch_user_timeline(config.credentials(), &config.query())
            .await?;
        let raw: Vec<RawPost> = serde_json::from_slice(&body)?;

        let posts: Vec<EnrichedPost> = raw
            .into_iter()
            .map(|post| EnrichedPost::enrich(post, config.show_retweeted_by()))
            .collect();

        tracing::info!(
            screen_name = config.screen_name(),
            posts = posts.len(),
            "fetched user timeline"
        );

        if config.cache_enabled() {
            self.cache
                .put(&key, posts.clone(), config.cache_expiration())
                .await;
        } else {
            self.cache.invalidate(&key).await;
        }

        Ok(posts)
    }

    /// Drop the cached timeline for `screen_name`, if any. The name is
    /// normalized the same way [`FetchConfig`] normalizes it.
    pub async fn invalidate(&self, screen_name: &str) {
        self.cache
            .invalidate(&cache_key(normalize_screen_name(screen_name)))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::error::{Error, ErrorKind};
    use serde_json::{Value, json};
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TIMELINE_PATH: &str = "/1.1/statuses/user_timeline.json";

    fn options() -> FetchOptions {
        FetchOptions {
            consumer_key: Some("ck".into()),
            consumer_secret: Some("cs".into()),
            screen_name: Some("netglooweb".into()),
            ..Default::default()
        }
    }

    fn config(options: FetchOptions) -> FetchConfig {
        FetchConfig::from_options(options).unwrap()
    }

    fn timeline() -> Value {
        json!([
            {
                "id": 3,
                "id_str": "3",
                "text": "newest",
                "user": { "screen_name": "netglooweb" },
                "entities": {
                    "media": [
                        { "type": "photo", "media_url": "http://pbs.twimg.com/A.jpg" },
                        { "type": "video", "media_url": "http://pbs.twimg.com/B.jpg" },
                        { "type": "photo", "media_url": "http://pbs.twimg.com/C.jpg" }
                    ]
                }
            },
            {
                "id": 2,
                "id_str": "2",
                "text": "RT @nasa: liftoff",
                "user": { "screen_name": "netglooweb" },
                "retweeted_status": {
                    "id": 1,
                    "text": "liftoff",
                    "user": { "screen_name": "nasa" }
                }
            },
            {
                "id": 0,
                "id_str": "0",
                "text": "oldest",
                "user": { "screen_name": "netglooweb" }
            }
        ])
    }

    async fn mount_timeline(server: &MockServer, body: Value, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path(TIMELINE_PATH))
            .and(query_param("screen_name", "netglooweb"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    fn service(server: &MockServer, cache: Arc<MemoryCache>) -> TimelineService {
        let client = XClient::with_options(&server.uri(), Duration::from_secs(5)).unwrap();
        TimelineService::new(client, cache)
    }

    fn ids(posts: &[EnrichedPost]) -> Vec<u64> {
        posts.iter().map(|p| p.post().id).collect()
    }

    #[tokio::test]
    async fn fetch_enriches_posts_in_upstream_order() {
        let server = MockServer::start().await;
        mount_timeline(&server, timeline(), 1).await;
        let service = service(&server, Arc::new(MemoryCache::new()));

        let posts = service.get_tweets(&config(options())).await.unwrap();

        assert_eq!(ids(&posts), [3, 2, 0]);
        assert_eq!(
            posts[0].media_photo_urls(),
            ["http://pbs.twimg.com/A.jpg", "http://pbs.twimg.com/C.jpg"]
        );
        assert_eq!(
            posts[0].primary_media_photo_url(),
            Some("http://pbs.twimg.com/A.jpg")
        );
        assert!(posts[1].is_retweet());
        assert!(posts[1].display_text().contains("@nasa</a>: liftoff"));
        assert!(!posts[2].has_media_photo());
        assert_eq!(posts[2].display_text(), "oldest");
    }

    #[tokio::test]
    async fn count_and_retweet_flag_reach_the_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TIMELINE_PATH))
            .and(query_param("count", "5"))
            .and(query_param("include_rts", "false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        let service = service(&server, Arc::new(MemoryCache::new()));

        let posts = service
            .get_tweets(&config(FetchOptions {
                count: Some(5),
                include_retweets: Some(false),
                ..options()
            }))
            .await
            .unwrap();
        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn cache_hit_skips_the_network() {
        let server = MockServer::start().await;
        mount_timeline(&server, timeline(), 1).await;
        let service = service(&server, Arc::new(MemoryCache::new()));
        let config = config(options());

        let first = service.get_tweets(&config).await.unwrap();
        let second = service.get_tweets(&config).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn cached_batch_is_returned_as_stored() {
        let server = MockServer::start().await;
        mount_timeline(&server, timeline(), 1).await;
        let service = service(&server, Arc::new(MemoryCache::new()));

        let with_attribution = service.get_tweets(&config(options())).await.unwrap();
        let cached = service
            .get_tweets(&config(FetchOptions {
                show_retweeted_by: Some(false),
                ..options()
            }))
            .await
            .unwrap();

        assert_eq!(cached[1].display_text(), with_attribution[1].display_text());
    }

    #[tokio::test]
    async fn disabled_cache_always_fetches_and_clears_old_entry() {
        let server = MockServer::start().await;
        mount_timeline(&server, timeline(), 4).await;
        let cache = Arc::new(MemoryCache::new());
        let service = service(&server, cache.clone());

        service.get_tweets(&config(options())).await.unwrap();
        assert_eq!(cache.len().await, 1);

        let disabled = config(FetchOptions {
            cache_enabled: Some(false),
            ..options()
        });
        service.get_tweets(&disabled).await.unwrap();
        service.get_tweets(&disabled).await.unwrap();
        assert!(cache.is_empty().await);

        // Re-enabling must fetch again rather than see the pre-disable entry.
        service.get_tweets(&config(options())).await.unwrap();
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn expired_entry_triggers_fresh_fetch() {
        let server = MockServer::start().await;
        mount_timeline(&server, timeline(), 2).await;
        let service = service(&server, Arc::new(MemoryCache::new()));
        let config = config(FetchOptions {
            cache_expiration_seconds: Some(0),
            ..options()
        });

        service.get_tweets(&config).await.unwrap();
        service.get_tweets(&config).await.unwrap();
    }

    #[tokio::test]
    async fn accounts_are_cached_separately() {
        let server = MockServer::start().await;
        mount_timeline(&server, timeline(), 1).await;
        Mock::given(method("GET"))
            .and(path(TIMELINE_PATH))
            .and(query_param("screen_name", "nasa"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        let service = service(&server, Arc::new(MemoryCache::new()));

        let netgloo = service.get_tweets(&config(options())).await.unwrap();
        let nasa = service
            .get_tweets(&config(FetchOptions {
                screen_name: Some("nasa".into()),
                ..options()
            }))
            .await
            .unwrap();

        assert_eq!(netgloo.len(), 3);
        assert!(nasa.is_empty());
    }

    #[tokio::test]
    async fn missing_field_fails_before_any_request() {
        let server = MockServer::start().await;
        mount_timeline(&server, timeline(), 0).await;
        let service = service(&server, Arc::new(MemoryCache::new()));

        let err = service
            .get_tweets_with(FetchOptions {
                screen_name: None,
                ..options()
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(matches!(err, Error::MissingField { field: "screen_name" }));
    }

    #[tokio::test]
    async fn malformed_payload_is_decode_error_and_not_cached() {
        let server = MockServer::start().await;
        mount_timeline(&server, json!({ "unexpected": "object" }), 1).await;
        let cache = Arc::new(MemoryCache::new());
        let service = service(&server, cache.clone());

        let err = service.get_tweets(&config(options())).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn upstream_failure_does_not_fall_back_to_stale_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(timeline()))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Over capacity"))
            .mount(&server)
            .await;
        let service = service(&server, Arc::new(MemoryCache::new()));
        let config = config(FetchOptions {
            cache_expiration_seconds: Some(0),
            ..options()
        });

        service.get_tweets(&config).await.unwrap();
        let err = service.get_tweets(&config).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let server = MockServer::start().await;
        mount_timeline(&server, timeline(), 2).await;
        let service = service(&server, Arc::new(MemoryCache::new()));
        let config = config(options());

        service.get_tweets(&config).await.unwrap();
        service.invalidate("netglooweb").await;
        service.get_tweets(&config).await.unwrap();
    }
}
