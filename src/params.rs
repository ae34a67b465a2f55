use schemars::JsonSchema;
use serde::Deserialize;

use crate::config::FetchOptions;

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GetTweetsParams {
    #[schemars(description = "Account whose recent posts to read, without the leading @. Defaults to the configured screen_name")]
    pub screen_name: Option<String>,
    #[schemars(description = "Number of posts to request (at least 1, default 20)")]
    pub count: Option<u32>,
    #[schemars(description = "Include retweets in the timeline (default true)")]
    pub include_retweets: Option<bool>,
    #[schemars(description = "Render retweets as 'RT @author: ...' of the original post (default true)")]
    pub show_retweeted_by: Option<bool>,
    #[schemars(description = "Serve and store the result through the per-account cache (default true). Disabling it also drops any cached batch")]
    pub cache_enabled: Option<bool>,
    #[schemars(description = "Seconds a fetched batch stays cached (default 60)")]
    pub cache_expiration_seconds: Option<u64>,
}

impl GetTweetsParams {
    /// Tool arguments as fetch options. Credentials always come from the
    /// server config, never from the caller.
    pub fn into_options(self) -> FetchOptions {
        FetchOptions {
            consumer_key: None,
            consumer_secret: None,
            screen_name: self.screen_name,
            count: self.count,
            include_retweets: self.include_retweets,
            show_retweeted_by: self.show_retweeted_by,
            cache_enabled: self.cache_enabled,
            cache_expiration_seconds: self.cache_expiration_seconds,
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct InvalidateCacheParams {
    #[schemars(description = "Account whose cached timeline should be dropped, without the leading @")]
    pub screen_name: String,
}
