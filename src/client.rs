use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use rand::Rng;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config::Credentials;
use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.twitter.com";
const USER_TIMELINE_PATH: &str = "/1.1/statuses/user_timeline.json";

/// RFC 3986 unreserved characters. Everything else gets percent-encoded.
const RFC3986: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

type HmacSha1 = Hmac<sha1::Sha1>;

/// Query parameters for one page of a user's timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineQuery {
    pub screen_name: String,
    pub count: u32,
    pub include_retweets: bool,
}

impl TimelineQuery {
    fn params(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("screen_name".to_string(), self.screen_name.clone()),
            ("count".to_string(), self.count.to_string()),
            ("include_rts".to_string(), self.include_retweets.to_string()),
        ])
    }
}

#[derive(Deserialize)]
struct ApiErrors {
    errors: Vec<ApiError>,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<i64>,
    message: String,
}

pub struct XClient {
    http: Client,
    base_url: String,
}

impl XClient {
    /// Client against an alternative API root, with a bounded per-request
    /// timeout.
    pub fn with_options(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Network)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn user_timeline_url(&self) -> String {
        format!("{}{USER_TIMELINE_PATH}", self.base_url)
    }

    /// Signed GET of one timeline page. Returns the raw response body; a
    /// non-success status or an `errors` payload is an upstream error.
    pub async fn fetch_user_timeline(
        &self,
        credentials: &Credentials,
        query: &TimelineQuery,
    ) -> Result<Bytes> {
        let url = self.user_timeline_url();
        let params = query.params();
        let auth = oauth_header(credentials, "GET", &url, &params);

        tracing::debug!(
            screen_name = %query.screen_name,
            count = query.count,
            "requesting user timeline"
        );

        let resp = self
            .http
            .get(&url)
            .query(&params)
            .header("Authorization", auth)
            .send()
            .await
            .map_err(Error::Network)?;

        check_auth_error(&resp);
        let status = resp.status();
        if !status.is_success() {
            let reset = rate_limit_reset(&resp);
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                status: status.as_u16(),
                message: format!("{reset}{body}"),
            });
        }

        let body = resp.bytes().await.map_err(Error::Network)?;
        if let Some(err) = api_error(&body) {
            tracing::warn!(status = status.as_u16(), "X API returned an error payload");
            return Err(Error::Upstream {
                status: status.as_u16(),
                message: err,
            });
        }

        Ok(body)
    }
}

/// First message of an `{"errors": [...]}` body, if that is what we got.
fn api_error(body: &[u8]) -> Option<String> {
    let errors: ApiErrors = serde_json::from_slice(body).ok()?;
    let first = errors.errors.into_iter().next()?;
    Some(match first.code {
        Some(code) => format!("{} (code {code})", first.message),
        None => first.message,
    })
}

fn rate_limit_reset(resp: &Response) -> String {
    if resp.status().as_u16() != 429 {
        return String::new();
    }
    if let Some(reset) = resp.headers().get("x-rate-limit-reset") {
        if let Ok(val) = reset.to_str() {
            return format!("Rate limited; resets at timestamp {val}. ");
        }
    }
    "Rate limited. ".to_string()
}

fn check_auth_error(resp: &Response) {
    if resp.status().as_u16() == 401 {
        tracing::error!(
            "Received 401 Unauthorized from X API. \
             The consumer key or secret may be revoked or invalid. \
             Regenerate them at https://developer.x.com/"
        );
    }
}

// --- OAuth 1.0a ---

fn oauth_header(
    credentials: &Credentials,
    method: &str,
    url: &str,
    extra_params: &BTreeMap<String, String>,
) -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        .to_string();

    let nonce = {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill(&mut bytes);
        hex::encode(bytes)
    };

    signed_header(credentials, method, url, extra_params, &nonce, &timestamp)
}

fn signed_header(
    credentials: &Credentials,
    method: &str,
    url: &str,
    extra_params: &BTreeMap<String, String>,
    nonce: &str,
    timestamp: &str,
) -> String {
    let mut params = BTreeMap::new();
    params.insert("oauth_consumer_key".to_string(), credentials.consumer_key.clone());
    params.insert("oauth_nonce".to_string(), nonce.to_string());
    params.insert("oauth_signature_method".to_string(), "HMAC-SHA1".to_string());
    params.insert("oauth_timestamp".to_string(), timestamp.to_string());
    params.insert("oauth_token".to_string(), String::new());
    params.insert("oauth_version".to_string(), "1.0".to_string());

    for (k, v) in extra_params {
        params.insert(k.clone(), v.clone());
    }

    let signature = sign(&credentials.consumer_secret, method, url, &params);
    params.insert("oauth_signature".to_string(), signature);

    let header_parts: Vec<String> = params
        .iter()
        .filter(|(k, _)| k.starts_with("oauth_"))
        .map(|(k, v)| format!("{}=\"{}\"", pct_encode(k), pct_encode(v)))
        .collect();

    format!("OAuth {}", header_parts.join(", "))
}

/// HMAC-SHA1 over the signature base string. The token secret is always
/// empty, so the key is the encoded consumer secret followed by `&`.
fn sign(consumer_secret: &str, method: &str, url: &str, params: &BTreeMap<String, String>) -> String {
    let base_string = signature_base_string(method, url, params);
    let signing_key = format!("{}&", pct_encode(consumer_secret));

    let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(base_string.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

fn signature_base_string(method: &str, url: &str, params: &BTreeMap<String, String>) -> String {
    let param_string: String = params
        .iter()
        .map(|(k, v)| format!("{}={}", pct_encode(k), pct_encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        pct_encode(url),
        pct_encode(&param_string)
    )
}

fn pct_encode(input: &str) -> String {
    utf8_percent_encode(input, RFC3986).to_string()
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes
            .as_ref()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}
