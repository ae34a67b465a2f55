use crate::config::{FetchOptions, normalize_screen_name};
use crate::error::{Error, ErrorKind};
use crate::params::{GetTweetsParams, InvalidateCacheParams};
use crate::timeline::TimelineService;
use rmcp::{
    ErrorData as McpError, ServerHandler, handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters, model::*, tool, tool_handler, tool_router,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct GetXServer {
    service: Arc<TimelineService>,
    defaults: FetchOptions,
    tool_router: ToolRouter<Self>,
}

impl GetXServer {
    fn describe_error(err: &Error) -> String {
        let class = match err.kind() {
            ErrorKind::Config => "Configuration error",
            ErrorKind::Network => "Network error",
            ErrorKind::Upstream => "Upstream error",
            ErrorKind::Decode => "Decode error",
        };
        let retry = if err.is_retryable() {
            "retryable"
        } else {
            "not retryable"
        };
        format!("{class} ({retry}): {err}")
    }
}

#[tool_router]
impl GetXServer {
    /// `defaults` holds the configured credentials plus any fetch options a
    /// tool call leaves unset.
    pub fn new(service: TimelineService, defaults: FetchOptions) -> Self {
        Self {
            service: Arc::new(service),
            defaults,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Get the most recent posts of an X (Twitter) account as JSON. Each post carries the API fields plus display_text (HTML), is_retweet, media_photo_urls, has_media_photo and primary_media_photo_url. Results are cached per account."
    )]
    async fn get_tweets(
        &self,
        Parameters(params): Parameters<GetTweetsParams>,
    ) -> Result<CallToolResult, McpError> {
        let options = params.into_options().or(self.defaults.clone());

        match self.service.get_tweets_with(options).await {
            Ok(posts) => {
                let json = serde_json::to_string_pretty(&posts).map_err(|e| {
                    McpError::internal_error(format!("Failed to serialize posts: {e}"), None)
                })?;
                Ok(CallToolResult::success(vec![Content::text(json)]))
            }
            Err(e) if e.kind() == ErrorKind::Config => {
                Err(McpError::invalid_params(Self::describe_error(&e), None))
            }
            Err(e) => {
                tracing::warn!(error = %e, "get_tweets failed");
                Ok(CallToolResult::error(vec![Content::text(
                    Self::describe_error(&e),
                )]))
            }
        }
    }

    #[tool(description = "Drop the cached timeline of an X (Twitter) account so the next get_tweets call fetches fresh posts.")]
    async fn invalidate_cache(
        &self,
        Parameters(params): Parameters<InvalidateCacheParams>,
    ) -> Result<CallToolResult, McpError> {
        let screen_name = normalize_screen_name(&params.screen_name);
        if screen_name.is_empty() {
            return Err(McpError::invalid_params("screen_name cannot be empty", None));
        }

        self.service.invalidate(screen_name).await;
        Ok(CallToolResult::success(vec![Content::text(format!(
            "Cache cleared for @{screen_name}"
        ))]))
    }
}

#[tool_handler]
impl ServerHandler for GetXServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "mcp-server-get-x".to_string(),
                title: None,
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "X (Twitter) timeline reader. Use get_tweets to read an account's recent \
                 posts, or invalidate_cache to force the next read to hit the API."
                    .to_string(),
            ),
        }
    }
}
