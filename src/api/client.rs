// Typed action methods over the forum's HTTP API.
//
// Each method only templates a URL and maps arguments onto the form field
// names the server expects. Responses are returned as raw JSON since the
// server's schemas are undocumented and drift between deployments.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::transport::{ApiRequest, Attachment, HttpTransport, Transport};
use crate::config::Config;
use crate::error::{DramaError, Result};

/// Prefixed identifier telling the server what a reply is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fullname {
    Comment(u64),
    Post(u64),
}

impl fmt::Display for Fullname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fullname::Comment(id) => write!(f, "c_{id}"),
            Fullname::Post(id) => write!(f, "p_{id}"),
        }
    }
}

/// Parameters for the comment listing endpoints.
#[derive(Debug, Clone)]
pub struct CommentQuery {
    /// Restrict to one user's comments.
    pub user: Option<String>,
    /// Sort key understood by the server (`new`, `top`, `old`, ...).
    pub sort: String,
    /// Only comments created before this instant.
    pub before: Option<DateTime<Utc>>,
    /// Only comments created after this instant.
    pub after: Option<DateTime<Utc>>,
    /// How many pages to fetch, starting at page 1.
    pub pages: u32,
}

impl Default for CommentQuery {
    fn default() -> Self {
        Self {
            user: None,
            sort: "new".to_string(),
            before: None,
            after: None,
            pages: 1,
        }
    }
}

/// Client for one forum site, authenticated with a single token.
#[derive(Clone)]
pub struct DramaClient {
    transport: Arc<dyn Transport>,
    base_url: String,
}

impl DramaClient {
    /// Create a client that talks HTTP to the configured site.
    pub fn new(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client over a caller-supplied transport.
    pub fn with_transport(config: &Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            base_url: config.base_url(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: ApiRequest) -> Result<Value> {
        self.transport.send(request).await
    }

    // -- Posting and messaging --

    /// Submit a new post. `submission_url` may be empty for text posts.
    pub async fn make_post(&self, title: &str, submission_url: &str, body: &str) -> Result<Value> {
        self.send(
            ApiRequest::post(self.url("/submit"))
                .field("title", title)
                .field("url", submission_url)
                .field("body", body),
        )
        .await
    }

    /// Send a direct message to a user.
    pub async fn send_message(&self, username: &str, message: &str) -> Result<Value> {
        let url = self.url(&format!("/@{username}/message"));
        self.send(ApiRequest::post(url).field("message", message))
            .await
    }

    /// Reply under a comment or post, optionally attaching a file.
    pub async fn reply_to_comment(
        &self,
        parent: Fullname,
        submission: u64,
        message: &str,
        file: Option<Attachment>,
    ) -> Result<Value> {
        self.send(
            ApiRequest::post(self.url("/comment"))
                .field("parent_fullname", parent)
                .field("submission", submission)
                .field("body", message)
                .attachment(file),
        )
        .await
    }

    /// Reply to the comment with the given id.
    pub async fn reply_to_comment_by_id(
        &self,
        comment_id: u64,
        submission: u64,
        message: &str,
        file: Option<Attachment>,
    ) -> Result<Value> {
        self.reply_to_comment(Fullname::Comment(comment_id), submission, message, file)
            .await
    }

    /// Top-level comment on a post.
    pub async fn reply_to_post(&self, post_id: u64, message: &str) -> Result<Value> {
        self.reply_to_comment(Fullname::Post(post_id), post_id, message, None)
            .await
    }

    /// Reply inside a direct-message thread.
    ///
    /// The server answers 500 on some successful replies, so that status
    /// is tolerated.
    pub async fn reply_to_direct_message(&self, message_id: u64, message: &str) -> Result<Value> {
        self.send(
            ApiRequest::post(self.url("/reply"))
                .field("parent_id", message_id)
                .field("body", message)
                .allow_failure(500),
        )
        .await
    }

    /// Transfer coins to another user.
    pub async fn give_coins(&self, user: &str, amount: u64) -> Result<Value> {
        let url = self.url(&format!("/@{user}/transfer_coins"));
        self.send(ApiRequest::post(url).field("amount", amount))
            .await
    }

    // -- Lookups --

    pub async fn get_post(&self, id: u64) -> Result<Value> {
        self.send(ApiRequest::get(self.url(&format!("/post/{id}")))).await
    }

    pub async fn get_comment(&self, id: u64) -> Result<Value> {
        self.send(ApiRequest::get(self.url(&format!("/comment/{id}")))).await
    }

    pub async fn get_front_page(&self) -> Result<Value> {
        self.send(ApiRequest::get(self.url("/"))).await
    }

    pub async fn get_user_information(&self, id: u64) -> Result<Value> {
        self.send(ApiRequest::get(self.url(&format!("/{id}/info")))).await
    }

    /// List comments site-wide or for one user.
    ///
    /// A single page returns the server's response untouched. Several pages
    /// are fetched one after another and their `data` arrays concatenated
    /// into `{"data": [...]}`. Zero pages sends nothing and yields an empty
    /// `data` array.
    pub async fn get_comments(&self, query: &CommentQuery) -> Result<Value> {
        let path = match &query.user {
            Some(user) => format!("/@{user}/comments"),
            None => "/comments".to_string(),
        };
        let url = format!(
            "{}?sort={}&t=all&before={}&after={}",
            self.url(&path),
            query.sort,
            query.before.map_or(0, |t| t.timestamp()),
            query.after.map_or(0, |t| t.timestamp()),
        );

        if query.pages == 1 {
            return self.send(ApiRequest::get(url)).await;
        }

        let mut results = Vec::new();
        for page in 1..=query.pages {
            let page_url = format!("{url}&page={page}");
            let response = self.send(ApiRequest::get(page_url.clone())).await?;
            results.extend(data_array(response, &page_url)?);
        }
        Ok(serde_json::json!({ "data": results }))
    }

    /// Ask whether a link has already been submitted.
    pub async fn has_url_been_posted(&self, link: &str) -> Result<bool> {
        let response = self
            .send(ApiRequest::post(self.url("/is_repost")).field("url", link))
            .await?;
        Ok(response
            .get("permalink")
            .and_then(Value::as_str)
            .is_some_and(|permalink| !permalink.is_empty()))
    }

    // -- Notifications --

    /// One page of the full notification history.
    pub async fn get_notifications(&self, page: u32) -> Result<Value> {
        self.send(ApiRequest::get(self.url(&format!("/notifications?page={page}"))))
            .await
    }

    pub async fn get_unread_notifications(&self) -> Result<Value> {
        self.send(ApiRequest::get(self.url("/unread"))).await
    }

    /// Mark all notifications as read.
    pub async fn clear_notifications(&self) -> Result<Value> {
        self.send(ApiRequest::post(self.url("/clear"))).await
    }
}

/// Pull the `data` array out of a listing response.
pub(crate) fn data_array(response: Value, url: &str) -> Result<Vec<Value>> {
    match response {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(DramaError::UnexpectedResponse {
                url: url.to_string(),
                detail: "missing `data` array".to_string(),
            }),
        },
        _ => Err(DramaError::UnexpectedResponse {
            url: url.to_string(),
            detail: "response is not a JSON object".to_string(),
        }),
    }
}
