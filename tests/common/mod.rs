// Shared test helpers: an in-memory transport and notification builders.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use drama_client::{ApiRequest, Config, DramaClient, DramaError, Result, Transport};
use serde_json::{json, Value};

/// Records every request and answers from a queue of canned results.
/// An empty queue answers `null`.
#[derive(Default)]
pub struct FakeTransport {
    requests: Mutex<Vec<ApiRequest>>,
    responses: Mutex<VecDeque<Result<Value>>>,
}

impl FakeTransport {
    pub fn new(responses: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
        })
    }

    pub fn failing(error: DramaError) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::from([Err(error)])),
        })
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> ApiRequest {
        self.requests().pop().expect("no request was sent")
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Value::Null))
    }
}

pub fn client_with(transport: &Arc<FakeTransport>) -> DramaClient {
    let config = Config::new("secret-token", "example.net");
    DramaClient::with_transport(&config, transport.clone())
}

// -- Notification builders --

pub fn system_notification(id: u64, body_html: &str) -> Value {
    json!({
        "id": id,
        "author_name": "Drama",
        "author": {"id": 1},
        "post_id": 0,
        "body_html": body_html,
    })
}

pub fn follow_html(user_id: u64, name: &str) -> String {
    format!(
        r#"<p><a href="/id/{user_id}"><img loading="lazy" src="/pp/{user_id}" alt="@{name}">@{name}</a> has followed you!</p>"#
    )
}

pub fn transfer_html(user_id: u64, name: &str, amount: &str) -> String {
    format!(
        r#"<p><img loading="lazy" data-bs-toggle="tooltip" alt=":marseycapitalistmanlet:" src="/e/marseycapitalistmanlet.webp"> <a href="/id/{user_id}"><img loading="lazy" src="/pp/{user_id}">@{name}</a> has gifted you {amount} coins!</p>"#
    )
}

pub fn direct_message(id: u64, author: &str, author_id: u64, body_html: &str) -> Value {
    json!({
        "id": id,
        "author_name": author,
        "author": {"id": author_id},
        "post_id": 0,
        "body_html": body_html,
        "level": 1,
    })
}

pub fn comment_mention(id: u64, level: u32, parent_comment_id: Option<u64>) -> Value {
    json!({
        "id": id,
        "author_name": "carol",
        "author": {"id": 31},
        "post_id": 500,
        "body": "hey @bot what do you think",
        "body_html": "<p>hey <a href=\"/id/2\">@bot</a> what do you think</p>",
        "level": level,
        "parent_comment_id": parent_comment_id,
    })
}
