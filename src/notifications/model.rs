use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DramaError, Result};

/// A raw notification as served by `/unread` and `/notifications`.
///
/// Only `id` is guaranteed. Everything else depends on the notification
/// kind, so it is optional here and checked by whichever parser needs it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Notification {
    pub id: u64,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
    /// `0` for direct messages.
    #[serde(default)]
    pub post_id: Option<u64>,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub post: Option<PostRef>,
    #[serde(default)]
    pub parent_comment_id: Option<u64>,
    /// Comment nesting depth; 1 is top level.
    #[serde(default)]
    pub level: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub id: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostRef {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
}

impl Notification {
    /// Read the typed view out of a raw JSON item.
    pub fn from_value(item: &Value) -> Result<Self> {
        Ok(Notification::deserialize(item)?)
    }

    pub fn author_id(&self) -> Option<u64> {
        self.author.as_ref().and_then(|a| a.id)
    }

    /// The HTML body, or an empty string when absent.
    pub fn html(&self) -> &str {
        self.body_html.as_deref().unwrap_or_default()
    }

    pub(crate) fn require_html(&self) -> Result<&str> {
        self.body_html
            .as_deref()
            .ok_or_else(|| DramaError::malformed(self.id, "body_html"))
    }

    pub(crate) fn require_author_name(&self) -> Result<String> {
        self.author_name
            .clone()
            .ok_or_else(|| DramaError::malformed(self.id, "author_name"))
    }

    pub(crate) fn require_author_id(&self) -> Result<u64> {
        self.author_id()
            .ok_or_else(|| DramaError::malformed(self.id, "author.id"))
    }
}

/// A notification reduced to what a bot needs to act on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParsedEvent {
    /// Someone gifted us coins.
    Transfer {
        id: u64,
        user_id: u64,
        user_name: String,
        amount: u64,
    },
    /// Someone mentioned us in a post.
    PostMention {
        id: u64,
        user_id: u64,
        user_name: String,
        post_id: u64,
        post_name: String,
    },
    Follow {
        id: u64,
        user_id: u64,
        user_name: String,
    },
    Unfollow {
        id: u64,
        user_id: u64,
        user_name: String,
    },
    DirectMessage {
        id: u64,
        user_id: u64,
        user_name: String,
        /// Body text with markup stripped.
        message: String,
        message_html: String,
    },
    /// A reply to one of our comments. `parent_id` is the comment to answer.
    CommentReply {
        id: u64,
        parent_id: u64,
        post_id: u64,
        post_name: String,
    },
    /// A comment mentioning us.
    CommentMention {
        id: u64,
        user_id: u64,
        user_name: String,
        /// Raw comment body; absent when the server omits it.
        message: Option<String>,
        post_id: u64,
        /// `None` for top-level comments.
        parent_comment_id: Option<u64>,
    },
}

impl ParsedEvent {
    /// Id of the source notification.
    pub fn id(&self) -> u64 {
        match self {
            ParsedEvent::Transfer { id, .. }
            | ParsedEvent::PostMention { id, .. }
            | ParsedEvent::Follow { id, .. }
            | ParsedEvent::Unfollow { id, .. }
            | ParsedEvent::DirectMessage { id, .. }
            | ParsedEvent::CommentReply { id, .. }
            | ParsedEvent::CommentMention { id, .. } => *id,
        }
    }

    /// The `type` tag used in serialized form.
    pub fn kind(&self) -> &'static str {
        match self {
            ParsedEvent::Transfer { .. } => "transfer",
            ParsedEvent::PostMention { .. } => "post_mention",
            ParsedEvent::Follow { .. } => "follow",
            ParsedEvent::Unfollow { .. } => "unfollow",
            ParsedEvent::DirectMessage { .. } => "direct_message",
            ParsedEvent::CommentReply { .. } => "comment_reply",
            ParsedEvent::CommentMention { .. } => "comment_mention",
        }
    }
}

/// Why a notification produced no event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    Welcome,
    ApiApproval,
    /// A system message we have no parser for.
    UnrecognizedSystemMessage,
}

/// Outcome of classifying a single notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Event(ParsedEvent),
    Suppressed(SuppressReason),
}

impl Classification {
    pub fn into_event(self) -> Option<ParsedEvent> {
        match self {
            Classification::Event(event) => Some(event),
            Classification::Suppressed(_) => None,
        }
    }
}
