// drama-client: API client and notification parser for rDrama-style forums.
//
// `api` wraps the HTTP endpoints (posting, messaging, coin transfers,
// lookups). `notifications` turns the unread list into typed events.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod notifications;

pub use api::client::{CommentQuery, DramaClient, Fullname};
pub use api::transport::{ApiRequest, Attachment, Transport};
pub use config::Config;
pub use error::{DramaError, Result};
pub use notifications::{process_unread, ParsedEvent};
