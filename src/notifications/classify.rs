// Notification classifier.
//
// Decides which kind of event a raw notification is and extracts a
// normalized record. The decision tree is two ordered rule tables; the first
// rule whose predicate matches handles the notification. Sender identity is
// checked before content: system messages all come from one account and are
// told apart by markup, while peer notifications are told apart by
// structural fields.

use tracing::trace;

use super::markup::{self, Fragment};
use super::model::{Classification, Notification, ParsedEvent, SuppressReason};
use crate::error::{DramaError, Result};

/// Display name of the site's system account.
pub const SYSTEM_ACCOUNT_NAME: &str = "Drama";
/// User id of the site's system account.
pub const SYSTEM_ACCOUNT_ID: u64 = 1;
/// Service account whose notifications are replies to our comments.
pub const COMMENT_REPLY_ACCOUNT: &str = "HMSE";

/// Emoji alt text that opens a coin transfer notice.
pub const TRANSFER_MARKER: &str = ":marseycapitalistmanlet:";
pub const POST_MENTION_MARKER: &str = "has mentioned you: ";
pub const FOLLOW_MARKER: &str = "has followed you!";
pub const UNFOLLOW_MARKER: &str = "has unfollowed you!";
/// Opening of the message every new account receives.
pub const WELCOME_MARKER: &str = "Welcome to";
/// Tail of the message sent when an API application is approved.
pub const API_APPROVAL_MARKER: &str = "if you don't know what to do next";

/// One step of the decision tree.
pub struct Rule {
    pub name: &'static str,
    pub matches: fn(&Notification) -> bool,
    pub handle: fn(&Notification) -> Result<Classification>,
}

/// Top-level rules, in priority order. The last one always matches.
pub const RULES: &[Rule] = &[
    Rule {
        name: "system_message",
        matches: is_from_system_account,
        handle: classify_system_message,
    },
    Rule {
        name: "direct_message",
        matches: is_direct_message,
        handle: handle_direct_message,
    },
    Rule {
        name: "comment_reply",
        matches: is_comment_reply,
        handle: handle_comment_reply,
    },
    Rule {
        name: "comment_mention",
        matches: always,
        handle: handle_comment_mention,
    },
];

/// Rules for messages from the system account, in priority order.
/// Anything left over is suppressed as unrecognized.
pub const SYSTEM_RULES: &[Rule] = &[
    Rule {
        name: "transfer",
        matches: is_transfer,
        handle: handle_transfer,
    },
    Rule {
        name: "post_mention",
        matches: is_post_mention,
        handle: handle_post_mention,
    },
    Rule {
        name: "follow",
        matches: is_follow,
        handle: handle_follow,
    },
    Rule {
        name: "unfollow",
        matches: is_unfollow,
        handle: handle_unfollow,
    },
    Rule {
        name: "welcome",
        matches: is_welcome,
        handle: suppress_welcome,
    },
    Rule {
        name: "api_approval",
        matches: is_api_approval,
        handle: suppress_api_approval,
    },
];

/// Classify one notification and extract its record.
pub fn classify_and_parse(notification: &Notification) -> Result<Classification> {
    apply(RULES, notification)
}

/// Name of the top-level rule that would handle this notification.
pub fn matching_rule(notification: &Notification) -> Option<&'static str> {
    RULES
        .iter()
        .find(|rule| (rule.matches)(notification))
        .map(|rule| rule.name)
}

fn apply(rules: &[Rule], notification: &Notification) -> Result<Classification> {
    match rules.iter().find(|rule| (rule.matches)(notification)) {
        Some(rule) => {
            trace!(notification_id = notification.id, rule = rule.name, "Matched rule");
            (rule.handle)(notification)
        }
        None => Ok(Classification::Suppressed(
            SuppressReason::UnrecognizedSystemMessage,
        )),
    }
}

// -- Predicates --

pub fn is_from_system_account(n: &Notification) -> bool {
    n.author_name.as_deref() == Some(SYSTEM_ACCOUNT_NAME)
        || n.author_id() == Some(SYSTEM_ACCOUNT_ID)
}

pub fn is_direct_message(n: &Notification) -> bool {
    n.post_id == Some(0)
}

pub fn is_comment_reply(n: &Notification) -> bool {
    n.author_name.as_deref() == Some(COMMENT_REPLY_ACCOUNT)
}

fn always(_: &Notification) -> bool {
    true
}

/// First child of the body is the transfer emoji.
pub fn is_transfer(n: &Notification) -> bool {
    let fragment = Fragment::parse(n.html());
    let children = fragment.children();
    children
        .first()
        .is_some_and(|first| first.is_image_with_alt(TRANSFER_MARKER))
}

pub fn is_post_mention(n: &Notification) -> bool {
    n.html().contains(POST_MENTION_MARKER)
}

pub fn is_follow(n: &Notification) -> bool {
    n.html().contains(FOLLOW_MARKER)
}

pub fn is_unfollow(n: &Notification) -> bool {
    n.html().contains(UNFOLLOW_MARKER)
}

fn is_welcome(n: &Notification) -> bool {
    n.html().contains(WELCOME_MARKER)
}

fn is_api_approval(n: &Notification) -> bool {
    n.html().contains(API_APPROVAL_MARKER)
}

// -- Handlers --

fn classify_system_message(n: &Notification) -> Result<Classification> {
    apply(SYSTEM_RULES, n)
}

fn handle_transfer(n: &Notification) -> Result<Classification> {
    parse_transfer(n).map(Classification::Event)
}

fn handle_post_mention(n: &Notification) -> Result<Classification> {
    parse_post_mention(n).map(Classification::Event)
}

fn handle_follow(n: &Notification) -> Result<Classification> {
    parse_follow(n).map(Classification::Event)
}

fn handle_unfollow(n: &Notification) -> Result<Classification> {
    parse_unfollow(n).map(Classification::Event)
}

fn handle_direct_message(n: &Notification) -> Result<Classification> {
    parse_direct_message(n).map(Classification::Event)
}

fn handle_comment_reply(n: &Notification) -> Result<Classification> {
    parse_comment_reply(n).map(Classification::Event)
}

fn handle_comment_mention(n: &Notification) -> Result<Classification> {
    parse_comment_mention(n).map(Classification::Event)
}

fn suppress_welcome(_: &Notification) -> Result<Classification> {
    Ok(Classification::Suppressed(SuppressReason::Welcome))
}

fn suppress_api_approval(_: &Notification) -> Result<Classification> {
    Ok(Classification::Suppressed(SuppressReason::ApiApproval))
}

// -- Extractors --

/// `<img alt=":marseycapitalistmanlet:"> <a href="/id/5">@user</a> has gifted you 500 coins`
///
/// Third child is the sender link; the amount is word 4 of the fourth child
/// when split on single spaces.
pub fn parse_transfer(n: &Notification) -> Result<ParsedEvent> {
    let fragment = Fragment::parse(n.require_html()?);
    let children = fragment.children();
    let (user_id, user_name) = markup::user_link(&children, 2, n.id)?;

    let amount_text = markup::child(&children, 3, n.id, "body_html.child[3]")?.text();
    let amount = amount_text
        .split(' ')
        .nth(4)
        .and_then(|word| word.replace(',', "").parse().ok())
        .ok_or_else(|| DramaError::malformed(n.id, "body_html.child[3].amount"))?;

    Ok(ParsedEvent::Transfer {
        id: n.id,
        user_id,
        user_name,
        amount,
    })
}

/// `<a href="/id/7">@bob</a> has mentioned you: <a href="/post/99">My Post</a>`
pub fn parse_post_mention(n: &Notification) -> Result<ParsedEvent> {
    let fragment = Fragment::parse(n.require_html()?);
    let children = fragment.children();
    let (user_id, user_name) = markup::user_link(&children, 0, n.id)?;

    let field = "body_html.last_child";
    let post_link = fragment
        .last_child()
        .and_then(|last| last.as_element())
        .ok_or_else(|| DramaError::malformed(n.id, field))?;
    let post_id = markup::href_id(post_link, n.id, field)?;
    let post_name = post_link.text().collect::<String>().trim().to_string();

    Ok(ParsedEvent::PostMention {
        id: n.id,
        user_id,
        user_name,
        post_id,
        post_name,
    })
}

pub fn parse_follow(n: &Notification) -> Result<ParsedEvent> {
    let (user_id, user_name) = leading_user(n)?;
    Ok(ParsedEvent::Follow {
        id: n.id,
        user_id,
        user_name,
    })
}

pub fn parse_unfollow(n: &Notification) -> Result<ParsedEvent> {
    let (user_id, user_name) = leading_user(n)?;
    Ok(ParsedEvent::Unfollow {
        id: n.id,
        user_id,
        user_name,
    })
}

fn leading_user(n: &Notification) -> Result<(u64, String)> {
    let fragment = Fragment::parse(n.require_html()?);
    let children = fragment.children();
    markup::user_link(&children, 0, n.id)
}

pub fn parse_direct_message(n: &Notification) -> Result<ParsedEvent> {
    let html = n.require_html()?;
    Ok(ParsedEvent::DirectMessage {
        id: n.id,
        user_id: n.require_author_id()?,
        user_name: n.require_author_name()?,
        message: Fragment::parse(html).text(),
        message_html: html.to_string(),
    })
}

/// The notification itself is the reply, so its id is the parent to answer.
pub fn parse_comment_reply(n: &Notification) -> Result<ParsedEvent> {
    let post = n
        .post
        .as_ref()
        .ok_or_else(|| DramaError::malformed(n.id, "post"))?;
    Ok(ParsedEvent::CommentReply {
        id: n.id,
        parent_id: n.id,
        post_id: post
            .id
            .ok_or_else(|| DramaError::malformed(n.id, "post.id"))?,
        post_name: post
            .title
            .clone()
            .ok_or_else(|| DramaError::malformed(n.id, "post.title"))?,
    })
}

/// Only top-level comments drop the parent. Deeper ones pass through whatever
/// `parent_comment_id` the server sent, including none.
pub fn parse_comment_mention(n: &Notification) -> Result<ParsedEvent> {
    let parent_comment_id = match n.level {
        Some(1) => None,
        Some(_) => n.parent_comment_id,
        None => return Err(DramaError::malformed(n.id, "level")),
    };

    Ok(ParsedEvent::CommentMention {
        id: n.id,
        user_id: n.require_author_id()?,
        user_name: n.require_author_name()?,
        message: n.body.clone(),
        post_id: n
            .post_id
            .ok_or_else(|| DramaError::malformed(n.id, "post_id"))?,
        parent_comment_id,
    })
}
