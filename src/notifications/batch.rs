// Unread notification processing.
//
// Fetches the unread list once and classifies each item in order. A bad
// item is logged and skipped; only the fetch itself can fail the call.

use serde_json::Value;
use tracing::{debug, info, warn};

use super::classify::classify_and_parse;
use super::model::{Classification, Notification, ParsedEvent};
use crate::api::client::{data_array, DramaClient};
use crate::error::Result;

/// Fetch unread notifications and return their parsed events.
///
/// Suppressed and unparseable notifications are dropped, so the result is
/// never longer than the unread list. Order is preserved.
pub async fn process_unread(client: &DramaClient) -> Result<Vec<ParsedEvent>> {
    let response = client.get_unread_notifications().await?;
    let items = data_array(response, &format!("{}/unread", client.base_url()))?;

    if items.is_empty() {
        debug!("No unread notifications");
        return Ok(Vec::new());
    }

    let events = classify_batch(&items);
    info!(
        unread = items.len(),
        parsed = events.len(),
        "Processed unread notifications"
    );
    Ok(events)
}

/// Classify raw notifications, skipping any that fail.
pub fn classify_batch(items: &[Value]) -> Vec<ParsedEvent> {
    let mut events = Vec::with_capacity(items.len());

    for item in items {
        match classify_value(item) {
            Ok(Classification::Event(event)) => events.push(event),
            Ok(Classification::Suppressed(reason)) => {
                debug!(notification_id = raw_id(item), reason = ?reason, "Suppressed notification");
            }
            Err(e) => {
                warn!(
                    notification_id = raw_id(item),
                    notification = %item,
                    error = %e,
                    "Failed to parse notification, skipping"
                );
            }
        }
    }

    events
}

/// Numeric id of a raw item, for log fields. Unset when absent.
fn raw_id(item: &Value) -> Option<u64> {
    item.get("id").and_then(Value::as_u64)
}

/// Read a raw JSON notification and classify it.
pub fn classify_value(item: &Value) -> Result<Classification> {
    let notification = Notification::from_value(item)?;
    classify_and_parse(&notification)
}
