// Notification parsing — classify raw notifications into typed events.
//
// Notifications arrive as loosely structured JSON, many with an HTML body
// whose layout is the only thing that tells event kinds apart. `classify`
// holds the decision tree, `markup` the DOM lookups it relies on, and
// `batch` the unread-list loop that isolates per-item failures.

pub mod batch;
pub mod classify;
pub mod markup;
pub mod model;

pub use batch::{classify_batch, process_unread};
pub use classify::classify_and_parse;
pub use model::{Classification, Notification, ParsedEvent, SuppressReason};
