// Forum API client: transport, backoff, and the typed action methods.

pub mod client;
pub mod retry;
pub mod transport;
