// Tracing setup for programs embedding the client.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "drama_client=info";

/// Install a fmt subscriber filtered by `RUST_LOG`.
///
/// Returns false when a global subscriber was already installed, so calling
/// it twice is harmless.
pub fn init() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .try_init()
        .is_ok()
}
