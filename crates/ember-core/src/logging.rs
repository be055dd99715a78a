use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

pub const ENV_LOG: &str = "EMBER_LOG";

static INIT: OnceLock<()> = OnceLock::new();

/// Install a fmt subscriber filtered by `EMBER_LOG` (default `info`).
/// Repeated calls are ignored, as is an already-installed global subscriber.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
    });
}

/// First `max` characters of `s`, for logging prompts without dumping them.
pub(crate) fn preview(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
