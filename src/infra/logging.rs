//! Process-start logging setup (§4.10): one `tracing-subscriber` init, human
//! or JSON, driven by `RUST_LOG` when set and the config's `log_level`
//! otherwise.

use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

pub fn init(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        "json" => {
            fmt().json().with_env_filter(filter).init();
        }
        _ => {
            fmt().with_env_filter(filter).init();
        }
    }
}
