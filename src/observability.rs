//! Tracing setup. Diagnostics go to stderr; stdout carries build output only.

use tracing_subscriber::{prelude::*, EnvFilter};

/// Initialize tracing. Call once at process startup.
///
/// `LIPKBH_LOG` takes an env-filter directive and overrides `verbose`;
/// `LIPKBH_LOG_JSON=1` switches to JSON lines.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "lipkbh=debug" } else { "lipkbh=warn" };
    let filter = EnvFilter::try_from_env("LIPKBH_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    let json = std::env::var("LIPKBH_LOG_JSON").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));

    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt.json())
            .try_init()
    } else {
        tracing_subscriber::registry().with(filter).with(fmt).try_init()
    };
}
