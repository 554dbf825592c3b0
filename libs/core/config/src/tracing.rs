use crate::Environment;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, prelude::*};

/// Filter directives used when `RUST_LOG` is not set.
pub fn default_directives(environment: Environment) -> &'static str {
    match environment {
        Environment::Production => "warn,domain_returns=info",
        Environment::Development => "info,domain_returns=debug",
    }
}

/// Initialize the global subscriber with an `ErrorLayer` for span traces.
///
/// Production logs are flattened JSON; development logs are pretty-printed.
/// `RUST_LOG` overrides [`default_directives`]. If a subscriber is already
/// installed (common in tests) this is a no-op.
pub fn init_tracing(environment: &Environment) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(*environment)));

    let result = if environment.is_production() {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .flatten_event(true),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    };

    match result {
        Ok(()) => info!(environment = ?environment, "Tracing initialized"),
        Err(_) => debug!("Tracing already initialized"),
    }
}
