use std::sync::Arc;

use axum::Router;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use crate::{
    config::Config,
    error::{AppError, Result},
    state::AppState,
};

/// Puts a per-IP token bucket in front of the credential endpoints.
///
/// One request is replenished every `AUTH_RATE_LIMIT_PERIOD_SECS`, with bursts
/// of up to `AUTH_RATE_LIMIT_BURST`. A burst of zero leaves the routes
/// unlimited. Peers are keyed by `ConnectInfo`, so the service must be built
/// with `into_make_service_with_connect_info`.
pub fn limit_credential_routes(routes: Router<AppState>, config: &Config) -> Result<Router<AppState>> {
    if config.auth_rate_limit_burst == 0 {
        tracing::warn!("⚠️ Credential rate limiting disabled");
        return Ok(routes);
    }

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.auth_rate_limit_period_secs)
            .burst_size(config.auth_rate_limit_burst)
            .use_headers()
            .finish()
            .ok_or_else(|| AppError::Internal("Invalid credential rate limit settings".to_string()))?,
    );

    tracing::info!(
        "✅ Credential rate limit: burst {}, one request per {}s",
        config.auth_rate_limit_burst,
        config.auth_rate_limit_period_secs
    );

    Ok(routes.layer(GovernorLayer::new(governor_conf)))
}
