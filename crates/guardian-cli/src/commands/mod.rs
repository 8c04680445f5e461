pub mod config;
pub mod oracle;
pub mod session;

use guardian_core::{Config, GeminiClient, Oracles};

/// Gemini oracles when an API key is configured, otherwise the offline
/// fallbacks.
pub(crate) fn oracles(config: &Config) -> Oracles {
    match GeminiClient::from_config(&config.oracle) {
        Ok(client) => {
            tracing::debug!(model = client.model(), "using gemini oracles");
            Oracles::gemini(client)
        }
        Err(e) => {
            tracing::warn!(error = %e, "oracles offline, using safe defaults");
            Oracles::offline()
        }
    }
}

/// Multi-threaded runtime for one CLI invocation.
pub(crate) fn async_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
}
