use anyhow::{Result, anyhow};
use once_cell::sync::OnceCell;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{Protocol, SpanExporter, WithExportConfig};
use opentelemetry_sdk::{self as sdk, Resource};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_FILTER: &str = "info,tower_http=warn";

/// Configuration for tracing initialization.
#[derive(Clone, Debug)]
pub struct ObsConfig {
    pub service_name: String,
    pub env_filter: Option<String>,
    pub otlp_endpoint: Option<String>,
    /// Compact output without targets, for CLI one-shots.
    pub compact: bool,
}

impl Default for ObsConfig {
    fn default() -> Self {
        Self {
            service_name: "hr-policy-server".to_string(),
            env_filter: None,
            otlp_endpoint: None,
            compact: false,
        }
    }
}

impl ObsConfig {
    pub fn for_service(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Self::default()
        }
    }

    pub fn compact(mut self) -> Self {
        self.compact = true;
        self
    }

    fn resolved_filter(&self) -> String {
        self.env_filter
            .clone()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string())
    }

    fn resolved_endpoint(&self) -> Option<String> {
        self.otlp_endpoint
            .clone()
            .or_else(|| std::env::var("OTLP_ENDPOINT").ok())
            .filter(|endpoint| !endpoint.trim().is_empty())
    }
}

/// Install tracing subscribers with optional OTLP exporter. Calling it again
/// after a successful install is a no-op.
pub fn init_tracing(config: ObsConfig) -> Result<()> {
    if INIT.get().is_some() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_new(config.resolved_filter())?;
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(!config.compact)
        .with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if let Some(endpoint) = config.resolved_endpoint() {
        let provider = otlp_provider(&config.service_name, endpoint)?;
        let tracer = provider.tracer(config.service_name.clone());
        registry
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .try_init()?;
    } else {
        registry.try_init()?;
    }

    INIT.set(())
        .map_err(|_| anyhow!("tracing already initialized"))?;
    Ok(())
}

fn otlp_provider(service_name: &str, endpoint: String) -> Result<sdk::trace::SdkTracerProvider> {
    let exporter = SpanExporter::builder()
        .with_http()
        .with_protocol(Protocol::HttpBinary)
        .with_endpoint(endpoint)
        .build()?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    Ok(sdk::trace::SdkTracerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(exporter)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins() {
        let config = ObsConfig {
            env_filter: Some("debug".into()),
            ..ObsConfig::default()
        };
        assert_eq!(config.resolved_filter(), "debug");
    }

    #[test]
    fn blank_endpoint_disables_export() {
        let config = ObsConfig {
            otlp_endpoint: Some("  ".into()),
            ..ObsConfig::for_service("policy-cli")
        };
        assert!(config.resolved_endpoint().is_none());
        assert_eq!(config.service_name, "policy-cli");
    }

    #[test]
    fn second_init_is_a_noop() {
        let config = ObsConfig {
            env_filter: Some("off".into()),
            ..ObsConfig::default()
        }
        .compact();
        init_tracing(config.clone()).unwrap();
        init_tracing(config).unwrap();
    }
}
