//! Structured logging and optional OTLP trace export.
//!
//! Logs are always JSON on stdout. Spans are exported over gRPC only when
//! `OTEL_EXPORTER_OTLP_ENDPOINT` is set.

use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose::STANDARD};
use once_cell::sync::OnceCell;
use opentelemetry::{
    KeyValue, global, propagation::TextMapCompositePropagator, trace::TracerProvider as _,
};
use opentelemetry_otlp::{Compression, SpanExporter, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource,
    propagation::{BaggagePropagator, TraceContextPropagator},
    trace::{SdkTracerProvider, Tracer},
};
use std::{env, time::Duration};
use tonic::{
    metadata::{AsciiMetadataKey, AsciiMetadataValue, BinaryMetadataKey, MetadataMap, MetadataValue},
    transport::ClientTlsConfig,
};
use tracing::{Level, debug};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};
use ulid::Ulid;

const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

static PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

/// Exporter settings read from the standard `OTEL_*` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OtlpSettings {
    endpoint: String,
    headers: Vec<(String, String)>,
    instance_id: String,
}

impl OtlpSettings {
    /// `None` when no endpoint is configured.
    fn from_env() -> Option<Self> {
        let endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok()?;
        if let Ok(protocol) = env::var("OTEL_EXPORTER_OTLP_PROTOCOL")
            && protocol != "grpc"
        {
            debug!(%protocol, "only grpc export is supported, ignoring protocol");
        }
        Some(Self::new(
            &endpoint,
            env::var("OTEL_EXPORTER_OTLP_HEADERS").ok().as_deref(),
            env::var("OTEL_SERVICE_INSTANCE_ID").ok(),
        ))
    }

    fn new(endpoint: &str, headers: Option<&str>, instance_id: Option<String>) -> Self {
        let endpoint = endpoint.trim().trim_end_matches('/');
        let endpoint = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("https://{endpoint}")
        };
        Self {
            endpoint,
            headers: headers.map(split_headers).unwrap_or_default(),
            instance_id: instance_id.unwrap_or_else(|| Ulid::new().to_string()),
        }
    }

    /// Host used for TLS verification, only for https endpoints.
    fn tls_host(&self) -> Option<&str> {
        let authority = self.endpoint.strip_prefix("https://")?.split('/').next()?;
        let host = authority.rsplit_once(':').map_or(authority, |(host, _)| host);
        (!host.is_empty()).then_some(host)
    }

    /// gRPC metadata; `-bin` keys carry base64 values.
    fn metadata(&self) -> Result<MetadataMap> {
        let mut map = MetadataMap::with_capacity(self.headers.len());
        for (key, value) in &self.headers {
            let key = key.to_ascii_lowercase();
            if key.ends_with("-bin") {
                let bytes = STANDARD
                    .decode(value)
                    .with_context(|| format!("header {key} is not valid base64"))?;
                let name = BinaryMetadataKey::from_bytes(key.as_bytes())
                    .with_context(|| format!("invalid header name {key}"))?;
                map.insert_bin(name, MetadataValue::from_bytes(&bytes));
            } else {
                let name = AsciiMetadataKey::from_bytes(key.as_bytes())
                    .with_context(|| format!("invalid header name {key}"))?;
                let value: AsciiMetadataValue = value
                    .parse()
                    .with_context(|| format!("invalid value for header {key}"))?;
                map.insert(name, value);
            }
        }
        Ok(map)
    }
}

/// `k1=v1,k2=v2`; pairs without `=` are skipped.
fn split_headers(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

fn tracer(settings: &OtlpSettings) -> Result<Tracer> {
    let mut exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&settings.endpoint)
        .with_compression(Compression::Gzip)
        .with_timeout(EXPORT_TIMEOUT);

    if let Some(host) = settings.tls_host() {
        exporter = exporter.with_tls_config(
            ClientTlsConfig::new()
                .domain_name(host.to_string())
                .with_native_roots(),
        );
    }
    if !settings.headers.is_empty() {
        exporter = exporter.with_metadata(settings.metadata()?);
    }

    let resource = Resource::builder_empty()
        .with_attributes([
            KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            KeyValue::new("service.instance.id", settings.instance_id.clone()),
        ])
        .build();

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter.build()?)
        .with_resource(resource)
        .build();

    let _ = PROVIDER.set(provider.clone());
    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));

    Ok(provider.tracer(env!("CARGO_PKG_NAME")))
}

/// Install the global subscriber. `RUST_LOG` overrides `verbosity_level`.
///
/// # Errors
///
/// Returns an error if the exporter cannot be built or a subscriber is already set
pub fn init(verbosity_level: Option<Level>) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity_level.unwrap_or(Level::ERROR).into())
        .from_env_lossy()
        .add_directive("hyper=error".parse()?)
        .add_directive("tokio=error".parse()?)
        .add_directive("sqlx=warn".parse()?)
        .add_directive("opentelemetry_sdk=warn".parse()?);

    let json = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_target(false)
        .with_file(false)
        .with_line_number(false);

    let otel = OtlpSettings::from_env()
        .map(|settings| tracer(&settings))
        .transpose()?
        .map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    // An absent Option layer is a no-op.
    let subscriber = Registry::default().with(json).with(otel).with(filter);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// Flush pending spans. Does nothing when export was never enabled.
pub fn shutdown_tracer() {
    if let Some(provider) = PROVIDER.get() {
        debug!("flushing trace exporter");
        let _ = provider.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(endpoint: &str, headers: Option<&str>) -> OtlpSettings {
        OtlpSettings::new(endpoint, headers, Some("instance".to_string()))
    }

    #[test]
    fn endpoint_defaults_to_https() {
        assert_eq!(settings("collector:4317/", None).endpoint, "https://collector:4317");
        assert_eq!(
            settings("http://localhost:4317", None).endpoint,
            "http://localhost:4317"
        );
    }

    #[test]
    fn tls_host_only_for_https() {
        assert_eq!(
            settings("https://otel.truefeedback.dev:4317/v1/traces", None).tls_host(),
            Some("otel.truefeedback.dev")
        );
        assert_eq!(settings("http://localhost:4317", None).tls_host(), None);
    }

    #[test]
    fn headers_skip_malformed_pairs() {
        let parsed = split_headers(" a = 1 ,broken,b=x=y,=z");
        assert_eq!(
            parsed,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "x=y".to_string()),
            ]
        );
        assert!(split_headers("").is_empty());
    }

    #[test]
    fn metadata_decodes_binary_headers() -> Result<()> {
        let ok = settings(
            "localhost:4317",
            Some("authorization=Bearer abc,trace-bin=dHJ1ZWZlZWRiYWNr"),
        );
        assert_eq!(ok.metadata()?.len(), 2);

        let bad = settings("localhost:4317", Some("trace-bin=***"));
        assert!(
            bad.metadata()
                .err()
                .is_some_and(|err| err.to_string().contains("not valid base64"))
        );
        Ok(())
    }

    #[test]
    fn instance_id_defaults_to_ulid() {
        let generated = OtlpSettings::new("localhost:4317", None, None);
        assert!(Ulid::from_string(&generated.instance_id).is_ok());
    }

    #[test]
    fn shutdown_without_exporter_is_noop() {
        shutdown_tracer();
    }
}
