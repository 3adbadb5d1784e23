//! # Host Data
//!
//! Bootstrap configuration delivered once by the host at provider start-up.
//!
//! ## Clusters
//!
//! - **Bootstrap**: [`HostData`]
//! - **Logging**: [`Level`]
//! - **Observability**: [`OtelConfig`]
//! - **Secrets**: [`RedactedString`], [`SecretValue`]

use crate::{InterfaceLinkDefinition, LevelParseError, DEFAULT_LINK_NAME};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Timeout applied to outbound calls when the host does not configure one.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(2);

// =============================================================================
// SECRETS
// =============================================================================

/// A string that never prints its content.
///
/// `Debug`, `Display` and `Serialize` all render `redacted(string)`, or the
/// empty string when the value is empty. Use [`RedactedString::reveal`] to
/// get the real value.
#[derive(Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct RedactedString(String);

impl RedactedString {
    /// Wrap a secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The secret itself.
    #[must_use]
    pub fn reveal(&self) -> &str {
        &self.0
    }

    /// True when no secret is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn masked(&self) -> &'static str {
        if self.0.is_empty() {
            ""
        } else {
            "redacted(string)"
        }
    }
}

impl From<String> for RedactedString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RedactedString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for RedactedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.masked())
    }
}

impl fmt::Display for RedactedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.masked())
    }
}

impl Serialize for RedactedString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.masked())
    }
}

/// A secret delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum SecretValue {
    /// Textual secret.
    String(RedactedString),
    /// Binary secret.
    Bytes(Vec<u8>),
}

// =============================================================================
// LOGGING
// =============================================================================

/// Log level requested by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    Critical,
}

impl Level {
    /// Lower-case name as sent on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = LevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            "critical" => Ok(Self::Critical),
            _ => Err(LevelParseError(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// OBSERVABILITY
// =============================================================================

/// OTLP protocol name for HTTP exporters.
pub const OTEL_PROTOCOL_HTTP: &str = "http";
/// OTLP protocol name for gRPC exporters.
pub const OTEL_PROTOCOL_GRPC: &str = "grpc";

const OTEL_HTTP_ENDPOINT: &str = "http://localhost:4318";
const OTEL_GRPC_ENDPOINT: &str = "http://localhost:4317";

#[derive(Debug, Clone, Copy)]
enum Signal {
    Traces,
    Metrics,
    Logs,
}

/// Observability settings forwarded by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtelConfig {
    pub enable_observability: bool,
    pub enable_traces: bool,
    pub enable_metrics: bool,
    pub enable_logs: bool,
    pub observability_endpoint: String,
    pub traces_endpoint: String,
    pub metrics_endpoint: String,
    pub logs_endpoint: String,
    pub protocol: String,
}

impl OtelConfig {
    /// Configured protocol, lower-cased; `http` when unset.
    #[must_use]
    pub fn otel_protocol(&self) -> String {
        if self.protocol.is_empty() {
            OTEL_PROTOCOL_HTTP.to_string()
        } else {
            self.protocol.to_ascii_lowercase()
        }
    }

    /// Traces endpoint, explicit or resolved from the base endpoint.
    #[must_use]
    pub fn traces_url(&self) -> String {
        self.explicit_or_resolved(&self.traces_endpoint, Signal::Traces)
    }

    /// Metrics endpoint, explicit or resolved from the base endpoint.
    #[must_use]
    pub fn metrics_url(&self) -> String {
        self.explicit_or_resolved(&self.metrics_endpoint, Signal::Metrics)
    }

    /// Logs endpoint, explicit or resolved from the base endpoint.
    #[must_use]
    pub fn logs_url(&self) -> String {
        self.explicit_or_resolved(&self.logs_endpoint, Signal::Logs)
    }

    #[must_use]
    pub fn traces_enabled(&self) -> bool {
        self.enable_observability || self.enable_traces
    }

    #[must_use]
    pub fn metrics_enabled(&self) -> bool {
        self.enable_observability || self.enable_metrics
    }

    #[must_use]
    pub fn logs_enabled(&self) -> bool {
        self.enable_observability || self.enable_logs
    }

    fn is_grpc(&self) -> bool {
        self.otel_protocol() == OTEL_PROTOCOL_GRPC
    }

    fn explicit_or_resolved(&self, explicit: &str, signal: Signal) -> String {
        if !explicit.is_empty() {
            return explicit.to_string();
        }

        let base = if self.observability_endpoint.is_empty() {
            if self.is_grpc() {
                OTEL_GRPC_ENDPOINT
            } else {
                OTEL_HTTP_ENDPOINT
            }
        } else {
            self.observability_endpoint.as_str()
        };

        // gRPC exporters take the bare endpoint
        let path = match (self.is_grpc(), signal) {
            (true, _) => "",
            (false, Signal::Traces) => "/v1/traces",
            (false, Signal::Metrics) => "/v1/metrics",
            (false, Signal::Logs) => "/v1/logs",
        };

        format!("{}{}", base.trim_end_matches('/'), path)
    }
}

// =============================================================================
// BOOTSTRAP
// =============================================================================

/// Everything the host tells a provider at start-up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostData {
    pub host_id: String,
    pub lattice_rpc_prefix: String,
    pub lattice_rpc_user_jwt: String,
    pub lattice_rpc_user_seed: RedactedString,
    pub lattice_rpc_url: String,
    /// This provider's identity on the lattice.
    pub provider_key: String,
    /// Link name this instance serves, `default` when absent.
    pub link_name: Option<String>,
    pub env_values: HashMap<String, String>,
    pub instance_id: String,
    /// Links persisted by the host before this process started.
    pub link_definitions: Vec<InterfaceLinkDefinition>,
    pub cluster_issuers: Vec<String>,
    pub config: HashMap<String, String>,
    pub secrets: HashMap<String, SecretValue>,
    pub host_xkey_public_key: String,
    pub provider_xkey_private_key: RedactedString,
    /// nkeys seed used to sign outbound invocation claims.
    pub invocation_seed: RedactedString,
    pub default_rpc_timeout_ms: Option<u64>,
    pub structured_logging: bool,
    pub log_level: Option<Level>,
    pub otel_config: OtelConfig,
}

impl HostData {
    /// Host data for `provider_key` on lattice `prefix`, everything else default.
    pub fn new(provider_key: impl Into<String>, lattice_rpc_prefix: impl Into<String>) -> Self {
        Self {
            provider_key: provider_key.into(),
            lattice_rpc_prefix: lattice_rpc_prefix.into(),
            ..Self::default()
        }
    }

    /// Configured link name or `default`.
    #[must_use]
    pub fn link_name(&self) -> &str {
        match self.link_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => DEFAULT_LINK_NAME,
        }
    }

    /// Outbound call timeout.
    #[must_use]
    pub fn rpc_timeout(&self) -> Duration {
        self.default_rpc_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_RPC_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_string_never_prints_secret() {
        let secret = RedactedString::new("its-a-secret");
        assert_eq!(format!("{secret}"), "redacted(string)");
        assert_eq!(format!("{secret:?}"), "redacted(string)");
        assert_eq!(
            serde_json::to_string(&secret).unwrap(),
            "\"redacted(string)\""
        );
        assert_eq!(secret.reveal(), "its-a-secret");

        assert_eq!(format!("{}", RedactedString::default()), "");
    }

    #[test]
    fn test_redacted_string_deserializes_plain() {
        let secret: RedactedString = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(secret.reveal(), "abc");
    }

    #[test]
    fn test_level_parse_case_insensitive() {
        assert_eq!("WARN".parse::<Level>().unwrap(), Level::Warn);
        assert_eq!("Critical".parse::<Level>().unwrap(), Level::Critical);
        assert!("verbose".parse::<Level>().is_err());

        let level: Level = serde_json::from_str("\"DEBUG\"").unwrap();
        assert_eq!(level, Level::Debug);
        assert!(serde_json::from_str::<Level>("\"loud\"").is_err());
    }

    #[test]
    fn test_otel_defaults_http() {
        let config = OtelConfig::default();
        assert_eq!(config.otel_protocol(), "http");
        assert_eq!(config.traces_url(), "http://localhost:4318/v1/traces");
        assert_eq!(config.metrics_url(), "http://localhost:4318/v1/metrics");
        assert_eq!(config.logs_url(), "http://localhost:4318/v1/logs");
        assert!(!config.traces_enabled());
    }

    #[test]
    fn test_otel_grpc_has_no_path() {
        let config = OtelConfig {
            protocol: "GRPC".to_string(),
            ..OtelConfig::default()
        };
        assert_eq!(config.otel_protocol(), "grpc");
        assert_eq!(config.traces_url(), "http://localhost:4317");
    }

    #[test]
    fn test_otel_endpoint_resolution() {
        let config = OtelConfig {
            observability_endpoint: "https://collector:4318/".to_string(),
            logs_endpoint: "https://logs.example".to_string(),
            enable_metrics: true,
            ..OtelConfig::default()
        };
        assert_eq!(config.traces_url(), "https://collector:4318/v1/traces");
        assert_eq!(config.logs_url(), "https://logs.example");
        assert!(config.metrics_enabled());
        assert!(!config.logs_enabled());

        let all = OtelConfig {
            enable_observability: true,
            ..OtelConfig::default()
        };
        assert!(all.traces_enabled() && all.metrics_enabled() && all.logs_enabled());
    }

    #[test]
    fn test_host_data_defaults() {
        let host: HostData =
            serde_json::from_str(r#"{"provider_key":"P1","lattice_rpc_prefix":"default"}"#)
                .unwrap();
        assert_eq!(host.link_name(), "default");
        assert_eq!(host.rpc_timeout(), Duration::from_secs(2));
        assert!(host.link_definitions.is_empty());
        assert!(host.log_level.is_none());
    }

    #[test]
    fn test_host_data_full_json() {
        let raw = r#"{
            "host_id": "H1",
            "provider_key": "P1",
            "link_name": "backup",
            "default_rpc_timeout_ms": 500,
            "log_level": "TRACE",
            "structured_logging": true,
            "invocation_seed": "SEED",
            "secrets": {"token": {"kind": "string", "value": "t0k"}},
            "link_definitions": [{"source_id": "A1", "target": "P1"}]
        }"#;
        let host: HostData = serde_json::from_str(raw).unwrap();
        assert_eq!(host.link_name(), "backup");
        assert_eq!(host.rpc_timeout(), Duration::from_millis(500));
        assert_eq!(host.log_level, Some(Level::Trace));
        assert_eq!(host.invocation_seed.reveal(), "SEED");
        assert_eq!(
            host.secrets.get("token"),
            Some(&SecretValue::String(RedactedString::new("t0k")))
        );
        assert_eq!(host.link_definitions[0].target, "P1");
    }
}
