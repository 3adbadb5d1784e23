//! # Message Codecs
//!
//! [`WireEncode`] / [`WireDecode`] implementations for every protocol value.
//! Structs encode as maps in a fixed key order; decoders accept keys in any
//! order and skip the ones they do not know.

use crate::{Decoder, Encoder, EntityTagging, WireError};
use lattice_types::{
    Entity, EntityKind, HealthCheckResponse, HostData, InterfaceLinkDefinition, Invocation,
    InvocationResponse, Level, OtelConfig, RedactedString, SecretValue, TraceContext,
};
use std::collections::HashMap;
use tracing::trace;

/// A value with a wire representation.
pub trait WireEncode {
    fn encode(&self, enc: &mut Encoder);
}

/// A value that can be read back from its wire representation.
pub trait WireDecode: Sized {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError>;
}

fn skip_unknown(dec: &mut Decoder<'_>, key: &str) -> Result<(), WireError> {
    trace!(field = %key, "skipping unknown wire field");
    dec.skip()
}

fn require_map(dec: &mut Decoder<'_>) -> Result<usize, WireError> {
    if dec.try_read_nil()? {
        return Err(WireError::UnexpectedMarker {
            expected: "map",
            found: 0xc0,
        });
    }
    dec.read_map_len()
}

/// Map length, or `None` if the value is nil.
fn optional_map(dec: &mut Decoder<'_>) -> Result<Option<usize>, WireError> {
    if dec.try_read_nil()? {
        Ok(None)
    } else {
        dec.read_map_len().map(Some)
    }
}

// =============================================================================
// PRIMITIVES
// =============================================================================

impl WireEncode for String {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_str(self);
    }
}

impl WireDecode for String {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        dec.read_str()
    }
}

impl WireEncode for u64 {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_u64(*self);
    }
}

impl WireDecode for u64 {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        dec.read_u64()
    }
}

impl WireEncode for bool {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_bool(*self);
    }
}

impl WireDecode for bool {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        dec.read_bool()
    }
}

impl<T: WireEncode> WireEncode for Option<T> {
    fn encode(&self, enc: &mut Encoder) {
        match self {
            Some(value) => value.encode(enc),
            None => enc.write_nil(),
        }
    }
}

impl<T: WireDecode> WireDecode for Option<T> {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        if dec.try_read_nil()? {
            Ok(None)
        } else {
            T::decode(dec).map(Some)
        }
    }
}

fn write_string_list(enc: &mut Encoder, items: &[String]) {
    enc.write_array_len(items.len());
    for item in items {
        enc.write_str(item);
    }
}

fn read_string_list(dec: &mut Decoder<'_>) -> Result<Vec<String>, WireError> {
    if dec.try_read_nil()? {
        return Ok(Vec::new());
    }
    let len = dec.read_array_len()?;
    let mut items = Vec::with_capacity(len.min(dec.remaining()));
    for _ in 0..len {
        items.push(dec.read_str()?);
    }
    Ok(items)
}

/// Sorted by key so equal maps encode to equal bytes.
fn write_string_map(enc: &mut Encoder, map: &HashMap<String, String>) {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
    enc.write_map_len(entries.len());
    for (key, value) in entries {
        enc.write_str(key);
        enc.write_str(value);
    }
}

fn read_string_map(dec: &mut Decoder<'_>) -> Result<HashMap<String, String>, WireError> {
    let Some(len) = optional_map(dec)? else {
        return Ok(HashMap::new());
    };
    let mut map = HashMap::with_capacity(len.min(dec.remaining()));
    for _ in 0..len {
        let key = dec.read_str()?;
        let value = dec.read_str()?;
        map.insert(key, value);
    }
    Ok(map)
}

// =============================================================================
// ENTITIES
// =============================================================================

impl WireEncode for Entity {
    fn encode(&self, enc: &mut Encoder) {
        let tagged = enc.tagging() == EntityTagging::Explicit;
        let fields = match self {
            Entity::Actor { .. } => 1,
            Entity::Provider { .. } => 3,
        };
        enc.write_map_len(fields + usize::from(tagged));

        if tagged {
            enc.write_str("entity_type");
            enc.write_i64(i64::from(self.kind().tag()));
        }
        enc.write_str("public_key");
        enc.write_str(self.public_key());
        if let Entity::Provider {
            link_name,
            contract_id,
            ..
        } = self
        {
            enc.write_str("link_name");
            enc.write_str(link_name);
            enc.write_str("contract_id");
            enc.write_str(contract_id);
        }
    }
}

impl WireDecode for Entity {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        let len = require_map(dec)?;

        let mut tag = None;
        let mut public_key = None;
        let mut link_name = None;
        let mut contract_id = None;
        for _ in 0..len {
            let key = dec.read_str()?;
            match key.as_str() {
                "entity_type" => tag = Some(dec.read_i64()?),
                "public_key" => public_key = Some(dec.read_str()?),
                "link_name" => link_name = Some(dec.read_str()?),
                "contract_id" => contract_id = Some(dec.read_str()?),
                _ => skip_unknown(dec, &key)?,
            }
        }

        let kind = match (dec.tagging(), tag) {
            (_, Some(tag)) => EntityKind::from_tag(tag).ok_or(WireError::InvalidEntityKind(tag))?,
            (EntityTagging::Explicit, None) => return Err(WireError::MissingField("entity_type")),
            (EntityTagging::Implicit, None) => {
                if link_name.is_some() || contract_id.is_some() {
                    EntityKind::Provider
                } else {
                    EntityKind::Actor
                }
            }
        };

        let public_key = public_key.ok_or(WireError::MissingField("public_key"))?;
        Ok(match kind {
            EntityKind::Actor => Entity::Actor { public_key },
            EntityKind::Provider => Entity::Provider {
                public_key,
                link_name: link_name.unwrap_or_default(),
                contract_id: contract_id.unwrap_or_default(),
            },
        })
    }
}

// =============================================================================
// INVOCATIONS
// =============================================================================

fn write_trace_context(enc: &mut Encoder, trace_context: &TraceContext) {
    if trace_context.is_empty() {
        enc.write_nil();
        return;
    }
    enc.write_array_len(trace_context.len());
    for (key, value) in trace_context {
        enc.write_map_len(2);
        enc.write_str("f0");
        enc.write_str(key);
        enc.write_str("f1");
        enc.write_str(value);
    }
}

fn read_trace_context(dec: &mut Decoder<'_>) -> Result<TraceContext, WireError> {
    if dec.try_read_nil()? {
        return Ok(TraceContext::new());
    }
    let len = dec.read_array_len()?;
    let mut pairs = TraceContext::with_capacity(len.min(dec.remaining()));
    for _ in 0..len {
        let mut pair = (String::new(), String::new());
        if let Some(fields) = optional_map(dec)? {
            for _ in 0..fields {
                let key = dec.read_str()?;
                match key.as_str() {
                    "f0" => pair.0 = dec.read_str()?,
                    "f1" => pair.1 = dec.read_str()?,
                    _ => skip_unknown(dec, &key)?,
                }
            }
        }
        pairs.push(pair);
    }
    Ok(pairs)
}

impl WireEncode for Invocation {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_map_len(9);
        enc.write_str("origin");
        self.origin.encode(enc);
        enc.write_str("target");
        self.target.encode(enc);
        enc.write_str("operation");
        enc.write_str(&self.operation);
        enc.write_str("msg");
        enc.write_bin(&self.msg);
        enc.write_str("id");
        enc.write_str(&self.id);
        enc.write_str("encoded_claims");
        enc.write_str(&self.encoded_claims);
        enc.write_str("host_id");
        enc.write_str(&self.host_id);
        enc.write_str("content_length");
        enc.write_u64(self.content_length);
        enc.write_str("traceContext");
        write_trace_context(enc, &self.trace_context);
    }
}

impl WireDecode for Invocation {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        let len = require_map(dec)?;

        let mut origin = None;
        let mut target = None;
        let mut operation = String::new();
        let mut msg = Vec::new();
        let mut id = String::new();
        let mut encoded_claims = String::new();
        let mut host_id = String::new();
        let mut content_length = 0;
        let mut trace_context = TraceContext::new();
        for _ in 0..len {
            let key = dec.read_str()?;
            match key.as_str() {
                "origin" => origin = Some(Entity::decode(dec)?),
                "target" => target = Some(Entity::decode(dec)?),
                "operation" => operation = dec.read_str()?,
                "msg" => msg = dec.read_bin()?,
                "id" => id = dec.read_str()?,
                "encoded_claims" => encoded_claims = dec.read_str()?,
                "host_id" => host_id = dec.read_str()?,
                "content_length" => content_length = dec.read_u64()?,
                "traceContext" => trace_context = read_trace_context(dec)?,
                _ => skip_unknown(dec, &key)?,
            }
        }

        Ok(Invocation {
            origin: origin.ok_or(WireError::MissingField("origin"))?,
            target: target.ok_or(WireError::MissingField("target"))?,
            operation,
            msg,
            id,
            encoded_claims,
            host_id,
            content_length,
            trace_context,
        })
    }
}

/// Decode only the `origin` of an encoded [`Invocation`]. Fields before it
/// are skipped and nothing after it is read.
pub fn peek_origin(bytes: &[u8], tagging: EntityTagging) -> Result<Entity, WireError> {
    let mut dec = Decoder::new(bytes, tagging);
    let len = require_map(&mut dec)?;
    for _ in 0..len {
        let key = dec.read_str()?;
        if key == "origin" {
            return Entity::decode(&mut dec);
        }
        dec.skip()?;
    }
    Err(WireError::MissingField("origin"))
}

impl WireEncode for InvocationResponse {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_map_len(4);
        enc.write_str("msg");
        enc.write_bin(&self.msg);
        enc.write_str("invocation_id");
        enc.write_str(&self.invocation_id);
        enc.write_str("error");
        self.error.encode(enc);
        enc.write_str("content_length");
        enc.write_u64(self.content_length);
    }
}

impl WireDecode for InvocationResponse {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        let mut val = InvocationResponse::default();
        let Some(len) = optional_map(dec)? else {
            return Ok(val);
        };
        for _ in 0..len {
            let key = dec.read_str()?;
            match key.as_str() {
                "msg" => val.msg = dec.read_bin()?,
                "invocation_id" => val.invocation_id = dec.read_str()?,
                "error" => val.error = Option::<String>::decode(dec)?,
                "content_length" => val.content_length = dec.read_u64()?,
                _ => skip_unknown(dec, &key)?,
            }
        }
        Ok(val)
    }
}

// =============================================================================
// LIFECYCLE
// =============================================================================

impl WireEncode for HealthCheckResponse {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_map_len(2);
        enc.write_str("healthy");
        enc.write_bool(self.healthy);
        enc.write_str("message");
        enc.write_str(&self.message);
    }
}

impl WireDecode for HealthCheckResponse {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        let mut val = HealthCheckResponse::default();
        let Some(len) = optional_map(dec)? else {
            return Ok(val);
        };
        for _ in 0..len {
            let key = dec.read_str()?;
            match key.as_str() {
                "healthy" => val.healthy = dec.read_bool()?,
                "message" => val.message = dec.read_str()?,
                _ => skip_unknown(dec, &key)?,
            }
        }
        Ok(val)
    }
}

// =============================================================================
// LINKS
// =============================================================================

impl WireEncode for InterfaceLinkDefinition {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_map_len(8);
        enc.write_str("source_id");
        enc.write_str(&self.source_id);
        enc.write_str("target");
        enc.write_str(&self.target);
        enc.write_str("name");
        enc.write_str(&self.name);
        enc.write_str("wit_namespace");
        enc.write_str(&self.wit_namespace);
        enc.write_str("wit_package");
        enc.write_str(&self.wit_package);
        enc.write_str("interfaces");
        write_string_list(enc, &self.interfaces);
        enc.write_str("source_config");
        write_string_map(enc, &self.source_config);
        enc.write_str("target_config");
        write_string_map(enc, &self.target_config);
    }
}

impl WireDecode for InterfaceLinkDefinition {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        let mut val = InterfaceLinkDefinition::default();
        let Some(len) = optional_map(dec)? else {
            return Ok(val);
        };
        for _ in 0..len {
            let key = dec.read_str()?;
            match key.as_str() {
                "source_id" => val.source_id = dec.read_str()?,
                "target" => val.target = dec.read_str()?,
                "name" => val.name = dec.read_str()?,
                "wit_namespace" => val.wit_namespace = dec.read_str()?,
                "wit_package" => val.wit_package = dec.read_str()?,
                "interfaces" => val.interfaces = read_string_list(dec)?,
                "source_config" => val.source_config = read_string_map(dec)?,
                "target_config" => val.target_config = read_string_map(dec)?,
                _ => skip_unknown(dec, &key)?,
            }
        }
        Ok(val)
    }
}

// =============================================================================
// HOST DATA
// =============================================================================

impl WireEncode for Level {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_str(self.as_str());
    }
}

impl WireDecode for Level {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        let raw = dec.read_str()?;
        raw.parse().map_err(|_| WireError::InvalidValue {
            field: "log_level",
            value: raw,
        })
    }
}

impl WireEncode for SecretValue {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_map_len(2);
        enc.write_str("kind");
        match self {
            SecretValue::String(secret) => {
                enc.write_str("string");
                enc.write_str("value");
                enc.write_str(secret.reveal());
            }
            SecretValue::Bytes(bytes) => {
                enc.write_str("bytes");
                enc.write_str("value");
                enc.write_bin(bytes);
            }
        }
    }
}

impl WireDecode for SecretValue {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        let len = require_map(dec)?;
        let mut kind = None;
        let mut value = None;
        for _ in 0..len {
            let key = dec.read_str()?;
            match key.as_str() {
                "kind" => kind = Some(dec.read_str()?),
                "value" => value = Some(dec.read_bin()?),
                _ => skip_unknown(dec, &key)?,
            }
        }

        let kind = kind.ok_or(WireError::MissingField("kind"))?;
        let value = value.ok_or(WireError::MissingField("value"))?;
        match kind.as_str() {
            "string" => String::from_utf8(value)
                .map(|s| SecretValue::String(RedactedString::new(s)))
                .map_err(|_| WireError::InvalidUtf8),
            "bytes" => Ok(SecretValue::Bytes(value)),
            _ => Err(WireError::InvalidValue {
                field: "kind",
                value: kind,
            }),
        }
    }
}

impl WireEncode for OtelConfig {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_map_len(9);
        enc.write_str("enable_observability");
        enc.write_bool(self.enable_observability);
        enc.write_str("enable_traces");
        enc.write_bool(self.enable_traces);
        enc.write_str("enable_metrics");
        enc.write_bool(self.enable_metrics);
        enc.write_str("enable_logs");
        enc.write_bool(self.enable_logs);
        enc.write_str("observability_endpoint");
        enc.write_str(&self.observability_endpoint);
        enc.write_str("traces_endpoint");
        enc.write_str(&self.traces_endpoint);
        enc.write_str("metrics_endpoint");
        enc.write_str(&self.metrics_endpoint);
        enc.write_str("logs_endpoint");
        enc.write_str(&self.logs_endpoint);
        enc.write_str("protocol");
        enc.write_str(&self.protocol);
    }
}

impl WireDecode for OtelConfig {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        let mut val = OtelConfig::default();
        let Some(len) = optional_map(dec)? else {
            return Ok(val);
        };
        for _ in 0..len {
            let key = dec.read_str()?;
            match key.as_str() {
                "enable_observability" => val.enable_observability = dec.read_bool()?,
                "enable_traces" => val.enable_traces = dec.read_bool()?,
                "enable_metrics" => val.enable_metrics = dec.read_bool()?,
                "enable_logs" => val.enable_logs = dec.read_bool()?,
                "observability_endpoint" => val.observability_endpoint = dec.read_str()?,
                "traces_endpoint" => val.traces_endpoint = dec.read_str()?,
                "metrics_endpoint" => val.metrics_endpoint = dec.read_str()?,
                "logs_endpoint" => val.logs_endpoint = dec.read_str()?,
                "protocol" => val.protocol = dec.read_str()?,
                _ => skip_unknown(dec, &key)?,
            }
        }
        Ok(val)
    }
}

impl WireEncode for HostData {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_map_len(20);
        enc.write_str("host_id");
        enc.write_str(&self.host_id);
        enc.write_str("lattice_rpc_prefix");
        enc.write_str(&self.lattice_rpc_prefix);
        enc.write_str("lattice_rpc_user_jwt");
        enc.write_str(&self.lattice_rpc_user_jwt);
        enc.write_str("lattice_rpc_user_seed");
        enc.write_str(self.lattice_rpc_user_seed.reveal());
        enc.write_str("lattice_rpc_url");
        enc.write_str(&self.lattice_rpc_url);
        enc.write_str("provider_key");
        enc.write_str(&self.provider_key);
        enc.write_str("link_name");
        self.link_name.encode(enc);
        enc.write_str("env_values");
        write_string_map(enc, &self.env_values);
        enc.write_str("instance_id");
        enc.write_str(&self.instance_id);
        enc.write_str("link_definitions");
        enc.write_array_len(self.link_definitions.len());
        for link in &self.link_definitions {
            link.encode(enc);
        }
        enc.write_str("cluster_issuers");
        write_string_list(enc, &self.cluster_issuers);
        enc.write_str("config");
        write_string_map(enc, &self.config);
        enc.write_str("secrets");
        let mut secrets: Vec<_> = self.secrets.iter().collect();
        secrets.sort_unstable_by(|a, b| a.0.cmp(b.0));
        enc.write_map_len(secrets.len());
        for (name, secret) in secrets {
            enc.write_str(name);
            secret.encode(enc);
        }
        enc.write_str("host_xkey_public_key");
        enc.write_str(&self.host_xkey_public_key);
        enc.write_str("provider_xkey_private_key");
        enc.write_str(self.provider_xkey_private_key.reveal());
        enc.write_str("invocation_seed");
        enc.write_str(self.invocation_seed.reveal());
        enc.write_str("default_rpc_timeout_ms");
        self.default_rpc_timeout_ms.encode(enc);
        enc.write_str("structured_logging");
        enc.write_bool(self.structured_logging);
        enc.write_str("log_level");
        self.log_level.encode(enc);
        enc.write_str("otel_config");
        self.otel_config.encode(enc);
    }
}

impl WireDecode for HostData {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        let mut val = HostData::default();
        let Some(len) = optional_map(dec)? else {
            return Ok(val);
        };
        for _ in 0..len {
            let key = dec.read_str()?;
            match key.as_str() {
                "host_id" => val.host_id = dec.read_str()?,
                "lattice_rpc_prefix" => val.lattice_rpc_prefix = dec.read_str()?,
                "lattice_rpc_user_jwt" => val.lattice_rpc_user_jwt = dec.read_str()?,
                "lattice_rpc_user_seed" => val.lattice_rpc_user_seed = dec.read_str()?.into(),
                "lattice_rpc_url" => val.lattice_rpc_url = dec.read_str()?,
                "provider_key" => val.provider_key = dec.read_str()?,
                "link_name" => val.link_name = Option::<String>::decode(dec)?,
                "env_values" => val.env_values = read_string_map(dec)?,
                "instance_id" => val.instance_id = dec.read_str()?,
                "link_definitions" => {
                    if !dec.try_read_nil()? {
                        let count = dec.read_array_len()?;
                        for _ in 0..count {
                            val.link_definitions.push(InterfaceLinkDefinition::decode(dec)?);
                        }
                    }
                }
                "cluster_issuers" => val.cluster_issuers = read_string_list(dec)?,
                "config" => val.config = read_string_map(dec)?,
                "secrets" => {
                    if let Some(count) = optional_map(dec)? {
                        for _ in 0..count {
                            let name = dec.read_str()?;
                            let secret = SecretValue::decode(dec)?;
                            val.secrets.insert(name, secret);
                        }
                    }
                }
                "host_xkey_public_key" => val.host_xkey_public_key = dec.read_str()?,
                "provider_xkey_private_key" => {
                    val.provider_xkey_private_key = dec.read_str()?.into();
                }
                "invocation_seed" => val.invocation_seed = dec.read_str()?.into(),
                "default_rpc_timeout_ms" => {
                    val.default_rpc_timeout_ms = Option::<u64>::decode(dec)?;
                }
                "structured_logging" => val.structured_logging = dec.read_bool()?,
                "log_level" => val.log_level = Option::<Level>::decode(dec)?,
                "otel_config" => val.otel_config = OtelConfig::decode(dec)?,
                _ => skip_unknown(dec, &key)?,
            }
        }
        Ok(val)
    }
}
