//! Chainable serialization codecs.
//!
//! A [`Codec`] is one stage of a serialization pipeline: it turns a
//! [`Payload`] into bytes and back. Stages compose with [`CodecChain`]
//! (encode left to right, decode right to left), so `"json|binary"`
//! means "serialize to JSON, then base64-wrap the result". The
//! [`CodecRegistry`] resolves those pipe-separated names at runtime,
//! which keeps topic declarations data-driven.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors from encoding or decoding a payload
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("base64 decoding failed: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("unknown codec: {0}")]
    UnknownCodec(String),

    #[error("codec {codec} cannot {operation} a {payload} payload")]
    UnsupportedPayload {
        codec: &'static str,
        operation: &'static str,
        payload: &'static str,
    },
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Data flowing through a codec stage.
///
/// The outermost stage of a chain sees a structured [`Payload::Value`];
/// every later stage sees the [`Payload::Bytes`] the previous stage
/// produced. Decoding runs the same pipeline in reverse.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Structured data, not yet serialized
    Value(serde_json::Value),
    /// Opaque bytes produced by an earlier stage
    Bytes(Vec<u8>),
}

impl Payload {
    fn kind(&self) -> &'static str {
        match self {
            Payload::Value(_) => "value",
            Payload::Bytes(_) => "bytes",
        }
    }
}

/// One stage of a serialization pipeline
pub trait Codec: Send + Sync {
    /// Short name used in registry lookups and chain strings
    fn name(&self) -> &'static str;

    /// Serialize a payload to bytes
    fn encode(&self, payload: &Payload) -> CodecResult<Vec<u8>>;

    /// Reverse [`Codec::encode`]
    fn decode(&self, data: &[u8]) -> CodecResult<Payload>;
}

/// JSON codec: structured value to UTF-8 JSON bytes
#[derive(Debug, Default, Clone, Copy)]
pub struct Json;

impl Codec for Json {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, payload: &Payload) -> CodecResult<Vec<u8>> {
        match payload {
            Payload::Value(v) => Ok(serde_json::to_vec(v)?),
            Payload::Bytes(_) => Err(CodecError::UnsupportedPayload {
                codec: "json",
                operation: "encode",
                payload: payload.kind(),
            }),
        }
    }

    fn decode(&self, data: &[u8]) -> CodecResult<Payload> {
        Ok(Payload::Value(serde_json::from_slice(data)?))
    }
}

/// Base64 codec: wraps bytes in a transport-safe ASCII encoding
#[derive(Debug, Default, Clone, Copy)]
pub struct Binary;

impl Codec for Binary {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn encode(&self, payload: &Payload) -> CodecResult<Vec<u8>> {
        match payload {
            Payload::Bytes(b) => Ok(BASE64.encode(b).into_bytes()),
            Payload::Value(_) => Err(CodecError::UnsupportedPayload {
                codec: "binary",
                operation: "encode",
                payload: payload.kind(),
            }),
        }
    }

    fn decode(&self, data: &[u8]) -> CodecResult<Payload> {
        Ok(Payload::Bytes(BASE64.decode(data)?))
    }
}

/// Pass-through codec for values that are already bytes
#[derive(Debug, Default, Clone, Copy)]
pub struct Raw;

impl Codec for Raw {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn encode(&self, payload: &Payload) -> CodecResult<Vec<u8>> {
        match payload {
            Payload::Bytes(b) => Ok(b.clone()),
            Payload::Value(_) => Err(CodecError::UnsupportedPayload {
                codec: "raw",
                operation: "encode",
                payload: payload.kind(),
            }),
        }
    }

    fn decode(&self, data: &[u8]) -> CodecResult<Payload> {
        Ok(Payload::Bytes(data.to_vec()))
    }
}

/// An ordered pipeline of codec stages.
///
/// Encoding folds the stages left to right, threading each stage's
/// output bytes into the next stage as a [`Payload::Bytes`]. Decoding
/// folds right to left.
pub struct CodecChain {
    stages: Vec<Arc<dyn Codec>>,
}

impl CodecChain {
    pub fn new(stages: Vec<Arc<dyn Codec>>) -> Self {
        debug_assert!(!stages.is_empty());
        Self { stages }
    }

    pub fn single(codec: Arc<dyn Codec>) -> Self {
        Self {
            stages: vec![codec],
        }
    }

    /// Run the full pipeline over a structured value
    pub fn encode(&self, payload: &Payload) -> CodecResult<Vec<u8>> {
        let mut iter = self.stages.iter();
        let first = iter
            .next()
            .ok_or_else(|| CodecError::UnknownCodec(String::new()))?;
        let mut data = first.encode(payload)?;
        for stage in iter {
            data = stage.encode(&Payload::Bytes(data))?;
        }
        Ok(data)
    }

    /// Reverse the full pipeline
    pub fn decode(&self, data: &[u8]) -> CodecResult<Payload> {
        let mut iter = self.stages.iter().rev();
        let last = iter
            .next()
            .ok_or_else(|| CodecError::UnknownCodec(String::new()))?;
        let mut payload = last.decode(data)?;
        for stage in iter {
            match payload {
                Payload::Bytes(ref b) => payload = stage.decode(b)?,
                Payload::Value(_) => {
                    return Err(CodecError::UnsupportedPayload {
                        codec: stage.name(),
                        operation: "decode",
                        payload: "value",
                    })
                }
            }
        }
        Ok(payload)
    }
}

impl fmt::Debug for CodecChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.stages.iter().map(|c| c.name()).collect();
        f.debug_tuple("CodecChain").field(&names.join("|")).finish()
    }
}

/// Name-keyed codec lookup.
///
/// Resolves single names (`"json"`) and pipe-separated chains
/// (`"json|binary"`). The default registry knows `json`, `binary` and
/// `raw`; applications can register their own stages.
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn Codec>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    pub fn register(&mut self, codec: Arc<dyn Codec>) {
        self.codecs.insert(codec.name().to_string(), codec);
    }

    /// Resolve a name or pipe-separated chain of names
    pub fn get(&self, name: &str) -> CodecResult<CodecChain> {
        let stages = name
            .split('|')
            .map(|part| {
                let part = part.trim();
                self.codecs
                    .get(part)
                    .cloned()
                    .ok_or_else(|| CodecError::UnknownCodec(part.to_string()))
            })
            .collect::<CodecResult<Vec<_>>>()?;

        if stages.is_empty() {
            return Err(CodecError::UnknownCodec(name.to_string()));
        }
        Ok(CodecChain::new(stages))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.codecs.contains_key(name)
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(Json));
        registry.register(Arc::new(Binary));
        registry.register(Arc::new(Raw));
        registry
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.codecs.keys().collect();
        names.sort();
        f.debug_struct("CodecRegistry").field("codecs", &names).finish()
    }
}

/// Serialize a value with the named codec chain, defaulting to JSON.
///
/// `None` means "no codec configured", which falls back to the JSON
/// stage rather than failing.
pub fn dumps(
    registry: &CodecRegistry,
    codec: Option<&str>,
    value: &serde_json::Value,
) -> CodecResult<Vec<u8>> {
    let chain = registry.get(codec.unwrap_or("json"))?;
    chain.encode(&Payload::Value(value.clone()))
}

/// Reverse [`dumps`]
pub fn loads(
    registry: &CodecRegistry,
    codec: Option<&str>,
    data: &[u8],
) -> CodecResult<serde_json::Value> {
    let chain = registry.get(codec.unwrap_or("json"))?;
    match chain.decode(data)? {
        Payload::Value(v) => Ok(v),
        Payload::Bytes(b) => Ok(serde_json::Value::String(
            String::from_utf8_lossy(&b).into_owned(),
        )),
    }
}
