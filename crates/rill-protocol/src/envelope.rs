//! Request/reply envelopes.
//!
//! An envelope wraps a payload value with the routing and correlation
//! metadata needed for request/reply on top of plain publish. Envelopes
//! travel on the same topics as plain values, so [`TopicValue`] gives the
//! consumer side a closed set of shapes to match on instead of probing
//! the decoded data at runtime.

use crate::record::Record;
use serde::{Deserialize, Serialize};

/// Request envelope produced by `Actor::ask`.
///
/// Immutable once built. The `is_request` field is always `true`; it is
/// serialized under the wire name `__isareq__` and acts as a cheap type
/// tag when the envelope crosses the generic topic boundary, letting
/// untagged deserialization distinguish a request from a plain mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReqRepRequest<V> {
    /// Namespace of the wrapped value's model (absent for plain values)
    pub namespace: Option<String>,
    /// The payload value
    pub value: V,
    /// Destination topic for the eventual response
    pub reply_to: Option<String>,
    /// Caller-chosen or generated id linking this request to its response
    pub correlation_id: String,
    #[serde(rename = "__isareq__")]
    pub is_request: bool,
}

impl<V: Record> ReqRepRequest<V> {
    pub fn new(
        value: V,
        reply_to: Option<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            namespace: V::namespace().map(str::to_owned),
            value,
            reply_to,
            correlation_id: correlation_id.into(),
            is_request: true,
        }
    }
}

/// Response envelope produced by `Actor::reply`.
///
/// Carries the correlation id copied from the originating request so the
/// caller can match it to a pending ask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReqRepResponse<V> {
    /// Namespace of the wrapped value's model (absent for plain values)
    pub namespace: Option<String>,
    /// The payload value
    pub value: V,
    /// Copied verbatim from the request
    pub correlation_id: String,
}

impl<V: Record> ReqRepResponse<V> {
    pub fn new(value: V, correlation_id: impl Into<String>) -> Self {
        Self {
            namespace: V::namespace().map(str::to_owned),
            value,
            correlation_id: correlation_id.into(),
        }
    }
}

/// The closed set of shapes a topic message can take.
///
/// Variant order matters for untagged deserialization: a request is
/// recognized by its `__isareq__` tag, a response by its
/// `correlation_id`/`value` pair, and everything else decodes as a plain
/// value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TopicValue<V> {
    Request(ReqRepRequest<V>),
    Response(ReqRepResponse<V>),
    Plain(V),
}

impl<V> TopicValue<V> {
    /// Returns true if this message is a request envelope
    pub fn is_request(&self) -> bool {
        matches!(self, Self::Request(_))
    }

    /// Returns true if this message is a response envelope
    pub fn is_response(&self) -> bool {
        matches!(self, Self::Response(_))
    }

    /// The plain value, if this message is not an envelope
    pub fn as_plain(&self) -> Option<&V> {
        match self {
            Self::Plain(v) => Some(v),
            _ => None,
        }
    }

    /// Consume into the plain value, if this message is not an envelope
    pub fn into_plain(self) -> Option<V> {
        match self {
            Self::Plain(v) => Some(v),
            _ => None,
        }
    }
}
