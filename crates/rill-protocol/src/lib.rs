//! Protocol layer for the Rill stream runtime.
//!
//! This crate defines everything that crosses a topic boundary:
//! - [`Record`]: the trait structured values implement to carry model
//!   metadata (a namespace identifier used to tag envelopes)
//! - [`ReqRepRequest`] / [`ReqRepResponse`]: the request/reply envelopes
//!   layered on top of plain publish
//! - [`TopicValue`]: the closed set of shapes a topic message can take
//! - [`Codec`] / [`CodecRegistry`]: name-keyed, chainable serialization

pub mod codec;
pub mod envelope;
pub mod record;

pub use codec::{
    dumps, loads, Binary, Codec, CodecChain, CodecError, CodecRegistry, CodecResult, Json,
    Payload, Raw,
};
pub use envelope::{ReqRepRequest, ReqRepResponse, TopicValue};
pub use record::Record;
