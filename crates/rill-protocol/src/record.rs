use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Core trait for values flowing through Rill topics.
///
/// Records must be:
/// - Serializable through the codec chain (serde)
/// - Send + Sync (replicas run as concurrent tasks)
/// - Cheap to clone (values fan out to multiple sinks)
///
/// The `NAMESPACE` constant is the model metadata used to tag
/// request/reply envelopes. Plain values (strings, raw JSON) leave it
/// empty, which maps to an absent namespace on the wire.
pub trait Record: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Namespace identifier for this record type (empty for plain values)
    const NAMESPACE: &'static str;

    /// Namespace as it appears in envelopes: `None` when empty
    fn namespace() -> Option<&'static str> {
        if Self::NAMESPACE.is_empty() {
            None
        } else {
            Some(Self::NAMESPACE)
        }
    }
}

/// Helper macro to implement the Record trait
#[macro_export]
macro_rules! impl_record {
    ($type:ty, $namespace:expr) => {
        impl $crate::record::Record for $type {
            const NAMESPACE: &'static str = $namespace;
        }
    };
}

// Plain values carry no model metadata.
impl Record for serde_json::Value {
    const NAMESPACE: &'static str = "";
}

impl Record for String {
    const NAMESPACE: &'static str = "";
}
