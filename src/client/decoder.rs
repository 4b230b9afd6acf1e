//! Usage: Injected "decode payload into model" capability.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Nothing in the payload could be resolved as the model to map.
    #[error("no model found at key path {0:?}")]
    NoMappingClass(String),
    #[error("model mapping failed: {0}")]
    MappingFailed(String),
}

pub trait ModelDecoder<T>: Send + Sync {
    fn decode(&self, payload: &Value, model_key_path: Option<&str>) -> Result<T, DecodeError>;
}

/// Decodes any `DeserializeOwned` model with serde.
#[derive(Debug)]
pub struct SerdeDecoder<T>(PhantomData<fn() -> T>);

impl<T> SerdeDecoder<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for SerdeDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SerdeDecoder<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> ModelDecoder<T> for SerdeDecoder<T> {
    fn decode(&self, payload: &Value, model_key_path: Option<&str>) -> Result<T, DecodeError> {
        let target = match model_key_path.map(str::trim).filter(|p| !p.is_empty()) {
            Some(key_path) => resolve_key_path(payload, key_path)
                .ok_or_else(|| DecodeError::NoMappingClass(key_path.to_string()))?,
            None => payload,
        };

        T::deserialize(target).map_err(|e| DecodeError::MappingFailed(e.to_string()))
    }
}

/// Dotted key path, e.g. `"data"` or `"metadata.connections"`.
fn resolve_key_path<'a>(payload: &'a Value, key_path: &str) -> Option<&'a Value> {
    key_path
        .split('.')
        .try_fold(payload, |current, segment| current.get(segment))
}
