//! Payload codec: typed values to and from the string form stored by backends.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{CacheError, CacheResult};

/// Serialize a payload to its stored JSON form.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> CacheResult<String> {
    serde_json::to_string(value).map_err(CacheError::Encode)
}

/// Deserialize a stored JSON payload.
///
/// A stored value written by an older payload shape fails here and is
/// treated as a miss by the facade.
pub fn decode<T: DeserializeOwned>(raw: &str) -> CacheResult<T> {
    serde_json::from_str(raw).map_err(CacheError::Decode)
}
