//! Deterministic CBOR encoding for persisted entities.
//!
//! `ciborium` encodes maps in field-declaration order and uses the
//! shortest-form integer encoding required by the CBOR canonical form
//! (RFC 8949 §4.2), so `serde`-derived structs round-trip byte-identically
//! without any additional bookkeeping on our part.

use crate::error::StorageError;
use serde::{de::DeserializeOwned, Serialize};

/// Encode a value to its canonical CBOR byte representation.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| StorageError::Encoding(e.to_string()))?;
    Ok(buf)
}

/// Decode a value from its canonical CBOR byte representation.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    ciborium::from_reader(bytes).map_err(|e| StorageError::Encoding(e.to_string()))
}
