//! Canonical JSON encoding and content hashing for reports.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::errors::{ErrorInfo, TheoError};

fn serde_error(code: &str, err: impl ToString) -> TheoError {
    TheoError::Serde(ErrorInfo::new(code, err.to_string()))
}

/// Serializes a value into canonical JSON bytes (object keys sorted, no whitespace).
pub fn to_canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, TheoError> {
    let tree = serde_json::to_value(value).map_err(|err| serde_error("json-value", err))?;
    serde_json::to_vec(&tree).map_err(|err| serde_error("json-serialize", err))
}

/// Decodes a value from JSON bytes.
pub fn from_json_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, TheoError> {
    serde_json::from_slice(bytes).map_err(|err| serde_error("json-deserialize", err))
}

/// Computes the lowercase hex SHA-256 digest of the canonical JSON encoding.
pub fn stable_hash_string<T: Serialize + ?Sized>(value: &T) -> Result<String, TheoError> {
    let bytes = to_canonical_json_bytes(value)?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|byte| format!("{:02x}", byte)).collect())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn hash_ignores_map_insertion_order() {
        let mut first = HashMap::new();
        first.insert("b", 2);
        first.insert("a", 1);
        let mut second = HashMap::new();
        second.insert("a", 1);
        second.insert("b", 2);
        assert_eq!(
            stable_hash_string(&first).unwrap(),
            stable_hash_string(&second).unwrap()
        );
    }
}
