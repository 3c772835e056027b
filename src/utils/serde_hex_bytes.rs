//! serde helpers that carry opaque [`Bytes`] as hex strings so that keys and values
//! which are not valid utf8 survive a trip through a JSON payload.
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde::{Deserializer, Serializer};

/// Enable serde to serialize [`Bytes`] as a hex encoded [`String`]
pub fn serialize<S: Serializer>(v: &Bytes, s: S) -> Result<S::Ok, S::Error> {
    String::serialize(&hex::encode(v), s)
}

/// Enable serde to deserialize a hex encoded [`String`] into [`Bytes`]
///
/// # Errors
/// This function returns an error if the string is not valid hex
pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Bytes, D::Error> {
    let stringified = String::deserialize(d)?;
    let decoded = hex::decode(stringified.into_bytes())
        .map_err(|e| serde::de::Error::custom(format!("Unable to hex::decode {}", e)))?;
    Ok(decoded.into())
}
