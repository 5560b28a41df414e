//! Canonical entry encoding.
//!
//! Hash stability requires that the same logical entry always produces the
//! same byte sequence, so everything that gets hashed or signed goes
//! through a canonical JSON form:
//!
//! - Compact: no whitespace between tokens.
//! - Object keys sorted lexicographically at every nesting level.
//! - Arrays preserve element order (`next` order is significant).
//! - Binary fields (payload, keys, signatures) are lowercase hex strings.
//!
//! Two preimages are derived from an entry:
//!
//! - **Signing preimage**: the canonical object with `hash` and `sig`
//!   absent. This is what the author signs.
//! - **Block encoding**: the canonical object with every wire field
//!   present, `hash` rendered `null` and `sig` included. The entry's
//!   content address is the BLAKE3 hash of exactly these bytes, so a block
//!   fetched from the store always re-hashes to the address it was fetched
//!   under. Ed25519 signatures are deterministic, which keeps the block
//!   encoding, and hence the address, stable.

use serde_json::Value;

use crate::error::Error;
use crate::store::content_address;

use super::Entry;

/// Serde adapter encoding byte fields as lowercase hex strings.
pub(crate) mod hexstr {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(&text).map_err(serde::de::Error::custom)
    }
}

/// Deserialize the wire `hash` field, tolerating `null` (blocks carry
/// `"hash":null`; the decoder stamps the real address afterwards).
pub(crate) fn nullable_hash<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Canonical JSON writer
// ---------------------------------------------------------------------------

/// Render a [`serde_json::Value`] as canonical JSON: compact, with object
/// keys sorted lexicographically at every depth.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    let mut buf = String::new();
    write_canonical(value, &mut buf);
    buf
}

fn write_canonical(value: &Value, buf: &mut String) {
    match value {
        Value::Null => buf.push_str("null"),
        Value::Bool(b) => buf.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => buf.push_str(&n.to_string()),
        Value::String(s) => {
            buf.push_str(&serde_json::to_string(s).expect("string serialization cannot fail"));
        }
        Value::Array(items) => {
            buf.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                write_canonical(item, buf);
            }
            buf.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            buf.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                buf.push_str(
                    &serde_json::to_string(key).expect("string serialization cannot fail"),
                );
                buf.push(':');
                if let Some(val) = map.get(*key) {
                    write_canonical(val, buf);
                }
            }
            buf.push('}');
        }
    }
}

// ---------------------------------------------------------------------------
// Entry preimages
// ---------------------------------------------------------------------------

/// The canonical bytes an entry's signature covers: every wire field except
/// `hash` and `sig`.
pub fn signing_preimage(entry: &Entry) -> Result<Vec<u8>, Error> {
    let mut value = serde_json::to_value(entry)?;
    let object = value
        .as_object_mut()
        .expect("entry serializes to an object");
    object.remove("hash");
    object.remove("sig");
    Ok(canonical_json(&value).into_bytes())
}

/// The canonical block bytes written to the store: all wire fields, with
/// `hash` rendered `null`. The entry's content address is the address of
/// exactly these bytes.
pub fn encode_block(entry: &Entry) -> Result<Vec<u8>, Error> {
    let mut value = serde_json::to_value(entry)?;
    value["hash"] = Value::Null;
    Ok(canonical_json(&value).into_bytes())
}

/// Decode a block fetched under `address` back into an [`Entry`].
///
/// Verifies that the bytes re-hash to `address` before trusting them, then
/// stamps the entry's `hash` from the address.
pub fn decode_block(bytes: &[u8], address: &str) -> Result<Entry, Error> {
    let computed = content_address(bytes);
    if computed != address {
        return Err(Error::InvalidEntry(format!(
            "block does not match its address: stored under {address}, hashes to {computed}"
        )));
    }

    let mut entry: Entry = serde_json::from_slice(bytes)?;
    entry.hash = address.to_owned();
    Ok(entry)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
