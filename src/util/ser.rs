//! Helpful serialization tools.
//!
//! CESR lives and dies by base64url, so the helpers for moving between bytes,
//! text, and the integer "sextets" that make up counts and indices live here,
//! alongside the compact JSON serializer our key events are digested over.

use crate::error::{Error, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{de::DeserializeOwned, Serialize};

/// The base64url alphabet, in index order.
pub(crate) const B64_CHARS: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Convert bytes to base64
pub fn base64_encode<T: AsRef<[u8]>>(bytes: T) -> String {
    URL_SAFE_NO_PAD.encode(bytes.as_ref())
}

/// Convert base64 to bytes
pub fn base64_decode<T: AsRef<[u8]>>(bytes: T) -> Result<Vec<u8>> {
    Ok(URL_SAFE_NO_PAD.decode(bytes.as_ref())?)
}

/// Look up the sextet value of a single base64url character.
pub(crate) fn b64_index(c: u8) -> Option<u64> {
    match c {
        b'A'..=b'Z' => Some((c - b'A') as u64),
        b'a'..=b'z' => Some((c - b'a') as u64 + 26),
        b'0'..=b'9' => Some((c - b'0') as u64 + 52),
        b'-' => Some(62),
        b'_' => Some(63),
        _ => None,
    }
}

/// Encode an integer as exactly `len` base64url characters, left padded with
/// `A` (zero).
pub fn int_to_b64(mut num: u64, len: usize) -> String {
    let mut out = vec![b'A'; len];
    for slot in out.iter_mut().rev() {
        *slot = B64_CHARS[(num & 0x3f) as usize];
        num >>= 6;
    }
    // every byte comes out of B64_CHARS so this is always valid utf8
    String::from_utf8_lossy(&out).into_owned()
}

/// Decode a run of base64url characters into an integer.
pub fn b64_to_int(text: &str) -> Result<u64> {
    if text.len() > 10 {
        Err(Error::NumberInvalid(format!("{} sextets will not fit a u64", text.len())))?;
    }
    text.bytes().try_fold(0u64, |acc, c| {
        let val = b64_index(c).ok_or_else(|| Error::UnexpectedCode(text.to_string()))?;
        Ok((acc << 6) | val)
    })
}

/// Pull the first `chars` base64url characters out of binary (qb2) material.
/// Used to peek at codes without converting the whole stream.
pub(crate) fn qb2_peek(qb2: &[u8], chars: usize) -> Result<String> {
    let need = (chars * 3 + 3) / 4;
    if qb2.len() < need {
        Err(Error::Shortage { need, have: qb2.len() })?;
    }
    let mut buf = qb2[..need].to_vec();
    while buf.len() % 3 != 0 {
        buf.push(0);
    }
    let text = base64_encode(&buf);
    Ok(text[..chars].to_string())
}

/// Serialize an object to compact JSON (no whitespace, insertion ordered),
/// which is the form every digest and signature in the protocol is taken over.
pub(crate) fn serialize_json<T: Serialize>(obj: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(obj)?)
}

pub(crate) fn deserialize_human<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_yaml::from_slice(bytes)?)
}

pub(crate) mod human_bytes {
    use super::{base64_decode, base64_encode};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&base64_encode(bytes.as_slice()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = <String>::deserialize(deserializer)?;
        base64_decode(s).map_err(de::Error::custom)
    }
}

/// Implements `Serialize`/`Deserialize` for a CESR primitive as its qb64
/// string.
macro_rules! qb64_serde {
    ($class:ty) => {
        impl serde::Serialize for $class {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.qb64())
            }
        }

        impl<'de> serde::Deserialize<'de> for $class {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                <$class>::from_qb64(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}
