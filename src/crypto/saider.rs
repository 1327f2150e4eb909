//! Self-addressing identifiers: a digest of a map, embedded in that map.
//!
//! To compute one, the label field is filled with `#` placeholders as wide
//! as the final digest, the version string (if any) is resized, and the
//! whole thing is digested. The digest then replaces the placeholders. Since
//! the placeholders and digest are the same width, the serialized size
//! doesn't move.

use crate::{
    cesr::MatterCode,
    crypto::diger::{digest, Diger},
    error::{Error, Result},
    event::{sizeify, Kind, Sad},
};
use serde_json::Value;
use std::ops::Deref;

/// The field SAIDs live in unless told otherwise.
pub const DEFAULT_LABEL: &str = "d";

/// Placeholder char for fields being digested.
pub(crate) const DUMMY: char = '#';

/// A SAID. Structurally a digest, but one that names the map it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Saider {
    diger: Diger,
}

impl Saider {
    /// Compute a map's SAID without touching the map. Returns the SAID and
    /// the blanked/sized map it was computed over.
    pub fn derive(sad: &Sad, code: MatterCode, kind: Kind, label: &str) -> Result<(Self, Sad)> {
        if !code.is_digestive() {
            Err(Error::UnexpectedCode(code.to_string()))?;
        }
        if !sad.contains_key(label) {
            Err(Error::FieldMissing(label.into()))?;
        }
        let mut blanked = sad.clone();
        blanked.insert(label.into(), Value::String(dummy(code)?));
        let ser = if blanked.contains_key("v") { sizeify(&mut blanked, Some(kind))? } else { kind.dumps(&blanked)? };
        let diger = Diger::from_raw(code, digest(code, &ser)?)?;
        Ok((Self { diger }, blanked))
    }

    /// Compute a map's SAID and return the map with the SAID filled in.
    pub fn saidify(sad: &Sad, code: MatterCode, kind: Kind, label: &str) -> Result<(Self, Sad)> {
        let (saider, mut filled) = Self::derive(sad, code, kind, label)?;
        filled.insert(label.into(), Value::String(saider.qb64()));
        Ok((saider, filled))
    }

    pub fn from_qb64(qb64: &str) -> Result<Self> {
        Ok(Self { diger: Diger::from_qb64(qb64)? })
    }

    /// Does this SAID match the map? With `prefixed`, the label field has to
    /// already hold this SAID. With `versioned`, the version string has to
    /// already carry the right size.
    pub fn verify(&self, sad: &Sad, prefixed: bool, versioned: bool, kind: Kind, label: &str) -> bool {
        let (saider, sized) = match Self::derive(sad, *self.code(), kind, label) {
            Ok(derived) => derived,
            Err(_) => return false,
        };
        if saider.qb64() != self.qb64() {
            return false;
        }
        if versioned && sad.contains_key("v") && sad.get("v") != sized.get("v") {
            return false;
        }
        if prefixed && sad.get(label).and_then(|v| v.as_str()) != Some(self.qb64().as_str()) {
            return false;
        }
        true
    }
}

/// A run of placeholder chars as wide as the given code's qb64.
pub(crate) fn dummy(code: MatterCode) -> Result<String> {
    let fs = code.sizage().fs.ok_or_else(|| Error::UnsupportedCode(code.to_string()))?;
    Ok(DUMMY.to_string().repeat(fs))
}

impl Deref for Saider {
    type Target = Diger;
    fn deref(&self) -> &Self::Target {
        &self.diger
    }
}

qb64_serde!(Saider);
