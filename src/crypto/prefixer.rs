//! Identifier prefixes.
//!
//! A prefix is derived from an inception event in one of two ways: it is
//! the (single) inception key itself, or it is a digest of the inception
//! event with both the prefix and SAID fields blanked. Either way, anyone
//! holding the inception event can re-derive it.

use crate::{
    cesr::{Matter, MatterCode},
    crypto::{
        diger::digest,
        saider::dummy,
    },
    error::{Error, Result},
    event::{get_str, get_str_list, is_empty_field, sizeify, Ilk, Kind, Sad},
};
use serde_json::Value;
use std::ops::Deref;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefixer {
    matter: Matter,
}

impl Prefixer {
    /// Derive a prefix from an inception (or delegated inception) event.
    pub fn derive(ked: &Sad, code: MatterCode, kind: Kind) -> Result<Self> {
        let ilk = Ilk::from_str(get_str(ked, "t")?)?;
        if !ilk.is_inception() {
            Err(Error::PrefixInvalid(format!("can't derive a prefix from a {} event", ilk)))?;
        }
        let matter = match code {
            MatterCode::Ed25519N | MatterCode::Ed25519 => Self::derive_basic(ked, code)?,
            _ if code.is_digestive() => Self::derive_digest(ked, code, kind)?,
            _ => Err(Error::UnsupportedCode(code.to_string()))?,
        };
        Ok(Self { matter })
    }

    fn derive_basic(ked: &Sad, code: MatterCode) -> Result<Matter> {
        let keys = get_str_list(ked, "k")?;
        if keys.len() != 1 {
            Err(Error::PrefixInvalid(format!("basic derivation needs exactly one key, got {}", keys.len())))?;
        }
        let verfer = Matter::from_qb64(&keys[0])?;
        if verfer.code() != &code {
            Err(Error::PrefixInvalid(format!("key code {} doesn't match prefix code {}", verfer.code(), code)))?;
        }
        if code == MatterCode::Ed25519N {
            for field in ["n", "b", "a"] {
                if !is_empty_field(ked, field) {
                    Err(Error::PrefixInvalid(format!("non-transferable prefix with non-empty `{}`", field)))?;
                }
            }
        }
        Ok(verfer)
    }

    fn derive_digest(ked: &Sad, code: MatterCode, kind: Kind) -> Result<Matter> {
        let mut blanked = ked.clone();
        let placeholder = dummy(code)?;
        blanked.insert("i".into(), Value::String(placeholder.clone()));
        blanked.insert("d".into(), Value::String(placeholder));
        let ser = sizeify(&mut blanked, Some(kind))?;
        Matter::new(code, digest(code, &ser)?)
    }

    pub fn from_qb64(qb64: &str) -> Result<Self> {
        let matter = Matter::from_qb64(qb64)?;
        if !matter.is_prefixive() {
            Err(Error::UnexpectedCode(matter.code().to_string()))?;
        }
        Ok(Self { matter })
    }

    /// Does this prefix derive from the given inception event? With
    /// `prefixed`, the event's `i` has to already hold this prefix.
    pub fn verify(&self, ked: &Sad, prefixed: bool) -> bool {
        let derived = match Self::derive(ked, *self.code(), Kind::JSON) {
            Ok(derived) => derived,
            Err(_) => return false,
        };
        if derived.qb64() != self.qb64() {
            return false;
        }
        if prefixed {
            return get_str(ked, "i").map(|i| i == self.qb64()).unwrap_or(false);
        }
        true
    }
}

impl Deref for Prefixer {
    type Target = Matter;
    fn deref(&self) -> &Self::Target {
        &self.matter
    }
}

qb64_serde!(Prefixer);
