//! Key events: their version strings, serialization, construction, and the
//! key state they fold into.
//!
//! Events are ordered JSON maps (we call them "sads", self-addressing data)
//! because their field order is part of what gets digested and signed.

pub mod eventing;
pub mod serder;
pub mod state;

pub use eventing::{ample, incept, interact, messagize, rotate, Attachment, InceptArgs, InteractArgs, RotateArgs, Seal};
pub use serder::Serder;
pub use state::KeyState;

use crate::{
    error::{Error, Result},
    util::ser::serialize_json,
};
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// An insertion-ordered field map.
pub type Sad = serde_json::Map<String, Value>;

/// Length of a version string: `KERI10JSON000000_`.
pub const VERSION_SIZE: usize = 17;

/// How far into a message we'll look for the version string.
pub(crate) const MAX_VERSION_OFFSET: usize = 12;

/// The current protocol version.
pub const VERSION: Version = Version { major: 1, minor: 0 };

/// What protocol a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    KERI,
    ACDC,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KERI => "KERI",
            Self::ACDC => "ACDC",
        }
    }
}

/// Serialization kinds. We only ever write JSON, but we recognize the others
/// so we can say why we refuse them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Kind {
    JSON,
    CBOR,
    MGPK,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JSON => "JSON",
            Self::CBOR => "CBOR",
            Self::MGPK => "MGPK",
        }
    }

    fn from_code(kind: &str) -> Option<Self> {
        match kind {
            "JSON" => Some(Self::JSON),
            "CBOR" => Some(Self::CBOR),
            "MGPK" => Some(Self::MGPK),
            _ => None,
        }
    }

    /// Serialize a map in this kind.
    pub fn dumps(&self, sad: &Sad) -> Result<Vec<u8>> {
        match self {
            Self::JSON => serialize_json(sad),
            _ => Err(Error::UnsupportedKind(self.as_str().into())),
        }
    }

    /// Deserialize a map in this kind.
    pub fn loads(&self, raw: &[u8]) -> Result<Sad> {
        match self {
            Self::JSON => Ok(serde_json::from_slice(raw)?),
            _ => Err(Error::UnsupportedKind(self.as_str().into())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

/// Event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ilk {
    /// Inception
    Icp,
    /// Rotation
    Rot,
    /// Interaction
    Ixn,
    /// Delegated inception
    Dip,
    /// Delegated rotation
    Drt,
    /// Receipt
    Rct,
    /// Query
    Qry,
    /// Reply
    Rpy,
    /// Exchange
    Exn,
}

impl Ilk {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Icp => "icp",
            Self::Rot => "rot",
            Self::Ixn => "ixn",
            Self::Dip => "dip",
            Self::Drt => "drt",
            Self::Rct => "rct",
            Self::Qry => "qry",
            Self::Rpy => "rpy",
            Self::Exn => "exn",
        }
    }

    /// Does this event establish (or re-establish) key state?
    pub fn is_establishment(&self) -> bool {
        matches!(self, Self::Icp | Self::Rot | Self::Dip | Self::Drt)
    }

    pub fn is_inception(&self) -> bool {
        matches!(self, Self::Icp | Self::Dip)
    }
}

impl FromStr for Ilk {
    type Err = Error;
    fn from_str(ilk: &str) -> Result<Self> {
        let ilk = match ilk {
            "icp" => Self::Icp,
            "rot" => Self::Rot,
            "ixn" => Self::Ixn,
            "dip" => Self::Dip,
            "drt" => Self::Drt,
            "rct" => Self::Rct,
            "qry" => Self::Qry,
            "rpy" => Self::Rpy,
            "exn" => Self::Exn,
            _ => Err(Error::EventInvalid(format!("unknown ilk {}", ilk)))?,
        };
        Ok(ilk)
    }
}

impl std::fmt::Display for Ilk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A parsed version string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionString {
    pub protocol: Protocol,
    pub version: Version,
    pub kind: Kind,
    pub size: usize,
}

/// Build a version string.
pub fn versify(protocol: Protocol, version: Version, kind: Kind, size: usize) -> String {
    format!("{}{:x}{:x}{}{:06x}_", protocol.as_str(), version.major, version.minor, kind.as_str(), size)
}

/// Parse a version string.
pub fn deversify(vs: &str) -> Result<VersionString> {
    let invalid = || Error::VersionInvalid(vs.to_string());
    if vs.len() != VERSION_SIZE || !vs.is_ascii() || !vs.ends_with('_') {
        Err(invalid())?;
    }
    let protocol = match &vs[0..4] {
        "KERI" => Protocol::KERI,
        "ACDC" => Protocol::ACDC,
        _ => Err(invalid())?,
    };
    let hex_digit = |s: &str| -> Result<u8> {
        if !s.bytes().all(|c| matches!(c, b'0'..=b'9' | b'a'..=b'f')) {
            Err(invalid())?;
        }
        u8::from_str_radix(s, 16).map_err(|_| invalid())
    };
    let major = hex_digit(&vs[4..5])?;
    let minor = hex_digit(&vs[5..6])?;
    let kind_str = &vs[6..10];
    let kind = Kind::from_code(kind_str).ok_or_else(|| Error::UnsupportedKind(kind_str.to_string()))?;
    let size_str = &vs[10..16];
    if !size_str.bytes().all(|c| matches!(c, b'0'..=b'9' | b'a'..=b'f')) {
        Err(invalid())?;
    }
    let size = usize::from_str_radix(size_str, 16).map_err(|_| invalid())?;
    Ok(VersionString { protocol, version: Version { major, minor }, kind, size })
}

/// Rewrite the size in a map's version string to match its own
/// serialization, returning the serialization.
pub fn sizeify(sad: &mut Sad, kind: Option<Kind>) -> Result<Vec<u8>> {
    let vs = get_str(sad, "v")?;
    let current = deversify(vs)?;
    let kind = kind.unwrap_or(current.kind);
    if kind != Kind::JSON {
        Err(Error::UnsupportedKind(kind.as_str().into()))?;
    }
    let raw = kind.dumps(sad)?;
    let size = raw.len();
    sad.insert("v".into(), Value::String(versify(current.protocol, current.version, kind, size)));
    let raw = kind.dumps(sad)?;
    if raw.len() != size {
        Err(Error::VersionInvalid(format!("serialization changed size ({} != {})", raw.len(), size)))?;
    }
    Ok(raw)
}

/// Grab a string field.
pub(crate) fn get_str<'a>(sad: &'a Sad, field: &str) -> Result<&'a str> {
    sad.get(field)
        .ok_or_else(|| Error::FieldMissing(field.into()))?
        .as_str()
        .ok_or_else(|| Error::EventInvalid(format!("field `{}` is not a string", field)))
}

/// Grab a list-of-strings field.
pub(crate) fn get_str_list(sad: &Sad, field: &str) -> Result<Vec<String>> {
    let list = sad
        .get(field)
        .ok_or_else(|| Error::FieldMissing(field.into()))?
        .as_array()
        .ok_or_else(|| Error::EventInvalid(format!("field `{}` is not a list", field)))?;
    list.iter()
        .map(|v| v.as_str().map(String::from).ok_or_else(|| Error::EventInvalid(format!("field `{}` has a non-string entry", field))))
        .collect()
}

/// Is a field absent or an empty list/map/string?
pub(crate) fn is_empty_field(sad: &Sad, field: &str) -> bool {
    match sad.get(field) {
        None | Some(Value::Null) => true,
        Some(Value::Array(arr)) => arr.is_empty(),
        Some(Value::Object(obj)) => obj.is_empty(),
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn version_strings() {
        let vs = versify(Protocol::KERI, VERSION, Kind::JSON, 0);
        assert_eq!(vs, "KERI10JSON000000_");
        assert_eq!(vs.len(), VERSION_SIZE);
        let vs = versify(Protocol::ACDC, VERSION, Kind::JSON, 0x1fd);
        assert_eq!(vs, "ACDC10JSON0001fd_");
        let parsed = deversify(&vs).unwrap();
        assert_eq!(parsed.protocol, Protocol::ACDC);
        assert_eq!(parsed.kind, Kind::JSON);
        assert_eq!(parsed.size, 0x1fd);
        assert_eq!(deversify("KERI10CBOR000000_").unwrap().kind, Kind::CBOR);
        assert_eq!(deversify("KERI10XXXX000000_").err(), Some(Error::UnsupportedKind("XXXX".into())));
        assert_eq!(deversify("KERI10JSON00000_").err(), Some(Error::VersionInvalid("KERI10JSON00000_".into())));
        assert_eq!(deversify("KERI10JSON0000FD_").err(), Some(Error::VersionInvalid("KERI10JSON0000FD_".into())));
    }

    #[test]
    fn sizes_itself() {
        let mut sad = json!({"v": "KERI10JSON000000_", "t": "ixn", "a": []}).as_object().unwrap().clone();
        let raw = sizeify(&mut sad, None).unwrap();
        let vs = deversify(get_str(&sad, "v").unwrap()).unwrap();
        assert_eq!(vs.size, raw.len());
        assert_eq!(raw, serialize_json(&sad).unwrap());

        let mut cbor = json!({"v": "KERI10CBOR000000_"}).as_object().unwrap().clone();
        assert_eq!(sizeify(&mut cbor, None).err(), Some(Error::UnsupportedKind("CBOR".into())));
        let mut missing = json!({"t": "icp"}).as_object().unwrap().clone();
        assert_eq!(sizeify(&mut missing, None).err(), Some(Error::FieldMissing("v".into())));
    }

    #[test]
    fn ilks() {
        assert_eq!(Ilk::from_str("dip").unwrap(), Ilk::Dip);
        assert!(Ilk::Drt.is_establishment());
        assert!(!Ilk::Ixn.is_establishment());
        assert_eq!(serde_json::to_string(&Ilk::Rot).unwrap(), "\"rot\"");
        assert!(Ilk::from_str("nope").is_err());
    }
}
