//! A serialized event: the exact bytes that get signed, alongside the map
//! they came from.

use crate::{
    cesr::{MatterCode, Number},
    crypto::{Diger, Prefixer, Saider, Verfer, DEFAULT_LABEL},
    error::{Error, Result},
    event::{deversify, get_str, get_str_list, sizeify, Ilk, Kind, Sad, VersionString, MAX_VERSION_OFFSET, VERSION_SIZE},
    tholder::Tholder,
};
use std::str::FromStr;

/// An event (or any versioned map) alongside its serialization.
#[derive(Debug, Clone, PartialEq, getset::Getters)]
#[getset(get = "pub")]
pub struct Serder {
    /// The serialized bytes.
    raw: Vec<u8>,
    /// The field map.
    ked: Sad,
    /// The parsed version string.
    version: VersionString,
}

impl Serder {
    /// Wrap a map, resizing its version string to match.
    pub fn new(mut ked: Sad) -> Result<Self> {
        let raw = sizeify(&mut ked, None)?;
        let version = deversify(get_str(&ked, "v")?)?;
        Ok(Self { raw, ked, version })
    }

    /// Read one message off the front of a stream, returning it and how many
    /// bytes it used.
    pub fn parse(stream: &[u8]) -> Result<(Self, usize)> {
        let window = &stream[..stream.len().min(MAX_VERSION_OFFSET + VERSION_SIZE)];
        let start = window
            .windows(4)
            .position(|w| w == b"KERI" || w == b"ACDC")
            .filter(|pos| *pos <= MAX_VERSION_OFFSET)
            .ok_or_else(|| Error::VersionInvalid("no version string found".into()))?;
        if stream.len() < start + VERSION_SIZE {
            Err(Error::Shortage { need: start + VERSION_SIZE, have: stream.len() })?;
        }
        let vs = std::str::from_utf8(&stream[start..start + VERSION_SIZE])
            .map_err(|_| Error::VersionInvalid("version string is not text".into()))?;
        let version = deversify(vs)?;
        if stream.len() < version.size {
            Err(Error::Shortage { need: version.size, have: stream.len() })?;
        }
        let raw = stream[..version.size].to_vec();
        let ked = version.kind.loads(&raw)?;
        if get_str(&ked, "v")? != vs {
            Err(Error::VersionInvalid(format!("embedded version string doesn't match {}", vs)))?;
        }
        let size = version.size;
        Ok((Self { raw, ked, version }, size))
    }

    /// Read a message that must take up the entire buffer.
    pub fn from_raw(raw: &[u8]) -> Result<Self> {
        let (serder, used) = Self::parse(raw)?;
        if used != raw.len() {
            Err(Error::Overage(raw.len() - used))?;
        }
        Ok(serder)
    }

    pub fn kind(&self) -> Kind {
        self.version.kind
    }

    pub fn size(&self) -> usize {
        self.version.size
    }

    /// The identifier prefix (`i`).
    pub fn pre(&self) -> Result<&str> {
        get_str(&self.ked, "i")
    }

    /// The sequence number, parsed from its hex `s` field.
    pub fn sn(&self) -> Result<u128> {
        let snh = get_str(&self.ked, "s")?;
        Ok(Number::from_numh(snh)?.num())
    }

    pub fn ilk(&self) -> Result<Ilk> {
        Ilk::from_str(get_str(&self.ked, "t")?)
    }

    /// The SAID (`d`).
    pub fn said(&self) -> Result<&str> {
        get_str(&self.ked, DEFAULT_LABEL)
    }

    /// Current signing keys (`k`).
    pub fn keys(&self) -> Result<Vec<String>> {
        get_str_list(&self.ked, "k")
    }

    pub fn verfers(&self) -> Result<Vec<Verfer>> {
        self.keys()?.iter().map(|k| Verfer::from_qb64(k)).collect()
    }

    /// Next key digests (`n`).
    pub fn ndigs(&self) -> Result<Vec<String>> {
        get_str_list(&self.ked, "n")
    }

    pub fn digers(&self) -> Result<Vec<Diger>> {
        self.ndigs()?.iter().map(|d| Diger::from_qb64(d)).collect()
    }

    /// Current signing threshold (`kt`).
    pub fn tholder(&self) -> Result<Tholder> {
        Tholder::from_sith(self.ked.get("kt").ok_or_else(|| Error::FieldMissing("kt".into()))?)
    }

    /// Next signing threshold (`nt`).
    pub fn ntholder(&self) -> Result<Tholder> {
        Tholder::from_sith(self.ked.get("nt").ok_or_else(|| Error::FieldMissing("nt".into()))?)
    }

    /// The delegator prefix, for delegated inceptions.
    pub fn delpre(&self) -> Option<&str> {
        self.ked.get("di").and_then(|v| v.as_str())
    }

    /// Check the event's SAID. Inceptions with a self-addressing prefix
    /// carry the same digest in `i` and `d`, so we re-derive the prefix
    /// instead.
    pub fn verify_said(&self) -> bool {
        let said = match self.said() {
            Ok(said) => said,
            Err(_) => return false,
        };
        let saider = match Saider::from_qb64(said) {
            Ok(saider) => saider,
            Err(_) => return false,
        };
        let inception = self.ilk().map(|ilk| ilk.is_inception()).unwrap_or(false);
        if inception {
            if let Ok(pre) = self.pre() {
                if let Ok(prefixer) = Prefixer::from_qb64(pre) {
                    if prefixer.is_digestive() {
                        return pre == said && prefixer.verify(&self.ked, true);
                    }
                }
            }
        }
        saider.verify(&self.ked, true, true, self.kind(), DEFAULT_LABEL)
    }

    /// The digest code of the SAID.
    pub fn said_code(&self) -> Result<MatterCode> {
        Ok(*Saider::from_qb64(self.said()?)?.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::ser::serialize_json;
    use serde_json::json;

    fn ixn() -> Sad {
        json!({
            "v": "KERI10JSON000000_",
            "t": "ixn",
            "d": "",
            "i": "EBfdlu8R27Fbx-ehrqwImnK-8Cm79sqbAQ4MmvEAYqao",
            "s": "a",
            "p": "EBfdlu8R27Fbx-ehrqwImnK-8Cm79sqbAQ4MmvEAYqao",
            "a": [],
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[test]
    fn new_sizes() {
        let serder = Serder::new(ixn()).unwrap();
        assert_eq!(serder.size(), serder.raw().len());
        assert_eq!(serder.raw(), &serialize_json(serder.ked()).unwrap());
        assert_eq!(serder.sn().unwrap(), 10);
        assert_eq!(serder.ilk().unwrap(), Ilk::Ixn);
        assert_eq!(serder.pre().unwrap(), "EBfdlu8R27Fbx-ehrqwImnK-8Cm79sqbAQ4MmvEAYqao");
        assert_eq!(serder.delpre(), None);
        assert_eq!(serder.keys().err(), Some(Error::FieldMissing("k".into())));
    }

    #[test]
    fn parse_stream() {
        let (_, ked) = Saider::saidify(&ixn(), MatterCode::Blake3_256, Kind::JSON, "d").unwrap();
        let serder = Serder::new(ked).unwrap();
        assert!(serder.verify_said());
        let mut stream = serder.raw().clone();
        stream.extend_from_slice(b"-AAB");
        let (parsed, used) = Serder::parse(&stream).unwrap();
        assert_eq!(used, serder.raw().len());
        assert_eq!(parsed, serder);
        assert_eq!(Serder::from_raw(&stream).err(), Some(Error::Overage(4)));
        assert_eq!(
            Serder::parse(&stream[..30]).err(),
            Some(Error::Shortage { need: serder.size(), have: 30 })
        );
        assert!(Serder::parse(b"{\"x\":\"nothing to see here at all\"}").is_err());
    }

    #[test]
    fn tampered_said() {
        let (_, mut ked) = Saider::saidify(&ixn(), MatterCode::Blake3_256, Kind::JSON, "d").unwrap();
        ked.insert("a".into(), json!([{"hi": "there"}]));
        let serder = Serder::new(ked).unwrap();
        assert!(!serder.verify_said());
    }
}
