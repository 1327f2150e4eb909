//! Matter is the base of every non-indexed primitive: a code plus raw bytes.
//!
//! The text form (qb64) is `code + soft + base64url(pad + lead + raw)` with
//! the pad chars dropped so the whole thing lands on a 24-bit boundary. The
//! binary form (qb2) is just the base64 decode of qb64.

use crate::{
    cesr::{
        code::{matter_hard_size, MatterCode, VariableFamily},
        exfil, infil, text_slice,
    },
    error::{Error, Result},
    util::ser::{b64_to_int, base64_decode, base64_encode, int_to_b64, qb2_peek},
};
use getset::Getters;

/// Variable sized material at or over this many quadlets needs a big code.
const SMALL_VARIABLE_LIMIT: usize = 64 * 64;

/// A fully-qualified piece of CESR material.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct Matter {
    /// The derivation code.
    code: MatterCode,
    /// The raw material.
    raw: Vec<u8>,
    /// For variable sized codes, the number of quadlets after the code.
    size: Option<usize>,
}

impl Matter {
    /// Build from a fixed code and raw bytes. The raw length must match what
    /// the code calls for. Variable codes get their size computed from raw.
    pub fn new(code: MatterCode, raw: impl Into<Vec<u8>>) -> Result<Self> {
        let raw = raw.into();
        let sizage = code.sizage();
        match sizage.raw_size() {
            Some(expected) => {
                if raw.len() != expected {
                    Err(Error::SizeMismatch { code: code.to_string(), expected, got: raw.len() })?;
                }
                Ok(Self { code, raw, size: None })
            }
            None => {
                if (raw.len() + sizage.ls) % 3 != 0 {
                    Err(Error::SizeMismatch {
                        code: code.to_string(),
                        expected: raw.len() + (3 - (raw.len() + sizage.ls) % 3),
                        got: raw.len(),
                    })?;
                }
                let size = (raw.len() + sizage.ls) / 3;
                if size >= 64usize.pow(sizage.ss as u32) {
                    Err(Error::InvalidCount { code: code.to_string(), count: size as u64 })?;
                }
                Ok(Self { code, raw, size: Some(size) })
            }
        }
    }

    /// Build fixed material when the caller already guarantees the raw
    /// size matches the code.
    pub(crate) fn fixed_unchecked(code: MatterCode, raw: Vec<u8>) -> Self {
        Self { code, raw, size: None }
    }

    /// Build variable sized material, picking the lead size and small/big
    /// code from the length of `raw`.
    pub fn new_variable(family: VariableFamily, raw: impl Into<Vec<u8>>) -> Result<Self> {
        let raw = raw.into();
        let ls = (3 - (raw.len() % 3)) % 3;
        let size = (raw.len() + ls) / 3;
        let code = family.code(ls, size >= SMALL_VARIABLE_LIMIT);
        Self::new(code, raw)
    }

    /// Parse strictly: the text must be exactly one primitive.
    pub fn from_qb64(qb64: &str) -> Result<Self> {
        let (matter, used) = Self::parse(qb64.as_bytes())?;
        if used != qb64.len() {
            Err(Error::Overage(qb64.len() - used))?;
        }
        Ok(matter)
    }

    /// Parse strictly from qb64 bytes.
    pub fn from_qb64b(qb64b: &[u8]) -> Result<Self> {
        let (matter, used) = Self::parse(qb64b)?;
        if used != qb64b.len() {
            Err(Error::Overage(qb64b.len() - used))?;
        }
        Ok(matter)
    }

    /// Parse one primitive from the front of a stream, returning it with the
    /// number of chars consumed.
    pub fn parse(qb64b: &[u8]) -> Result<(Self, usize)> {
        let first = *qb64b.first().ok_or(Error::Shortage { need: 1, have: 0 })?;
        let hs = matter_hard_size(first).ok_or_else(|| Error::UnexpectedCode(String::from_utf8_lossy(&[first]).into_owned()))?;
        if qb64b.len() < hs {
            Err(Error::Shortage { need: hs, have: qb64b.len() })?;
        }
        let hard = text_slice(qb64b, 0, hs)?;
        let code = MatterCode::from_code(hard).ok_or_else(|| Error::UnexpectedCode(hard.to_string()))?;
        let sizage = code.sizage();
        let cs = sizage.hs + sizage.ss;
        if qb64b.len() < cs {
            Err(Error::Shortage { need: cs, have: qb64b.len() })?;
        }
        let (fs, size) = match sizage.fs {
            Some(fs) => (fs, None),
            None => {
                let size = b64_to_int(text_slice(qb64b, hs, cs)?)? as usize;
                (cs + size * 4, Some(size))
            }
        };
        if qb64b.len() < fs {
            Err(Error::Shortage { need: fs, have: qb64b.len() })?;
        }

        let raw = exfil(qb64b, cs, fs, sizage.ls)?;
        if let Some(expected) = sizage.raw_size() {
            if raw.len() != expected {
                Err(Error::SizeMismatch { code: code.to_string(), expected, got: raw.len() })?;
            }
        }
        Ok((Self { code, raw, size }, fs))
    }

    /// Parse strictly from binary.
    pub fn from_qb2(qb2: &[u8]) -> Result<Self> {
        let (matter, used) = Self::parse_qb2(qb2)?;
        if used != qb2.len() {
            Err(Error::Overage(qb2.len() - used))?;
        }
        Ok(matter)
    }

    /// Parse one primitive from the front of a binary stream, returning it
    /// with the number of bytes consumed.
    pub fn parse_qb2(qb2: &[u8]) -> Result<(Self, usize)> {
        let first = qb2_peek(qb2, 1)?;
        let hs = matter_hard_size(first.as_bytes()[0]).ok_or_else(|| Error::UnexpectedCode(first.clone()))?;
        let hard = qb2_peek(qb2, hs)?;
        let code = MatterCode::from_code(&hard).ok_or_else(|| Error::UnexpectedCode(hard.clone()))?;
        let sizage = code.sizage();
        let fs = match sizage.fs {
            Some(fs) => fs,
            None => {
                let cs = sizage.hs + sizage.ss;
                let both = qb2_peek(qb2, cs)?;
                cs + (b64_to_int(&both[hs..])? as usize) * 4
            }
        };
        let bs = (fs * 3) / 4;
        if qb2.len() < bs {
            Err(Error::Shortage { need: bs, have: qb2.len() })?;
        }
        let text = base64_encode(&qb2[..bs]);
        let (matter, _) = Self::parse(text.as_bytes())?;
        Ok((matter, bs))
    }

    /// The code plus any soft (size) chars.
    fn both(&self) -> String {
        let sizage = self.code.sizage();
        match self.size {
            Some(size) => format!("{}{}", self.code.as_str(), int_to_b64(size as u64, sizage.ss)),
            None => self.code.as_str().to_string(),
        }
    }

    /// Fully qualified base64 text.
    pub fn qb64(&self) -> String {
        infil(&self.both(), &self.raw, self.code.sizage().ls)
    }

    /// Fully qualified base64 text, as bytes.
    pub fn qb64b(&self) -> Vec<u8> {
        self.qb64().into_bytes()
    }

    /// Fully qualified binary.
    pub fn qb2(&self) -> Vec<u8> {
        // qb64 always lands on a quadlet boundary, so this cannot fail
        base64_decode(self.qb64()).unwrap_or_default()
    }

    /// Size of the qb64 text in chars.
    pub fn full_size(&self) -> usize {
        let sizage = self.code.sizage();
        match (sizage.fs, self.size) {
            (Some(fs), _) => fs,
            (None, Some(size)) => sizage.hs + sizage.ss + size * 4,
            (None, None) => sizage.hs + sizage.ss,
        }
    }

    /// Non-transferable keys can never be rotated away from.
    pub fn is_transferable(&self) -> bool {
        !self.code.is_non_transferable()
    }

    pub fn is_digestive(&self) -> bool {
        self.code.is_digestive()
    }

    pub fn is_prefixive(&self) -> bool {
        self.code.is_prefixive()
    }
}

qb64_serde!(Matter);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ed25519_verkey_text() {
        let matter = Matter::new(MatterCode::Ed25519N, [0u8; 32]).unwrap();
        assert_eq!(matter.qb64(), format!("B{}", "A".repeat(43)));
        assert_eq!(matter.qb64().len(), 44);
        assert!(!matter.is_transferable());
        let parsed = Matter::from_qb64(&matter.qb64()).unwrap();
        assert_eq!(parsed, matter);
    }

    #[test]
    fn raw_size_enforced() {
        let res = Matter::new(MatterCode::Ed25519, [0u8; 31]);
        assert_eq!(res.err(), Some(Error::SizeMismatch { code: "D".into(), expected: 32, got: 31 }));
    }

    #[test]
    fn salt_text() {
        let raw = b"0123456789abcdef";
        let matter = Matter::new(MatterCode::Salt_128, raw.to_vec()).unwrap();
        let qb64 = matter.qb64();
        assert_eq!(qb64, "0AAwMTIzNDU2Nzg5YWJjZGVm");
        assert_eq!(qb64.len(), 24);
        assert_eq!(Matter::from_qb64(&qb64).unwrap().raw(), &raw.to_vec());
    }

    #[test]
    fn parse_consumes_one() {
        let one = Matter::new(MatterCode::Blake3_256, [7u8; 32]).unwrap();
        let two = Matter::new(MatterCode::Ed25519_Sig, [9u8; 64]).unwrap();
        let stream = format!("{}{}", one.qb64(), two.qb64());
        let (first, used) = Matter::parse(stream.as_bytes()).unwrap();
        assert_eq!(first, one);
        assert_eq!(used, 44);
        let (second, used2) = Matter::parse(&stream.as_bytes()[used..]).unwrap();
        assert_eq!(second, two);
        assert_eq!(used2, 88);
        assert_eq!(Matter::from_qb64(&stream).err(), Some(Error::Overage(88)));
    }

    #[test]
    fn bad_text() {
        assert_eq!(Matter::from_qb64("").err(), Some(Error::Shortage { need: 1, have: 0 }));
        assert_eq!(Matter::from_qb64("-AAB").err(), Some(Error::UnexpectedCode("-".into())));
        assert_eq!(Matter::from_qb64("DAAA").err(), Some(Error::Shortage { need: 44, have: 4 }));
        // second char carries set pad bits
        let bad = format!("D_{}", "A".repeat(42));
        assert_eq!(Matter::from_qb64(&bad).err(), Some(Error::NonZeroPad));
    }

    #[test]
    fn variable_sizes() {
        for len in 0..10usize {
            let raw = vec![0xa5u8; len];
            let matter = Matter::new_variable(VariableFamily::Bytes, raw.clone()).unwrap();
            let ls = (3 - (len % 3)) % 3;
            assert_eq!(matter.code().sizage().ls, ls);
            let qb64 = matter.qb64();
            assert_eq!(qb64.len() % 4, 0);
            assert_eq!(qb64.len(), matter.full_size());
            let parsed = Matter::from_qb64(&qb64).unwrap();
            assert_eq!(parsed.raw(), &raw);
        }
        let big = Matter::new_variable(VariableFamily::Bytes, vec![1u8; 3 * 4096]).unwrap();
        assert_eq!(big.code(), &MatterCode::Bytes_Big_L0);
        assert_eq!(Matter::from_qb64(&big.qb64()).unwrap(), big);
    }

    #[test]
    fn binary_form() {
        let matter = Matter::new(MatterCode::Ed25519, [3u8; 32]).unwrap();
        let qb2 = matter.qb2();
        assert_eq!(qb2.len(), 33);
        assert_eq!(Matter::from_qb2(&qb2).unwrap(), matter);
        let var = Matter::new_variable(VariableFamily::Bytes, b"hello".to_vec()).unwrap();
        let mut stream = var.qb2();
        stream.extend(matter.qb2());
        let (parsed, used) = Matter::parse_qb2(&stream).unwrap();
        assert_eq!(parsed, var);
        assert_eq!(Matter::from_qb2(&stream[used..]).unwrap(), matter);
    }

    #[test]
    fn serde_as_text() {
        let matter = Matter::new(MatterCode::Blake3_256, [1u8; 32]).unwrap();
        let json = serde_json::to_string(&matter).unwrap();
        assert_eq!(json, format!("\"{}\"", matter.qb64()));
        let back: Matter = serde_json::from_str(&json).unwrap();
        assert_eq!(back, matter);
    }
}
