//! Indexed signatures.
//!
//! An indexed signature carries, in its soft chars, the position of the
//! signing key in the current key list (the index) and optionally its
//! position in the prior next-key digest list (the ondex). Small codes have
//! room for indices up to 63. Big codes carry both explicitly.

use crate::{
    cesr::{
        code::{indexer_hard_size, IndexerCode},
        exfil, infil, text_slice,
    },
    error::{Error, Result},
    util::ser::{b64_to_int, base64_decode, base64_encode, int_to_b64, qb2_peek},
};
use getset::Getters;

#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct Indexer {
    code: IndexerCode,
    raw: Vec<u8>,
    /// Position of the signing key in the current key list.
    index: u32,
    /// Position of the signing key's digest in the prior next list. `None`
    /// for current-only codes.
    ondex: Option<u32>,
}

impl Indexer {
    /// Create an indexed signature. Current-only codes take no ondex. The
    /// small "both" codes have no room for an ondex, so it has to equal the
    /// index if given at all.
    pub fn new(code: IndexerCode, raw: impl Into<Vec<u8>>, index: u32, ondex: Option<u32>) -> Result<Self> {
        let raw = raw.into();
        let xizage = code.xizage();
        if raw.len() != xizage.raw_size() {
            Err(Error::SizeMismatch { code: code.to_string(), expected: xizage.raw_size(), got: raw.len() })?;
        }
        if index as u64 >= 64u64.pow((xizage.ss - xizage.os) as u32) {
            Err(Error::InvalidIndex { code: code.to_string(), index: index as u64 })?;
        }
        let ondex = if code.is_current_only() {
            if let Some(ondex) = ondex {
                Err(Error::InvalidIndex { code: code.to_string(), index: ondex as u64 })?;
            }
            None
        } else {
            let ondex = ondex.unwrap_or(index);
            if xizage.os == 0 {
                if ondex != index {
                    Err(Error::InvalidIndex { code: code.to_string(), index: ondex as u64 })?;
                }
            } else if ondex as u64 >= 64u64.pow(xizage.os as u32) {
                Err(Error::InvalidIndex { code: code.to_string(), index: ondex as u64 })?;
            }
            Some(ondex)
        };
        Ok(Self { code, raw, index, ondex })
    }

    pub fn from_qb64(qb64: &str) -> Result<Self> {
        let (indexer, used) = Self::parse(qb64.as_bytes())?;
        if used != qb64.len() {
            Err(Error::Overage(qb64.len() - used))?;
        }
        Ok(indexer)
    }

    /// Parse one indexed signature off the front of a stream.
    pub fn parse(qb64b: &[u8]) -> Result<(Self, usize)> {
        let first = *qb64b.first().ok_or(Error::Shortage { need: 1, have: 0 })?;
        let hs = indexer_hard_size(first).ok_or_else(|| Error::UnexpectedCode(String::from_utf8_lossy(&[first]).into_owned()))?;
        if qb64b.len() < hs {
            Err(Error::Shortage { need: hs, have: qb64b.len() })?;
        }
        let hard = text_slice(qb64b, 0, hs)?;
        let code = IndexerCode::from_code(hard).ok_or_else(|| Error::UnexpectedCode(hard.to_string()))?;
        let xizage = code.xizage();
        let cs = xizage.hs + xizage.ss;
        if qb64b.len() < xizage.fs {
            Err(Error::Shortage { need: xizage.fs, have: qb64b.len() })?;
        }
        let ms = xizage.ss - xizage.os;
        let index = b64_to_int(text_slice(qb64b, hs, hs + ms)?)?;
        let ondex = if code.is_current_only() {
            None
        } else if xizage.os == 0 {
            Some(index)
        } else {
            Some(b64_to_int(text_slice(qb64b, hs + ms, cs)?)?)
        };
        let raw = exfil(qb64b, cs, xizage.fs, xizage.ls)?;
        let index = u32::try_from(index).map_err(|_| Error::InvalidIndex { code: code.to_string(), index })?;
        let ondex = ondex
            .map(|o| u32::try_from(o).map_err(|_| Error::InvalidIndex { code: code.to_string(), index: o }))
            .transpose()?;
        Ok((Self { code, raw, index, ondex }, xizage.fs))
    }

    pub fn from_qb2(qb2: &[u8]) -> Result<Self> {
        let (indexer, used) = Self::parse_qb2(qb2)?;
        if used != qb2.len() {
            Err(Error::Overage(qb2.len() - used))?;
        }
        Ok(indexer)
    }

    pub fn parse_qb2(qb2: &[u8]) -> Result<(Self, usize)> {
        let first = qb2_peek(qb2, 1)?;
        let hs = indexer_hard_size(first.as_bytes()[0]).ok_or_else(|| Error::UnexpectedCode(first.clone()))?;
        let hard = qb2_peek(qb2, hs)?;
        let code = IndexerCode::from_code(&hard).ok_or_else(|| Error::UnexpectedCode(hard.clone()))?;
        let bs = (code.xizage().fs * 3) / 4;
        if qb2.len() < bs {
            Err(Error::Shortage { need: bs, have: qb2.len() })?;
        }
        let text = base64_encode(&qb2[..bs]);
        let (indexer, _) = Self::parse(text.as_bytes())?;
        Ok((indexer, bs))
    }

    pub fn qb64(&self) -> String {
        let xizage = self.code.xizage();
        let ms = xizage.ss - xizage.os;
        let both = format!(
            "{}{}{}",
            self.code.as_str(),
            int_to_b64(self.index as u64, ms),
            int_to_b64(self.ondex.unwrap_or(0) as u64, xizage.os),
        );
        infil(&both, &self.raw, xizage.ls)
    }

    pub fn qb64b(&self) -> Vec<u8> {
        self.qb64().into_bytes()
    }

    pub fn qb2(&self) -> Vec<u8> {
        base64_decode(self.qb64()).unwrap_or_default()
    }
}

qb64_serde!(Indexer);
