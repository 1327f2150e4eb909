//! Counters frame groups of attached material: "the next N things are
//! controller signatures", "the next N quadlets are attachments", and so on.

use crate::{
    cesr::{
        code::{counter_hard_size, CounterCode},
        text_slice,
    },
    error::{Error, Result},
    util::ser::{b64_to_int, base64_decode, base64_encode, int_to_b64, qb2_peek},
};
use getset::Getters;

#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct Counter {
    code: CounterCode,
    count: u64,
}

impl Counter {
    /// Create a counter. The count must fit in the code's soft chars.
    pub fn new(code: CounterCode, count: u64) -> Result<Self> {
        let ss = code.sizage().ss;
        if count >= 64u64.pow(ss as u32) {
            Err(Error::InvalidCount { code: code.to_string(), count })?;
        }
        Ok(Self { code, count })
    }

    pub fn from_qb64(qb64: &str) -> Result<Self> {
        let (counter, used) = Self::parse(qb64.as_bytes())?;
        if used != qb64.len() {
            Err(Error::Overage(qb64.len() - used))?;
        }
        Ok(counter)
    }

    /// Parse one counter off the front of a stream.
    pub fn parse(qb64b: &[u8]) -> Result<(Self, usize)> {
        if qb64b.len() < 2 {
            Err(Error::Shortage { need: 2, have: qb64b.len() })?;
        }
        let hs = counter_hard_size(qb64b).ok_or_else(|| Error::UnexpectedCode(String::from_utf8_lossy(&qb64b[..2]).into_owned()))?;
        if qb64b.len() < hs {
            Err(Error::Shortage { need: hs, have: qb64b.len() })?;
        }
        let hard = text_slice(qb64b, 0, hs)?;
        let code = CounterCode::from_code(hard).ok_or_else(|| Error::UnexpectedCode(hard.to_string()))?;
        let sizage = code.sizage();
        let fs = sizage.hs + sizage.ss;
        if qb64b.len() < fs {
            Err(Error::Shortage { need: fs, have: qb64b.len() })?;
        }
        let count = b64_to_int(text_slice(qb64b, hs, fs)?)?;
        Ok((Self { code, count }, fs))
    }

    pub fn parse_qb2(qb2: &[u8]) -> Result<(Self, usize)> {
        let selector = qb2_peek(qb2, 2)?;
        let hs = counter_hard_size(selector.as_bytes()).ok_or_else(|| Error::UnexpectedCode(selector.clone()))?;
        let hard = qb2_peek(qb2, hs)?;
        let code = CounterCode::from_code(&hard).ok_or_else(|| Error::UnexpectedCode(hard.clone()))?;
        let sizage = code.sizage();
        let bs = ((sizage.hs + sizage.ss) * 3) / 4;
        if qb2.len() < bs {
            Err(Error::Shortage { need: bs, have: qb2.len() })?;
        }
        let text = base64_encode(&qb2[..bs]);
        let (counter, _) = Self::parse(text.as_bytes())?;
        Ok((counter, bs))
    }

    pub fn qb64(&self) -> String {
        format!("{}{}", self.code.as_str(), int_to_b64(self.count, self.code.sizage().ss))
    }

    pub fn qb64b(&self) -> Vec<u8> {
        self.qb64().into_bytes()
    }

    pub fn qb2(&self) -> Vec<u8> {
        base64_decode(self.qb64()).unwrap_or_default()
    }

    /// Shorthand for building a counter's text in one go.
    pub fn encode(code: CounterCode, count: u64) -> Result<String> {
        Ok(Self::new(code, count)?.qb64())
    }
}
