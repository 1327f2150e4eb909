//! Ordinals: sequence numbers, thresholds, and the like.

use crate::{
    cesr::{Matter, MatterCode},
    error::{Error, Result},
};

/// A non-negative integer encoded in the smallest number code that holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Number {
    matter: Matter,
}

impl Number {
    pub fn new(num: u128) -> Self {
        let (code, width) = if num <= u16::MAX as u128 {
            (MatterCode::Short, 2)
        } else if num <= u32::MAX as u128 {
            (MatterCode::Long, 4)
        } else if num <= u64::MAX as u128 {
            (MatterCode::Big, 8)
        } else {
            (MatterCode::Salt_128, 16)
        };
        let bytes = num.to_be_bytes();
        let matter = Matter::fixed_unchecked(code, bytes[16 - width..].to_vec());
        Self { matter }
    }

    /// Parse from lowercase hex without leading zeros.
    pub fn from_numh(numh: &str) -> Result<Self> {
        if numh.is_empty() {
            Err(Error::NumberInvalid("empty hex".into()))?;
        }
        if !numh.bytes().all(|c| matches!(c, b'0'..=b'9' | b'a'..=b'f')) || (numh.len() > 1 && numh.starts_with('0')) {
            Err(Error::NumberInvalid(numh.into()))?;
        }
        let num = u128::from_str_radix(numh, 16).map_err(|_| Error::NumberInvalid(numh.into()))?;
        Ok(Self::new(num))
    }

    pub fn from_qb64(qb64: &str) -> Result<Self> {
        let matter = Matter::from_qb64(qb64)?;
        if !matter.code().is_numeric() {
            Err(Error::UnexpectedCode(matter.code().to_string()))?;
        }
        Ok(Self { matter })
    }

    pub fn num(&self) -> u128 {
        self.matter.raw().iter().fold(0u128, |acc, b| (acc << 8) | *b as u128)
    }

    /// Hex form, no leading zeros.
    pub fn numh(&self) -> String {
        format!("{:x}", self.num())
    }

    pub fn qb64(&self) -> String {
        self.matter.qb64()
    }

    pub fn matter(&self) -> &Matter {
        &self.matter
    }
}

/// A sequence number, always in the fixed 16 byte form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seqner {
    matter: Matter,
}

impl Seqner {
    pub fn new(sn: u128) -> Self {
        let matter = Matter::fixed_unchecked(MatterCode::Salt_128, sn.to_be_bytes().to_vec());
        Self { matter }
    }

    pub fn from_snh(snh: &str) -> Result<Self> {
        let sn = u128::from_str_radix(snh, 16).map_err(|_| Error::NumberInvalid(snh.into()))?;
        Ok(Self::new(sn))
    }

    pub fn from_qb64(qb64: &str) -> Result<Self> {
        let matter = Matter::from_qb64(qb64)?;
        if matter.code() != &MatterCode::Salt_128 {
            Err(Error::UnexpectedCode(matter.code().to_string()))?;
        }
        Ok(Self { matter })
    }

    pub fn sn(&self) -> u128 {
        self.matter.raw().iter().fold(0u128, |acc, b| (acc << 8) | *b as u128)
    }

    pub fn snh(&self) -> String {
        format!("{:x}", self.sn())
    }

    pub fn qb64(&self) -> String {
        self.matter.qb64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smallest_code() {
        assert_eq!(Number::new(0).matter().code(), &MatterCode::Short);
        assert_eq!(Number::new(0).qb64(), "MAAA");
        assert_eq!(Number::new(65535).matter().code(), &MatterCode::Short);
        assert_eq!(Number::new(65536).matter().code(), &MatterCode::Long);
        assert_eq!(Number::new(u32::MAX as u128 + 1).matter().code(), &MatterCode::Big);
        assert_eq!(Number::new(u64::MAX as u128 + 1).matter().code(), &MatterCode::Salt_128);
        for num in [0u128, 1, 255, 65536, 1 << 40, u128::MAX] {
            let number = Number::new(num);
            assert_eq!(Number::from_qb64(&number.qb64()).unwrap().num(), num);
        }
    }

    #[test]
    fn hex() {
        assert_eq!(Number::new(0).numh(), "0");
        assert_eq!(Number::new(26).numh(), "1a");
        assert_eq!(Number::from_numh("1a").unwrap().num(), 26);
        assert_eq!(Number::from_numh("").err(), Some(Error::NumberInvalid("empty hex".into())));
        assert_eq!(Number::from_numh("xyz").err(), Some(Error::NumberInvalid("xyz".into())));
        assert_eq!(Number::from_numh("1A").err(), Some(Error::NumberInvalid("1A".into())));
        assert_eq!(Number::from_numh("01").err(), Some(Error::NumberInvalid("01".into())));
        assert_eq!(Number::from_numh("0").unwrap().num(), 0);
    }

    #[test]
    fn seqner() {
        let seqner = Seqner::new(1);
        assert_eq!(seqner.qb64(), "0AAAAAAAAAAAAAAAAAAAAAAB");
        assert_eq!(Seqner::from_qb64(&seqner.qb64()).unwrap().sn(), 1);
        assert_eq!(seqner.snh(), "1");
        assert!(Seqner::from_qb64("MAAA").is_err());
    }
}
