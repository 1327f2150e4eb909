//! Digests as CESR material.

use crate::{
    cesr::{Matter, MatterCode},
    error::{Error, Result},
};
use blake2::Digest;
use std::ops::Deref;
use subtle::ConstantTimeEq;

/// Run the hash function a digest code names over `ser`.
pub(crate) fn digest(code: MatterCode, ser: &[u8]) -> Result<Vec<u8>> {
    let out = match code {
        MatterCode::Blake3_256 => blake3::hash(ser).as_bytes().to_vec(),
        MatterCode::Blake3_512 => {
            let mut out = [0u8; 64];
            let mut hasher = blake3::Hasher::new();
            hasher.update(ser);
            hasher.finalize_xof().fill(&mut out);
            out.to_vec()
        }
        MatterCode::Blake2b_256 => blake2::Blake2b::<blake2::digest::consts::U32>::digest(ser).to_vec(),
        MatterCode::Blake2b_512 => blake2::Blake2b512::digest(ser).to_vec(),
        MatterCode::Blake2s_256 => blake2::Blake2s256::digest(ser).to_vec(),
        MatterCode::SHA2_256 => sha2::Sha256::digest(ser).to_vec(),
        MatterCode::SHA2_512 => sha2::Sha512::digest(ser).to_vec(),
        _ => Err(Error::UnsupportedCode(code.to_string()))?,
    };
    Ok(out)
}

/// A digest of some serialization, qualified by the algorithm that made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diger {
    matter: Matter,
}

impl Diger {
    /// Digest `ser` with the algorithm `code` names.
    pub fn new(code: MatterCode, ser: &[u8]) -> Result<Self> {
        if !code.is_digestive() {
            Err(Error::UnexpectedCode(code.to_string()))?;
        }
        let raw = digest(code, ser)?;
        Ok(Self { matter: Matter::new(code, raw)? })
    }

    /// Wrap an existing digest.
    pub fn from_raw(code: MatterCode, raw: impl Into<Vec<u8>>) -> Result<Self> {
        if !code.is_digestive() {
            Err(Error::UnexpectedCode(code.to_string()))?;
        }
        Ok(Self { matter: Matter::new(code, raw)? })
    }

    pub fn from_qb64(qb64: &str) -> Result<Self> {
        let matter = Matter::from_qb64(qb64)?;
        if !matter.is_digestive() {
            Err(Error::UnexpectedCode(matter.code().to_string()))?;
        }
        Ok(Self { matter })
    }

    /// Does `ser` digest to this value? Compared in constant time.
    pub fn verify(&self, ser: &[u8]) -> bool {
        match digest(*self.code(), ser) {
            Ok(dig) => dig.as_slice().ct_eq(self.raw().as_slice()).into(),
            Err(_) => false,
        }
    }
}

impl Deref for Diger {
    type Target = Matter;
    fn deref(&self) -> &Self::Target {
        &self.matter
    }
}

qb64_serde!(Diger);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digests() {
        let cases = [
            (MatterCode::SHA2_256, "ILp4Fr-PAc_qQUFA3l2uIiOwA2Gjlhd6nLQQ_2HyABWt"),
            (MatterCode::Blake2b_256, "FL3dgTxjQjlyMXHvP-6YV5uUlk47scs-QnJiyMBo1SMZ"),
            (MatterCode::Blake2s_256, "GFCMXowyfBTi4acro07rRS83RYsgntY6KU2Zm0yGZ1mC"),
            (
                MatterCode::Blake2b_512,
                "0EC6gKU_mBxNDWonl7afEvbpTCEvFGhaxLdLErtv2_-i0X2HxTkqq3ktwlLV3kUzzJUY04qo2_GSWrkjhu3UAJkj",
            ),
            (
                MatterCode::SHA2_512,
                "0GDdrzWhk2F6usxBc0muIEExEub6TompfqIKnu7mS1XTmiGSmSonT8GoNro8I6P-671FTUQjZDzoDiqayU-lTKSf",
            ),
        ];
        for (code, expected) in cases {
            let diger = Diger::new(code, b"abc").unwrap();
            assert_eq!(diger.qb64(), expected);
            assert!(diger.verify(b"abc"));
            assert!(!diger.verify(b"abd"));
        }
    }

    #[test]
    fn blake3() {
        let diger = Diger::new(MatterCode::Blake3_256, b"tell me about your mother").unwrap();
        assert_eq!(diger.raw(), &blake3::hash(b"tell me about your mother").as_bytes().to_vec());
        assert_eq!(diger.qb64().len(), 44);
        assert!(diger.qb64().starts_with('E'));
        let big = Diger::new(MatterCode::Blake3_512, b"tell me about your mother").unwrap();
        assert_eq!(big.qb64().len(), 88);
        // the xof output extends the 256 bit digest
        assert_eq!(&big.raw()[..32], diger.raw().as_slice());
        assert!(big.verify(b"tell me about your mother"));
        let parsed = Diger::from_qb64(&diger.qb64()).unwrap();
        assert_eq!(parsed, diger);
    }

    #[test]
    fn unsupported_and_wrong_codes() {
        assert_eq!(Diger::new(MatterCode::SHA3_256, b"hi").err(), Some(Error::UnsupportedCode("H".into())));
        assert_eq!(Diger::new(MatterCode::Ed25519, b"hi").err(), Some(Error::UnexpectedCode("D".into())));
        let key = Matter::new(MatterCode::Ed25519, [0u8; 32]).unwrap();
        assert_eq!(Diger::from_qb64(&key.qb64()).err(), Some(Error::UnexpectedCode("D".into())));
    }
}
