//! Signing keys, verification keys, and the two shapes of signature KERI
//! attaches to events: indexed (Siger) and non-indexed (Cigar).
//!
//! Only Ed25519 is implemented. The other signature suites are registered as
//! codes so their material can be carried around, but asking us to sign or
//! verify with them returns `UnsupportedCode`.

use crate::{
    cesr::{Indexer, IndexerCode, Matter, MatterCode},
    error::{Error, Result},
};
use rand::{CryptoRng, RngCore};
use std::ops::Deref;
use zeroize::Zeroizing;

/// A public verification key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verfer {
    matter: Matter,
}

impl Verfer {
    pub fn new(code: MatterCode, raw: impl Into<Vec<u8>>) -> Result<Self> {
        if !matches!(code, MatterCode::Ed25519 | MatterCode::Ed25519N) {
            Err(Error::UnsupportedCode(code.to_string()))?;
        }
        Ok(Self { matter: Matter::new(code, raw)? })
    }

    pub fn from_qb64(qb64: &str) -> Result<Self> {
        let matter = Matter::from_qb64(qb64)?;
        if !matches!(matter.code(), MatterCode::Ed25519 | MatterCode::Ed25519N) {
            Err(Error::UnsupportedCode(matter.code().to_string()))?;
        }
        Ok(Self { matter })
    }

    /// Verify a raw signature over `ser`.
    pub fn verify(&self, sig: &[u8], ser: &[u8]) -> bool {
        let key_bytes: [u8; 32] = match self.raw().as_slice().try_into() {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        let sig_bytes: [u8; 64] = match sig.try_into() {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        let pubkey = match ed25519_consensus::VerificationKey::try_from(key_bytes) {
            Ok(key) => key,
            Err(_) => return false,
        };
        let sig = ed25519_consensus::Signature::from(sig_bytes);
        pubkey.verify(&sig, ser).is_ok()
    }
}

impl Deref for Verfer {
    type Target = Matter;
    fn deref(&self) -> &Self::Target {
        &self.matter
    }
}

qb64_serde!(Verfer);

/// A non-indexed signature, optionally bound to the key that made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cigar {
    matter: Matter,
    verfer: Option<Verfer>,
}

impl Cigar {
    pub fn new(raw: impl Into<Vec<u8>>, verfer: Option<Verfer>) -> Result<Self> {
        Ok(Self { matter: Matter::new(MatterCode::Ed25519_Sig, raw)?, verfer })
    }

    pub fn from_qb64(qb64: &str, verfer: Option<Verfer>) -> Result<Self> {
        let matter = Matter::from_qb64(qb64)?;
        if matter.code() != &MatterCode::Ed25519_Sig {
            Err(Error::UnsupportedCode(matter.code().to_string()))?;
        }
        Ok(Self { matter, verfer })
    }

    pub fn verfer(&self) -> Option<&Verfer> {
        self.verfer.as_ref()
    }

    /// Verify against the bound key. Unbound signatures never verify.
    pub fn verify(&self, ser: &[u8]) -> bool {
        self.verfer.as_ref().map(|v| v.verify(self.raw(), ser)).unwrap_or(false)
    }
}

impl Deref for Cigar {
    type Target = Matter;
    fn deref(&self) -> &Self::Target {
        &self.matter
    }
}

/// An indexed signature, optionally bound to the key that made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Siger {
    indexer: Indexer,
    verfer: Option<Verfer>,
}

impl Siger {
    pub fn new(code: IndexerCode, raw: impl Into<Vec<u8>>, index: u32, ondex: Option<u32>, verfer: Option<Verfer>) -> Result<Self> {
        Ok(Self { indexer: Indexer::new(code, raw, index, ondex)?, verfer })
    }

    pub fn from_qb64(qb64: &str, verfer: Option<Verfer>) -> Result<Self> {
        let indexer = Indexer::from_qb64(qb64)?;
        if !matches!(
            indexer.code(),
            IndexerCode::Ed25519_Sig | IndexerCode::Ed25519_Crt_Sig | IndexerCode::Ed25519_Big_Sig | IndexerCode::Ed25519_Big_Crt_Sig
        ) {
            Err(Error::UnsupportedCode(indexer.code().to_string()))?;
        }
        Ok(Self { indexer, verfer })
    }

    pub fn verfer(&self) -> Option<&Verfer> {
        self.verfer.as_ref()
    }

    /// Bind (or rebind) the key this signature is checked against.
    pub fn set_verfer(&mut self, verfer: Verfer) {
        self.verfer = Some(verfer);
    }

    pub fn verify(&self, ser: &[u8]) -> bool {
        self.verfer.as_ref().map(|v| v.verify(self.indexer.raw(), ser)).unwrap_or(false)
    }
}

impl Deref for Siger {
    type Target = Indexer;
    fn deref(&self) -> &Self::Target {
        &self.indexer
    }
}

/// What [`Signer::sign`] hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signature {
    Indexed(Siger),
    Unindexed(Cigar),
}

impl Signature {
    pub fn qb64(&self) -> String {
        match self {
            Self::Indexed(siger) => siger.qb64(),
            Self::Unindexed(cigar) => cigar.qb64(),
        }
    }
}

/// A private signing key (seed) and its matching verification key.
#[derive(Clone)]
pub struct Signer {
    seed: Zeroizing<[u8; 32]>,
    verfer: Verfer,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer").field("seed", &"<secret>").field("verfer", &self.verfer.qb64()).finish()
    }
}

impl Signer {
    /// Create a signer from seed bytes. `transferable` picks the verfer's
    /// code.
    pub fn new(seed: [u8; 32], transferable: bool) -> Result<Self> {
        let seed = Zeroizing::new(seed);
        let signing_key = ed25519_consensus::SigningKey::from(*seed);
        let code = if transferable { MatterCode::Ed25519 } else { MatterCode::Ed25519N };
        let verfer = Verfer::new(code, signing_key.verification_key().to_bytes())?;
        Ok(Self { seed, verfer })
    }

    /// Create a signer from a random seed.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R, transferable: bool) -> Result<Self> {
        let mut seed = Zeroizing::new([0u8; 32]);
        rng.fill_bytes(&mut seed[..]);
        Self::new(*seed, transferable)
    }

    /// Create a signer from raw seed bytes of the size the seed code wants.
    pub fn from_seed_bytes(code: MatterCode, seed: &[u8], transferable: bool) -> Result<Self> {
        if code != MatterCode::Ed25519_Seed {
            Err(Error::UnsupportedCode(code.to_string()))?;
        }
        let seed: [u8; 32] = seed.try_into().map_err(|_| Error::CryptoBadSeed)?;
        Self::new(seed, transferable)
    }

    /// Load a signer from its qb64 seed.
    pub fn from_qb64(qb64: &str, transferable: bool) -> Result<Self> {
        let matter = Matter::from_qb64(qb64)?;
        Self::from_seed_bytes(*matter.code(), matter.raw(), transferable)
    }

    pub fn code(&self) -> MatterCode {
        MatterCode::Ed25519_Seed
    }

    /// The seed as qb64. This is the private key, so treat it accordingly.
    pub fn qb64(&self) -> Zeroizing<String> {
        Zeroizing::new(Matter::fixed_unchecked(MatterCode::Ed25519_Seed, self.seed.to_vec()).qb64())
    }

    pub fn verfer(&self) -> &Verfer {
        &self.verfer
    }

    fn sign_raw(&self, ser: &[u8]) -> [u8; 64] {
        let signing_key = ed25519_consensus::SigningKey::from(*self.seed);
        signing_key.sign(ser).to_bytes()
    }

    /// Sign without an index.
    pub fn sign_unindexed(&self, ser: &[u8]) -> Result<Cigar> {
        Cigar::new(self.sign_raw(ser), Some(self.verfer.clone()))
    }

    /// Sign with an index. `only` signs as current-only (no ondex). Otherwise
    /// the ondex defaults to the index, and a small code is used when the two
    /// match and fit.
    pub fn sign_indexed(&self, ser: &[u8], index: u32, only: bool, ondex: Option<u32>) -> Result<Siger> {
        let raw = self.sign_raw(ser);
        let (code, ondex) = if only {
            let code = if index <= 63 { IndexerCode::Ed25519_Crt_Sig } else { IndexerCode::Ed25519_Big_Crt_Sig };
            (code, None)
        } else {
            let ondex = ondex.unwrap_or(index);
            let code = if ondex == index && index <= 63 { IndexerCode::Ed25519_Sig } else { IndexerCode::Ed25519_Big_Sig };
            (code, Some(ondex))
        };
        Siger::new(code, raw, index, ondex, Some(self.verfer.clone()))
    }

    /// Sign, indexed if an index is given.
    pub fn sign(&self, ser: &[u8], index: Option<u32>, only: bool, ondex: Option<u32>) -> Result<Signature> {
        match index {
            Some(index) => Ok(Signature::Indexed(self.sign_indexed(ser, index, only, ondex)?)),
            None => Ok(Signature::Unindexed(self.sign_unindexed(ser)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MSG: &[u8] = b"The mitochondria is the powerhouse of the cell. Nobody remembers anything else from biology.";

    #[test]
    fn sign_verify_unindexed() {
        let mut rng = crate::util::test::rng();
        let signer = Signer::random(&mut rng, true).unwrap();
        assert_eq!(signer.verfer().code(), &MatterCode::Ed25519);
        let cigar = signer.sign_unindexed(MSG).unwrap();
        assert_eq!(cigar.qb64().len(), 88);
        assert!(cigar.qb64().starts_with("0B"));
        assert!(cigar.verify(MSG));
        assert!(!cigar.verify(b"The mitochondria is the powerhouse of the cell."));

        // wrong key fails
        let other = Signer::random(&mut rng, true).unwrap();
        assert!(!other.verfer().verify(cigar.raw(), MSG));

        // an unbound cigar can't verify anything
        let unbound = Cigar::from_qb64(&cigar.qb64(), None).unwrap();
        assert!(!unbound.verify(MSG));
    }

    #[test]
    fn sign_indexed_codes() {
        let mut rng = crate::util::test::rng();
        let signer = Signer::random(&mut rng, true).unwrap();

        let siger = signer.sign_indexed(MSG, 0, false, None).unwrap();
        assert_eq!(siger.code(), &IndexerCode::Ed25519_Sig);
        assert_eq!(siger.ondex(), &Some(0));
        assert!(siger.verify(MSG));

        let siger = signer.sign_indexed(MSG, 1, false, Some(2)).unwrap();
        assert_eq!(siger.code(), &IndexerCode::Ed25519_Big_Sig);
        assert_eq!(siger.index(), &1);
        assert_eq!(siger.ondex(), &Some(2));

        let siger = signer.sign_indexed(MSG, 64, false, None).unwrap();
        assert_eq!(siger.code(), &IndexerCode::Ed25519_Big_Sig);

        let siger = signer.sign_indexed(MSG, 3, true, None).unwrap();
        assert_eq!(siger.code(), &IndexerCode::Ed25519_Crt_Sig);
        assert_eq!(siger.ondex(), &None);

        let siger = signer.sign_indexed(MSG, 70, true, None).unwrap();
        assert_eq!(siger.code(), &IndexerCode::Ed25519_Big_Crt_Sig);

        match signer.sign(MSG, None, false, None).unwrap() {
            Signature::Unindexed(cigar) => assert!(cigar.verify(MSG)),
            _ => panic!("expected cigar"),
        }
    }

    #[test]
    fn siger_parse_and_bind() {
        let mut rng = crate::util::test::rng();
        let signer = Signer::random(&mut rng, true).unwrap();
        let siger = signer.sign_indexed(MSG, 5, false, None).unwrap();
        let mut parsed = Siger::from_qb64(&siger.qb64(), None).unwrap();
        assert!(!parsed.verify(MSG));
        parsed.set_verfer(signer.verfer().clone());
        assert!(parsed.verify(MSG));
        assert_eq!(parsed.index(), &5);
    }

    #[test]
    fn seeds() {
        let mut rng = crate::util::test::rng();
        let signer = Signer::random(&mut rng, false).unwrap();
        assert_eq!(signer.verfer().code(), &MatterCode::Ed25519N);
        let seed = signer.qb64();
        assert!(seed.starts_with('A'));
        let signer2 = Signer::from_qb64(&seed, false).unwrap();
        assert_eq!(signer2.verfer(), signer.verfer());
        let signer3 = Signer::from_qb64(&seed, true).unwrap();
        assert_eq!(signer3.verfer().raw(), signer.verfer().raw());
        assert_eq!(signer3.verfer().code(), &MatterCode::Ed25519);
        assert!(!format!("{:?}", signer).contains(seed.as_str()));
        let key = Matter::new(MatterCode::Ed25519, [0u8; 32]).unwrap();
        assert_eq!(Signer::from_qb64(&key.qb64(), true).err(), Some(Error::UnsupportedCode("D".into())));
    }
}
