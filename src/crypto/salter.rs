//! Salts, and stretching them into signing keys.
//!
//! A salter turns `(salt, path)` into a seed with Argon2id, so the same salt
//! and path always give the same key. The work factor comes from a tier.

use crate::{
    cesr::{Matter, MatterCode},
    crypto::sign::Signer,
    error::{Error, Result},
};
use rand::{CryptoRng, RngCore};
use serde_derive::{Deserialize, Serialize};
use std::ops::Deref;
use zeroize::Zeroizing;

/// Argon2 work factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Interactive: ops 2, mem 64MiB
    #[default]
    Low,
    /// Moderate: ops 3, mem 256MiB
    Med,
    /// Sensitive: ops 4, mem 1GiB
    High,
}

impl Tier {
    /// (ops, mem in KiB). `temp` overrides the tier with the cheapest
    /// settings argon2 allows, for tests.
    fn params(&self, temp: bool) -> (u32, u32) {
        if temp {
            return (1, 8);
        }
        match self {
            Self::Low => (2, 65536),
            Self::Med => (3, 262144),
            Self::High => (4, 1048576),
        }
    }
}

/// A 128 bit salt.
#[derive(Clone, PartialEq, Eq)]
pub struct Salter {
    matter: Matter,
    tier: Tier,
}

impl std::fmt::Debug for Salter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Salter").field("salt", &"<secret>").field("tier", &self.tier).finish()
    }
}

impl Salter {
    pub fn new(raw: [u8; 16], tier: Tier) -> Self {
        Self { matter: Matter::fixed_unchecked(MatterCode::Salt_128, raw.to_vec()), tier }
    }

    pub fn random<R: RngCore + CryptoRng>(rng: &mut R, tier: Tier) -> Self {
        let mut raw = [0u8; 16];
        rng.fill_bytes(&mut raw);
        Self::new(raw, tier)
    }

    pub fn from_qb64(qb64: &str, tier: Tier) -> Result<Self> {
        let matter = Matter::from_qb64(qb64)?;
        if matter.code() != &MatterCode::Salt_128 {
            Err(Error::UnexpectedCode(matter.code().to_string()))?;
        }
        Ok(Self { matter, tier })
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Stretch the salt into `size` bytes, using `path` as the password.
    pub fn stretch(&self, size: usize, path: &str, tier: Option<Tier>, temp: bool) -> Result<Zeroizing<Vec<u8>>> {
        let (ops, mem) = tier.unwrap_or(self.tier).params(temp);
        let argon2_ctx = argon2::Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            argon2::Params::new(mem, ops, 1, Some(size)).map_err(|_| Error::CryptoKDFFailed)?,
        );
        let mut out = Zeroizing::new(vec![0u8; size]);
        argon2_ctx
            .hash_password_into(path.as_bytes(), self.raw(), &mut out)
            .map_err(|_| Error::CryptoKDFFailed)?;
        Ok(out)
    }

    /// Derive a signer for `path`.
    pub fn signer(&self, code: MatterCode, transferable: bool, path: &str, tier: Option<Tier>, temp: bool) -> Result<Signer> {
        let size = code.sizage().raw_size().ok_or_else(|| Error::UnsupportedCode(code.to_string()))?;
        let seed = self.stretch(size, path, tier, temp)?;
        Signer::from_seed_bytes(code, &seed, transferable)
    }

    /// Derive `count` signers at `path + hex(start + i)`.
    #[allow(clippy::too_many_arguments)]
    pub fn signers(
        &self,
        count: usize,
        start: usize,
        path: &str,
        code: MatterCode,
        transferable: bool,
        tier: Option<Tier>,
        temp: bool,
    ) -> Result<Vec<Signer>> {
        (0..count)
            .map(|i| self.signer(code, transferable, &format!("{}{:x}", path, start + i), tier, temp))
            .collect()
    }
}

impl Deref for Salter {
    type Target = Matter;
    fn deref(&self) -> &Self::Target {
        &self.matter
    }
}
