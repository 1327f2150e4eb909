//! Hierarchical keys from a salt.
//!
//! Each key's seed is `argon2id(path, salt)` where the path is the stem, the
//! prefix index, the rotation index, and the key index, all hex. Given the
//! salt and the indices, every key an identifier ever had can be derived
//! again.

use crate::{
    cesr::MatterCode,
    crypto::{SealKey, Sealed, Salter, Signer, Tier},
    error::{Error, Result},
    event::KeyState,
    keeping::{next_digests, sign_with, Algo, KeeperArgs, KeeperParams, Keeper},
};
use getset::Getters;
use rand::{CryptoRng, RngCore};
use serde_derive::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// What a salty keeper persists. The salt is sealed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
#[getset(get = "pub")]
pub struct SaltyParams {
    sxlt: Sealed,
    pidx: u32,
    kidx: u32,
    stem: String,
    tier: Tier,
    icodes: Vec<MatterCode>,
    ncodes: Vec<MatterCode>,
    dcode: MatterCode,
    transferable: bool,
}

#[derive(Debug)]
pub struct SaltyKeeper {
    salter: Salter,
    sxlt: Sealed,
    pidx: u32,
    kidx: u32,
    stem: String,
    tier: Tier,
    icodes: Vec<MatterCode>,
    ncodes: Vec<MatterCode>,
    dcode: MatterCode,
    transferable: bool,
    temp: bool,
}

impl SaltyKeeper {
    /// Create a salty keeper, with a random salt unless one is given.
    pub fn new<R: RngCore + CryptoRng>(rng: &mut R, seal_key: SealKey, args: KeeperArgs, temp: bool) -> Result<Self> {
        let salter = match args.salt.as_ref() {
            Some(salt) => Salter::from_qb64(salt, args.tier)?,
            None => Salter::random(rng, args.tier),
        };
        let salt = Zeroizing::new(salter.qb64());
        let sxlt = seal_key.seal_str(rng, &salt)?;
        Ok(Self {
            salter,
            sxlt,
            pidx: args.pidx,
            kidx: args.kidx,
            stem: args.stem,
            tier: args.tier,
            icodes: args.icodes,
            ncodes: args.ncodes,
            dcode: args.dcode,
            transferable: args.transferable,
            temp,
        })
    }

    /// Rebuild a salty keeper from its params, opening the salt.
    pub fn from_params(seal_key: SealKey, params: &SaltyParams, temp: bool) -> Result<Self> {
        let salt = seal_key.open_str(params.sxlt())?;
        let salter = Salter::from_qb64(&salt, params.tier)?;
        Ok(Self {
            salter,
            sxlt: params.sxlt.clone(),
            pidx: params.pidx,
            kidx: params.kidx,
            stem: params.stem.clone(),
            tier: params.tier,
            icodes: params.icodes.clone(),
            ncodes: params.ncodes.clone(),
            dcode: params.dcode,
            transferable: params.transferable,
            temp,
        })
    }

    fn path(&self, ridx: u32) -> String {
        let stem = if self.stem.is_empty() { self.salter.qb64() } else { self.stem.clone() };
        format!("{}{:x}{:x}", stem, self.pidx, ridx)
    }

    /// Derive signers for `codes` starting at key index `kidx`.
    fn signers(&self, codes: &[MatterCode], kidx: u32, transferable: bool) -> Result<Vec<Signer>> {
        let path = self.path(0);
        codes
            .iter()
            .enumerate()
            .map(|(i, code)| {
                self.salter
                    .signer(*code, transferable, &format!("{}{:x}", path, kidx as usize + i), Some(self.tier), self.temp)
            })
            .collect()
    }

    /// Current keys and next digests. Current keys that were committed to by a
    /// prior event keep the transferable code they were committed under.
    fn keys_and_digests(&self, current_transferable: bool) -> Result<(Vec<String>, Vec<String>)> {
        let signers = self.signers(&self.icodes, self.kidx, current_transferable)?;
        let keys = signers.iter().map(|s| s.verfer().qb64()).collect();
        if !self.transferable {
            return Ok((keys, vec![]));
        }
        let nsigners = self.signers(&self.ncodes, self.kidx + self.icodes.len() as u32, true)?;
        Ok((keys, next_digests(&nsigners, self.dcode)?))
    }
}

impl Keeper for SaltyKeeper {
    fn algo(&self) -> Algo {
        Algo::Salty
    }

    fn incept(&mut self, transferable: bool) -> Result<(Vec<String>, Vec<String>)> {
        self.transferable = transferable;
        self.kidx = 0;
        tracing::debug!(pidx = self.pidx, "salty incept");
        self.keys_and_digests(transferable)
    }

    fn rotate(
        &mut self,
        ncodes: &[MatterCode],
        transferable: bool,
        _states: &[KeyState],
        _rstates: &[KeyState],
    ) -> Result<(Vec<String>, Vec<String>)> {
        if !self.transferable {
            Err(Error::KeeperInvalid("can't rotate non-transferable keys".into()))?;
        }
        self.kidx += self.icodes.len() as u32;
        self.icodes = std::mem::replace(&mut self.ncodes, ncodes.to_vec());
        // the promoted keys were committed to as transferable keys
        self.transferable = transferable;
        tracing::debug!(pidx = self.pidx, kidx = self.kidx, transferable, "salty rotate");
        self.keys_and_digests(true)
    }

    fn sign(&self, ser: &[u8], indexed: bool, indices: Option<&[u32]>, ondices: Option<&[Option<u32>]>) -> Result<Vec<String>> {
        let signers = self.signers(&self.icodes, self.kidx, self.transferable)?;
        sign_with(&signers, ser, indexed, indices, ondices)
    }

    fn params(&self) -> KeeperParams {
        KeeperParams::Salty(SaltyParams {
            sxlt: self.sxlt.clone(),
            pidx: self.pidx,
            kidx: self.kidx,
            stem: self.stem.clone(),
            tier: self.tier,
            icodes: self.icodes.clone(),
            ncodes: self.ncodes.clone(),
            dcode: self.dcode,
            transferable: self.transferable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        crypto::{Diger, Siger},
        util::test::rng,
    };

    const SALT: &str = "0AAwMTIzNDU2Nzg5YWJjZGVm";

    fn keeper(rng: &mut rand_chacha::ChaCha20Rng, seal_key: &SealKey, pidx: u32) -> SaltyKeeper {
        let args = KeeperArgs { salt: Some(SALT.into()), pidx, ..Default::default() };
        SaltyKeeper::new(rng, seal_key.clone(), args, true).unwrap()
    }

    #[test]
    fn deterministic() {
        let mut rng = rng();
        let seal_key = SealKey::from_bytes([3; 32]);
        let mut keeper1 = keeper(&mut rng, &seal_key, 0);
        let mut keeper2 = keeper(&mut rng, &seal_key, 0);
        let mut keeper3 = keeper(&mut rng, &seal_key, 1);
        let (keys1, digs1) = keeper1.incept(true).unwrap();
        let (keys2, digs2) = keeper2.incept(true).unwrap();
        let (keys3, _) = keeper3.incept(true).unwrap();
        assert_eq!(keys1, keys2);
        assert_eq!(digs1, digs2);
        assert_ne!(keys1, keys3);
        assert_eq!(keys1.len(), 1);
        assert_eq!(digs1.len(), 1);

        // the path is stem + pidx + ridx + kidx
        let salter = Salter::from_qb64(SALT, Tier::Low).unwrap();
        let signer = salter.signer(MatterCode::Ed25519_Seed, true, &format!("{}000", SALT), None, true).unwrap();
        assert_eq!(keys1[0], signer.verfer().qb64());
    }

    #[test]
    fn rotate_promotes_next() {
        let mut rng = rng();
        let seal_key = SealKey::from_bytes([3; 32]);
        let mut keeper = keeper(&mut rng, &seal_key, 0);
        let (_, digs) = keeper.incept(true).unwrap();
        let (keys, digs2) = keeper.rotate(&[MatterCode::Ed25519_Seed], true, &[], &[]).unwrap();
        let diger = Diger::from_qb64(&digs[0]).unwrap();
        assert!(diger.verify(keys[0].as_bytes()));
        assert_ne!(digs, digs2);
        assert_eq!(keeper.kidx, 1);

        let ser = b"hello, is this thing on";
        let sigs = keeper.sign(ser, true, None, None).unwrap();
        let verfer = crate::crypto::Verfer::from_qb64(&keys[0]).unwrap();
        let siger = Siger::from_qb64(&sigs[0], Some(verfer)).unwrap();
        assert!(siger.verify(ser));
    }

    #[test]
    fn abandon_keeps_commitment() {
        let mut rng = rng();
        let seal_key = SealKey::from_bytes([3; 32]);
        let mut keeper = keeper(&mut rng, &seal_key, 0);
        let (_, digs) = keeper.incept(true).unwrap();
        let (keys, digs2) = keeper.rotate(&[MatterCode::Ed25519_Seed], false, &[], &[]).unwrap();
        assert!(keys[0].starts_with('D'));
        assert!(Diger::from_qb64(&digs[0]).unwrap().verify(keys[0].as_bytes()));
        assert!(digs2.is_empty());

        // signing still works with the promoted keys, and there's nothing left to rotate to
        let ser = b"last words";
        let sigs = keeper.sign(ser, true, None, None).unwrap();
        let siger = Siger::from_qb64(&sigs[0], Some(crate::crypto::Verfer::from_qb64(&keys[0]).unwrap())).unwrap();
        assert!(siger.verify(ser));
        assert!(keeper.rotate(&[MatterCode::Ed25519_Seed], true, &[], &[]).is_err());
    }

    #[test]
    fn params_reopen() {
        let mut rng = rng();
        let seal_key = SealKey::from_bytes([3; 32]);
        let mut keeper = SaltyKeeper::new(&mut rng, seal_key.clone(), KeeperArgs::default(), true).unwrap();
        let (keys, _) = keeper.incept(true).unwrap();
        let params = match keeper.params() {
            KeeperParams::Salty(params) => params,
            _ => panic!("wrong params"),
        };
        let json = serde_json::to_string(&params).unwrap();
        assert!(!json.contains(&keeper.salter.qb64()));
        let params2: SaltyParams = serde_json::from_str(&json).unwrap();

        let rebuilt = SaltyKeeper::from_params(seal_key, &params2, true).unwrap();
        assert_eq!(rebuilt.keys_and_digests(true).unwrap().0, keys);

        let wrong = SealKey::from_bytes([4; 32]);
        assert_eq!(SaltyKeeper::from_params(wrong, &params2, true).err(), Some(Error::CryptoOpenFailed));
    }

    #[test]
    fn non_transferable() {
        let mut rng = rng();
        let seal_key = SealKey::from_bytes([3; 32]);
        let mut keeper = keeper(&mut rng, &seal_key, 0);
        let (keys, digs) = keeper.incept(false).unwrap();
        assert!(keys[0].starts_with('B'));
        assert!(digs.is_empty());
        assert!(keeper.rotate(&[MatterCode::Ed25519_Seed], true, &[], &[]).is_err());
    }
}
