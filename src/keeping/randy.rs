//! Independent random keys. Nothing can re-derive them, so every seed we
//! hand out is kept, sealed.

use crate::{
    cesr::MatterCode,
    crypto::{SealKey, Sealed, Signer},
    error::{Error, Result},
    event::KeyState,
    keeping::{next_digests, sign_with, Algo, KeeperArgs, KeeperParams, Keeper},
};
use getset::Getters;
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde_derive::{Deserialize, Serialize};

/// What a randy keeper persists: the sealed current (`prxs`) and next
/// (`nxts`) seeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
#[getset(get = "pub")]
pub struct RandyParams {
    prxs: Vec<Sealed>,
    nxts: Vec<Sealed>,
    icodes: Vec<MatterCode>,
    ncodes: Vec<MatterCode>,
    dcode: MatterCode,
    transferable: bool,
}

pub struct RandyKeeper {
    seal_key: SealKey,
    rng: ChaCha20Rng,
    prxs: Vec<Sealed>,
    nxts: Vec<Sealed>,
    icodes: Vec<MatterCode>,
    ncodes: Vec<MatterCode>,
    dcode: MatterCode,
    transferable: bool,
}

impl std::fmt::Debug for RandyKeeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandyKeeper")
            .field("prxs", &self.prxs.len())
            .field("nxts", &self.nxts.len())
            .field("transferable", &self.transferable)
            .finish()
    }
}

impl RandyKeeper {
    /// Create a randy keeper. Its keys come from an rng seeded off `rng`.
    pub fn new<R: RngCore + CryptoRng>(rng: &mut R, seal_key: SealKey, args: KeeperArgs) -> Result<Self> {
        let rng = ChaCha20Rng::from_rng(rng).map_err(|_| Error::CryptoBadSeed)?;
        Ok(Self {
            seal_key,
            rng,
            prxs: vec![],
            nxts: vec![],
            icodes: args.icodes,
            ncodes: args.ncodes,
            dcode: args.dcode,
            transferable: args.transferable,
        })
    }

    pub fn from_params(seal_key: SealKey, params: &RandyParams) -> Result<Self> {
        Ok(Self {
            seal_key,
            rng: ChaCha20Rng::from_entropy(),
            prxs: params.prxs.clone(),
            nxts: params.nxts.clone(),
            icodes: params.icodes.clone(),
            ncodes: params.ncodes.clone(),
            dcode: params.dcode,
            transferable: params.transferable,
        })
    }

    /// Make fresh signers for `codes`, sealing their seeds.
    fn generate(&mut self, codes: &[MatterCode]) -> Result<(Vec<Signer>, Vec<Sealed>)> {
        let mut signers = Vec::with_capacity(codes.len());
        let mut sealed = Vec::with_capacity(codes.len());
        for code in codes {
            if *code != MatterCode::Ed25519_Seed {
                Err(Error::UnsupportedCode(code.to_string()))?;
            }
            let signer = Signer::random(&mut self.rng, self.transferable)?;
            sealed.push(self.seal_key.seal_str(&mut self.rng, &signer.qb64())?);
            signers.push(signer);
        }
        Ok((signers, sealed))
    }

    fn open(&self, sealed: &[Sealed]) -> Result<Vec<Signer>> {
        sealed
            .iter()
            .map(|s| Signer::from_qb64(&self.seal_key.open_str(s)?, self.transferable))
            .collect()
    }

    fn next_commitment(&mut self) -> Result<Vec<String>> {
        if !self.transferable {
            self.nxts = vec![];
            return Ok(vec![]);
        }
        let ncodes = self.ncodes.clone();
        let (nsigners, nxts) = self.generate(&ncodes)?;
        self.nxts = nxts;
        next_digests(&nsigners, self.dcode)
    }
}

impl Keeper for RandyKeeper {
    fn algo(&self) -> Algo {
        Algo::Randy
    }

    fn incept(&mut self, transferable: bool) -> Result<(Vec<String>, Vec<String>)> {
        self.transferable = transferable;
        let icodes = self.icodes.clone();
        let (signers, prxs) = self.generate(&icodes)?;
        self.prxs = prxs;
        let digs = self.next_commitment()?;
        tracing::debug!(keys = signers.len(), "randy incept");
        Ok((signers.iter().map(|s| s.verfer().qb64()).collect(), digs))
    }

    fn rotate(
        &mut self,
        ncodes: &[MatterCode],
        transferable: bool,
        _states: &[KeyState],
        _rstates: &[KeyState],
    ) -> Result<(Vec<String>, Vec<String>)> {
        if !self.transferable || self.nxts.is_empty() {
            Err(Error::KeeperInvalid("can't rotate non-transferable keys".into()))?;
        }
        // nothing changes unless the promoted seeds open
        let signers = self.open(&self.nxts)?;
        self.prxs = std::mem::take(&mut self.nxts);
        self.icodes = std::mem::replace(&mut self.ncodes, ncodes.to_vec());
        self.transferable = transferable;
        let digs = self.next_commitment()?;
        tracing::debug!(keys = signers.len(), "randy rotate");
        Ok((signers.iter().map(|s| s.verfer().qb64()).collect(), digs))
    }

    fn sign(&self, ser: &[u8], indexed: bool, indices: Option<&[u32]>, ondices: Option<&[Option<u32>]>) -> Result<Vec<String>> {
        let signers = self.open(&self.prxs)?;
        sign_with(&signers, ser, indexed, indices, ondices)
    }

    fn params(&self) -> KeeperParams {
        KeeperParams::Randy(RandyParams {
            prxs: self.prxs.clone(),
            nxts: self.nxts.clone(),
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
        crypto::{Diger, Siger, Verfer},
        util::test::rng,
    };

    #[test]
    fn rotate_promotes_next() {
        let mut rng = rng();
        let seal_key = SealKey::from_bytes([8; 32]);
        let args = KeeperArgs { icodes: vec![MatterCode::Ed25519_Seed; 2], ncodes: vec![MatterCode::Ed25519_Seed; 2], ..Default::default() };
        let mut keeper = RandyKeeper::new(&mut rng, seal_key.clone(), args).unwrap();
        let (keys, digs) = keeper.incept(true).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(digs.len(), 2);

        let (keys2, digs2) = keeper.rotate(&[MatterCode::Ed25519_Seed], true, &[], &[]).unwrap();
        assert_eq!(keys2.len(), 2);
        assert_eq!(digs2.len(), 1);
        for (key, dig) in keys2.iter().zip(digs.iter()) {
            assert!(Diger::from_qb64(dig).unwrap().verify(key.as_bytes()));
        }
        assert_ne!(keys, keys2);

        // rebuild from params and sign with the promoted keys
        let params = match keeper.params() {
            KeeperParams::Randy(params) => params,
            _ => panic!("wrong params"),
        };
        let rebuilt = RandyKeeper::from_params(seal_key, &params).unwrap();
        let ser = b"i'm not a robot";
        let sigs = rebuilt.sign(ser, true, None, None).unwrap();
        for (i, sig) in sigs.iter().enumerate() {
            let siger = Siger::from_qb64(sig, Some(Verfer::from_qb64(&keys2[i]).unwrap())).unwrap();
            assert!(siger.verify(ser));
        }
    }

    #[test]
    fn wrong_seal_key() {
        let mut rng = rng();
        let mut keeper = RandyKeeper::new(&mut rng, SealKey::from_bytes([8; 32]), KeeperArgs::default()).unwrap();
        keeper.incept(true).unwrap();
        let params = match keeper.params() {
            KeeperParams::Randy(params) => params,
            _ => panic!("wrong params"),
        };
        let mut rebuilt = RandyKeeper::from_params(SealKey::from_bytes([9; 32]), &params).unwrap();
        assert_eq!(rebuilt.sign(b"hi", true, None, None).err(), Some(Error::CryptoOpenFailed));

        // a failed rotation leaves the keeper where it was
        let res = rebuilt.rotate(&[MatterCode::Ed25519_Seed], true, &[], &[]);
        assert_eq!(res.err(), Some(Error::CryptoOpenFailed));
        assert_eq!(rebuilt.params(), KeeperParams::Randy(params));
    }

    #[test]
    fn abandon_keeps_commitment() {
        let mut rng = rng();
        let mut keeper = RandyKeeper::new(&mut rng, SealKey::from_bytes([8; 32]), KeeperArgs::default()).unwrap();
        let (_, digs) = keeper.incept(true).unwrap();
        let (keys, digs2) = keeper.rotate(&[MatterCode::Ed25519_Seed], false, &[], &[]).unwrap();
        assert!(keys[0].starts_with('D'));
        assert!(Diger::from_qb64(&digs[0]).unwrap().verify(keys[0].as_bytes()));
        assert!(digs2.is_empty());
    }

    #[test]
    fn non_transferable() {
        let mut rng = rng();
        let mut keeper = RandyKeeper::new(&mut rng, SealKey::from_bytes([8; 32]), KeeperArgs::default()).unwrap();
        let (keys, digs) = keeper.incept(false).unwrap();
        assert!(keys[0].starts_with('B'));
        assert!(digs.is_empty());
        assert!(keeper.rotate(&[MatterCode::Ed25519_Seed], true, &[], &[]).is_err());
    }
}
