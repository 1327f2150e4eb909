//! Key management for identifiers we control.
//!
//! A keeper holds (or knows how to derive) the signing keys behind one
//! identifier. There are a few flavors, each of which persists a different
//! set of parameters:
//!
//! - [salty][salty::SaltyKeeper]: keys are derived from a salt and a path,
//!   so only the (sealed) salt and a few indices need to be stored.
//! - [randy][randy::RandyKeeper]: keys are random, so every seed is stored,
//!   sealed.
//! - [group][group::GroupKeeper]: a multisig identifier, where our part of
//!   the signing is done by one of our own single-sig identifiers.
//! - [extern][external::ExternKeeper]: keys live somewhere else entirely
//!   (an HSM, a wallet) behind a factory registered by the caller.
//!
//! Secrets only ever leave a keeper sealed with the [`SealKey`] the
//! [`KeyManager`] was built with.

pub mod external;
pub mod group;
pub mod randy;
pub mod salty;

use crate::{
    cesr::MatterCode,
    crypto::{Diger, SealKey, Signature, Signer, Tier},
    error::{Error, Result},
    event::KeyState,
};
use getset::Getters;
use rand::{CryptoRng, RngCore};
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub use external::{ExternFactory, ExternKeeper, ExternParams};
pub use group::{GroupKeeper, GroupParams};
pub use randy::{RandyKeeper, RandyParams};
pub use salty::{SaltyKeeper, SaltyParams};

/// Which kind of keeper an identifier uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Algo {
    #[default]
    Salty,
    Randy,
    Group,
    Extern,
}

/// The persistable parameters of a keeper, tagged by algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeeperParams {
    Salty(SaltyParams),
    Randy(RandyParams),
    Group(GroupParams),
    Extern(ExternParams),
}

impl KeeperParams {
    pub fn algo(&self) -> Algo {
        match self {
            Self::Salty(_) => Algo::Salty,
            Self::Randy(_) => Algo::Randy,
            Self::Group(_) => Algo::Group,
            Self::Extern(_) => Algo::Extern,
        }
    }
}

/// Everything we keep about one of our identifiers: its name, prefix, key
/// state, and whatever its keeper needs to get its keys back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
#[getset(get = "pub")]
pub struct HabState {
    name: String,
    prefix: String,
    state: KeyState,
    #[serde(flatten)]
    keeper: KeeperParams,
}

impl HabState {
    pub fn new(name: impl Into<String>, state: KeyState, keeper: KeeperParams) -> Self {
        Self { name: name.into(), prefix: state.i().clone(), state, keeper }
    }

    /// Swap in newer key state (and keeper params) after an event.
    pub fn update(&mut self, state: KeyState, keeper: KeeperParams) {
        self.state = state;
        self.keeper = keeper;
    }

    pub fn algo(&self) -> Algo {
        self.keeper.algo()
    }
}

/// The things every keeper can do.
pub trait Keeper: Send {
    fn algo(&self) -> Algo;

    /// Create the inception keys, returning the current keys (qb64) and the
    /// digests of the next keys (qb64).
    fn incept(&mut self, transferable: bool) -> Result<(Vec<String>, Vec<String>)>;

    /// Rotate: the prior next keys become current, and new next keys are
    /// committed to. Group keepers take their keys from `states` (current)
    /// and `rstates` (next) instead.
    fn rotate(
        &mut self,
        ncodes: &[MatterCode],
        transferable: bool,
        states: &[KeyState],
        rstates: &[KeyState],
    ) -> Result<(Vec<String>, Vec<String>)>;

    /// Sign with the current keys, returning qb64 signatures. Indexed
    /// signatures use `indices` (default: key position) and `ondices`
    /// (default: same as index; `None` entries mean current-only).
    fn sign(&self, ser: &[u8], indexed: bool, indices: Option<&[u32]>, ondices: Option<&[Option<u32>]>) -> Result<Vec<String>>;

    /// The parameters to persist so [`KeyManager::get`] can rebuild us.
    fn params(&self) -> KeeperParams;
}

/// Options for building a new keeper. Each algorithm reads the fields it
/// cares about.
#[derive(Debug, Clone)]
pub struct KeeperArgs {
    pub pidx: u32,
    pub kidx: u32,
    pub tier: Tier,
    pub transferable: bool,
    /// Path stem for salty keys. Empty means the salt itself.
    pub stem: String,
    /// A qb64 salt for salty keepers. Random if not given.
    pub salt: Option<String>,
    pub icodes: Vec<MatterCode>,
    pub ncodes: Vec<MatterCode>,
    pub dcode: MatterCode,
    /// For group keepers: our member identifier.
    pub mhab: Option<HabState>,
    /// For group keepers: the members' current states (signing keys).
    pub states: Vec<KeyState>,
    /// For group keepers: the members' states whose next keys we commit to.
    pub rstates: Vec<KeyState>,
    pub extern_type: Option<String>,
    pub extern_params: Value,
}

impl Default for KeeperArgs {
    fn default() -> Self {
        Self {
            pidx: 0,
            kidx: 0,
            tier: Tier::Low,
            transferable: true,
            stem: String::new(),
            salt: None,
            icodes: vec![MatterCode::Ed25519_Seed],
            ncodes: vec![MatterCode::Ed25519_Seed],
            dcode: MatterCode::Blake3_256,
            mhab: None,
            states: vec![],
            rstates: vec![],
            extern_type: None,
            extern_params: Value::Null,
        }
    }
}

/// Builds keepers, and rebuilds them from persisted params.
pub struct KeyManager {
    seal_key: SealKey,
    externs: HashMap<String, ExternFactory>,
    temp: bool,
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("externs", &self.externs.keys().collect::<Vec<_>>())
            .field("temp", &self.temp)
            .finish()
    }
}

impl KeyManager {
    /// Create a key manager that seals secrets with `seal_key`.
    pub fn new(seal_key: SealKey) -> Self {
        Self { seal_key, externs: HashMap::new(), temp: false }
    }

    /// Use the cheapest key stretching. Only for tests.
    pub fn temp(mut self, temp: bool) -> Self {
        self.temp = temp;
        self
    }

    pub fn seal_key(&self) -> &SealKey {
        &self.seal_key
    }

    /// Register a factory for an external keeper type.
    pub fn register_extern(&mut self, extern_type: impl Into<String>, factory: ExternFactory) {
        self.externs.insert(extern_type.into(), factory);
    }

    /// Build a fresh keeper.
    pub fn new_keeper<R: RngCore + CryptoRng>(&self, rng: &mut R, algo: Algo, args: KeeperArgs) -> Result<Box<dyn Keeper>> {
        tracing::debug!(?algo, pidx = args.pidx, "creating keeper");
        let keeper: Box<dyn Keeper> = match algo {
            Algo::Salty => Box::new(SaltyKeeper::new(rng, self.seal_key.clone(), args, self.temp)?),
            Algo::Randy => Box::new(RandyKeeper::new(rng, self.seal_key.clone(), args)?),
            Algo::Group => {
                let mhab = args
                    .mhab
                    .clone()
                    .ok_or_else(|| Error::KeeperInvalid("group keeper needs a member identifier".into()))?;
                let member = self.get(&mhab)?;
                Box::new(GroupKeeper::new(member, mhab, &args.states, &args.rstates)?)
            }
            Algo::Extern => {
                let extern_type = args
                    .extern_type
                    .clone()
                    .ok_or_else(|| Error::KeeperInvalid("extern keeper needs a type".into()))?;
                self.build_extern(&extern_type, args.pidx, &args.extern_params)?
            }
        };
        Ok(keeper)
    }

    /// Rebuild the keeper for one of our identifiers.
    pub fn get(&self, hab: &HabState) -> Result<Box<dyn Keeper>> {
        let keeper: Box<dyn Keeper> = match hab.keeper() {
            KeeperParams::Salty(params) => Box::new(SaltyKeeper::from_params(self.seal_key.clone(), params, self.temp)?),
            KeeperParams::Randy(params) => Box::new(RandyKeeper::from_params(self.seal_key.clone(), params)?),
            KeeperParams::Group(params) => {
                let member = self.get(params.mhab())?;
                Box::new(GroupKeeper::from_params(member, params))
            }
            KeeperParams::Extern(params) => self.build_extern(params.extern_type(), *params.pidx(), params.params())?,
        };
        Ok(keeper)
    }

    fn build_extern(&self, extern_type: &str, pidx: u32, params: &Value) -> Result<Box<dyn Keeper>> {
        let factory = self
            .externs
            .get(extern_type)
            .ok_or_else(|| Error::KeeperInvalid(format!("no extern keeper registered for `{}`", extern_type)))?;
        let inner = factory(pidx, params)?;
        Ok(Box::new(ExternKeeper::new(extern_type, pidx, params.clone(), inner)))
    }
}

/// Digest each signer's public key, for committing to next keys.
pub(crate) fn next_digests(signers: &[Signer], dcode: MatterCode) -> Result<Vec<String>> {
    signers
        .iter()
        .map(|s| Ok(Diger::new(dcode, &s.verfer().qb64b())?.qb64()))
        .collect()
}

/// Sign with a set of signers, the way every local keeper does.
pub(crate) fn sign_with(
    signers: &[Signer],
    ser: &[u8],
    indexed: bool,
    indices: Option<&[u32]>,
    ondices: Option<&[Option<u32>]>,
) -> Result<Vec<String>> {
    if !indexed {
        return signers
            .iter()
            .map(|s| Ok(Signature::Unindexed(s.sign_unindexed(ser)?).qb64()))
            .collect();
    }
    if let Some(indices) = indices {
        if indices.len() < signers.len() {
            Err(Error::KeeperInvalid(format!("{} indices for {} keys", indices.len(), signers.len())))?;
        }
    }
    if let Some(ondices) = ondices {
        if ondices.len() < signers.len() {
            Err(Error::KeeperInvalid(format!("{} ondices for {} keys", ondices.len(), signers.len())))?;
        }
    }
    signers
        .iter()
        .enumerate()
        .map(|(j, signer)| {
            let index = indices.map(|i| i[j]).unwrap_or(j as u32);
            let (ondex, only) = match ondices {
                Some(ondices) => (ondices[j], ondices[j].is_none()),
                None => (Some(index), false),
            };
            Ok(Signature::Indexed(signer.sign_indexed(ser, index, only, ondex)?).qb64())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        crypto::{Siger, Verfer},
        util::test::rng,
    };

    #[test]
    fn signs_at_indices() {
        let mut rng = rng();
        let signers = (0..2).map(|_| Signer::random(&mut rng, true).unwrap()).collect::<Vec<_>>();
        let ser = b"kiss me on my hot mouth, i am feeling so sentimental";

        let sigs = sign_with(&signers, ser, true, None, None).unwrap();
        assert_eq!(sigs.len(), 2);
        for (i, sig) in sigs.iter().enumerate() {
            let siger = Siger::from_qb64(sig, Some(signers[i].verfer().clone())).unwrap();
            assert_eq!(siger.index(), &(i as u32));
            assert!(siger.verify(ser));
        }

        let sigs = sign_with(&signers, ser, true, Some(&[3, 5]), Some(&[None, Some(1)])).unwrap();
        let siger0 = Siger::from_qb64(&sigs[0], None).unwrap();
        let siger1 = Siger::from_qb64(&sigs[1], None).unwrap();
        assert_eq!((siger0.index(), siger0.ondex()), (&3, &None));
        assert_eq!((siger1.index(), siger1.ondex()), (&5, &Some(1)));

        assert!(sign_with(&signers, ser, true, Some(&[0]), None).is_err());

        let cigars = sign_with(&signers, ser, false, None, None).unwrap();
        assert!(cigars[0].starts_with("0B"));
        let verfer: &Verfer = signers[0].verfer();
        let cigar = crate::crypto::Cigar::from_qb64(&cigars[0], Some(verfer.clone())).unwrap();
        assert!(cigar.verify(ser));
    }

    #[test]
    fn digests_next_keys() {
        let mut rng = rng();
        let signers = (0..2).map(|_| Signer::random(&mut rng, true).unwrap()).collect::<Vec<_>>();
        let digs = next_digests(&signers, MatterCode::Blake3_256).unwrap();
        assert_eq!(digs.len(), 2);
        let diger = Diger::from_qb64(&digs[1]).unwrap();
        assert!(diger.verify(&signers[1].verfer().qb64b()));
        assert!(!diger.verify(&signers[0].verfer().qb64b()));
    }

    #[test]
    fn algo_serde() {
        assert_eq!(serde_json::to_string(&Algo::Extern).unwrap(), "\"extern\"");
        assert_eq!(Algo::default(), Algo::Salty);
    }
}
