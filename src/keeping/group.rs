//! Multisig identifiers. The group's keys are the first current key of each
//! member, and its next digests the first next digest of each member. We
//! only ever hold one member's keys, so signing is delegated to our member
//! identifier's keeper at the index our key has in the group.

use crate::{
    cesr::MatterCode,
    error::{Error, Result},
    event::KeyState,
    keeping::{Algo, HabState, KeeperParams, Keeper},
};
use getset::Getters;
use serde_derive::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
#[getset(get = "pub")]
pub struct GroupParams {
    /// Our member identifier.
    mhab: Box<HabState>,
    keys: Vec<String>,
    ndigs: Vec<String>,
}

impl GroupParams {
    /// The same group, with newer state for our member.
    pub fn with_member(&self, mhab: HabState) -> Self {
        Self { mhab: Box::new(mhab), keys: self.keys.clone(), ndigs: self.ndigs.clone() }
    }
}

pub struct GroupKeeper {
    member: Box<dyn Keeper>,
    mhab: HabState,
    gkeys: Vec<String>,
    gdigs: Vec<String>,
}

impl std::fmt::Debug for GroupKeeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupKeeper")
            .field("mhab", self.mhab.prefix())
            .field("gkeys", &self.gkeys)
            .field("gdigs", &self.gdigs)
            .finish()
    }
}

/// The group keys and next digests for a set of member states.
fn group_keys(states: &[KeyState], rstates: &[KeyState]) -> Result<(Vec<String>, Vec<String>)> {
    let keys = states
        .iter()
        .map(|s| {
            s.k().first()
                .cloned()
                .ok_or_else(|| Error::KeeperInvalid(format!("member {} has no signing keys", s.i())))
        })
        .collect::<Result<Vec<_>>>()?;
    let ndigs = rstates
        .iter()
        .map(|s| {
            s.n().first()
                .cloned()
                .ok_or_else(|| Error::KeeperInvalid(format!("member {} has no next keys", s.i())))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((keys, ndigs))
}

impl GroupKeeper {
    pub fn new(member: Box<dyn Keeper>, mhab: HabState, states: &[KeyState], rstates: &[KeyState]) -> Result<Self> {
        if states.is_empty() {
            Err(Error::KeeperInvalid("group keeper needs member states".into()))?;
        }
        let (gkeys, gdigs) = group_keys(states, rstates)?;
        let keeper = Self { member, mhab, gkeys, gdigs };
        keeper.csi()?;
        Ok(keeper)
    }

    pub fn from_params(member: Box<dyn Keeper>, params: &GroupParams) -> Self {
        Self { member, mhab: (*params.mhab).clone(), gkeys: params.keys.clone(), gdigs: params.ndigs.clone() }
    }

    /// Our member's index among the group's current keys.
    fn csi(&self) -> Result<u32> {
        let key = self
            .mhab
            .state()
            .k()
            .first()
            .ok_or_else(|| Error::KeeperInvalid("member has no signing keys".into()))?;
        self.gkeys
            .iter()
            .position(|k| k == key)
            .map(|p| p as u32)
            .ok_or_else(|| Error::KeeperInvalid(format!("member {} is not in the group", self.mhab.prefix())))
    }

    /// Our member's index among the group's prior next digests, if any.
    fn pni(&self) -> Option<u32> {
        let ndig = self.mhab.state().n().first()?;
        self.gdigs.iter().position(|d| d == ndig).map(|p| p as u32)
    }

    /// Point at newer state for our member identifier.
    pub fn set_member(&mut self, member: Box<dyn Keeper>, mhab: HabState) {
        self.member = member;
        self.mhab = mhab;
    }
}

impl Keeper for GroupKeeper {
    fn algo(&self) -> Algo {
        Algo::Group
    }

    fn incept(&mut self, _transferable: bool) -> Result<(Vec<String>, Vec<String>)> {
        Ok((self.gkeys.clone(), self.gdigs.clone()))
    }

    fn rotate(
        &mut self,
        _ncodes: &[MatterCode],
        _transferable: bool,
        states: &[KeyState],
        rstates: &[KeyState],
    ) -> Result<(Vec<String>, Vec<String>)> {
        if states.is_empty() {
            Err(Error::KeeperInvalid("group rotation needs member states".into()))?;
        }
        let (gkeys, gdigs) = group_keys(states, rstates)?;
        self.gkeys = gkeys;
        self.gdigs = gdigs;
        tracing::debug!(members = self.gkeys.len(), "group rotate");
        Ok((self.gkeys.clone(), self.gdigs.clone()))
    }

    fn sign(&self, ser: &[u8], indexed: bool, _indices: Option<&[u32]>, _ondices: Option<&[Option<u32>]>) -> Result<Vec<String>> {
        let csi = self.csi()?;
        let pni = self.pni();
        self.member.sign(ser, indexed, Some(&[csi]), Some(&[pni]))
    }

    fn params(&self) -> KeeperParams {
        KeeperParams::Group(GroupParams {
            mhab: Box::new(self.mhab.clone()),
            keys: self.gkeys.clone(),
            ndigs: self.gdigs.clone(),
        })
    }
}
