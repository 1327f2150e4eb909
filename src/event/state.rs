//! Key state: what a key event log says about an identifier right now.
//!
//! State is folded forward one event at a time. We don't run a full
//! validator here (no escrows, no witness receipts), but we do refuse events
//! that don't chain onto the state they're being applied to.

use crate::{
    cesr::Number,
    crypto::Verfer,
    error::{Error, Result},
    event::{get_str, get_str_list, serder::Serder, Ilk},
    tholder::Tholder,
    util::Timestamp,
};
use getset::Getters;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

/// The latest establishment event, in brief.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default, Getters)]
#[getset(get = "pub")]
pub struct EstablishmentState {
    s: String,
    d: String,
    br: Vec<String>,
    ba: Vec<String>,
}

/// An identifier's key state, in the field names KERI uses on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
#[getset(get = "pub")]
pub struct KeyState {
    /// Prefix
    i: String,
    /// Sequence number, hex
    s: String,
    /// Prior event SAID
    p: String,
    /// Latest event SAID
    d: String,
    /// First-seen ordinal, hex
    f: String,
    /// When the latest event was seen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dt: Option<Timestamp>,
    /// Latest event type
    et: Ilk,
    kt: Value,
    k: Vec<String>,
    nt: Value,
    n: Vec<String>,
    bt: String,
    b: Vec<String>,
    c: Vec<String>,
    ee: EstablishmentState,
    /// Delegator prefix, empty if not delegated.
    #[serde(default)]
    di: String,
}

impl KeyState {
    /// Start key state from an inception event.
    pub fn from_inception(serder: &Serder) -> Result<Self> {
        let ilk = serder.ilk()?;
        if !ilk.is_inception() {
            Err(Error::EventInvalid(format!("key state starts at an inception, not {}", ilk)))?;
        }
        if serder.sn()? != 0 {
            Err(Error::EventInvalid("inception must be at sequence number 0".into()))?;
        }
        if !serder.verify_said() {
            Err(Error::CryptoDigestMismatch)?;
        }
        let ked = serder.ked();
        let d = serder.said()?.to_string();
        Ok(Self {
            i: serder.pre()?.to_string(),
            s: "0".into(),
            p: String::new(),
            d: d.clone(),
            f: "0".into(),
            dt: None,
            et: ilk,
            kt: ked.get("kt").cloned().ok_or_else(|| Error::FieldMissing("kt".into()))?,
            k: serder.keys()?,
            nt: ked.get("nt").cloned().ok_or_else(|| Error::FieldMissing("nt".into()))?,
            n: serder.ndigs()?,
            bt: get_str(ked, "bt")?.to_string(),
            b: get_str_list(ked, "b")?,
            c: get_str_list(ked, "c")?,
            ee: EstablishmentState { s: "0".into(), d, br: vec![], ba: vec![] },
            di: serder.delpre().unwrap_or("").to_string(),
        })
    }

    /// Fold the next event into this state, returning the new state.
    pub fn apply(&self, serder: &Serder) -> Result<Self> {
        let ilk = serder.ilk()?;
        if ilk.is_inception() || !matches!(ilk, Ilk::Rot | Ilk::Drt | Ilk::Ixn) {
            Err(Error::EventInvalid(format!("can't apply a {} event to existing state", ilk)))?;
        }
        if !self.is_transferable() {
            Err(Error::NonTransferable(self.i.clone()))?;
        }
        if serder.pre()? != self.i {
            Err(Error::EventInvalid(format!("event is for {}, not {}", serder.pre()?, self.i)))?;
        }
        let sn = serder.sn()?;
        if sn != self.sn()? + 1 {
            Err(Error::EventInvalid(format!("out of order event: expected {:x}, got {:x}", self.sn()? + 1, sn)))?;
        }
        if get_str(serder.ked(), "p")? != self.d {
            Err(Error::EventInvalid("event doesn't chain to the latest event".into()))?;
        }
        if !serder.verify_said() {
            Err(Error::CryptoDigestMismatch)?;
        }
        let d = serder.said()?.to_string();
        let f = Number::from_numh(&self.f)?.num() + 1;
        let mut next = Self {
            s: format!("{:x}", sn),
            p: self.d.clone(),
            d: d.clone(),
            f: format!("{:x}", f),
            dt: None,
            et: ilk,
            ..self.clone()
        };
        if ilk.is_establishment() {
            let ked = serder.ked();
            let cuts = get_str_list(ked, "br")?;
            let adds = get_str_list(ked, "ba")?;
            next.kt = ked.get("kt").cloned().ok_or_else(|| Error::FieldMissing("kt".into()))?;
            next.k = serder.keys()?;
            next.nt = ked.get("nt").cloned().ok_or_else(|| Error::FieldMissing("nt".into()))?;
            next.n = serder.ndigs()?;
            next.bt = get_str(ked, "bt")?.to_string();
            next.b = self.b.iter().filter(|w| !cuts.contains(w)).cloned().chain(adds.iter().cloned()).collect();
            if let Ok(cnfg) = get_str_list(ked, "c") {
                next.c = cnfg;
            }
            next.ee = EstablishmentState { s: next.s.clone(), d, br: cuts, ba: adds };
        }
        Ok(next)
    }

    /// Stamp the state with the time it was seen.
    pub fn seen_at(mut self, dt: Timestamp) -> Self {
        self.dt = Some(dt);
        self
    }

    pub fn sn(&self) -> Result<u128> {
        Ok(Number::from_numh(&self.s)?.num())
    }

    /// Has this identifier committed to next keys?
    pub fn is_transferable(&self) -> bool {
        !self.n.is_empty()
    }

    pub fn is_delegated(&self) -> bool {
        !self.di.is_empty()
    }

    pub fn tholder(&self) -> Result<Tholder> {
        Tholder::from_sith(&self.kt)
    }

    pub fn ntholder(&self) -> Result<Tholder> {
        Tholder::from_sith(&self.nt)
    }

    pub fn verfers(&self) -> Result<Vec<Verfer>> {
        self.k.iter().map(|k| Verfer::from_qb64(k)).collect()
    }
}
