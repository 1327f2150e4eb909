//! Working with other people: multisig signing rounds, delegation approval,
//! and waiting on things that happen elsewhere.
//!
//! A multisig event only comes together if every member builds it from the
//! same inputs, so the inputs are a value ([`GroupInputs`]) that members can
//! fingerprint and compare before anyone signs. Each member then tracks the
//! signing round with a [`GroupSession`].

use crate::{
    cesr::MatterCode,
    crypto::{Diger, Siger, Verfer},
    error::{Error, Result},
    event::{incept, messagize, Attachment, Ilk, InceptArgs, KeyState, Seal, Serder},
    tholder::Tholder,
    util::ser::serialize_json,
};
use getset::Getters;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// The inputs every member of a group must agree on to build the same
/// group inception.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GroupInputs {
    /// Member states whose current keys sign for the group.
    pub states: Vec<KeyState>,
    /// Member states whose next keys the group commits to.
    pub rstates: Vec<KeyState>,
    pub isith: Option<Value>,
    pub nsith: Option<Value>,
    pub toad: Option<u32>,
    pub wits: Vec<String>,
    pub delpre: Option<String>,
    pub data: Vec<Value>,
}

impl GroupInputs {
    /// A digest of the inputs' canonical JSON. Two members with the same
    /// fingerprint will build the same event.
    pub fn fingerprint(&self) -> Result<Diger> {
        Diger::new(MatterCode::Blake3_256, &serialize_json(self)?)
    }

    /// The group's signing keys, one per member.
    pub fn keys(&self) -> Result<Vec<String>> {
        self.states
            .iter()
            .map(|s| s.k().first().cloned().ok_or_else(|| Error::KeeperInvalid(format!("member {} has no keys", s.i()))))
            .collect()
    }

    /// The group's next key digests, one per member.
    pub fn ndigs(&self) -> Result<Vec<String>> {
        self.rstates
            .iter()
            .map(|s| s.n().first().cloned().ok_or_else(|| Error::KeeperInvalid(format!("member {} has no next keys", s.i()))))
            .collect()
    }

    /// Build the group inception event these inputs describe.
    pub fn incept(&self) -> Result<Serder> {
        incept(InceptArgs {
            keys: self.keys()?,
            isith: self.isith.clone(),
            ndigs: self.ndigs()?,
            nsith: self.nsith.clone(),
            toad: self.toad,
            wits: self.wits.clone(),
            data: self.data.clone(),
            delpre: self.delpre.clone(),
            ..Default::default()
        })
    }
}

/// Where a signing round stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Built, nobody has signed.
    Pending,
    /// Some signatures are in.
    PartiallySigned,
    /// Handed off to be published.
    Submitted,
    /// Seen accepted.
    Confirmed,
}

/// One member's view of a multisig signing round.
#[derive(Debug, Clone, Getters)]
#[getset(get = "pub")]
pub struct GroupSession {
    serder: Serder,
    fingerprint: String,
    #[getset(skip)]
    verfers: Vec<Verfer>,
    #[getset(skip)]
    tholder: Tholder,
    sigers: BTreeMap<u32, Siger>,
    phase: Phase,
    seal: Option<Seal>,
    /// For rotations: the prior next digests and threshold the new keys must
    /// also satisfy.
    #[getset(skip)]
    prior: Option<(Vec<Diger>, Tholder)>,
}

impl GroupSession {
    /// Start a round for an establishment event, which carries its own keys
    /// and threshold.
    pub fn new(serder: Serder, fingerprint: &Diger) -> Result<Self> {
        let ilk = serder.ilk()?;
        if !ilk.is_establishment() {
            Err(Error::EventInvalid("use `for_state` to sign non-establishment events".into()))?;
        }
        if !ilk.is_inception() {
            Err(Error::EventInvalid("use `for_rotation` to sign rotations".into()))?;
        }
        let verfers = serder.verfers()?;
        let tholder = serder.tholder()?;
        Ok(Self::build(serder, fingerprint, verfers, tholder))
    }

    /// Start a round for a rotation. Its signatures have to meet the new
    /// signing threshold and, through their ondices, the prior next threshold.
    pub fn for_rotation(serder: Serder, fingerprint: &Diger, prior: &KeyState) -> Result<Self> {
        if !matches!(serder.ilk()?, Ilk::Rot | Ilk::Drt) {
            Err(Error::EventInvalid("only rotations carry a prior next threshold".into()))?;
        }
        let digers = prior.n().iter().map(|n| Diger::from_qb64(n)).collect::<Result<Vec<_>>>()?;
        let ntholder = prior.ntholder()?;
        let verfers = serder.verfers()?;
        let tholder = serder.tholder()?;
        let mut session = Self::build(serder, fingerprint, verfers, tholder);
        session.prior = Some((digers, ntholder));
        Ok(session)
    }

    /// Start a round for an event signed by the group's current keys.
    pub fn for_state(serder: Serder, fingerprint: &Diger, state: &KeyState) -> Result<Self> {
        let verfers = state.verfers()?;
        let tholder = state.tholder()?;
        Ok(Self::build(serder, fingerprint, verfers, tholder))
    }

    fn build(serder: Serder, fingerprint: &Diger, verfers: Vec<Verfer>, tholder: Tholder) -> Self {
        Self { serder, fingerprint: fingerprint.qb64(), verfers, tholder, sigers: BTreeMap::new(), phase: Phase::Pending, seal: None, prior: None }
    }

    /// Attach a seal pointing at the group's signing establishment event.
    pub fn with_seal(mut self, seal: Seal) -> Self {
        self.seal = Some(seal);
        self
    }

    /// Make sure another member built from the same inputs.
    pub fn check_inputs(&self, fingerprint: &str) -> Result<()> {
        if fingerprint != self.fingerprint {
            Err(Error::CoordinationInputMismatch)?;
        }
        Ok(())
    }

    /// Take in signatures (ours or other members'). Each is checked against
    /// the key at its index, and if any fails none are taken. Returns how many
    /// were new.
    pub fn add_signatures(&mut self, sigs: &[String]) -> Result<usize> {
        if !matches!(self.phase, Phase::Pending | Phase::PartiallySigned) {
            Err(Error::CoordinationState(format!("can't add signatures while {:?}", self.phase)))?;
        }
        let mut verified = Vec::with_capacity(sigs.len());
        for sig in sigs {
            let mut siger = Siger::from_qb64(sig, None)?;
            let index = *siger.index();
            let verfer = self
                .verfers
                .get(index as usize)
                .ok_or_else(|| Error::InvalidIndex { code: siger.code().to_string(), index: index as u64 })?;
            siger.set_verfer(verfer.clone());
            if !siger.verify(self.serder.raw()) {
                Err(Error::CryptoSignatureVerificationFailed)?;
            }
            verified.push(siger);
        }
        let mut added = 0;
        for siger in verified {
            let index = *siger.index();
            if self.sigers.contains_key(&index) {
                continue;
            }
            self.sigers.insert(index, siger);
            added += 1;
        }
        if !self.sigers.is_empty() && self.phase == Phase::Pending {
            self.phase = Phase::PartiallySigned;
        }
        tracing::debug!(added, total = self.sigers.len(), phase = ?self.phase, "group signatures");
        Ok(added)
    }

    /// Do the signatures so far meet the signing threshold (and for a
    /// rotation, the prior next threshold)?
    pub fn satisfied(&self) -> bool {
        let indices = self.sigers.keys().copied().collect::<Vec<_>>();
        if !self.tholder.satisfy(&indices) {
            return false;
        }
        match self.prior.as_ref() {
            None => true,
            Some((digers, ntholder)) => {
                // an ondex only counts if the signing key is the one committed to there
                let ondices = self
                    .sigers
                    .values()
                    .filter_map(|siger| {
                        let ondex = (*siger.ondex())?;
                        let verfer = siger.verfer()?;
                        let diger = digers.get(ondex as usize)?;
                        diger.verify(&verfer.qb64b()).then_some(ondex)
                    })
                    .collect::<Vec<_>>();
                ntholder.satisfy(&ondices)
            }
        }
    }

    /// Finish the round, returning the signed message to publish.
    pub fn submit(&mut self) -> Result<Vec<u8>> {
        if self.phase != Phase::PartiallySigned {
            Err(Error::CoordinationState(format!("can't submit while {:?}", self.phase)))?;
        }
        if !self.satisfied() {
            Err(Error::ThresholdInvalid(format!("{} signatures don't meet the threshold", self.sigers.len())))?;
        }
        let attachment = Attachment::Controller { sigers: self.sigers.values().cloned().collect(), seal: self.seal.clone() };
        let msg = messagize(&self.serder, &attachment, false)?;
        self.phase = Phase::Submitted;
        tracing::debug!(said = ?self.serder.said().ok(), "group event submitted");
        Ok(msg)
    }

    /// Mark the submitted event as accepted.
    pub fn confirm(&mut self) -> Result<()> {
        if self.phase != Phase::Submitted {
            Err(Error::CoordinationState(format!("can't confirm while {:?}", self.phase)))?;
        }
        self.phase = Phase::Confirmed;
        Ok(())
    }
}

/// An anchor seal: which event of which identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[getset(get = "pub")]
pub struct AnchorSeal {
    i: String,
    s: String,
    d: String,
}

impl AnchorSeal {
    pub fn to_value(&self) -> Value {
        serde_json::json!({"i": self.i, "s": self.s, "d": self.d})
    }

    fn matches(&self, value: &Value) -> bool {
        value.get("i").and_then(|v| v.as_str()) == Some(self.i.as_str())
            && value.get("s").and_then(|v| v.as_str()) == Some(self.s.as_str())
            && value.get("d").and_then(|v| v.as_str()) == Some(self.d.as_str())
    }
}

/// A delegated event waiting on its delegator to anchor it.
#[derive(Debug, Clone, Getters)]
#[getset(get = "pub")]
pub struct DelegationRequest {
    delpre: String,
    seal: AnchorSeal,
    /// Sequence number of the delegator event that anchored us, once seen.
    confirmed_at: Option<u128>,
}

impl DelegationRequest {
    /// Start waiting on `delpre` to anchor a delegated event. A `dip`
    /// names its delegator; a `drt` doesn't, so it has to be given.
    pub fn new(serder: &Serder, delpre: Option<&str>) -> Result<Self> {
        let ilk = serder.ilk()?;
        if !matches!(ilk, Ilk::Dip | Ilk::Drt) {
            Err(Error::EventInvalid(format!("a {} event isn't delegated", ilk)))?;
        }
        let delpre = delpre
            .or_else(|| serder.delpre())
            .ok_or_else(|| Error::FieldMissing("di".into()))?
            .to_string();
        let seal = AnchorSeal {
            i: serder.pre()?.to_string(),
            s: format!("{:x}", serder.sn()?),
            d: serder.said()?.to_string(),
        };
        Ok(Self { delpre, seal, confirmed_at: None })
    }

    /// Look for our anchor in a delegator event. Returns whether we're
    /// confirmed.
    pub fn observe(&mut self, event: &Serder) -> Result<bool> {
        if self.confirmed_at.is_some() {
            return Ok(true);
        }
        if event.pre()? != self.delpre || !matches!(event.ilk()?, Ilk::Ixn | Ilk::Rot | Ilk::Drt) {
            return Ok(false);
        }
        let anchored = event
            .ked()
            .get("a")
            .and_then(|a| a.as_array())
            .map(|a| a.iter().any(|v| self.seal.matches(v)))
            .unwrap_or(false);
        if anchored {
            self.confirmed_at = Some(event.sn()?);
            tracing::debug!(delegate = %self.seal.i, delegator = %self.delpre, "delegation anchored");
        }
        Ok(anchored)
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed_at.is_some()
    }
}

/// How long and how often to wait on something external.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
#[getset(get = "pub")]
#[serde(default)]
pub struct PollConfig {
    max_retries: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
    timeout_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { max_retries: 10, initial_backoff_ms: 250, max_backoff_ms: 5000, timeout_ms: 60000 }
    }
}

impl PollConfig {
    pub fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64, timeout_ms: u64) -> Self {
        Self { max_retries, initial_backoff_ms, max_backoff_ms, timeout_ms }
    }
}

/// Call `check` until it returns something, backing off exponentially
/// between attempts. Gives up after `max_retries` attempts or once
/// `timeout_ms` has passed.
pub fn poll<T, F>(label: &str, config: &PollConfig, mut check: F) -> Result<T>
where
    F: FnMut() -> Result<Option<T>>,
{
    let start = Instant::now();
    let timeout = Duration::from_millis(config.timeout_ms);
    let mut backoff = Duration::from_millis(config.initial_backoff_ms);
    let max_backoff = Duration::from_millis(config.max_backoff_ms);
    let mut attempts = 0;
    while attempts < config.max_retries {
        attempts += 1;
        tracing::trace!(label, attempts, "poll");
        if let Some(found) = check()? {
            return Ok(found);
        }
        let elapsed = start.elapsed();
        if attempts >= config.max_retries || elapsed >= timeout {
            break;
        }
        std::thread::sleep(backoff.min(timeout - elapsed));
        backoff = (backoff * 2).min(max_backoff);
    }
    tracing::debug!(label, attempts, "poll timed out");
    Err(Error::CoordinationTimeout { label: label.into(), attempts })
}

/// A long-running operation somewhere else (an agent, a witness pool).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
#[getset(get = "pub")]
pub struct Operation {
    name: String,
    done: bool,
    #[serde(default)]
    response: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl Operation {
    pub fn new(name: impl Into<String>, done: bool, response: Option<Value>, error: Option<Value>) -> Self {
        Self { name: name.into(), done, response, error }
    }
}

/// Something we can ask about operations.
pub trait Operations {
    fn get(&self, name: &str) -> Result<Operation>;
}

/// Wait for an operation to finish. An operation that finishes with an
/// error is a failed transition, not a timeout.
pub fn wait_operation(ops: &dyn Operations, name: &str, config: &PollConfig) -> Result<Operation> {
    let op = poll(name, config, || {
        let op = ops.get(name)?;
        Ok(if *op.done() { Some(op) } else { None })
    })?;
    if let Some(err) = op.error() {
        Err(Error::CoordinationState(format!("operation {} failed: {}", name, err)))?;
    }
    Ok(op)
}
