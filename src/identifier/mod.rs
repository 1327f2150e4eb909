//! Managing our own identifiers: creating them, rotating their keys, and
//! anchoring data with interaction events.
//!
//! [`Identifiers`] ties the key manager to the event builders. It doesn't
//! store anything; the caller persists the [`HabState`]s it hands back.

pub mod coordination;

use crate::{
    config::Config,
    crypto::{Siger, Tier},
    error::{Error, Result},
    event::{self, messagize, Attachment, InceptArgs, InteractArgs, Ilk, KeyState, Serder},
    keeping::{Algo, HabState, KeeperArgs, KeeperParams, KeyManager},
};
use rand::{CryptoRng, RngCore};
use serde_json::{json, Value};

/// Config trait: establishment events only.
pub const EST_ONLY: &str = "EO";
/// Config trait: this identifier won't delegate.
pub const DO_NOT_DELEGATE: &str = "DND";

/// Options for creating an identifier.
#[derive(Debug, Clone, Default)]
pub struct CreateArgs {
    pub algo: Option<Algo>,
    pub transferable: Option<bool>,
    pub isith: Option<Value>,
    pub nsith: Option<Value>,
    pub wits: Vec<String>,
    pub toad: Option<u32>,
    pub count: Option<usize>,
    pub ncount: Option<usize>,
    pub tier: Option<Tier>,
    pub stem: Option<String>,
    pub salt: Option<String>,
    pub est_only: bool,
    pub do_not_delegate: bool,
    pub data: Vec<Value>,
    pub delpre: Option<String>,
    /// Group identifiers: our member identifier.
    pub mhab: Option<HabState>,
    pub states: Vec<KeyState>,
    pub rstates: Vec<KeyState>,
    pub extern_type: Option<String>,
    pub extern_params: Value,
}

/// Options for rotating an identifier.
#[derive(Debug, Clone, Default)]
pub struct RotateArgs {
    pub transferable: Option<bool>,
    pub nsith: Option<Value>,
    pub toad: Option<u32>,
    pub cuts: Vec<String>,
    pub adds: Vec<String>,
    pub data: Vec<Value>,
    pub ncount: Option<usize>,
    /// Group identifiers: newer state for our member identifier.
    pub mhab: Option<HabState>,
    pub states: Vec<KeyState>,
    pub rstates: Vec<KeyState>,
}

/// A new identifier's inception event, its signatures, and what to persist.
#[derive(Debug, Clone)]
pub struct InceptionResult {
    pub serder: Serder,
    pub sigs: Vec<String>,
    pub params: KeeperParams,
    /// Group members that sign.
    pub smids: Vec<String>,
    /// Group members whose next keys are committed to.
    pub rmids: Vec<String>,
}

impl InceptionResult {
    /// The state to persist for the new identifier.
    pub fn hab(&self, name: &str) -> Result<HabState> {
        Ok(HabState::new(name, KeyState::from_inception(&self.serder)?, self.params.clone()))
    }

    /// The signed inception message.
    pub fn message(&self) -> Result<Vec<u8>> {
        signed_message(&self.serder, &self.sigs)
    }
}

/// A rotation or interaction, its signatures, and the keeper's new params.
#[derive(Debug, Clone)]
pub struct EventResult {
    pub serder: Serder,
    pub sigs: Vec<String>,
    pub params: KeeperParams,
}

impl EventResult {
    /// Fold this event into the identifier's persisted state.
    pub fn apply_to(&self, hab: &mut HabState) -> Result<()> {
        let state = hab.state().apply(&self.serder)?;
        hab.update(state, self.params.clone());
        Ok(())
    }

    pub fn message(&self) -> Result<Vec<u8>> {
        signed_message(&self.serder, &self.sigs)
    }
}

fn signed_message(serder: &Serder, sigs: &[String]) -> Result<Vec<u8>> {
    let sigers = sigs.iter().map(|s| Siger::from_qb64(s, None)).collect::<Result<Vec<_>>>()?;
    messagize(serder, &Attachment::Controller { sigers, seal: None }, false)
}

/// Creates and evolves our identifiers.
#[derive(Debug)]
pub struct Identifiers {
    manager: KeyManager,
    config: Config,
    /// The next prefix index to hand out.
    pidx: u32,
}

impl Identifiers {
    pub fn new(manager: KeyManager, config: Config) -> Self {
        let temp = *config.temp();
        Self { manager: manager.temp(temp), config, pidx: 0 }
    }

    pub fn manager(&self) -> &KeyManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut KeyManager {
        &mut self.manager
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pidx(&self) -> u32 {
        self.pidx
    }

    /// Pick up where a previous session left off.
    pub fn set_pidx(&mut self, pidx: u32) {
        self.pidx = pidx;
    }

    /// Create a new identifier.
    pub fn create<R: RngCore + CryptoRng>(&mut self, rng: &mut R, name: &str, args: CreateArgs) -> Result<InceptionResult> {
        let algo = args.algo.unwrap_or_default();
        let transferable = args.transferable.unwrap_or(*self.config.transferable());
        let count = args.count.unwrap_or(*self.config.count());
        let ncount = if transferable { args.ncount.unwrap_or(*self.config.ncount()) } else { 0 };
        let keeper_args = KeeperArgs {
            pidx: self.pidx,
            kidx: 0,
            tier: args.tier.unwrap_or(*self.config.tier()),
            transferable,
            stem: args.stem.clone().unwrap_or_default(),
            salt: args.salt.clone(),
            icodes: vec![*self.config.icode(); count],
            ncodes: vec![*self.config.ncode(); ncount],
            dcode: *self.config.dcode(),
            mhab: args.mhab.clone(),
            states: args.states.clone(),
            rstates: args.rstates.clone(),
            extern_type: args.extern_type.clone(),
            extern_params: args.extern_params.clone(),
        };
        let mut keeper = self.manager.new_keeper(rng, algo, keeper_args)?;
        let (keys, ndigs) = keeper.incept(transferable)?;

        let mut cnfg = vec![];
        if args.est_only {
            cnfg.push(EST_ONLY.to_string());
        }
        if args.do_not_delegate {
            cnfg.push(DO_NOT_DELEGATE.to_string());
        }
        let code = if transferable || args.delpre.is_some() { InceptArgs::default().code } else { None };
        let serder = event::incept(InceptArgs {
            keys,
            isith: args.isith,
            ndigs,
            nsith: args.nsith,
            toad: args.toad,
            wits: args.wits,
            cnfg,
            data: args.data,
            code,
            delpre: args.delpre,
            ..Default::default()
        })?;
        let sigs = keeper.sign(serder.raw(), true, None, None)?;
        self.pidx += 1;
        tracing::debug!(name, pre = ?serder.pre().ok(), ?algo, "created identifier");
        Ok(InceptionResult {
            serder,
            sigs,
            params: keeper.params(),
            smids: args.states.iter().map(|s| s.i().clone()).collect(),
            rmids: args.rstates.iter().map(|s| s.i().clone()).collect(),
        })
    }

    /// Rotate an identifier's keys.
    pub fn rotate(&self, hab: &HabState, args: RotateArgs) -> Result<EventResult> {
        let state = hab.state();
        if !state.is_transferable() {
            Err(Error::NonTransferable(hab.prefix().clone()))?;
        }
        // a group rotating after its member rotated needs the member's new state
        let hab = match (hab.keeper(), args.mhab) {
            (KeeperParams::Group(params), Some(mhab)) => {
                HabState::new(hab.name().clone(), state.clone(), KeeperParams::Group(params.with_member(mhab)))
            }
            _ => hab.clone(),
        };
        let mut keeper = self.manager.get(&hab)?;
        let transferable = args.transferable.unwrap_or(true);
        let ncount = if transferable { args.ncount.unwrap_or(*self.config.ncount()) } else { 0 };
        let ncodes = vec![*self.config.ncode(); ncount];
        let (keys, ndigs) = keeper.rotate(&ncodes, transferable, &args.states, &args.rstates)?;

        let nsith = match args.nsith {
            Some(nsith) => nsith,
            None if ndigs.is_empty() => json!("0"),
            None => state.nt().clone(),
        };
        let serder = event::rotate(event::RotateArgs {
            pre: state.i().clone(),
            keys,
            dig: state.d().clone(),
            ilk: if state.is_delegated() { Ilk::Drt } else { Ilk::Rot },
            sn: state.sn()? + 1,
            isith: Some(state.nt().clone()),
            ndigs,
            nsith: Some(nsith),
            toad: args.toad,
            wits: state.b().clone(),
            cuts: args.cuts,
            adds: args.adds,
            data: args.data,
            ..Default::default()
        })?;
        let sigs = keeper.sign(serder.raw(), true, None, None)?;
        tracing::debug!(pre = %state.i(), sn = ?serder.sn().ok(), "rotated identifier");
        Ok(EventResult { serder, sigs, params: keeper.params() })
    }

    /// Anchor data in an interaction event.
    pub fn interact(&self, hab: &HabState, data: Vec<Value>) -> Result<EventResult> {
        let state = hab.state();
        if !state.is_transferable() {
            Err(Error::NonTransferable(hab.prefix().clone()))?;
        }
        if state.c().iter().any(|c| c == EST_ONLY) {
            Err(Error::EventInvalid(format!("{} only allows establishment events", hab.prefix())))?;
        }
        let serder = event::interact(InteractArgs {
            pre: state.i().clone(),
            dig: state.d().clone(),
            sn: state.sn()? + 1,
            data,
            ..Default::default()
        })?;
        let keeper = self.manager.get(hab)?;
        let sigs = keeper.sign(serder.raw(), true, None, None)?;
        Ok(EventResult { serder, sigs, params: keeper.params() })
    }
}
