//! Keys that live outside this library (hardware, a wallet, a remote
//! signer). The caller registers a factory per extern type; we persist the
//! type, prefix index, and whatever opaque params the factory wants back.

use crate::{
    cesr::MatterCode,
    error::Result,
    event::KeyState,
    keeping::{Algo, KeeperParams, Keeper},
};
use getset::Getters;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

/// Builds an extern keeper from its prefix index and params.
pub type ExternFactory = Box<dyn Fn(u32, &Value) -> Result<Box<dyn Keeper>> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
#[getset(get = "pub")]
pub struct ExternParams {
    extern_type: String,
    pidx: u32,
    params: Value,
}

/// Wraps a caller-provided keeper so its params persist under our tag.
pub struct ExternKeeper {
    extern_type: String,
    pidx: u32,
    params: Value,
    inner: Box<dyn Keeper>,
}

impl std::fmt::Debug for ExternKeeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternKeeper").field("extern_type", &self.extern_type).field("pidx", &self.pidx).finish()
    }
}

impl ExternKeeper {
    pub fn new(extern_type: impl Into<String>, pidx: u32, params: Value, inner: Box<dyn Keeper>) -> Self {
        Self { extern_type: extern_type.into(), pidx, params, inner }
    }

    /// The params as the inner keeper sees them now, falling back to what we
    /// were built with.
    fn current_params(&self) -> Value {
        match self.inner.params() {
            KeeperParams::Extern(params) => params.params,
            _ => self.params.clone(),
        }
    }
}

impl Keeper for ExternKeeper {
    fn algo(&self) -> Algo {
        Algo::Extern
    }

    fn incept(&mut self, transferable: bool) -> Result<(Vec<String>, Vec<String>)> {
        self.inner.incept(transferable)
    }

    fn rotate(
        &mut self,
        ncodes: &[MatterCode],
        transferable: bool,
        states: &[KeyState],
        rstates: &[KeyState],
    ) -> Result<(Vec<String>, Vec<String>)> {
        self.inner.rotate(ncodes, transferable, states, rstates)
    }

    fn sign(&self, ser: &[u8], indexed: bool, indices: Option<&[u32]>, ondices: Option<&[Option<u32>]>) -> Result<Vec<String>> {
        self.inner.sign(ser, indexed, indices, ondices)
    }

    fn params(&self) -> KeeperParams {
        KeeperParams::Extern(ExternParams {
            extern_type: self.extern_type.clone(),
            pidx: self.pidx,
            params: self.current_params(),
        })
    }
}
