//! A client-side core for KERI, the Key Event Receipt Infrastructure.
//!
//! KERI identifiers are self-certifying: the prefix is derived from the
//! identifier's first keys (or from its whole inception event), and the
//! authority to speak for it moves forward through a hash-chained log of
//! signed key events. This library builds and signs those events; it does not
//! run witnesses or keep a database. The pieces:
//!
//! - [cesr] is the encoding everything travels in: compact qualified
//! base64 primitives, indexed signatures, and attachment group counters.
//! - [crypto] has the primitives built on it: digests, self-addressing
//! identifiers, prefixes, signers and verifiers, salts, and the sealing of
//! secrets at rest.
//! - [tholder] is signing thresholds, numeric or fractionally weighted.
//! - [event] builds inception, rotation, and interaction events, tracks
//! key state, and attaches signatures for the wire.
//! - [keeping] holds the keys: derived from a salt, random, a member's
//! share of a group, or a caller-provided external signer.
//! - [identifier] ties it together, and coordinates multisig rounds and
//! delegation with other parties.
//!
//! Nothing in here touches the network. Where we have to wait on someone
//! else, the caller supplies the lookups and we supply the retry loop.

pub mod error;
#[macro_use]
pub(crate) mod util;
pub mod cesr;
pub mod config;
pub mod crypto;
pub mod event;
pub mod identifier;
pub mod keeping;
pub mod tholder;

pub use error::{Error, ErrorKind, Result};
pub use util::Timestamp;
