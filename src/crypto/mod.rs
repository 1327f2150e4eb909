//! The crypto module contains our cryptographic primitives: digests, SAIDs,
//! identifier prefixes, signing, salt stretching, and sealing secrets.

pub mod diger;
pub mod prefixer;
pub mod saider;
pub mod salter;
pub mod seal;
pub mod sign;

pub use diger::Diger;
pub use prefixer::Prefixer;
pub use saider::{Saider, DEFAULT_LABEL};
pub use salter::{Salter, Tier};
pub use seal::{SealKey, Sealed};
pub use sign::{Cigar, Siger, Signature, Signer, Verfer};
