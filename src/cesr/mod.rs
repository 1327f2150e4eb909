//! The Composable Event Streaming Representation.
//!
//! CESR primitives are self-framing: a reader can pull a key, digest, or
//! signature off the front of a stream without knowing in advance what it is.
//! The text and binary forms round-trip, and concatenations of primitives
//! stay aligned on 24-bit boundaries in both.

pub mod code;
pub mod counter;
pub mod indexer;
pub mod matter;
pub mod number;

pub use code::{CounterCode, IndexerCode, MatterCode, Sizage, VariableFamily, Xizage};
pub use counter::Counter;
pub use indexer::Indexer;
pub use matter::Matter;
pub use number::{Number, Seqner};

use crate::{
    error::{Error, Result},
    util::ser::{base64_decode, base64_encode},
};

/// Encode raw material behind its code chars (`both`). Prepends pad and lead
/// zero bytes so the code chars replace the pad chars exactly.
pub(crate) fn infil(both: &str, raw: &[u8], ls: usize) -> String {
    let ps = (3 - ((raw.len() + ls) % 3)) % 3;
    let mut padded = vec![0u8; ps + ls];
    padded.extend_from_slice(raw);
    let encoded = base64_encode(&padded);
    format!("{}{}", both, &encoded[ps..])
}

/// Pull raw material back out of `qb64b[cs..fs]`, checking that the pad and
/// lead bytes are zero.
pub(crate) fn exfil(qb64b: &[u8], cs: usize, fs: usize, ls: usize) -> Result<Vec<u8>> {
    let ps = cs % 4;
    let mut base = vec![b'A'; ps];
    base.extend_from_slice(&qb64b[cs..fs]);
    let paw = base64_decode(&base)?;
    let lead = ps + ls;
    if paw.len() < lead {
        Err(Error::Shortage { need: lead, have: paw.len() })?;
    }
    if paw[..lead].iter().any(|b| *b != 0) {
        Err(Error::NonZeroPad)?;
    }
    Ok(paw[lead..].to_vec())
}

/// Read `qb64b[start..end]` as text, for code and soft chars.
pub(crate) fn text_slice(qb64b: &[u8], start: usize, end: usize) -> Result<&str> {
    std::str::from_utf8(&qb64b[start..end]).map_err(|_| Error::UnexpectedCode(String::from_utf8_lossy(&qb64b[start..end]).into_owned()))
}
