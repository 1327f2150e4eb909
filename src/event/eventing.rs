//! Building key events, and framing them with their signatures for the wire.
//!
//! Everything in here is pure: give it the same arguments and you get the
//! same bytes back, which is what lets several members of a group build
//! identical events independently.

use crate::{
    cesr::{Counter, CounterCode, Matter, MatterCode, Seqner},
    crypto::{Cigar, Diger, Prefixer, Saider, Siger, DEFAULT_LABEL},
    error::{Error, Result},
    event::{serder::Serder, versify, Ilk, Kind, Protocol, Sad, Version, VERSION},
    tholder::{default_sith, Tholder},
};
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Arguments for an inception (or delegated inception) event.
#[derive(Debug, Clone)]
pub struct InceptArgs {
    /// Current signing keys, qb64.
    pub keys: Vec<String>,
    /// Current signing threshold. Defaults to a simple majority.
    pub isith: Option<Value>,
    /// Digests of the next keys, qb64.
    pub ndigs: Vec<String>,
    /// Next signing threshold. Defaults to a simple majority.
    pub nsith: Option<Value>,
    /// Witness threshold. Defaults to [`ample`] of the witness count.
    pub toad: Option<u32>,
    pub wits: Vec<String>,
    /// Configuration traits (`EO`, `DND`, ...).
    pub cnfg: Vec<String>,
    /// Anchored seals.
    pub data: Vec<Value>,
    pub version: Version,
    pub kind: Kind,
    /// Prefix derivation code. `None` with a single key and no delegator
    /// makes the key itself the prefix.
    pub code: Option<MatterCode>,
    /// The delegator, which makes this a `dip`.
    pub delpre: Option<String>,
}

impl Default for InceptArgs {
    fn default() -> Self {
        Self {
            keys: vec![],
            isith: None,
            ndigs: vec![],
            nsith: None,
            toad: None,
            wits: vec![],
            cnfg: vec![],
            data: vec![],
            version: VERSION,
            kind: Kind::JSON,
            code: Some(MatterCode::Blake3_256),
            delpre: None,
        }
    }
}

/// Arguments for a rotation (or delegated rotation) event.
#[derive(Debug, Clone)]
pub struct RotateArgs {
    pub pre: String,
    pub keys: Vec<String>,
    /// SAID of the prior event.
    pub dig: String,
    /// `rot` or `drt`.
    pub ilk: Ilk,
    pub sn: u128,
    pub isith: Option<Value>,
    pub ndigs: Vec<String>,
    pub nsith: Option<Value>,
    pub toad: Option<u32>,
    /// The witness list before this rotation.
    pub wits: Vec<String>,
    pub cuts: Vec<String>,
    pub adds: Vec<String>,
    pub cnfg: Vec<String>,
    pub data: Vec<Value>,
    pub version: Version,
    pub kind: Kind,
}

impl Default for RotateArgs {
    fn default() -> Self {
        Self {
            pre: String::new(),
            keys: vec![],
            dig: String::new(),
            ilk: Ilk::Rot,
            sn: 1,
            isith: None,
            ndigs: vec![],
            nsith: None,
            toad: None,
            wits: vec![],
            cuts: vec![],
            adds: vec![],
            cnfg: vec![],
            data: vec![],
            version: VERSION,
            kind: Kind::JSON,
        }
    }
}

/// Arguments for an interaction event.
#[derive(Debug, Clone)]
pub struct InteractArgs {
    pub pre: String,
    /// SAID of the prior event.
    pub dig: String,
    pub sn: u128,
    pub data: Vec<Value>,
    pub version: Version,
    pub kind: Kind,
}

impl Default for InteractArgs {
    fn default() -> Self {
        Self { pre: String::new(), dig: String::new(), sn: 1, data: vec![], version: VERSION, kind: Kind::JSON }
    }
}

/// The witness threshold for `n` witnesses that tolerates `f` faulty ones.
///
/// Without an explicit `f`, assume the most faults `n` witnesses can take,
/// `(n - 1) / 3`. With one, `weak` picks the smaller sufficient quorum.
pub fn ample(n: usize, f: Option<usize>, weak: bool) -> Result<usize> {
    match f {
        None => {
            let f = n.saturating_sub(1) / 3;
            Ok(n.min((n + f + 2) / 2))
        }
        Some(f) => {
            let m1 = (n + f + 2) / 2;
            let m2 = n.saturating_sub(f);
            if m2 < m1 && n > 0 {
                Err(Error::WitnessInvalid(format!("{} faulty witnesses is too many for {} witnesses", f, n)))?;
            }
            if weak {
                Ok(n.min(m1).min(m2))
            } else {
                Ok(n.min(m1.max(m2)))
            }
        }
    }
}

/// A seal naming the establishment event whose keys made the attached
/// signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seal {
    /// A specific event: prefix, sequence number, SAID.
    Event { i: String, s: u128, d: String },
    /// Whatever the latest establishment event of `i` is.
    Last { i: String },
}

/// What to frame an event with.
#[derive(Debug, Clone)]
pub enum Attachment {
    /// Controller signatures, optionally pointing at the signing keys' event.
    Controller { sigers: Vec<Siger>, seal: Option<Seal> },
    /// Indexed witness signatures.
    Witness(Vec<Siger>),
    /// Non-transferable receipt couples.
    Receipts(Vec<Cigar>),
}

fn check_unique(list: &[String], what: &str) -> Result<()> {
    let set = list.iter().collect::<HashSet<_>>();
    if set.len() != list.len() {
        Err(Error::WitnessInvalid(format!("duplicate entries in {}", what)))?;
    }
    Ok(())
}

/// Parse a threshold (or build its default) and check it fits `count`.
fn resolve_sith(sith: Option<&Value>, count: usize, default: u32, allow_zero: bool) -> Result<Tholder> {
    let tholder = match sith {
        Some(sith) => Tholder::from_sith(sith)?,
        None => Tholder::numeric(default),
    };
    if let Some(num) = tholder.num() {
        if num < 1 && !allow_zero {
            Err(Error::ThresholdInvalid(format!("threshold {} must be at least 1", num)))?;
        }
    }
    tholder.validate_for(count)?;
    Ok(tholder)
}

/// Default the witness threshold and check it against the witness count.
fn resolve_toad(toad: Option<u32>, wits: usize) -> Result<u32> {
    let toad = match toad {
        Some(toad) => toad,
        None => ample(wits, None, false)? as u32,
    };
    if wits == 0 {
        if toad != 0 {
            Err(Error::WitnessInvalid(format!("toad {} with no witnesses", toad)))?;
        }
    } else if toad < 1 || toad as usize > wits {
        Err(Error::WitnessInvalid(format!("toad {} outside [1, {}]", toad, wits)))?;
    }
    Ok(toad)
}

fn str_list(list: &[String]) -> Value {
    Value::Array(list.iter().cloned().map(Value::String).collect())
}

/// Build an inception event.
pub fn incept(args: InceptArgs) -> Result<Serder> {
    let isith = resolve_sith(args.isith.as_ref(), args.keys.len(), default_sith(args.keys.len()).max(1), false)?;
    let nsith = resolve_sith(args.nsith.as_ref(), args.ndigs.len(), default_sith(args.ndigs.len()), true)?;
    check_unique(&args.wits, "witnesses")?;
    let toad = resolve_toad(args.toad, args.wits.len())?;
    let ilk = if args.delpre.is_some() { Ilk::Dip } else { Ilk::Icp };

    let mut ked = Sad::new();
    ked.insert("v".into(), Value::String(versify(Protocol::KERI, args.version, args.kind, 0)));
    ked.insert("t".into(), Value::String(ilk.as_str().into()));
    ked.insert("d".into(), Value::String(String::new()));
    ked.insert("i".into(), Value::String(String::new()));
    ked.insert("s".into(), Value::String("0".into()));
    ked.insert("kt".into(), isith.sith());
    ked.insert("k".into(), str_list(&args.keys));
    ked.insert("nt".into(), nsith.sith());
    ked.insert("n".into(), str_list(&args.ndigs));
    ked.insert("bt".into(), Value::String(format!("{:x}", toad)));
    ked.insert("b".into(), str_list(&args.wits));
    ked.insert("c".into(), str_list(&args.cnfg));
    ked.insert("a".into(), Value::Array(args.data));
    if let Some(delpre) = args.delpre.as_ref() {
        ked.insert("di".into(), Value::String(delpre.clone()));
    }

    let code = match args.code {
        Some(code) => code,
        None if args.keys.len() == 1 && args.delpre.is_none() => *Matter::from_qb64(&args.keys[0])?.code(),
        None => MatterCode::Blake3_256,
    };
    if args.delpre.is_some() && !code.is_digestive() {
        Err(Error::PrefixInvalid(format!("delegated inception needs a digestive prefix, got {}", code)))?;
    }
    let prefixer = Prefixer::derive(&ked, code, args.kind)?;
    ked.insert("i".into(), Value::String(prefixer.qb64()));
    if prefixer.is_digestive() {
        ked.insert("d".into(), Value::String(prefixer.qb64()));
    } else {
        let (_, saidified) = Saider::saidify(&ked, MatterCode::Blake3_256, args.kind, DEFAULT_LABEL)?;
        ked = saidified;
    }
    tracing::trace!(pre = %prefixer.qb64(), ilk = %ilk, "incepted");
    Serder::new(ked)
}

/// Build a rotation event.
pub fn rotate(args: RotateArgs) -> Result<Serder> {
    if !matches!(args.ilk, Ilk::Rot | Ilk::Drt) {
        Err(Error::EventInvalid(format!("can't rotate with a {} event", args.ilk)))?;
    }
    if args.sn < 1 {
        Err(Error::EventInvalid("rotation sequence number must be at least 1".into()))?;
    }
    let isith = resolve_sith(args.isith.as_ref(), args.keys.len(), default_sith(args.keys.len()).max(1), false)?;
    let nsith = resolve_sith(args.nsith.as_ref(), args.ndigs.len(), default_sith(args.ndigs.len()), true)?;

    check_unique(&args.wits, "witnesses")?;
    check_unique(&args.cuts, "cuts")?;
    check_unique(&args.adds, "adds")?;
    let wits = args.wits.iter().collect::<HashSet<_>>();
    let cuts = args.cuts.iter().collect::<HashSet<_>>();
    let adds = args.adds.iter().collect::<HashSet<_>>();
    if !cuts.is_subset(&wits) {
        Err(Error::WitnessInvalid("cuts must be current witnesses".into()))?;
    }
    if !cuts.is_disjoint(&adds) {
        Err(Error::WitnessInvalid("a witness can't be both cut and added".into()))?;
    }
    if !wits.is_disjoint(&adds) {
        Err(Error::WitnessInvalid("adds must not already be witnesses".into()))?;
    }
    let new_wits = args
        .wits
        .iter()
        .filter(|w| !cuts.contains(w))
        .chain(args.adds.iter())
        .cloned()
        .collect::<Vec<_>>();
    if new_wits.len() != args.wits.len() - args.cuts.len() + args.adds.len() {
        Err(Error::WitnessInvalid("witness list doesn't add up".into()))?;
    }
    let toad = resolve_toad(args.toad, new_wits.len())?;

    let mut ked = Sad::new();
    ked.insert("v".into(), Value::String(versify(Protocol::KERI, args.version, args.kind, 0)));
    ked.insert("t".into(), Value::String(args.ilk.as_str().into()));
    ked.insert("d".into(), Value::String(String::new()));
    ked.insert("i".into(), Value::String(args.pre.clone()));
    ked.insert("s".into(), Value::String(format!("{:x}", args.sn)));
    ked.insert("p".into(), Value::String(args.dig));
    ked.insert("kt".into(), isith.sith());
    ked.insert("k".into(), str_list(&args.keys));
    ked.insert("nt".into(), nsith.sith());
    ked.insert("n".into(), str_list(&args.ndigs));
    ked.insert("bt".into(), Value::String(format!("{:x}", toad)));
    ked.insert("br".into(), str_list(&args.cuts));
    ked.insert("ba".into(), str_list(&args.adds));
    ked.insert("c".into(), str_list(&args.cnfg));
    ked.insert("a".into(), Value::Array(args.data));
    let (_, ked) = Saider::saidify(&ked, MatterCode::Blake3_256, args.kind, DEFAULT_LABEL)?;
    tracing::trace!(pre = %args.pre, sn = args.sn, "rotated");
    Serder::new(ked)
}

/// Build an interaction event.
pub fn interact(args: InteractArgs) -> Result<Serder> {
    if args.sn < 1 {
        Err(Error::EventInvalid("interaction sequence number must be at least 1".into()))?;
    }
    let mut ked = Sad::new();
    ked.insert("v".into(), Value::String(versify(Protocol::KERI, args.version, args.kind, 0)));
    ked.insert("t".into(), Value::String(Ilk::Ixn.as_str().into()));
    ked.insert("d".into(), Value::String(String::new()));
    ked.insert("i".into(), Value::String(args.pre));
    ked.insert("s".into(), Value::String(format!("{:x}", args.sn)));
    ked.insert("p".into(), Value::String(args.dig));
    ked.insert("a".into(), Value::Array(args.data));
    let (_, ked) = Saider::saidify(&ked, MatterCode::Blake3_256, args.kind, DEFAULT_LABEL)?;
    Serder::new(ked)
}

/// Frame an event with its attachment. `pipelined` wraps the attachment in
/// a quadlet count so a reader can skip it without parsing.
pub fn messagize(serder: &Serder, attachment: &Attachment, pipelined: bool) -> Result<Vec<u8>> {
    let mut atc = String::new();
    match attachment {
        Attachment::Controller { sigers, seal } => {
            if sigers.is_empty() {
                Err(Error::EventInvalid("missing controller signatures".into()))?;
            }
            match seal {
                Some(Seal::Event { i, s, d }) => {
                    let prefixer = Prefixer::from_qb64(i)?;
                    let diger = Diger::from_qb64(d)?;
                    atc.push_str(&Counter::encode(CounterCode::TransIdxSigGroups, 1)?);
                    atc.push_str(&prefixer.qb64());
                    atc.push_str(&Seqner::new(*s).qb64());
                    atc.push_str(&diger.qb64());
                }
                Some(Seal::Last { i }) => {
                    let prefixer = Prefixer::from_qb64(i)?;
                    atc.push_str(&Counter::encode(CounterCode::TransLastIdxSigGroups, 1)?);
                    atc.push_str(&prefixer.qb64());
                }
                None => {}
            }
            atc.push_str(&Counter::encode(CounterCode::ControllerIdxSigs, sigers.len() as u64)?);
            for siger in sigers {
                atc.push_str(&siger.qb64());
            }
        }
        Attachment::Witness(wigers) => {
            if wigers.is_empty() {
                Err(Error::EventInvalid("missing witness signatures".into()))?;
            }
            atc.push_str(&Counter::encode(CounterCode::WitnessIdxSigs, wigers.len() as u64)?);
            for wiger in wigers {
                if wiger.verfer().map(|v| v.is_transferable()).unwrap_or(false) {
                    Err(Error::EventInvalid("witness signature from a transferable key".into()))?;
                }
                atc.push_str(&wiger.qb64());
            }
        }
        Attachment::Receipts(cigars) => {
            if cigars.is_empty() {
                Err(Error::EventInvalid("missing receipt signatures".into()))?;
            }
            atc.push_str(&Counter::encode(CounterCode::NonTransReceiptCouples, cigars.len() as u64)?);
            for cigar in cigars {
                let verfer = cigar
                    .verfer()
                    .ok_or_else(|| Error::EventInvalid("receipt signature has no key".into()))?;
                if verfer.is_transferable() {
                    Err(Error::EventInvalid("receipt signature from a transferable key".into()))?;
                }
                atc.push_str(&verfer.qb64());
                atc.push_str(&cigar.qb64());
            }
        }
    }

    let mut msg = serder.raw().clone();
    if pipelined {
        if atc.len() % 4 != 0 {
            Err(Error::EventInvalid(format!("attachment of {} chars is not in quadlets", atc.len())))?;
        }
        let quadlets = (atc.len() / 4) as u64;
        let code = if quadlets >= 4096 { CounterCode::BigAttachedMaterialQuadlets } else { CounterCode::AttachedMaterialQuadlets };
        msg.extend_from_slice(Counter::encode(code, quadlets)?.as_bytes());
    }
    msg.extend_from_slice(atc.as_bytes());
    Ok(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        crypto::{Diger, Signer},
        util::test::rng,
    };
    use serde_json::json;

    fn signers(rng: &mut rand_chacha::ChaCha20Rng, count: usize, transferable: bool) -> Vec<Signer> {
        (0..count).map(|_| Signer::random(rng, transferable).unwrap()).collect()
    }

    fn keys(signers: &[Signer]) -> Vec<String> {
        signers.iter().map(|s| s.verfer().qb64()).collect()
    }

    fn digs(signers: &[Signer]) -> Vec<String> {
        signers
            .iter()
            .map(|s| Diger::new(MatterCode::Blake3_256, &s.verfer().qb64b()).unwrap().qb64())
            .collect()
    }

    #[test]
    fn ample_quorums() {
        let expected = [0, 1, 2, 2, 3, 4, 4, 5, 6, 6, 7];
        for (n, m) in expected.iter().enumerate() {
            assert_eq!(ample(n, None, false).unwrap(), *m, "n = {}", n);
        }
        assert_eq!(ample(4, Some(1), false).unwrap(), 3);
        assert_eq!(ample(6, Some(1), true).unwrap(), 4);
        assert_eq!(ample(6, Some(1), false).unwrap(), 5);
        assert!(ample(3, Some(1), false).is_err());
        assert_eq!(ample(0, Some(0), false).unwrap(), 0);
    }

    #[test]
    fn incept_self_addressing() {
        let mut rng = rng();
        let current = signers(&mut rng, 1, true);
        let next = signers(&mut rng, 1, true);
        let serder = incept(InceptArgs {
            keys: keys(&current),
            isith: Some(json!(1)),
            ndigs: digs(&next),
            nsith: Some(json!(1)),
            toad: Some(0),
            ..Default::default()
        })
        .unwrap();
        let ked = serder.ked();
        assert_eq!(ked["t"], json!("icp"));
        assert_eq!(ked["s"], json!("0"));
        assert_eq!(ked["kt"], json!("1"));
        assert_eq!(ked["nt"], json!("1"));
        assert_eq!(ked["bt"], json!("0"));
        assert_eq!(ked["k"], json!(keys(&current)));
        let pre = serder.pre().unwrap();
        assert!(pre.starts_with('E'));
        assert_ne!(pre, keys(&current)[0]);
        assert_eq!(serder.said().unwrap(), pre);
        assert!(serder.verify_said());
        let fields = ked.keys().map(|k| k.as_str()).collect::<Vec<_>>();
        assert_eq!(fields, vec!["v", "t", "d", "i", "s", "kt", "k", "nt", "n", "bt", "b", "c", "a"]);
    }

    #[test]
    fn incept_basic() {
        let mut rng = rng();
        let current = signers(&mut rng, 1, true);
        let next = signers(&mut rng, 1, true);
        let serder = incept(InceptArgs { keys: keys(&current), ndigs: digs(&next), code: None, ..Default::default() }).unwrap();
        assert_eq!(serder.pre().unwrap(), keys(&current)[0]);
        assert_ne!(serder.said().unwrap(), serder.pre().unwrap());
        assert!(serder.verify_said());

        let nontrans = signers(&mut rng, 1, false);
        let serder = incept(InceptArgs { keys: keys(&nontrans), code: None, ..Default::default() }).unwrap();
        assert!(serder.pre().unwrap().starts_with('B'));
        assert_eq!(serder.ked()["nt"], json!("0"));

        let res = incept(InceptArgs { keys: keys(&nontrans), ndigs: digs(&next), code: None, ..Default::default() });
        assert_eq!(res.err(), Some(Error::PrefixInvalid("non-transferable prefix with non-empty `n`".into())));
    }

    #[test]
    fn incept_witnesses() {
        let mut rng = rng();
        let current = signers(&mut rng, 1, true);
        let wits = keys(&signers(&mut rng, 3, false));
        let serder = incept(InceptArgs { keys: keys(&current), wits: wits.clone(), ..Default::default() }).unwrap();
        assert_eq!(serder.ked()["bt"], json!("2"));
        assert_eq!(serder.ked()["b"], json!(wits));

        for toad in [0, 4] {
            let res = incept(InceptArgs { keys: keys(&current), wits: wits.clone(), toad: Some(toad), ..Default::default() });
            assert_eq!(res.err().map(|e| e.kind()), Some(crate::error::ErrorKind::Configuration));
        }
        assert!(incept(InceptArgs { keys: keys(&current), toad: Some(1), ..Default::default() }).is_err());
        let dupes = vec![wits[0].clone(), wits[1].clone(), wits[0].clone()];
        assert_eq!(
            incept(InceptArgs { keys: keys(&current), wits: dupes, ..Default::default() }).err(),
            Some(Error::WitnessInvalid("duplicate entries in witnesses".into()))
        );
    }

    #[test]
    fn incept_thresholds() {
        let mut rng = rng();
        let current = signers(&mut rng, 3, true);
        let next = signers(&mut rng, 3, true);
        let serder = incept(InceptArgs { keys: keys(&current), ndigs: digs(&next), ..Default::default() }).unwrap();
        assert_eq!(serder.ked()["kt"], json!("2"));
        assert_eq!(serder.ked()["nt"], json!("2"));

        let serder = incept(InceptArgs {
            keys: keys(&current),
            isith: Some(json!(["1/2", "1/2", "1/2"])),
            ndigs: digs(&next),
            nsith: Some(json!(0)),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(serder.ked()["kt"], json!(["1/2", "1/2", "1/2"]));
        assert!(serder.tholder().unwrap().is_weighted());
        assert_eq!(serder.ntholder().unwrap().num(), Some(0));

        assert!(incept(InceptArgs { keys: keys(&current), isith: Some(json!(4)), ..Default::default() }).is_err());
        assert!(incept(InceptArgs { keys: keys(&current), isith: Some(json!(0)), ..Default::default() }).is_err());
        assert!(incept(InceptArgs { keys: keys(&current), isith: Some(json!(["1/2", "1/2"])), ..Default::default() }).is_err());
        assert!(incept(InceptArgs { keys: vec![], ..Default::default() }).is_err());
    }

    #[test]
    fn incept_delegated() {
        let mut rng = rng();
        let current = signers(&mut rng, 1, true);
        let delpre = "EHpD0-CDWOdu5RJ8jHBSUkOqBZ3cXeDVHWNb_Ul89VI7".to_string();
        let serder = incept(InceptArgs { keys: keys(&current), delpre: Some(delpre.clone()), code: None, ..Default::default() }).unwrap();
        assert_eq!(serder.ilk().unwrap(), Ilk::Dip);
        assert_eq!(serder.delpre(), Some(delpre.as_str()));
        assert!(serder.pre().unwrap().starts_with('E'));
        assert!(serder.verify_said());

        let res = incept(InceptArgs { keys: keys(&current), delpre: Some(delpre), code: Some(MatterCode::Ed25519), ..Default::default() });
        assert!(matches!(res.err(), Some(Error::PrefixInvalid(_))));
    }

    #[test]
    fn rotate_witness_algebra() {
        let mut rng = rng();
        let current = signers(&mut rng, 1, true);
        let next = signers(&mut rng, 1, true);
        let w = keys(&signers(&mut rng, 4, false));
        let base = RotateArgs {
            pre: "EBfdlu8R27Fbx-ehrqwImnK-8Cm79sqbAQ4MmvEAYqao".into(),
            keys: keys(&current),
            dig: "EBfdlu8R27Fbx-ehrqwImnK-8Cm79sqbAQ4MmvEAYqao".into(),
            ndigs: digs(&next),
            wits: vec![w[0].clone(), w[1].clone(), w[2].clone()],
            cuts: vec![w[0].clone()],
            adds: vec![w[3].clone()],
            ..Default::default()
        };
        let serder = rotate(base.clone()).unwrap();
        let ked = serder.ked();
        assert_eq!(ked["t"], json!("rot"));
        assert_eq!(ked["s"], json!("1"));
        assert_eq!(ked["bt"], json!("2"));
        assert_eq!(ked["br"], json!([w[0]]));
        assert_eq!(ked["ba"], json!([w[3]]));
        assert!(serder.verify_said());
        let fields = ked.keys().map(|k| k.as_str()).collect::<Vec<_>>();
        assert_eq!(fields, vec!["v", "t", "d", "i", "s", "p", "kt", "k", "nt", "n", "bt", "br", "ba", "c", "a"]);

        for toad in [0, 4] {
            assert!(rotate(RotateArgs { toad: Some(toad), ..base.clone() }).is_err());
        }
        assert!(rotate(RotateArgs { toad: Some(3), ..base.clone() }).is_ok());
        assert!(rotate(RotateArgs { cuts: vec![w[3].clone()], adds: vec![], ..base.clone() }).is_err());
        assert!(rotate(RotateArgs { cuts: vec![w[0].clone()], adds: vec![w[0].clone()], ..base.clone() }).is_err());
        assert!(rotate(RotateArgs { cuts: vec![], adds: vec![w[1].clone()], ..base.clone() }).is_err());
        assert!(rotate(RotateArgs { adds: vec![w[3].clone(), w[3].clone()], ..base.clone() }).is_err());
        assert!(rotate(RotateArgs { sn: 0, ..base.clone() }).is_err());
        assert!(rotate(RotateArgs { ilk: Ilk::Ixn, ..base.clone() }).is_err());
        assert_eq!(rotate(RotateArgs { ilk: Ilk::Drt, sn: 17, ..base }).unwrap().ked()["s"], json!("11"));
    }

    #[test]
    fn interact_events() {
        let serder = interact(InteractArgs {
            pre: "EBfdlu8R27Fbx-ehrqwImnK-8Cm79sqbAQ4MmvEAYqao".into(),
            dig: "EBfdlu8R27Fbx-ehrqwImnK-8Cm79sqbAQ4MmvEAYqao".into(),
            sn: 2,
            data: vec![json!({"i": "EBfdlu8R27Fbx-ehrqwImnK-8Cm79sqbAQ4MmvEAYqao", "s": "0", "d": "EBfdlu8R27Fbx-ehrqwImnK-8Cm79sqbAQ4MmvEAYqao"})],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(serder.ilk().unwrap(), Ilk::Ixn);
        assert_eq!(serder.sn().unwrap(), 2);
        assert!(serder.verify_said());
        assert!(interact(InteractArgs { sn: 0, ..Default::default() }).is_err());
    }

    #[test]
    fn messagize_controller() {
        let mut rng = rng();
        let current = signers(&mut rng, 1, true);
        let serder = incept(InceptArgs { keys: keys(&current), ..Default::default() }).unwrap();
        let siger = current[0].sign_indexed(serder.raw(), 0, false, None).unwrap();
        let attachment = Attachment::Controller { sigers: vec![siger.clone()], seal: None };

        let msg = messagize(&serder, &attachment, false).unwrap();
        let mut expected = serder.raw().clone();
        expected.extend_from_slice(b"-AAB");
        expected.extend_from_slice(siger.qb64().as_bytes());
        assert_eq!(msg, expected);

        let msg = messagize(&serder, &attachment, true).unwrap();
        assert_eq!(&msg[serder.raw().len()..serder.raw().len() + 4], b"-VAX");

        let pre = serder.pre().unwrap().to_string();
        let sealed = Attachment::Controller {
            sigers: vec![siger.clone()],
            seal: Some(Seal::Event { i: pre.clone(), s: 0, d: pre.clone() }),
        };
        let msg = messagize(&serder, &sealed, false).unwrap();
        let atc = String::from_utf8(msg[serder.raw().len()..].to_vec()).unwrap();
        assert_eq!(atc, format!("-FAB{}0AAAAAAAAAAAAAAAAAAAAAAA{}-AAB{}", pre, pre, siger.qb64()));

        let last = Attachment::Controller { sigers: vec![siger.clone()], seal: Some(Seal::Last { i: pre.clone() }) };
        let msg = messagize(&serder, &last, false).unwrap();
        let atc = String::from_utf8(msg[serder.raw().len()..].to_vec()).unwrap();
        assert_eq!(atc, format!("-HAB{}-AAB{}", pre, siger.qb64()));

        // seals have to hold real primitives or the attachment won't parse
        let garbled = |seal: Seal| Attachment::Controller { sigers: vec![siger.clone()], seal: Some(seal) };
        assert!(messagize(&serder, &garbled(Seal::Last { i: "not a prefix".into() }), false).is_err());
        assert!(messagize(&serder, &garbled(Seal::Event { i: pre.clone(), s: 0, d: pre[..20].to_string() }), false).is_err());
        let key = current[0].verfer().qb64();
        assert!(messagize(&serder, &garbled(Seal::Event { i: pre.clone(), s: 0, d: key }), false).is_err());

        let empty = Attachment::Controller { sigers: vec![], seal: None };
        assert_eq!(messagize(&serder, &empty, false).err(), Some(Error::EventInvalid("missing controller signatures".into())));
    }

    #[test]
    fn messagize_receipts() {
        let mut rng = rng();
        let current = signers(&mut rng, 1, true);
        let serder = incept(InceptArgs { keys: keys(&current), ..Default::default() }).unwrap();

        let witness = Signer::random(&mut rng, false).unwrap();
        let cigar = witness.sign_unindexed(serder.raw()).unwrap();
        let msg = messagize(&serder, &Attachment::Receipts(vec![cigar.clone()]), false).unwrap();
        let atc = String::from_utf8(msg[serder.raw().len()..].to_vec()).unwrap();
        assert_eq!(atc, format!("-CAB{}{}", witness.verfer().qb64(), cigar.qb64()));

        let wiger = witness.sign_indexed(serder.raw(), 0, false, None).unwrap();
        let msg = messagize(&serder, &Attachment::Witness(vec![wiger.clone()]), false).unwrap();
        assert!(msg.ends_with(format!("-BAB{}", wiger.qb64()).as_bytes()));

        let transferable = current[0].sign_unindexed(serder.raw()).unwrap();
        assert!(messagize(&serder, &Attachment::Receipts(vec![transferable]), false).is_err());
        let unbound = Cigar::from_qb64(&cigar.qb64(), None).unwrap();
        assert!(messagize(&serder, &Attachment::Receipts(vec![unbound]), false).is_err());
        let trans_wiger = current[0].sign_indexed(serder.raw(), 0, false, None).unwrap();
        assert!(messagize(&serder, &Attachment::Witness(vec![trans_wiger]), false).is_err());
    }
}
