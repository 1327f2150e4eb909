//! Signing thresholds.
//!
//! A threshold is either a plain count of signatures ("2 of however many
//! keys") or a weighted list of clauses, where each key gets a fractional
//! weight and every clause must sum to at least one over the keys that
//! signed.
//!
//! On the wire, numeric thresholds are hex strings (`"2"`) and weighted ones
//! are lists of fraction strings: `["1/2", "1/2", "1/2"]` for one clause or
//! `[["1/2", "1/2"], ["1"]]` for several.

use crate::error::{Error, Result};
use serde_json::Value;

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// A non-negative rational, kept in lowest terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fraction {
    num: u128,
    den: u128,
}

impl Fraction {
    pub fn new(num: u128, den: u128) -> Result<Self> {
        if den == 0 {
            Err(Error::ThresholdInvalid(format!("{}/{} has a zero denominator", num, den)))?;
        }
        let div = gcd(num, den).max(1);
        Ok(Self { num: num / div, den: den / div })
    }

    /// Parse `"n/d"` or a whole number.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || Error::ThresholdInvalid(format!("bad weight {:?}", text));
        let text = text.trim();
        match text.split_once('/') {
            Some((num, den)) => {
                let num = num.trim().parse::<u128>().map_err(|_| invalid())?;
                let den = den.trim().parse::<u128>().map_err(|_| invalid())?;
                Self::new(num, den)
            }
            None => Self::new(text.parse::<u128>().map_err(|_| invalid())?, 1),
        }
    }

    pub fn zero() -> Self {
        Self { num: 0, den: 1 }
    }

    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        let num = self.num.checked_mul(other.den)?.checked_add(other.num.checked_mul(self.den)?)?;
        let den = self.den.checked_mul(other.den)?;
        Self::new(num, den).ok()
    }

    /// Is this at least one?
    pub fn at_least_one(&self) -> bool {
        self.num >= self.den
    }

    fn in_unit_range(&self) -> bool {
        self.num <= self.den
    }
}

impl std::fmt::Display for Fraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// The threshold proper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Thold {
    Numeric(u32),
    Weighted(Vec<Vec<Fraction>>),
}

/// A validated signing threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tholder {
    thold: Thold,
}

impl Tholder {
    pub fn numeric(thold: u32) -> Self {
        Self { thold: Thold::Numeric(thold) }
    }

    /// Build a weighted threshold, validating every clause.
    pub fn weighted(clauses: Vec<Vec<Fraction>>) -> Result<Self> {
        if clauses.is_empty() {
            Err(Error::ThresholdInvalid("empty weighted threshold".into()))?;
        }
        for clause in &clauses {
            if clause.is_empty() {
                Err(Error::ThresholdInvalid("empty clause".into()))?;
            }
            let mut sum = Fraction::zero();
            for weight in clause {
                if !weight.in_unit_range() {
                    Err(Error::ThresholdInvalid(format!("weight {} is over one", weight)))?;
                }
                sum = sum
                    .checked_add(weight)
                    .ok_or_else(|| Error::ThresholdInvalid("weights overflow".into()))?;
            }
            if !sum.at_least_one() {
                Err(Error::ThresholdInvalid(format!("clause sums to {}, which can never be satisfied", sum)))?;
            }
        }
        Ok(Self { thold: Thold::Weighted(clauses) })
    }

    /// Parse a threshold from its wire form.
    pub fn from_sith(sith: &Value) -> Result<Self> {
        match sith {
            Value::Number(num) => {
                let num = num.as_u64().ok_or_else(|| Error::ThresholdInvalid(format!("{} is not a whole number", num)))?;
                Self::from_u64(num)
            }
            Value::String(text) if text.trim_start().starts_with('[') => {
                let parsed: Value = serde_json::from_str(text).map_err(|_| Error::ThresholdInvalid(text.clone()))?;
                match parsed {
                    Value::Array(_) => Self::from_sith(&parsed),
                    _ => Err(Error::ThresholdInvalid(text.clone())),
                }
            }
            Value::String(text) => {
                if text.is_empty() {
                    Err(Error::ThresholdInvalid("empty threshold".into()))?;
                }
                let num = u64::from_str_radix(text, 16).map_err(|_| Error::ThresholdInvalid(text.clone()))?;
                Self::from_u64(num)
            }
            Value::Array(items) => {
                if items.is_empty() {
                    Err(Error::ThresholdInvalid("empty weighted threshold".into()))?;
                }
                if items.iter().all(|v| v.is_string()) {
                    Self::weighted(vec![Self::parse_clause(items)?])
                } else if items.iter().all(|v| v.is_array()) {
                    let clauses = items
                        .iter()
                        .map(|clause| match clause {
                            Value::Array(weights) => Self::parse_clause(weights),
                            _ => Err(Error::ThresholdInvalid("mixed clause shapes".into())),
                        })
                        .collect::<Result<Vec<_>>>()?;
                    Self::weighted(clauses)
                } else {
                    Err(Error::ThresholdInvalid("mixed clause shapes".into()))
                }
            }
            _ => Err(Error::ThresholdInvalid(format!("unsupported threshold {}", sith))),
        }
    }

    fn from_u64(num: u64) -> Result<Self> {
        let num = u32::try_from(num).map_err(|_| Error::ThresholdInvalid(format!("{} is too big a threshold", num)))?;
        Ok(Self::numeric(num))
    }

    fn parse_clause(weights: &[Value]) -> Result<Vec<Fraction>> {
        weights
            .iter()
            .map(|w| match w {
                Value::String(text) => Fraction::parse(text),
                _ => Err(Error::ThresholdInvalid("weights must be strings".into())),
            })
            .collect()
    }

    pub fn thold(&self) -> &Thold {
        &self.thold
    }

    pub fn is_weighted(&self) -> bool {
        matches!(self.thold, Thold::Weighted(_))
    }

    /// The numeric threshold, if this is one.
    pub fn num(&self) -> Option<u32> {
        match self.thold {
            Thold::Numeric(num) => Some(num),
            Thold::Weighted(_) => None,
        }
    }

    /// For numeric thresholds, the minimum number of keys needed. For
    /// weighted, the number of keys it assigns weights to.
    pub fn size(&self) -> usize {
        match &self.thold {
            Thold::Numeric(num) => *num as usize,
            Thold::Weighted(clauses) => clauses.iter().map(|c| c.len()).sum(),
        }
    }

    /// Check that this threshold makes sense for `count` keys.
    pub fn validate_for(&self, count: usize) -> Result<()> {
        match &self.thold {
            Thold::Numeric(num) => {
                if *num as usize > count {
                    Err(Error::ThresholdInvalid(format!("threshold {} is more than the {} keys available", num, count)))?;
                }
            }
            Thold::Weighted(_) => {
                if self.size() != count {
                    Err(Error::ThresholdInvalid(format!("{} weights for {} keys", self.size(), count)))?;
                }
            }
        }
        Ok(())
    }

    /// The wire form of this threshold.
    pub fn sith(&self) -> Value {
        match &self.thold {
            Thold::Numeric(num) => Value::String(format!("{:x}", num)),
            Thold::Weighted(clauses) => {
                let to_list = |clause: &Vec<Fraction>| Value::Array(clause.iter().map(|w| Value::String(w.to_string())).collect());
                if clauses.len() == 1 {
                    to_list(&clauses[0])
                } else {
                    Value::Array(clauses.iter().map(to_list).collect())
                }
            }
        }
    }

    /// Do signatures from the keys at `indices` satisfy this threshold?
    /// Duplicates count once.
    pub fn satisfy(&self, indices: &[u32]) -> bool {
        match &self.thold {
            Thold::Numeric(num) => {
                let mut distinct = indices.to_vec();
                distinct.sort_unstable();
                distinct.dedup();
                distinct.len() >= *num as usize
            }
            Thold::Weighted(clauses) => {
                let mut sats = vec![false; self.size()];
                for idx in indices {
                    if let Some(sat) = sats.get_mut(*idx as usize) {
                        *sat = true;
                    }
                }
                let mut offset = 0;
                for clause in clauses {
                    let mut sum = Fraction::zero();
                    for (i, weight) in clause.iter().enumerate() {
                        if sats[offset + i] {
                            sum = match sum.checked_add(weight) {
                                Some(sum) => sum,
                                None => return false,
                            };
                        }
                    }
                    if !sum.at_least_one() {
                        return false;
                    }
                    offset += clause.len();
                }
                true
            }
        }
    }
}

/// `ceil(n / 2)`, the usual default threshold for `n` keys.
pub(crate) fn default_sith(n: usize) -> u32 {
    ((n + 1) / 2) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test::generate_combinations;
    use serde_json::json;

    #[test]
    fn fractions() {
        assert_eq!(Fraction::parse("2/4").unwrap(), Fraction::new(1, 2).unwrap());
        assert_eq!(Fraction::parse("1").unwrap().to_string(), "1");
        assert_eq!(Fraction::parse("1/3").unwrap().to_string(), "1/3");
        assert!(Fraction::parse("1/0").is_err());
        assert!(Fraction::parse("half").is_err());
        let sum = Fraction::parse("1/3").unwrap().checked_add(&Fraction::parse("2/3").unwrap()).unwrap();
        assert!(sum.at_least_one());
    }

    #[test]
    fn numeric() {
        let tholder = Tholder::from_sith(&json!("2")).unwrap();
        assert_eq!(tholder.num(), Some(2));
        assert_eq!(tholder.sith(), json!("2"));
        assert!(!tholder.satisfy(&[0]));
        assert!(!tholder.satisfy(&[1, 1]));
        assert!(tholder.satisfy(&[0, 1]));
        assert_eq!(Tholder::from_sith(&json!(26)).unwrap().sith(), json!("1a"));
        assert_eq!(Tholder::from_sith(&json!("1a")).unwrap().num(), Some(26));
        assert!(Tholder::from_sith(&json!(u32::MAX as u64 + 1)).is_err());
        assert!(Tholder::from_sith(&json!("100000000")).is_err());
        assert!(Tholder::from_sith(&json!(-1)).is_err());
        assert!(Tholder::from_sith(&json!(1.5)).is_err());
        assert!(Tholder::from_sith(&json!("")).is_err());
        assert!(Tholder::numeric(0).satisfy(&[]));
    }

    #[test]
    fn weighted_two_of_three() {
        let tholder = Tholder::from_sith(&json!([["1/2", "1/2", "1/2"]])).unwrap();
        assert!(tholder.is_weighted());
        assert_eq!(tholder.size(), 3);
        assert_eq!(tholder.sith(), json!(["1/2", "1/2", "1/2"]));
        for combo in generate_combinations(&vec![0u32, 1, 2]) {
            assert_eq!(tholder.satisfy(&combo), combo.len() >= 2, "{:?}", combo);
        }
        // out of range indices are ignored
        assert!(!tholder.satisfy(&[0, 5]));
    }

    #[test]
    fn weighted_multi_clause() {
        let tholder = Tholder::from_sith(&json!([["1/2", "1/2"], ["1/3", "1/3", "1/3"]])).unwrap();
        assert_eq!(tholder.size(), 5);
        assert_eq!(tholder.sith(), json!([["1/2", "1/2"], ["1/3", "1/3", "1/3"]]));
        for combo in generate_combinations(&vec![0u32, 1, 2, 3, 4]) {
            let first = combo.contains(&0) && combo.contains(&1);
            let second = combo.contains(&2) && combo.contains(&3) && combo.contains(&4);
            assert_eq!(tholder.satisfy(&combo), first && second, "{:?}", combo);
        }
    }

    #[test]
    fn weighted_from_strings() {
        let flat = Tholder::from_sith(&json!(r#"["1/2","1/2"]"#)).unwrap();
        assert_eq!(flat, Tholder::from_sith(&json!(["1/2", "1/2"])).unwrap());
        let nested = Tholder::from_sith(&json!(r#"[["1"],["1/2","1/2"]]"#)).unwrap();
        assert_eq!(nested.size(), 3);
        assert!(nested.satisfy(&[0, 1, 2]));
        assert!(!nested.satisfy(&[1, 2]));
    }

    #[test]
    fn weighted_strict() {
        assert!(Tholder::from_sith(&json!([])).is_err());
        assert!(Tholder::from_sith(&json!([[]])).is_err());
        assert!(Tholder::from_sith(&json!(["1/2", ["1/2"]])).is_err());
        assert!(Tholder::from_sith(&json!(["3/2", "1/2"])).is_err());
        assert!(Tholder::from_sith(&json!(["1/3", "1/3"])).is_err());
        assert!(Tholder::from_sith(&json!([1, 1])).is_err());
        assert!(Tholder::from_sith(&json!("[1/2]")).is_err());
    }

    #[test]
    fn validate_for_keys() {
        assert!(Tholder::numeric(2).validate_for(2).is_ok());
        assert!(Tholder::numeric(3).validate_for(2).is_err());
        let weighted = Tholder::from_sith(&json!(["1/2", "1/2", "1/2"])).unwrap();
        assert!(weighted.validate_for(3).is_ok());
        assert!(weighted.validate_for(4).is_err());
        assert!(weighted.validate_for(2).is_err());
        assert_eq!(default_sith(1), 1);
        assert_eq!(default_sith(3), 2);
        assert_eq!(default_sith(4), 2);
        assert_eq!(default_sith(0), 0);
    }
}
