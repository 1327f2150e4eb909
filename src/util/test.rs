use rand::SeedableRng;

/// A deterministic rng so test vectors stay put between runs.
pub(crate) fn rng() -> rand_chacha::ChaCha20Rng {
    rand_chacha::ChaCha20Rng::seed_from_u64(0)
}

/// A deterministic rng with a caller-chosen seed, for tests that need several
/// independent participants.
pub(crate) fn rng_seeded(seed: u64) -> rand_chacha::ChaCha20Rng {
    rand_chacha::ChaCha20Rng::seed_from_u64(seed)
}

/// Given a set of values, find all combinations of those values as present or
/// absent in a vec.
///
/// Useful for poor attempts at fuzzing/parameter testing.
pub(crate) fn generate_combinations<T: Clone>(vals: &Vec<T>) -> Vec<Vec<T>> {
    // binary counting: bit N set means value N is in the combo
    let mut out = vec![];
    let combos = 2u32.pow(vals.len() as u32);
    for i in 0..combos {
        let mut combo = vec![];
        let mut bits = i;
        for idx in 0..vals.len() {
            if bits & 1 > 0 {
                combo.push(vals[idx].clone());
            }
            bits = bits >> 1;
        }
        out.push(combo);
    }
    out
}
