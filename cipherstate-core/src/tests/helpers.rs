//! Helpers shared by the unit tests.

use rand_chacha::ChaChaRng;
use rand_core::SeedableRng;

use crate::Identifier;

/// A deterministic RNG so that failures can be reproduced.
pub(crate) fn rng(seed: u64) -> ChaChaRng {
    ChaChaRng::seed_from_u64(seed)
}

pub(crate) fn id(n: u16) -> Identifier {
    Identifier::try_from(n).unwrap()
}

/// All subsets of `1..=n` with exactly `k` elements.
pub(crate) fn subsets(n: u16, k: usize) -> Vec<Vec<Identifier>> {
    fn go(
        start: u16,
        n: u16,
        k: usize,
        current: &mut Vec<Identifier>,
        out: &mut Vec<Vec<Identifier>>,
    ) {
        if current.len() == k {
            out.push(current.clone());
            return;
        }
        for i in start..=n {
            current.push(id(i));
            go(i + 1, n, k, current, out);
            current.pop();
        }
    }
    let mut out = Vec::new();
    go(1, n, k, &mut Vec::new(), &mut out);
    out
}
