//! Fibonacci membership: memoized sequence seeded 1, 1, extended on demand.

/// Memoized prefix of 1, 1, 2, 3, 5, 8, ... Only ever grows.
#[derive(Debug, Clone)]
pub struct FibonacciOracle {
    terms: Vec<u64>,
    /// Set once the next term would overflow `u64`; nothing larger can be a member.
    exhausted: bool,
}

impl Default for FibonacciOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl FibonacciOracle {
    pub fn new() -> Self {
        Self {
            terms: vec![1, 1],
            exhausted: false,
        }
    }

    /// Oracle whose prefix already reaches at least `bound`.
    #[cfg(test)]
    pub fn covering(bound: u64) -> Self {
        let mut oracle = Self::new();
        oracle.ensure_covers(bound);
        oracle
    }

    /// Extend until the latest term is >= `bound` (or `u64` runs out).
    pub fn ensure_covers(&mut self, bound: u64) {
        while !self.exhausted && self.largest() < bound {
            let n = self.terms.len();
            match self.terms[n - 1].checked_add(self.terms[n - 2]) {
                Some(next) => self.terms.push(next),
                None => self.exhausted = true,
            }
        }
    }

    /// Largest term generated so far.
    #[inline]
    pub fn largest(&self) -> u64 {
        self.terms[self.terms.len() - 1]
    }

    /// Exact membership; extends the prefix to `n` first.
    pub fn is_fibonacci(&mut self, n: u64) -> bool {
        self.ensure_covers(n);
        self.contains(n)
    }

    /// Membership against the current prefix only.
    pub fn contains(&self, n: u64) -> bool {
        self.terms.binary_search(&n).is_ok()
    }

    #[cfg(test)]
    pub fn terms(&self) -> &[u64] {
        &self.terms
    }
}
