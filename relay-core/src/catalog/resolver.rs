//! Fuzzy model-id resolution against the catalog
//!
//! Resolution runs a fixed ladder: normalize, canonicalize, exact match,
//! fuzzy similarity, seeded random fallback. Steps 1-4 are deterministic;
//! the random step spreads load across capability-matched entries and draws
//! from a seedable RNG so tests can pin the sequence. Lock mode disables the
//! fuzzy and random steps entirely and returns the canonicalized id verbatim,
//! delegating unavailability to the upstream provider.

use crate::catalog::{canonical, ModelCatalog};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Similarity acceptance threshold, strict lower bound on a 0-1 scale
const FUZZY_THRESHOLD: f64 = 0.5;

/// Resolves requested model ids to concrete catalog ids
pub struct ModelResolver {
    catalog: Arc<ModelCatalog>,
    locked: bool,
    trace: bool,
    rng: Mutex<StdRng>,
}

impl ModelResolver {
    /// Create a resolver seeded from system entropy
    pub fn new(catalog: Arc<ModelCatalog>) -> Self {
        Self {
            catalog,
            locked: false,
            trace: false,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Create a resolver with a fixed seed for deterministic selection
    pub fn with_seed(catalog: Arc<ModelCatalog>, seed: u64) -> Self {
        Self {
            catalog,
            locked: false,
            trace: false,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Lock mode: disable fuzzy matching and random fallback
    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    /// Trace mode: emit per-step resolution logs
    pub fn traced(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Resolve a requested id to a concrete catalog id.
    ///
    /// Returns `None` only when the random fallback has nothing to draw from
    /// (empty catalog in unlocked mode).
    pub fn resolve(&self, requested: &str, required_capability: Option<&str>) -> Option<String> {
        let normalized = canonical::normalize(requested);
        let canonicalized = canonical::canonicalize(&normalized);
        if self.trace {
            debug!(%requested, %canonicalized, "resolving model id");
        }

        if let Some(entry) = self.catalog.get(&canonicalized) {
            if self.trace {
                debug!(id = %entry.id, "exact catalog match");
            }
            return Some(entry.id.clone());
        }

        if self.locked {
            if self.trace {
                debug!(id = %canonicalized, "lock mode: returning canonicalized id verbatim");
            }
            return Some(canonicalized);
        }

        if let Some(id) = self.fuzzy_match(&canonicalized) {
            return Some(id);
        }

        // One more fuzzy pass with the leading provider segment stripped
        if let Some((_, slug)) = canonicalized.split_once('/') {
            if let Some(id) = self.fuzzy_match(slug) {
                return Some(id);
            }
        }

        self.random_pick(required_capability)
    }

    /// Best similarity match over the catalog, accepted strictly above the
    /// threshold. Each entry scores as the better of its full id and its
    /// bare slug, so an unqualified request can still find a qualified entry.
    fn fuzzy_match(&self, requested: &str) -> Option<String> {
        let mut best: Option<(&str, f64)> = None;
        for entry in self.catalog.entries() {
            let mut score = similarity(requested, &entry.id);
            if let Some((_, slug)) = entry.id.split_once('/') {
                score = score.max(similarity(requested, slug));
            }
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((&entry.id, score));
            }
        }

        let (id, score) = best?;
        if self.trace {
            debug!(%requested, candidate = %id, score, "fuzzy match candidate");
        }
        (score > FUZZY_THRESHOLD).then(|| id.to_string())
    }

    /// Uniform random pick, restricted to capability-matched entries when any
    /// exist
    fn random_pick(&self, required_capability: Option<&str>) -> Option<String> {
        let pool = match required_capability {
            Some(capability) => {
                let filtered = self.catalog.with_capability(capability);
                if filtered.is_empty() {
                    self.catalog.entries().iter().collect()
                } else {
                    filtered
                }
            }
            None => self.catalog.entries().iter().collect::<Vec<_>>(),
        };

        if pool.is_empty() {
            return None;
        }

        let index = self
            .rng
            .lock()
            .expect("resolver RNG lock poisoned")
            .gen_range(0..pool.len());
        let id = pool[index].id.clone();
        if self.trace {
            debug!(%id, pool = pool.len(), "random fallback selection");
        }
        Some(id)
    }
}

/// Normalized Levenshtein similarity on a 0-1 scale
fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

/// Classic two-row Levenshtein distance over chars
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::caps;

    fn resolver() -> ModelResolver {
        ModelResolver::with_seed(Arc::new(ModelCatalog::default_set()), 42)
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", "abc"), 0);
    }

    #[test]
    fn similarity_is_symmetric_and_bounded() {
        let pairs = [("gpt-4o", "gpt-4o-mini"), ("a", "b"), ("", "x")];
        for (a, b) in pairs {
            let forward = similarity(a, b);
            let backward = similarity(b, a);
            assert!((forward - backward).abs() < f64::EPSILON);
            assert!((0.0..=1.0).contains(&forward));
        }
    }

    #[test]
    fn exact_match_wins_over_everything() {
        assert_eq!(
            resolver().resolve("openai/gpt-4o-mini", None),
            Some("openai/gpt-4o-mini".to_string())
        );
    }

    #[test]
    fn near_miss_resolves_by_similarity() {
        assert_eq!(
            resolver().resolve("openai/gpt-4o-minii", None),
            Some("openai/gpt-4o-mini".to_string())
        );
    }

    #[test]
    fn lock_mode_returns_canonicalized_verbatim() {
        let resolver = resolver().locked(true);
        assert_eq!(
            resolver.resolve("totally-unknown-model", None),
            Some("totally-unknown-model".to_string())
        );
        // canonicalization still applies under lock
        assert_eq!(
            resolver.resolve("gemini-2.5-flash:free", None),
            Some("google/gemini-2.5-flash".to_string())
        );
    }

    #[test]
    fn random_fallback_respects_capability_filter() {
        let resolver = resolver();
        for _ in 0..20 {
            let id = resolver
                .resolve("zzzzzzzzzzzzzzzzzzzzzzzz", Some(caps::IMAGE_OUTPUT))
                .unwrap();
            assert_eq!(id, "google/gemini-2.5-flash-image");
        }
    }

    #[test]
    fn empty_catalog_resolves_to_none() {
        let resolver = ModelResolver::with_seed(Arc::new(ModelCatalog::new(vec![])), 7);
        assert_eq!(resolver.resolve("zzzz-unknown", None), None);
    }
}
