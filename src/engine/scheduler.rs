use rand::Rng;

use crate::catalog::WritingSystem;
use crate::store::score_store::{CharacterScores, MAX_SCORE};

/// Identity order, used for the first pass over a writing system that has
/// never been practiced.
pub fn initial_order(writing_system: &WritingSystem) -> Vec<usize> {
    (0..writing_system.len()).collect()
}

/// Every index once, followed by `score` extra copies of each index.
/// Index `i` ends up with `score[i] + 1` occurrences, the score capped at
/// `MAX_SCORE`.
pub fn weighted_pool(writing_system: &WritingSystem, scores: Option<&CharacterScores>) -> Vec<usize> {
    let mut pool = initial_order(writing_system);
    for (index, character) in writing_system.characters.iter().enumerate() {
        let score = scores
            .and_then(|s| s.get(character.id()))
            .copied()
            .unwrap_or(0)
            .min(MAX_SCORE);
        pool.extend(std::iter::repeat_n(index, score as usize));
    }
    pool
}

/// Weighted pool in a uniformly random permutation.
pub fn build_weighted_order<R: Rng>(
    writing_system: &WritingSystem,
    scores: Option<&CharacterScores>,
    rng: &mut R,
) -> Vec<usize> {
    let mut pool = weighted_pool(writing_system, scores);
    shuffle(&mut pool, rng);
    pool
}

/// Fisher–Yates: walk down from the last slot, swapping each with a
/// uniformly chosen slot at or below it.
pub fn shuffle<T, R: Rng>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// The order of one pass and the position within it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PracticeOrder {
    order: Vec<usize>,
    position: usize,
}

impl PracticeOrder {
    pub fn new(order: Vec<usize>) -> Self {
        Self { order, position: 0 }
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Character index at the current position.
    pub fn current(&self) -> Option<usize> {
        self.order.get(self.position).copied()
    }

    /// Step forward. Past the last slot, a new weighted order is built from
    /// the scores as they are now and the position restarts at 0.
    /// Returns true when a new pass began.
    pub fn advance<R: Rng>(
        &mut self,
        writing_system: &WritingSystem,
        scores: Option<&CharacterScores>,
        rng: &mut R,
    ) -> bool {
        if self.position + 1 < self.order.len() {
            self.position += 1;
            return false;
        }
        self.order = build_weighted_order(writing_system, scores, rng);
        self.position = 0;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn greek_upper() -> WritingSystem {
        let catalog = Catalog::embedded().unwrap();
        let (l, w) = catalog.find("el-GR", "Uppercase").unwrap();
        catalog.writing_system(l, w).unwrap().clone()
    }

    fn occurrences(order: &[usize], index: usize) -> usize {
        order.iter().filter(|&&i| i == index).count()
    }

    #[test]
    fn test_initial_order_is_identity() {
        let ws = greek_upper();
        let order = initial_order(&ws);
        assert_eq!(order, (0..ws.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_weighted_pool_multiplicities() {
        let ws = greek_upper();
        let mut scores = CharacterScores::new();
        scores.insert("beta".to_string(), 1);
        scores.insert("omega".to_string(), 3);

        let pool = weighted_pool(&ws, Some(&scores));
        assert_eq!(pool.len(), ws.len() + 4);
        assert_eq!(occurrences(&pool, ws.index_of("alpha").unwrap()), 1);
        assert_eq!(occurrences(&pool, ws.index_of("beta").unwrap()), 2);
        assert_eq!(occurrences(&pool, ws.index_of("omega").unwrap()), 4);
    }

    #[test]
    fn test_weighted_pool_caps_copies() {
        let ws = greek_upper();
        let mut scores = CharacterScores::new();
        scores.insert("alpha".to_string(), u32::MAX);

        let pool = weighted_pool(&ws, Some(&scores));
        let alpha = ws.index_of("alpha").unwrap();
        assert_eq!(occurrences(&pool, alpha), MAX_SCORE as usize + 1);
        assert_eq!(pool.len(), ws.len() + MAX_SCORE as usize);
    }

    #[test]
    fn test_weighted_order_without_scores_is_permutation() {
        let ws = greek_upper();
        let mut rng = SmallRng::seed_from_u64(7);
        let mut order = build_weighted_order(&ws, None, &mut rng);
        order.sort_unstable();
        assert_eq!(order, initial_order(&ws));
    }

    #[test]
    fn test_weighted_order_preserves_multiset() {
        let ws = greek_upper();
        let mut scores = CharacterScores::new();
        for (i, c) in ws.characters.iter().enumerate() {
            scores.insert(c.id().to_string(), (i % 4) as u32);
        }
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..20 {
            let order = build_weighted_order(&ws, Some(&scores), &mut rng);
            assert!(order.len() >= ws.len());
            for (i, c) in ws.characters.iter().enumerate() {
                assert_eq!(occurrences(&order, i), scores[c.id()] as usize + 1);
            }
        }
    }

    #[test]
    fn test_shuffle_is_roughly_uniform() {
        // Each of the 6 permutations of [0, 1, 2] should show up about 1/6 of the time.
        let mut rng = SmallRng::seed_from_u64(1234);
        let mut counts = std::collections::HashMap::new();
        let trials = 60_000;
        for _ in 0..trials {
            let mut items = [0, 1, 2];
            shuffle(&mut items, &mut rng);
            *counts.entry(items).or_insert(0usize) += 1;
        }
        assert_eq!(counts.len(), 6);
        for (perm, count) in counts {
            let share = count as f64 / trials as f64;
            assert!((share - 1.0 / 6.0).abs() < 0.01, "{perm:?} share {share}");
        }
    }

    #[test]
    fn test_shuffle_empty_and_single() {
        let mut rng = SmallRng::seed_from_u64(0);
        let mut empty: [usize; 0] = [];
        shuffle(&mut empty, &mut rng);
        let mut single = [9];
        shuffle(&mut single, &mut rng);
        assert_eq!(single, [9]);
    }

    #[test]
    fn test_advance_wraps_into_weighted_pass() {
        let ws = greek_upper();
        let mut rng = SmallRng::seed_from_u64(3);
        let mut practice = PracticeOrder::new(initial_order(&ws));

        for expected in 1..ws.len() {
            assert!(!practice.advance(&ws, None, &mut rng));
            assert_eq!(practice.position(), expected);
        }

        let mut scores = CharacterScores::new();
        scores.insert("alpha".to_string(), 2);
        assert!(practice.advance(&ws, Some(&scores), &mut rng));
        assert_eq!(practice.position(), 0);
        assert_eq!(practice.len(), ws.len() + 2);
        assert_eq!(occurrences(practice.order(), 0), 3);
    }
}
