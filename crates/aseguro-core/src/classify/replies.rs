//! Seedable canned-reply selection

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Mutex;

/// Picks one reply out of a fixed set
pub struct ReplyPicker {
    rng: Mutex<StdRng>,
}

impl ReplyPicker {
    /// Deterministic when `seed` is set, entropy-seeded otherwise
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    pub fn pick(&self, replies: &[String]) -> Option<String> {
        let mut rng = match self.rng.lock() {
            Ok(rng) => rng,
            Err(poisoned) => poisoned.into_inner(),
        };
        replies.choose(&mut *rng).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let replies: Vec<String> = (0..10).map(|i| format!("r{}", i)).collect();
        let a = ReplyPicker::new(Some(7));
        let b = ReplyPicker::new(Some(7));
        for _ in 0..20 {
            assert_eq!(a.pick(&replies), b.pick(&replies));
        }
    }

    #[test]
    fn test_empty_set() {
        assert_eq!(ReplyPicker::new(None).pick(&[]), None);
    }
}
