use rand::Rng;
use serde::{Deserialize, Serialize};

/// Order in which an arpeggio walks its note pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArpPattern {
    #[default]
    Up,
    Down,
    #[serde(alias = "bounce")]
    UpDown,
    Random,
    /// Notes sound together; the caller decides timing
    Chord,
}

impl ArpPattern {
    pub fn name(&self) -> &'static str {
        match self {
            ArpPattern::Up => "up",
            ArpPattern::Down => "down",
            ArpPattern::UpDown => "updown",
            ArpPattern::Random => "random",
            ArpPattern::Chord => "chord",
        }
    }

    /// Unknown names play upward
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "down" => ArpPattern::Down,
            "updown" | "bounce" => ArpPattern::UpDown,
            "random" => ArpPattern::Random,
            "chord" => ArpPattern::Chord,
            _ => ArpPattern::Up,
        }
    }
}

/// Expand `pool` into exactly `steps` notes (`steps == 0` means one pass over the pool).
/// An empty pool yields nothing.
pub fn resolve_arp_sequence<T: Clone, R: Rng>(
    pool: &[T],
    steps: usize,
    pattern: ArpPattern,
    rng: &mut R,
) -> Vec<T> {
    if pool.is_empty() {
        return Vec::new();
    }
    let target = if steps == 0 { pool.len() } else { steps };

    match pattern {
        ArpPattern::Up | ArpPattern::Chord => pool.iter().cycle().take(target).cloned().collect(),
        ArpPattern::Down => pool.iter().rev().cycle().take(target).cloned().collect(),
        ArpPattern::UpDown => {
            // Ascend, then descend without repeating either end
            let inner = pool.len().saturating_sub(2);
            let cycle: Vec<&T> = pool
                .iter()
                .chain(pool.iter().rev().skip(1).take(inner))
                .collect();
            cycle.into_iter().cycle().take(target).cloned().collect()
        }
        ArpPattern::Random => (0..target)
            .map(|_| pool[rng.gen_range(0..pool.len())].clone())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn resolve(pool: &[char], steps: usize, pattern: ArpPattern) -> String {
        let mut rng = StdRng::seed_from_u64(7);
        resolve_arp_sequence(pool, steps, pattern, &mut rng)
            .into_iter()
            .collect()
    }

    #[test]
    fn test_up_cycles() {
        assert_eq!(resolve(&['A', 'B', 'C'], 5, ArpPattern::Up), "ABCAB");
    }

    #[test]
    fn test_down_cycles_reversed() {
        assert_eq!(resolve(&['A', 'B', 'C'], 5, ArpPattern::Down), "CBACB");
    }

    #[test]
    fn test_updown_skips_repeated_ends() {
        assert_eq!(resolve(&['A', 'B', 'C'], 5, ArpPattern::UpDown), "ABCBA");
        assert_eq!(resolve(&['A', 'B', 'C'], 6, ArpPattern::UpDown), "ABCBAB");
        assert_eq!(resolve(&['A', 'B', 'C', 'D'], 8, ArpPattern::UpDown), "ABCDCBAB");
        assert_eq!(resolve(&['A', 'B'], 4, ArpPattern::UpDown), "ABAB");
        assert_eq!(resolve(&['A'], 3, ArpPattern::UpDown), "AAA");
    }

    #[test]
    fn test_zero_steps_is_pool_length() {
        assert_eq!(resolve(&['A', 'B', 'C'], 0, ArpPattern::Up), "ABC");
        assert_eq!(resolve(&['A', 'B', 'C'], 0, ArpPattern::Chord), "ABC");
    }

    #[test]
    fn test_empty_pool() {
        assert_eq!(resolve(&[], 8, ArpPattern::Up), "");
        assert_eq!(resolve(&[], 8, ArpPattern::Random), "");
    }

    #[test]
    fn test_random_draws_from_pool() {
        let out = resolve(&['A', 'B', 'C'], 64, ArpPattern::Random);
        assert_eq!(out.len(), 64);
        assert!(out.chars().all(|c| "ABC".contains(c)));
    }

    #[test]
    fn test_pattern_names() {
        assert_eq!(ArpPattern::from_name("bounce"), ArpPattern::UpDown);
        assert_eq!(ArpPattern::from_name("DOWN"), ArpPattern::Down);
        assert_eq!(ArpPattern::from_name("sideways"), ArpPattern::Up);
    }
}
