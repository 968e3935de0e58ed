//! Reusable removal scenarios.
//!
//! - [`random_kill_list`]: a reproducible ascending removal list.
//! - [`kill_every`]: removes every n-th live particle.
//! - [`kill_where`]: removes live particles whose size matches a predicate.

use mote_container::ParticleContainer;
use mote_core::ParticleId;
use mote_math::ChaosKey;

use crate::StandardFields;

/// Ascending, duplicate-free removal list over `[0, live)`.
///
/// Each particle is picked with probability `rate`, driven by `seed`.
pub fn random_kill_list(live: u32, rate: f32, seed: u32) -> Vec<ParticleId> {
    let mut key = ChaosKey::new(seed);
    (0..live).filter(|_| key.rand_unorm() < rate).collect()
}

/// Remove every `n`-th live particle, starting with index 0.
pub fn kill_every(container: &mut ParticleContainer, n: u32) -> Vec<ParticleId> {
    let remove: Vec<ParticleId> = container.live_range().iter().step_by(n as usize).collect();
    container.remove_particles(&remove);
    remove
}

/// Remove live particles whose size satisfies `dead`.
///
/// Returns the number removed.
pub fn kill_where(
    container: &mut ParticleContainer,
    fields: &StandardFields,
    dead: impl Fn(f32) -> bool,
) -> usize {
    let remove: Vec<ParticleId> = {
        let sizes = container.read_stream(fields.size, 0.0);
        container
            .live_range()
            .iter()
            .filter(|&i| dead(sizes.load(i)))
            .collect()
    };
    container.remove_particles(&remove);
    remove.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{live_spawn_ids, TestPopulation};

    #[test]
    fn kill_list_is_sorted_and_reproducible() {
        let a = random_kill_list(500, 0.3, 11);
        let b = random_kill_list(500, 0.3, 11);
        assert_eq!(a, b);
        assert!(a.windows(2).all(|w| w[0] < w[1]));
        assert!(!a.is_empty() && a.len() < 500);
    }

    #[test]
    fn kill_where_removes_matching() {
        let (mut container, fields) = TestPopulation::new(20).build();
        let removed = kill_where(&mut container, &fields, |s| s >= 15.0);
        assert_eq!(removed, 5);
        let mut ids = live_spawn_ids(&container, &fields);
        ids.sort_unstable();
        assert_eq!(ids, (0..15).collect::<Vec<_>>());
    }

    #[test]
    fn kill_every_second() {
        let (mut container, _) = TestPopulation::new(10).build();
        let removed = kill_every(&mut container, 2);
        assert_eq!(removed, vec![0, 2, 4, 6, 8]);
        assert_eq!(container.live_count(), 5);
    }
}
