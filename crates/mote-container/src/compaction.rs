//! Swap-to-end removal planning.
//!
//! Removing particles from the live range `[0, live)` must leave the
//! survivors packed at the front. Rather than shifting everything down,
//! each removed index below the new live count is filled with a survivor
//! taken from the tail. The plan is computed once per removal and then
//! replayed on every enabled slot, so planning cost does not scale with
//! the number of fields.
//!
//! ```text
//! live = 8, remove = [1, 3, 6]          new live = 5
//!
//! index:  0  1  2  3  4  5  6  7
//!            x     x        x           holes below 5: 1, 3
//!                                       tail survivors: 7, 5
//! moves:  7 -> 1, 5 -> 3
//! ```
//!
//! Each value moves at most once and the walk is `O(live + removed)`.

use mote_core::{ParticleId, INVALID_PARTICLE};

/// One element copy: `dst` takes the value at `src`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Move {
    pub(crate) src: u32,
    pub(crate) dst: u32,
}

/// Moves that compact `[0, live)` after a removal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CompactionPlan {
    pub(crate) moves: Vec<Move>,
    pub(crate) old_live: u32,
    pub(crate) new_live: u32,
}

impl CompactionPlan {
    /// Plan the removal of `remove` (ascending, unique, all `< live`).
    pub(crate) fn new(live: u32, remove: &[ParticleId]) -> Self {
        debug_assert!(
            remove.windows(2).all(|w| w[0] < w[1]),
            "removal list must be ascending and duplicate-free"
        );
        debug_assert!(
            remove.last().is_none_or(|&last| last < live),
            "removal index outside the live range"
        );

        let new_live = live - remove.len() as u32;
        let mut moves = Vec::new();
        let mut tail = live;
        let mut pending_tail = remove.len();

        for &hole in remove {
            if hole >= new_live {
                break;
            }
            // Walk down to the highest index that is not itself removed.
            loop {
                tail -= 1;
                if pending_tail > 0 && remove[pending_tail - 1] == tail {
                    pending_tail -= 1;
                    continue;
                }
                break;
            }
            moves.push(Move { src: tail, dst: hole });
        }

        Self {
            moves,
            old_live: live,
            new_live,
        }
    }

    /// Build the index permutation described by this plan.
    pub(crate) fn remap(&self, remove: &[ParticleId]) -> ParticleRemap {
        let mut old_to_new: Vec<ParticleId> = (0..self.old_live).collect();
        for &id in remove {
            old_to_new[id as usize] = INVALID_PARTICLE;
        }
        let mut new_to_old: Vec<ParticleId> = (0..self.new_live).collect();
        for m in &self.moves {
            old_to_new[m.src as usize] = m.dst;
            new_to_old[m.dst as usize] = m.src;
        }
        ParticleRemap {
            old_to_new,
            new_to_old,
        }
    }
}

/// How particle indices moved during one removal.
///
/// Both directions are explicit arrays: `old_to_new` has one entry per
/// particle that was live before the removal ([`INVALID_PARTICLE`] for
/// removed ones), `new_to_old` one entry per survivor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParticleRemap {
    old_to_new: Vec<ParticleId>,
    new_to_old: Vec<ParticleId>,
}

impl ParticleRemap {
    /// Current index of the particle formerly at `old`, or `None` if it
    /// was removed or `old` was not live.
    pub fn new_index(&self, old: ParticleId) -> Option<ParticleId> {
        self.old_to_new
            .get(old as usize)
            .copied()
            .filter(|&id| id != INVALID_PARTICLE)
    }

    /// Former index of the particle now at `new`.
    pub fn old_index(&self, new: ParticleId) -> Option<ParticleId> {
        self.new_to_old.get(new as usize).copied()
    }

    /// The forward map, indexed by old particle index.
    pub fn old_to_new(&self) -> &[ParticleId] {
        &self.old_to_new
    }

    /// The inverse map, indexed by new particle index.
    pub fn new_to_old(&self) -> &[ParticleId] {
        &self.new_to_old
    }

    /// Whether every survivor kept its index.
    pub fn is_identity(&self) -> bool {
        self.new_to_old
            .iter()
            .enumerate()
            .all(|(new, &old)| new as u32 == old)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(values: &[u32], plan: &CompactionPlan) -> Vec<u32> {
        let mut out = values.to_vec();
        for m in &plan.moves {
            out[m.dst as usize] = out[m.src as usize];
        }
        out.truncate(plan.new_live as usize);
        out
    }

    #[test]
    fn documented_example() {
        let plan = CompactionPlan::new(8, &[1, 3, 6]);
        assert_eq!(plan.new_live, 5);
        assert_eq!(
            plan.moves,
            vec![Move { src: 7, dst: 1 }, Move { src: 5, dst: 3 }]
        );
    }

    #[test]
    fn remove_all_moves_nothing() {
        let remove: Vec<u32> = (0..100).collect();
        let plan = CompactionPlan::new(100, &remove);
        assert_eq!(plan.new_live, 0);
        assert!(plan.moves.is_empty());
    }

    #[test]
    fn remove_tail_moves_nothing() {
        let plan = CompactionPlan::new(6, &[4, 5]);
        assert!(plan.moves.is_empty());
        assert!(plan.remap(&[4, 5]).is_identity());
    }

    #[test]
    fn empty_removal_is_noop() {
        let plan = CompactionPlan::new(10, &[]);
        assert_eq!(plan.new_live, 10);
        assert!(plan.moves.is_empty());
    }

    #[test]
    fn partial_removal_keeps_survivor_set() {
        let values = [10, 20, 30, 40, 50];
        let plan = CompactionPlan::new(5, &[1, 3]);
        let mut out = apply(&values, &plan);
        out.sort_unstable();
        assert_eq!(out, vec![10, 30, 50]);
    }

    #[test]
    fn remap_is_consistent_both_ways() {
        let remove = [0, 2, 7];
        let plan = CompactionPlan::new(9, &remove);
        let remap = plan.remap(&remove);
        assert_eq!(remap.new_index(0), None);
        assert_eq!(remap.new_index(9), None);
        for new in 0..plan.new_live {
            let old = remap.old_index(new).unwrap();
            assert_eq!(remap.new_index(old), Some(new));
        }
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_removal() -> impl Strategy<Value = (u32, Vec<u32>)> {
            (0u32..200).prop_flat_map(|live| {
                let ids = prop::collection::btree_set(0..live.max(1), 0..=live as usize);
                (Just(live), ids.prop_map(move |s| {
                    s.into_iter().filter(|&id| id < live).collect::<Vec<_>>()
                }))
            })
        }

        proptest! {
            #[test]
            fn survivors_keep_their_values((live, remove) in arb_removal()) {
                let values: Vec<u32> = (0..live).map(|i| i * 7 + 1).collect();
                let plan = CompactionPlan::new(live, &remove);
                let remap = plan.remap(&remove);
                let out = apply(&values, &plan);

                prop_assert_eq!(out.len() as u32, live - remove.len() as u32);
                for (new, value) in out.iter().enumerate() {
                    let old = remap.old_index(new as u32).unwrap();
                    prop_assert_eq!(*value, values[old as usize]);
                    prop_assert!(remove.binary_search(&old).is_err());
                }
            }

            #[test]
            fn each_source_moves_at_most_once((live, remove) in arb_removal()) {
                let plan = CompactionPlan::new(live, &remove);
                let mut srcs: Vec<_> = plan.moves.iter().map(|m| m.src).collect();
                srcs.sort_unstable();
                srcs.dedup();
                prop_assert_eq!(srcs.len(), plan.moves.len());
                for m in &plan.moves {
                    prop_assert!(m.src >= plan.new_live && m.dst < plan.new_live);
                }
            }
        }
    }
}
