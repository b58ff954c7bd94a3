//! Iteration-stamped k-of-n intersection counting over posting lists.
//!
//! The pruner keeps a persistent scratch array instead of allocating a set
//! per call: marking `mem[id] = iteration` and bumping `iteration` between
//! calls invalidates stale marks without ever zeroing the scratch. Only when
//! the counter would reach its configured maximum is the array cleared and
//! the counter restarted. Each worker owns one pruner; it is never shared.

use std::collections::HashMap;

use crate::config::PrunerConfig;

/// Collision counter over posting lists with reusable scratch memory.
#[derive(Debug)]
pub struct QuickPruner {
    memory: Vec<u32>,
    iteration: u32,
    max_iteration: u32,
}

impl QuickPruner {
    /// The scratch must be sized past every article, term and category id.
    pub fn new(config: PrunerConfig) -> QuickPruner {
        QuickPruner {
            memory: vec![0; config.memory_size],
            iteration: 1,
            max_iteration: config.max_iteration.max(2),
        }
    }

    /// Counts, per article id, how many of the given posting lists contain
    /// it; ids seen in fewer than two lists are not reported. The caller
    /// applies its own `>= k` threshold. Correct regardless of how many
    /// prune calls preceded this one.
    pub fn prune(&mut self, lists: &[&[(u32, u32)]]) -> HashMap<u32, u32> {
        let mut collisions = HashMap::new();

        for list in lists {
            for &(id, _) in *list {
                let slot = id as usize;
                if slot >= self.memory.len() {
                    self.memory.resize(slot + 1, 0);
                }
                if self.memory[slot] == self.iteration {
                    *collisions.entry(id).or_insert(1) += 1;
                } else {
                    self.memory[slot] = self.iteration;
                }
            }
        }

        self.iteration += 1;
        if self.iteration == self.max_iteration {
            self.memory.fill(0);
            self.iteration = 1;
        }

        collisions
    }
}
