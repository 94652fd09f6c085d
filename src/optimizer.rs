//! Group pruning and ranking
//!
//! Small groups are statistical noise. Of two groups whose url sets are in
//! a subset relation (a broad selector and a narrower one matching the
//! same links): only the one with the better context score survives.

use crate::group::EntryGroup;
use crate::paths::PathBuilder;
use crate::FastHashMap;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Score written into both fields of an occluded group.
pub const SCORE_CULLED: f64 = -65536.0;

/// Groups with this many entries or fewer are discarded.
const MIN_GROUP_SIZE: usize = 4;

/// Builds groups from aggregated paths and ranks them.
pub struct Optimizer {
    groups: Vec<EntryGroup>,
}

impl Optimizer {
    /// Merges paths with identical fingerprints into groups. Group order is
    /// path insertion order, which keeps the final ranking deterministic.
    pub fn new(builder: PathBuilder) -> Optimizer {
        let entries = builder.entries;
        let paths = builder.paths;
        let mut group_index: FastHashMap<BTreeSet<u64>, usize> = FastHashMap::default();
        let mut groups: Vec<EntryGroup> = Vec::new();

        for path in paths {
            if path.entries.is_empty() {
                continue;
            }
            let index = match group_index.get(path.fingerprint()) {
                Some(&existing) => existing,
                None => {
                    let snapshot = path.entries.iter().map(|&i| entries[i].clone()).collect();
                    let index = groups.len();
                    group_index.insert(path.fingerprint().clone(), index);
                    groups.push(EntryGroup::new(snapshot));
                    index
                }
            };
            groups[index].add_path(path);
        }

        log::debug!("formed {} candidate groups", groups.len());
        Optimizer { groups }
    }

    /// All groups sorted by `(score, cbg_score)` descending, untruncated.
    pub fn sort_groups(mut self) -> Vec<EntryGroup> {
        sort_by_rank(&mut self.groups);
        self.groups
    }

    /// The full treatment: prune, cull, rank, select.
    pub fn optimize(mut self) -> Vec<EntryGroup> {
        self.remove_small_groups(MIN_GROUP_SIZE);
        self.occlusion_culling();
        sort_by_rank(&mut self.groups);

        let positives = self.groups.iter().filter(|g| g.score > 0.0).count();
        if positives >= 4 {
            self.groups.retain(|g| g.score > 0.0);
            self.groups.truncate(8);
        } else {
            // nothing convincing on this page; keep the least bad four for
            // the caller to inspect
            self.groups.truncate(4);
        }
        self.groups
    }

    fn remove_small_groups(&mut self, threshold: usize) {
        let before = self.groups.len();
        self.groups.retain(|g| g.len() > threshold);
        log::debug!("pruned {} small groups", before - self.groups.len());
    }

    /// Pairwise over all still-positive groups: if one url set contains the
    /// other, the group with the smaller `cbg_score` is forced to the culled
    /// score. A culled group drops out of later pairs through the
    /// positivity guard.
    fn occlusion_culling(&mut self) {
        for a in 0..self.groups.len() {
            for b in a + 1..self.groups.len() {
                if self.groups[a].cbg_score <= 0.0 || self.groups[b].cbg_score <= 0.0 {
                    continue;
                }
                let a_only = self.groups[a]
                    .url_set
                    .difference(&self.groups[b].url_set)
                    .count();
                let b_only = self.groups[b]
                    .url_set
                    .difference(&self.groups[a].url_set)
                    .count();
                if a_only == 0 || b_only == 0 {
                    let culled = if self.groups[a].cbg_score < self.groups[b].cbg_score {
                        a
                    } else {
                        b
                    };
                    log::debug!(
                        "occlusion culled group with key {:?}",
                        self.groups[culled].paths.first().map(|p| p.key.as_str())
                    );
                    self.groups[culled].score = SCORE_CULLED;
                    self.groups[culled].cbg_score = SCORE_CULLED;
                }
            }
        }
    }
}

fn sort_by_rank(groups: &mut [EntryGroup]) {
    groups.sort_by(rank);
}

/// Descending by score, ties broken by cbg score; the sort is stable so
/// equal groups keep their insertion order.
fn rank(a: &EntryGroup, b: &EntryGroup) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then(b.cbg_score.total_cmp(&a.cbg_score))
}
