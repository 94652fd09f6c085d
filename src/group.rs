//! Group scoring
//!
//! A group is one candidate "feed-like" region: all entries sharing a path
//! fingerprint. Its score starts as the sum of the entry scores and is then
//! damped by three signals: duplicated urls/titles inside the group,
//! non-uniform ancestor chains, and dispersion across context groups.

use crate::entry::Entry;
use crate::paths::Path;
use crate::FastHashMap;
use std::collections::BTreeSet;

pub const SCORE_DUP_URL: i32 = -4; // penalty of url duplication (but not title)
pub const SCORE_DUP_TITLE: i32 = -1; // penalty of title duplication (but not url)
pub const SCORE_DUP_KEY: i32 = -6; // penalty of url and title duplication

/// A ranked candidate region.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde_serialization", derive(serde::Serialize))]
pub struct EntryGroup {
    /// Duplication- and uniformity-adjusted sum of the entry scores.
    pub score: f64,
    /// `score` additionally damped by context-group dispersion.
    pub cbg_score: f64,
    /// Snapshot of the fingerprint's entries, in document order.
    pub entries: Vec<Entry>,
    /// Every path that collected exactly these entries.
    pub paths: Vec<Path>,
    /// The distinct entry urls, used for occlusion culling.
    pub url_set: BTreeSet<String>,
}

impl EntryGroup {
    pub(crate) fn new(entries: Vec<Entry>) -> EntryGroup {
        debug_assert!(!entries.is_empty(), "group entries must not be empty");
        let url_set: BTreeSet<String> = entries.iter().map(|e| e.url.clone()).collect();
        let mut group = EntryGroup {
            score: entries.iter().map(|e| e.score as f64).sum(),
            cbg_score: 0.0,
            entries,
            paths: Vec::new(),
            url_set,
        };
        group.score_duplication();
        group.score_fullpath();
        group.cbg_score = group.score_cbg();
        group
    }

    pub(crate) fn add_path(&mut self, path: Path) {
        self.paths.push(path);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A repeated (title, url) pair costs the most; repeating only the url
    /// (same target, different text) still hurts, repeating only the title
    /// barely matters.
    fn score_duplication(&mut self) {
        let mut keys: BTreeSet<(&str, &str)> = BTreeSet::new();
        let mut urls: BTreeSet<&str> = BTreeSet::new();
        let mut titles: BTreeSet<&str> = BTreeSet::new();
        let mut penalty = 0i64;
        for entry in &self.entries {
            let key = (entry.title.as_str(), entry.url.as_str());
            if keys.contains(&key) {
                penalty += SCORE_DUP_KEY as i64;
            } else if urls.contains(entry.url.as_str()) {
                penalty += SCORE_DUP_URL as i64;
            } else if titles.contains(entry.title.as_str()) {
                penalty += SCORE_DUP_TITLE as i64;
            }
            keys.insert(key);
            urls.insert(&entry.url);
            titles.insert(&entry.title);
        }
        self.score += penalty as f64;
    }

    /// Entries of one real listing share a single ancestor-chain shape. If
    /// more than one distinct fullpath repeats, the region is a mixture.
    fn score_fullpath(&mut self) {
        let mut counts: FastHashMap<&str, usize> = FastHashMap::default();
        for entry in &self.entries {
            *counts.entry(entry.fullpath.as_str()).or_insert(0) += 1;
        }
        let repeated = counts.values().filter(|&&v| v > 1).count();
        if repeated > 1 {
            self.score /= repeated as f64 * 0.9;
        }
    }

    /// Entries scattered over k context groups are damped k−1 times: a
    /// positive score shrinks (×0.6), a negative one sinks further (×1.5).
    fn score_cbg(&self) -> f64 {
        let distinct: BTreeSet<usize> = self.entries.iter().map(|e| e.cbg_id).collect();
        let scale = if self.score > 0.0 { 0.6 } else { 1.5 };
        let mut score = self.score;
        for _ in 1..distinct.len() {
            score *= scale;
        }
        score
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::dom::NodeId;
    use crate::entry::{SCORE_IMG, SCORE_LINK};

    fn entry(title: &str, url: &str, cbg_id: usize, score: i32, fullpath: &str) -> Entry {
        Entry {
            score,
            cbg_id,
            element: NodeId::new(0),
            url: url.to_string(),
            title: title.to_string(),
            paths: Vec::new(),
            fullpath: fullpath.to_string(),
        }
    }

    fn plain(i: usize) -> Entry {
        entry(
            &format!("Article number {}", i),
            &format!("https://example.com/{}", i),
            1,
            SCORE_LINK,
            "html>body>ul>li>a",
        )
    }

    #[test]
    fn test_plain_sum() {
        let group = EntryGroup::new((0..5).map(plain).collect());
        assert_eq!(group.score, 10.0);
        assert_eq!(group.cbg_score, 10.0);
        assert_eq!(group.url_set.len(), 5);
    }

    #[test]
    fn test_url_duplication_penalty() {
        // five different titles all pointing at the same url:
        // 2×5 + 4×(−4) = −6
        let entries = (0..5)
            .map(|i| {
                entry(
                    &format!("Article number {}", i),
                    "https://example.com/x",
                    1,
                    SCORE_LINK,
                    "html>body>ul>li>a",
                )
            })
            .collect();
        let group = EntryGroup::new(entries);
        assert_eq!(group.score, -6.0);
    }

    #[test]
    fn test_key_duplication_penalty() {
        // the same (title, url) twice: 2×2 − 6 = −2
        let entries = vec![plain(1), plain(1)];
        let group = EntryGroup::new(entries);
        assert_eq!(group.score, -2.0);
    }

    #[test]
    fn test_title_duplication_penalty() {
        // same title, different urls: 2×2 − 1 = 3
        let entries = vec![
            entry(
                "Duplicate title",
                "https://example.com/1",
                1,
                SCORE_LINK,
                "html>body>ul>li>a",
            ),
            entry(
                "Duplicate title",
                "https://example.com/2",
                1,
                SCORE_LINK,
                "html>body>ul>li>a",
            ),
        ];
        let group = EntryGroup::new(entries);
        assert_eq!(group.score, 3.0);
    }

    #[test]
    fn test_fullpath_mixture_division() {
        // two fullpath values each occurring twice: 8 / (2 × 0.9)
        let entries = vec![
            entry("First article", "https://example.com/1", 1, SCORE_LINK, "p1"),
            entry("Second article", "https://example.com/2", 1, SCORE_LINK, "p1"),
            entry("Third article", "https://example.com/3", 1, SCORE_LINK, "p2"),
            entry("Fourth article", "https://example.com/4", 1, SCORE_LINK, "p2"),
        ];
        let group = EntryGroup::new(entries);
        assert_eq!(group.score, 8.0 / (2.0 * 0.9));
    }

    #[test]
    fn test_single_repeated_fullpath_is_fine() {
        // one repeating fullpath value is the normal case, no division
        let entries = vec![
            entry("First article", "https://example.com/1", 1, SCORE_LINK, "p1"),
            entry("Second article", "https://example.com/2", 1, SCORE_LINK, "p1"),
            entry("Third article", "https://example.com/3", 1, SCORE_LINK, "p2"),
        ];
        let group = EntryGroup::new(entries);
        assert_eq!(group.score, 6.0);
    }

    #[test]
    fn test_cbg_dispersion_damps_positive_scores() {
        let entries = vec![
            entry("First article", "https://example.com/1", 1, SCORE_LINK, "p"),
            entry("Second article", "https://example.com/2", 2, SCORE_LINK, "p"),
            entry("Third article", "https://example.com/3", 3, SCORE_LINK, "p"),
        ];
        let group = EntryGroup::new(entries);
        assert_eq!(group.score, 6.0);
        assert_eq!(group.cbg_score, 6.0 * 0.6 * 0.6);
    }

    #[test]
    fn test_cbg_dispersion_amplifies_negative_scores() {
        let entries = vec![
            entry("", "https://example.com/1", 1, -2, "p"),
            entry("", "https://example.com/2", 2, -2, "p"),
        ];
        let group = EntryGroup::new(entries);
        // titles are equal ("" twice): −4 − 1 = −5, then ×1.5 once
        assert_eq!(group.score, -5.0);
        assert_eq!(group.cbg_score, -7.5);
    }

    #[test]
    fn test_image_entries_stay_positive() {
        let entries: Vec<Entry> = (0..5)
            .map(|i| {
                entry(
                    &format!("Item {}", i),
                    &format!("https://example.com/{}", i),
                    1,
                    SCORE_IMG,
                    "html>body>ul>li>a",
                )
            })
            .collect();
        let group = EntryGroup::new(entries);
        assert_eq!(group.score, 5.0);
    }
}
