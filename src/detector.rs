//! Detection façade
//!
//! Wires the pipeline together: annotate the tree, aggregate anchor paths,
//! form and rank groups. A run owns its document exclusively and mutates it
//! (scratch attributes, duplicate-id removal, class alignment): callers
//! that want to keep the original must pass a clone.

use crate::annotate::set_element_indices;
use crate::dom::Document;
use crate::group::EntryGroup;
use crate::optimizer::Optimizer;
use crate::paths::PathBuilder;

/// Detection options. Future options will default to preserving current
/// behaviour.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde_serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectorConfig {
    /// Skip pruning, occlusion culling and the positive filter; return all
    /// groups sorted by `(score, cbg_score)` descending.
    pub skip_optimization: bool,
}

/// The detector itself. Stateless between runs; one instance can serve any
/// number of documents, one at a time per document.
#[derive(Debug, Default, Clone)]
pub struct Detector {
    config: DetectorConfig,
}

impl Detector {
    pub fn new(config: DetectorConfig) -> Detector {
        Detector { config }
    }

    /// Runs detection over a document and returns the ranked groups.
    pub fn run(&self, doc: &mut Document) -> Vec<EntryGroup> {
        set_element_indices(doc);
        let builder = PathBuilder::build(doc);
        let optimizer = Optimizer::new(builder);
        let groups = if self.config.skip_optimization {
            optimizer.sort_groups()
        } else {
            optimizer.optimize()
        };
        log::debug!("detection finished with {} groups", groups.len());
        groups
    }
}

/// Convenience entry point with default options.
pub fn detect(doc: &mut Document) -> Vec<EntryGroup> {
    Detector::default().run(doc)
}
