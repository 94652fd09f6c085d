//! Heuristic detection of repeating link-list regions in HTML documents
//!
//! Given a parsed document, the detector returns a ranked set of candidate
//! groups, each a coherent collection of anchors sharing structural context:
//! the blocks a reader would recognise as an index of articles, a
//! navigation of posts or a product listing.
//!
//! ```no_run
//! use feed_detector::{detect, parse_document};
//!
//! let html = std::fs::read_to_string("page.html").unwrap();
//! let mut doc = parse_document(&html).unwrap();
//! for group in detect(&mut doc) {
//!     println!("{} entries, score {}", group.entries.len(), group.score);
//! }
//! ```
//!
//! Detection mutates the document (scratch attributes, duplicate-id
//! removal, class alignment): pass a `clone()` when the original matters.

/// Arena DOM: node ids, hierarchy, payloads, iterators
pub mod dom;
/// Lenient `xmlparser`-based HTML reader
pub mod html;
/// Pre-pass: sibling indices, spanned tables, class alignment
pub mod annotate;
/// Link scheme gate and deny list
pub mod url;
/// Per-anchor entries: titles, scores, selector enumeration
pub mod entry;
/// Context-based grouping and path aggregation
pub mod paths;
/// Group scoring
pub mod group;
/// Group pruning and ranking
pub mod optimizer;
/// Detection façade and configuration
pub mod detector;
/// Optional pre-filter that strips article-body regions
pub mod filter;
/// Human-readable and JSON output of detection results
pub mod formatter;

pub use crate::detector::{detect, Detector, DetectorConfig};
pub use crate::dom::{Document, NodeId};
pub use crate::entry::Entry;
pub use crate::filter::{BodyRemovalConfig, BodyRemovalFilter};
pub use crate::group::EntryGroup;
pub use crate::html::{parse_document, HtmlParseError};
pub use crate::paths::Path;

#[cfg(feature = "faster-hashing")]
use core::hash::BuildHasherDefault;

// Typedef for possible faster implementation of hashing
#[cfg(not(feature = "faster-hashing"))]
pub type FastHashMap<T, U> = std::collections::HashMap<T, U>;
#[cfg(feature = "faster-hashing")]
pub type FastHashMap<T, U> =
    std::collections::HashMap<T, U, BuildHasherDefault<twox_hash::XxHash64>>;

#[cfg(not(feature = "faster-hashing"))]
pub type FastHashSet<T> = std::collections::HashSet<T>;
#[cfg(feature = "faster-hashing")]
pub type FastHashSet<T> = std::collections::HashSet<T, BuildHasherDefault<twox_hash::XxHash64>>;
