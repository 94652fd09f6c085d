//! Per-anchor entries: title selection, scoring, selector enumeration

use crate::dom::{Document, NodeId, INDEX_ATTR};
use crate::url::is_valid_url;
use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

pub const SCORE_LINK: i32 = 2; // normal link
pub const SCORE_IMG: i32 = 1; // image link
pub const SCORE_DENY_URL: i32 = -6; // penalty of denied urls
pub const SCORE_NO_TITLE: i32 = -2; // link without text
pub const SCORE_LABEL: i32 = -1; // link text looks like a label
pub const SCORE_SHORT: i32 = 0; // link text is too short

/// A level never contributes more selector branches once the accumulators
/// hold this many candidate chains.
const MAX_CANDIDATE_PATHS: usize = 32;

lazy_static! {
    /// Titles shaped like `example.com/foo` or `index.html` - labels, not
    /// article titles.
    static ref LABEL_RE: Regex =
        Regex::new(r"^[-+?&=%:/~#\w]+\.[-+?&=%:/.~#\w]+$").expect("hardcoded regex");
}

/// One qualifying anchor together with everything the scorer needs to know
/// about it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde_serialization", derive(serde::Serialize))]
pub struct Entry {
    /// Base score, see the `SCORE_*` constants.
    pub score: i32,
    /// Context group this anchor belongs to.
    pub cbg_id: usize,
    /// The anchor element itself.
    pub element: NodeId,
    /// Trimmed `href`.
    pub url: String,
    /// Chosen display text (anchor text, `title` attribute, wrapper text or
    /// image alt/title, in that order of preference).
    pub title: String,
    /// Candidate selector chains, outermost segment first.
    pub paths: Vec<Vec<String>>,
    /// Canonical ancestor chain used for uniformity scoring.
    pub fullpath: String,
}

impl Entry {
    /// Builds the entry for `element`. `wrapper` is the surrounding `<li>`
    /// if the context walk registered one for this anchor.
    pub fn new(
        doc: &Document,
        element: NodeId,
        cbg_id: usize,
        wrapper: Option<NodeId>,
    ) -> Entry {
        let mut score = SCORE_LINK;
        let mut title = {
            let text = doc.text_content(element).trim().to_string();
            if text.is_empty() {
                doc.attr(element, "title").unwrap_or("").trim().to_string()
            } else {
                text
            }
        };
        let url = doc.attr(element, "href").unwrap_or("").trim().to_string();
        let fullpath = build_fullpath(doc, element);
        let paths = build_candidate_paths(doc, element);

        if let Some(wrapper) = wrapper {
            let wrapper_title = doc.text_content(wrapper).trim().to_string();
            if title.chars().count() < wrapper_title.chars().count() {
                title = wrapper_title;
            }
        }
        let mut from_image = false;
        if title.is_empty() {
            let mut longest = 0;
            for img in doc.descendants_by_tag(element, "img") {
                let alt = doc.attr(img, "alt").unwrap_or("").trim();
                let text = if alt.is_empty() {
                    doc.attr(img, "title").unwrap_or("").trim()
                } else {
                    alt
                };
                let len = text.chars().count();
                if len > longest {
                    title = text.to_string();
                    score = SCORE_IMG;
                    from_image = true;
                    longest = len;
                }
            }
        }

        if !is_valid_url(&url) {
            score = SCORE_DENY_URL;
        } else if title.is_empty() {
            score = SCORE_NO_TITLE;
        } else if !from_image {
            // image alts are labels by nature; the shortness ladder only
            // demotes real link text
            let shrunk = shrunk_title_len(&title);
            if shrunk <= 6 || LABEL_RE.is_match(&title) {
                score = SCORE_LABEL;
            } else if shrunk <= 8 {
                score = SCORE_SHORT;
            }
        }

        Entry {
            score,
            cbg_id,
            element,
            url,
            title,
            paths,
            fullpath,
        }
    }
}

/// Length of the title after NFKD normalization with ASCII controls,
/// punctuation and symbols removed. "Wow!!!" and "Wow" look equally short.
fn shrunk_title_len(title: &str) -> usize {
    title
        .nfkd()
        .filter(|c| !matches!(*c, '\u{0}'..='\u{2f}' | ':'..='@' | '['..='`' | '{'..='\u{7f}'))
        .count()
}

/// `tag[.sorted-classes]` for every ancestor from the root down, then the
/// bare anchor tag. An anchor's class may indicate click behaviour, so it is
/// not included.
fn build_fullpath(doc: &Document, element: NodeId) -> String {
    let mut ancestors: Vec<NodeId> = doc.ancestors(element).collect();
    ancestors.reverse();
    let mut parts: Vec<String> = Vec::with_capacity(ancestors.len() + 1);
    for ancestor in ancestors {
        let tag = doc.tag(ancestor).unwrap_or("");
        let mut classes: Vec<&str> = doc
            .attr(ancestor, "class")
            .unwrap_or("")
            .split_whitespace()
            .collect();
        classes.sort_unstable();
        if classes.is_empty() {
            parts.push(tag.to_string());
        } else {
            parts.push(format!("{}.{}", tag, classes.join(".")));
        }
    }
    parts.push(doc.tag(element).unwrap_or("").to_string());
    parts.join(">")
}

/// Enumerates the candidate selector chains for an anchor by walking to the
/// root with two accumulators: plain class/tag chains and chains containing
/// a `tag#id` segment. Id chains only ever grow by the fallback segment per
/// level, so they never multiply.
fn build_candidate_paths(doc: &Document, anchor: NodeId) -> Vec<Vec<String>> {
    let mut normal: Vec<Vec<String>> = Vec::new();
    let mut with_ids: Vec<Vec<String>> = Vec::new();

    let mut current = Some(anchor);
    while let Some(el) = current {
        push_level(doc, el, &mut normal, &mut with_ids);
        current = doc.hierarchy[el].parent;
    }

    normal.extend(with_ids);
    normal
}

fn push_level(
    doc: &Document,
    el: NodeId,
    normal: &mut Vec<Vec<String>>,
    with_ids: &mut Vec<Vec<String>>,
) {
    let tag = doc.tag(el).unwrap_or("");

    let mut ids: Option<Vec<Vec<String>>> = None;
    let mut segments: Vec<String>;

    if tag == "html" || tag == "body" {
        segments = vec![tag.to_string()];
    } else {
        // the anchor level itself (empty accumulator) never contributes an
        // id segment, and neither does any other anchor on the way up
        let tagid = if normal.is_empty() {
            ""
        } else {
            doc.attr(el, "id").unwrap_or("").trim()
        };
        if !tagid.is_empty() && tag != "a" {
            let xsel = format!("{}#{}", tag, tagid);
            ids = Some(
                normal
                    .iter()
                    .map(|suffix| prepend(xsel.clone(), suffix))
                    .collect(),
            );
        }

        // important class(es) tend to be put first
        segments = doc
            .attr(el, "class")
            .unwrap_or("")
            .split_whitespace()
            .take(2)
            .map(|c| format!("{}.{}", tag, c))
            .collect();
        if tag == "td" || tag == "th" {
            match doc.attr(el, INDEX_ATTR) {
                Some(idx) if !idx.is_empty() => {
                    segments = vec![format!("{}:nth-child({})", tag, idx)];
                }
                _ => segments.push(tag.to_string()),
            }
        } else {
            segments.push(tag.to_string());
        }
    }

    if normal.len() + with_ids.len() > MAX_CANDIDATE_PATHS {
        segments = vec![segments.pop().unwrap_or_else(|| tag.to_string())];
        ids = None;
    }

    *normal = if normal.is_empty() {
        segments.iter().map(|s| vec![s.clone()]).collect()
    } else {
        let mut crossed = Vec::with_capacity(segments.len() * normal.len());
        for segment in &segments {
            for suffix in normal.iter() {
                crossed.push(prepend(segment.clone(), suffix));
            }
        }
        crossed
    };

    if !with_ids.is_empty() {
        let fallback = segments[segments.len() - 1].clone();
        for chain in with_ids.iter_mut() {
            chain.insert(0, fallback.clone());
        }
    }
    if let Some(id_paths) = ids {
        with_ids.extend(id_paths);
    }
}

fn prepend(segment: String, suffix: &[String]) -> Vec<String> {
    let mut chain = Vec::with_capacity(suffix.len() + 1);
    chain.push(segment);
    chain.extend(suffix.iter().cloned());
    chain
}
