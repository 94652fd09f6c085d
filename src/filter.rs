//! Optional pre-filter that strips article-body regions
//!
//! Detection works better on pages where the article text is gone and only
//! the navigational skeleton remains. This filter scores text containers
//! the readability way (comma density, text length, link density, class/id
//! vocabulary), finds the dominant ones, and removes their droppable
//! subtrees from the document, while explicitly keeping anything that
//! looks like a link list, since those are exactly the regions the
//! detector is after.
//!
//! All scoring happens on a working clone whose `<div>`s have been
//! normalised to paragraphs; only the final subtree removal touches the
//! real document. Node identity carries over because clones preserve node
//! ids; nodes created during normalisation are told apart by the arena
//! length at clone time.

use crate::dom::{Document, NodeId};
use crate::{FastHashMap, FastHashSet};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref UNLIKELY_CANDIDATES_RE: Regex = Regex::new(
        "(?i)combx|comment|community|disqus|extra|foot|header|menu|remark|rss|shoutbox\
         |sidebar|sponsor|ad-break|agegate|pagination|pager|popup|tweet|twitter"
    )
    .expect("hardcoded regex");
    static ref MAYBE_CANDIDATE_RE: Regex =
        Regex::new("(?i)and|article|body|column|main|shadow").expect("hardcoded regex");
    static ref POSITIVE_RE: Regex = Regex::new(
        "(?i)article|body|content|entry|hentry|main|page|pagination|post|text|blog|story"
    )
    .expect("hardcoded regex");
    static ref NEGATIVE_RE: Regex = Regex::new(
        "(?i)combx|comment|com-|contact|foot|footer|footnote|masthead|media|meta|outbrain\
         |promo|related|scroll|shoutbox|sidebar|sponsor|shopping|tags|tool|widget"
    )
    .expect("hardcoded regex");
    static ref CLEAN_LF_RE: Regex = Regex::new(r"\s*\n\s*").expect("hardcoded regex");
    static ref CLEAN_TAB_RE: Regex = Regex::new(r"\t|[ \t]{2,}").expect("hardcoded regex");
}

/// Block-level content; a `<div>` containing none of these is really a
/// paragraph.
const DIV_TO_P_TAGS: &[&str] = &[
    "a",
    "blockquote",
    "dl",
    "div",
    "img",
    "ol",
    "p",
    "pre",
    "table",
    "ul",
];

/// Options for the body-removal filter.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BodyRemovalConfig {
    /// Paragraphs shorter than this do not contribute to container scores.
    pub body_minimum_length: usize,
}

/// The filter itself. Run it on a document before detection to strip
/// article bodies.
#[derive(Debug, Default, Clone)]
pub struct BodyRemovalFilter {
    config: BodyRemovalConfig,
}

#[derive(Debug, Default, Copy, Clone)]
struct CandidateScore {
    score: f64,
    link_density: f64,
}

impl BodyRemovalFilter {
    pub fn new(config: BodyRemovalConfig) -> BodyRemovalFilter {
        BodyRemovalFilter { config }
    }

    /// Removes dominant article-text regions from `doc`.
    pub fn run(&self, doc: &mut Document) {
        let mut work = doc.clone();
        // nodes at or past this index are created below and have no
        // counterpart in the real document
        let boundary = work.node_count();

        remove_unlikely_candidates(&mut work);
        inappropriate_div_to_p(&mut work);

        let (scores, ordered) = self.score_paragraphs(&work);
        if scores.is_empty() {
            return;
        }
        let reduced = reduce_candidates(&work, &scores, &ordered, boundary);

        let mut keep: FastHashSet<NodeId> = FastHashSet::default();
        let mut done: FastHashSet<NodeId> = FastHashSet::default();
        let mut drop_list: Vec<NodeId> = Vec::new();
        for candidate in reduced {
            self.collect_keep_marks(&work, candidate, &scores, &mut keep, &mut done);
            if !keep.contains(&candidate) {
                collect_drop_list(&work, candidate, &keep, boundary, &mut drop_list);
            }
        }

        log::debug!("body removal drops {} subtrees", drop_list.len());
        for id in drop_list {
            doc.detach(id);
        }
    }

    /// Scores the parents and grandparents of every substantial paragraph.
    fn score_paragraphs(
        &self,
        work: &Document,
    ) -> (FastHashMap<NodeId, CandidateScore>, Vec<NodeId>) {
        let min_len = self.config.body_minimum_length;
        let mut scores: FastHashMap<NodeId, CandidateScore> = FastHashMap::default();
        let mut ordered: Vec<NodeId> = Vec::new();

        let paragraphs: Vec<NodeId> = work
            .descendants(work.root())
            .filter(|n| matches!(work.tag(*n), Some("p") | Some("pre")))
            .collect();

        for el in paragraphs {
            let Some(parent) = work.hierarchy[el].parent else {
                continue;
            };
            let grand_parent = work.hierarchy[parent].parent;

            let inner_text = clean_text(&work.text_content(el));
            let inner_len = inner_text.chars().count();
            if inner_len < min_len {
                continue;
            }

            if !scores.contains_key(&parent) {
                scores.insert(
                    parent,
                    CandidateScore {
                        score: score_node(work, parent),
                        link_density: 0.0,
                    },
                );
                ordered.push(parent);
            }
            if let Some(gp) = grand_parent {
                if !scores.contains_key(&gp) {
                    scores.insert(
                        gp,
                        CandidateScore {
                            score: score_node(work, gp),
                            link_density: 0.0,
                        },
                    );
                    ordered.push(gp);
                }
            }

            let score = 1.0 + score_text(&inner_text) + (inner_len as f64 / 100.0).min(3.0);
            if let Some(s) = scores.get_mut(&parent) {
                s.score += score;
            }
            if let Some(gp) = grand_parent {
                if let Some(s) = scores.get_mut(&gp) {
                    s.score += score / 2.0;
                }
            }
        }

        for el in &ordered {
            let density = link_density(work, *el);
            if let Some(s) = scores.get_mut(el) {
                s.link_density = density;
                s.score *= 1.0 - density;
            }
        }

        (scores, ordered)
    }

    /// Marks the subtrees of `element` that must survive the drop: headers
    /// that read like navigation, and containers that are really link
    /// lists.
    fn collect_keep_marks(
        &self,
        work: &Document,
        element: NodeId,
        scores: &FastHashMap<NodeId, CandidateScore>,
        keep: &mut FastHashSet<NodeId>,
        done: &mut FastHashSet<NodeId>,
    ) {
        let min_len = self.config.body_minimum_length;

        for header in work.subtree(element).filter(|n| {
            matches!(
                work.tag(*n),
                Some("h1") | Some("h2") | Some("h3") | Some("h4") | Some("h5") | Some("h6")
            )
        }) {
            if class_weight(work, header) < 0 || link_density(work, header) > 0.33 {
                keep.insert(header);
            }
        }

        let containers: Vec<NodeId> = work
            .subtree(element)
            .filter(|n| {
                matches!(
                    work.tag(*n),
                    Some("table") | Some("ul") | Some("div") | Some("p")
                )
            })
            .collect();

        for el in containers.into_iter().rev() {
            if !done.insert(el) {
                continue;
            }
            let tag = work.tag(el).unwrap_or("");
            let weight = class_weight(work, el);
            let score = scores.get(&el).map(|s| s.score).unwrap_or(0.0);

            if (weight as f64) + score < 0.0 {
                keep.insert(el);
            } else if score_text(&work.text_content(el)) < 10.0 {
                let p = count_tag(work, el, "p");
                let img = count_tag(work, el, "img");
                let li = count_tag(work, el, "li");
                let a = count_tag(work, el, "a");
                let embed = count_tag(work, el, "embed");
                let input = count_tag(work, el, "input")
                    - work
                        .descendants_by_tag(el, "input")
                        .filter(|i| work.attr(*i, "type") == Some("hidden"))
                        .count() as i64;

                let content_length = text_length(work, el);
                let density = link_density(work, el);
                let mut to_remove = if tag == "ul" || tag == "ol" {
                    li == a
                } else {
                    li - 100 > p
                };
                to_remove = to_remove
                    || (p > 0 && (img as f64) > 1.0 + (p as f64) * 1.3)
                    || ((input as f64) > (p as f64) / 3.0)
                    || (content_length < min_len && img == 0)
                    || (content_length < min_len && img > 2)
                    || (weight < 25 && density > 0.2)
                    || (weight >= 25 && density > 0.5)
                    || ((embed == 1 && content_length < 75) || embed > 1);
                if !to_remove && content_length == 0 {
                    to_remove = true;
                }
                if to_remove {
                    let target = work.ancestor_by_tag(el, "a").unwrap_or(el);
                    keep.insert(target);
                }
            } else if (tag == "ul" || tag == "ol")
                && count_tag(work, el, "li") == count_tag(work, el, "a")
            {
                let target = work.ancestor_by_tag(el, "a").unwrap_or(el);
                keep.insert(target);
            }
        }
    }
}

/// Drops elements whose class/id vocabulary screams boilerplate, unless a
/// maybe-word vouches for them.
fn remove_unlikely_candidates(work: &mut Document) {
    let elements: Vec<NodeId> = work
        .subtree(work.root())
        .filter(|n| work.is_element(*n))
        .collect();
    for el in elements {
        if !work.is_attached(el) {
            continue;
        }
        let s = format!(
            "{} {}",
            work.attr(el, "class").unwrap_or(""),
            work.attr(el, "id").unwrap_or("")
        );
        if s.len() >= 2
            && UNLIKELY_CANDIDATES_RE.is_match(&s)
            && !MAYBE_CANDIDATE_RE.is_match(&s)
            && !matches!(work.tag(el), Some("html") | Some("body"))
        {
            work.detach(el);
        }
    }
}

/// Turns block-free `<div>`s into `<p>`s and wraps stray text children of
/// the remaining `<div>`s in synthetic paragraphs, so paragraph scoring
/// sees them. Direct `<br>` children are dropped along the way.
fn inappropriate_div_to_p(work: &mut Document) {
    let divs: Vec<NodeId> = work.descendants_by_tag(work.root(), "div").collect();
    for div in divs {
        let has_block = work
            .descendants(div)
            .any(|d| matches!(work.tag(d), Some(t) if DIV_TO_P_TAGS.contains(&t)));
        if !has_block {
            work.set_tag(div, "p");
        }
    }

    let divs: Vec<NodeId> = work.descendants_by_tag(work.root(), "div").collect();
    for div in divs {
        let children: Vec<NodeId> = work.children(div).collect();
        for child in children {
            if work.is_element(child) {
                if work.tag(child) == Some("br") {
                    work.detach(child);
                }
            } else if !work.text_content(child).trim().is_empty() {
                let p = work.create_element("p");
                work.insert_before(child, p);
                work.detach(child);
                work.append_child(p, child);
            }
        }
    }
}

/// Keeps the best-scoring non-overlapping candidates.
fn reduce_candidates(
    work: &Document,
    scores: &FastHashMap<NodeId, CandidateScore>,
    ordered: &[NodeId],
    boundary: usize,
) -> Vec<NodeId> {
    let mut sorted: Vec<NodeId> = ordered
        .iter()
        .copied()
        .filter(|el| el.index() < boundary)
        .collect();
    sorted.sort_by(|a, b| {
        let sa = scores.get(a).map(|s| s.score).unwrap_or(0.0);
        let sb = scores.get(b).map(|s| s.score).unwrap_or(0.0);
        sb.total_cmp(&sa)
    });

    let mut reduced: Vec<NodeId> = Vec::new();
    let mut added: FastHashSet<NodeId> = FastHashSet::default();
    let mut denial: FastHashSet<NodeId> = FastHashSet::default();
    for el in sorted {
        let Some(s) = scores.get(&el) else {
            continue;
        };
        if s.score < 15.0 || s.link_density > 0.33 || denial.contains(&el) {
            continue;
        }
        if matches!(work.tag(el), Some("html") | Some("head") | Some("body")) {
            continue;
        }
        if work.ancestors(el).any(|a| added.contains(&a)) {
            continue;
        }
        reduced.push(el);
        added.insert(el);
        denial.insert(el);
        for ancestor in work.ancestors(el) {
            denial.insert(ancestor);
        }
    }
    reduced
}

/// Walks a candidate subtree and records the maximal droppable subtrees:
/// a node is droppable when nothing below it is marked to keep.
fn collect_drop_list(
    work: &Document,
    element: NodeId,
    keep: &FastHashSet<NodeId>,
    boundary: usize,
    drop_list: &mut Vec<NodeId>,
) -> bool {
    let mut drop = true;
    let mut sub_list: Vec<NodeId> = Vec::new();
    for child in work.element_children(element) {
        if child.index() >= boundary {
            continue;
        }
        if keep.contains(&child) {
            drop = false;
        } else {
            drop = collect_drop_list(work, child, keep, boundary, &mut sub_list) && drop;
        }
    }
    if drop && element.index() < boundary {
        drop_list.push(element);
    } else {
        drop_list.extend(sub_list);
    }
    drop
}

fn clean_text(text: &str) -> String {
    let text = CLEAN_LF_RE.replace_all(text, "\n");
    let text = CLEAN_TAB_RE.replace_all(&text, " ");
    text.trim().to_string()
}

fn text_length(doc: &Document, el: NodeId) -> usize {
    clean_text(&doc.text_content(el)).chars().count()
}

fn link_density(doc: &Document, el: NodeId) -> f64 {
    let mut link_length = 0usize;
    for a in doc.descendants_by_tag(el, "a") {
        link_length += text_length(doc, a);
    }
    link_length as f64 / text_length(doc, el).max(1) as f64
}

/// Comma density, the universal prose signal. The ideographic comma counts
/// half.
fn score_text(text: &str) -> f64 {
    let commas = text.matches(',').count() as f64;
    let ideographic = text.matches('\u{3001}').count() as f64;
    commas + ideographic / 2.0 + 1.0
}

fn class_weight(doc: &Document, el: NodeId) -> i32 {
    let mut weight = 0;
    for feature in [doc.attr(el, "class"), doc.attr(el, "id")] {
        if let Some(feature) = feature {
            if feature.is_empty() {
                continue;
            }
            if NEGATIVE_RE.is_match(feature) {
                weight -= 25;
            }
            if POSITIVE_RE.is_match(feature) {
                weight += 25;
            }
        }
    }
    weight
}

fn score_node(doc: &Document, el: NodeId) -> f64 {
    let mut score = class_weight(doc, el) as f64;
    score += match doc.tag(el) {
        Some("div") => 5.0,
        Some("pre") | Some("blockquote") => 3.0,
        Some("address") | Some("ol") | Some("ul") | Some("dl") | Some("dd") | Some("dt")
        | Some("li") | Some("td") | Some("form") => -3.0,
        Some("h1") | Some("h2") | Some("h3") | Some("h4") | Some("h5") | Some("h6")
        | Some("th") => -5.0,
        _ => 0.0,
    };
    score
}

fn count_tag(doc: &Document, el: NodeId, tag: &str) -> i64 {
    doc.descendants_by_tag(el, tag).count() as i64
}
