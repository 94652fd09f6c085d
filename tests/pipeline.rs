//! Filter + detection working together on an article-shaped page

use feed_detector::{detect, parse_document, BodyRemovalFilter};

fn article_page() -> String {
    let mut prose = String::new();
    for i in 0..8 {
        prose.push_str(&format!(
            "<p>Paragraph {}, with plenty of words, several commas, and enough \
             length, to look like real article prose, not like navigation, \
             because it keeps going, and going, and going for a while.</p>",
            i
        ));
    }
    let mut related = String::new();
    for i in 0..6 {
        related.push_str(&format!(
            "<li><a href=\"https://example.com/related/{}\">Related article headline {}</a></li>",
            i, i
        ));
    }
    format!(
        "<body><div class=\"article\">{}</div>\
         <ul class=\"related\">{}</ul></body>",
        prose, related
    )
}

#[test]
fn test_filter_then_detect_finds_the_related_list() {
    let mut doc = parse_document(&article_page()).unwrap();
    BodyRemovalFilter::default().run(&mut doc);
    // the article prose is gone before detection starts
    assert_eq!(doc.descendants_by_tag(doc.root(), "p").count(), 0);

    let groups = detect(&mut doc);
    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.entries.len(), 6);
    assert!(group.score > 0.0);
    assert!(group.entries.iter().all(|e| e.url.contains("/related/")));
}

#[test]
fn test_detection_alone_still_finds_the_list() {
    // the filter is optional; the detector copes with the prose in place
    let mut doc = parse_document(&article_page()).unwrap();
    let groups = detect(&mut doc);
    assert!(!groups.is_empty());
    assert!(groups[0].entries.iter().all(|e| e.url.contains("/related/")));
}
