//! Link classification: scheme gate and the ad/share/redirect deny list

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Anchors qualify when their raw `href` starts with an absolute
    /// HTTP(S) URL, optionally behind leading whitespace.
    pub static ref LINK_RE: Regex = Regex::new(r"(?i)^\s*https?://").expect("hardcoded regex");

    /// Well-known ad, share and redirect hosts, matched directly after the
    /// scheme. Part of the public contract: callers that need more must
    /// post-filter results.
    static ref DENY_RE: Regex = Regex::new(concat!(
        r"(?i)^(?:adclick\.g\.doubleclick\.net/",
        r"|googleads\.g\.doubleclick\.net/",
        r"|rd\.ane\.yahoo\.co\.jp/",
        r"|paid\.outbrain\.com/network/redir",
        r"|a\.popin\.cc/popin_redirect/",
        r"|click\.linksynergy\.com/",
        r"|www\.facebook\.com/sharer/sharer\.php",
        r"|twitter\.com/intent/tweet",
        r"|twitter\.com/share",
        r"|adserver\.adtechjp\.com/",
        r"|tg\.socdm\.com/rd",
        r"|s-adserver\.cxad\.cxense\.com/",
        r"|nkis\.nikkei\.com/pub_click/",
        r"|2ch-c\.net/",
        r"|dsp\.logly\.co\.jp/click\?ad=",
        r"|ac\.ebis\.ne\.jp/",
        r"|af\.moshimo\.com/",
        r"|tr\.adgocoo\.com/",
        r"|[^w][^.]+\.i-mobile\.co\.jp/",
        r"|[^.]+\.[^.]+\.impact-ad\.jp/",
        r")",
    ))
    .expect("hardcoded regex");
}

/// Whether the string is an `http(s)` URL that does not point at a denied
/// host. The deny list is applied to the remainder after the scheme match,
/// so `https://example.com/?u=twitter.com/share` stays valid.
pub fn is_valid_url(s: &str) -> bool {
    match LINK_RE.find(s) {
        Some(m) => !DENY_RE.is_match(&s[m.end()..]),
        None => false,
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_link_gate() {
        assert!(LINK_RE.is_match("https://example.com/"));
        assert!(LINK_RE.is_match("  http://example.com/a"));
        assert!(LINK_RE.is_match("HTTPS://EXAMPLE.COM/"));
        assert!(!LINK_RE.is_match("ftp://example.com/"));
        assert!(!LINK_RE.is_match("/relative/path"));
        assert!(!LINK_RE.is_match("mailto:a@example.com"));
        assert!(!LINK_RE.is_match(""));
    }

    #[test]
    fn test_deny_hosts() {
        assert!(!is_valid_url("https://twitter.com/share?url=x"));
        assert!(!is_valid_url("https://twitter.com/intent/tweet?text=y"));
        assert!(!is_valid_url("https://www.facebook.com/sharer/sharer.php?u=z"));
        assert!(!is_valid_url("http://adclick.g.doubleclick.net/pcs/click"));
        assert!(!is_valid_url("https://paid.outbrain.com/network/redir?p=1"));
        assert!(!is_valid_url("https://ad.i-mobile.co.jp/script"));
        assert!(!is_valid_url("https://x.y.impact-ad.jp/s"));
        assert!(is_valid_url("https://example.com/article/1"));
        // deny patterns only apply directly after the scheme
        assert!(is_valid_url("https://example.com/?next=twitter.com/share"));
        // www.i-mobile.co.jp itself is a regular site
        assert!(is_valid_url("https://www.i-mobile.co.jp/"));
    }
}
