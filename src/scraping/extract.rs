//! Per-page text extraction.
//!
//! Two tiers: the rendered visible text is the cheap common path; when it
//! comes back missing or suspiciously short we re-read the raw markup and
//! strip it down ourselves. Extraction never fails a page — the worst
//! outcome is an empty contribution.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::{debug, warn};

use super::session::SearchSession;

/// Visible text shorter than this is treated as "page did not really
/// render" and sent through the markup-strip fallback.
pub const MIN_MEANINGFUL_CHARS: usize = 100;

fn script_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("valid script pattern"))
}

fn style_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("valid style pattern"))
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid tag pattern"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace pattern"))
}

fn entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&(#x?[0-9a-fA-F]+|[a-zA-Z]+);").expect("valid entity pattern"))
}

/// Best-effort text for the current page.
pub async fn extract_page_text(session: &mut dyn SearchSession) -> String {
    match session.visible_text().await {
        Ok(text) => {
            let text = text.trim().to_string();
            if text.chars().count() > MIN_MEANINGFUL_CHARS {
                debug!(chars = text.len(), "extracted visible text");
                return text;
            }
            debug!(
                chars = text.len(),
                "low content from visible text, trying markup extraction"
            );
        }
        Err(e) => warn!("visible text extraction failed: {e}, trying markup extraction"),
    }

    match session.page_content().await {
        Ok(html) => {
            let text = strip_markup(&html);
            if text.chars().count() > MIN_MEANINGFUL_CHARS {
                debug!(chars = text.len(), "extracted text from markup");
            } else if !text.is_empty() {
                // A partial result still beats nothing.
                warn!(chars = text.len(), "very little content extracted");
            }
            text
        }
        Err(e) => {
            warn!("both extraction methods failed: {e}");
            String::new()
        }
    }
}

/// Reduce raw markup to readable text: drop script/style blocks, strip the
/// remaining tags, collapse whitespace runs, then decode entities.
pub fn strip_markup(html: &str) -> String {
    let no_scripts = script_re().replace_all(html, "");
    let no_styles = style_re().replace_all(&no_scripts, "");
    let no_tags = tag_re().replace_all(&no_styles, " ");
    let collapsed = whitespace_re().replace_all(&no_tags, " ");
    decode_entities(collapsed.trim())
}

/// Decode the named and numeric HTML entities that survive tag stripping.
fn decode_entities(text: &str) -> String {
    entity_re()
        .replace_all(text, |caps: &Captures<'_>| {
            let body = &caps[1];
            if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                return u32::from_str_radix(hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_else(|| caps[0].to_string());
            }
            if let Some(dec) = body.strip_prefix('#') {
                return dec
                    .parse::<u32>()
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_else(|| caps[0].to_string());
            }
            match body {
                "amp" => "&".to_string(),
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "quot" => "\"".to_string(),
                "apos" => "'".to_string(),
                "nbsp" => " ".to_string(),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_and_style_blocks() {
        let html = "<html><head><style>body { color: red; }</style>\
                    <script>\nvar x = '<div>';\n</script></head>\
                    <body><p>hello world</p></body></html>";
        assert_eq!(strip_markup(html), "hello world");
    }

    #[test]
    fn script_strip_is_non_greedy_across_blocks() {
        let html = "<script>a</script>keep<script>b</script>";
        assert_eq!(strip_markup(html), "keep");
    }

    #[test]
    fn collapses_whitespace_runs() {
        let html = "<div>  a \n\n b\t\tc  </div>";
        assert_eq!(strip_markup(html), "a b c");
    }

    #[test]
    fn decodes_common_entities() {
        let html = "<p>a &amp; b &lt;c&gt; &quot;d&quot; &#39;e&#39; &#x41;</p>";
        assert_eq!(strip_markup(html), "a & b <c> \"d\" 'e' A");
    }

    #[test]
    fn unknown_entities_pass_through() {
        assert_eq!(strip_markup("<p>&bogus; &amp;</p>"), "&bogus; &");
    }

    #[test]
    fn entities_decode_after_collapse() {
        // &nbsp; decodes to a literal space that is not re-collapsed,
        // matching decode-last ordering.
        assert_eq!(strip_markup("a&nbsp;&nbsp;b"), "a  b");
    }
}
