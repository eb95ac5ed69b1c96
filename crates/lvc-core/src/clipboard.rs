//! Plain-text rendering of reports for pasting into messaging apps.
//!
//! Reports arrive as Markdown. Chat apps don't render it, so before copying
//! the structural markers are rewritten into whitespace and glyphs and the
//! emphasis markers are dropped. The stored message is never touched.

use once_cell::sync::Lazy;
use regex::Regex;

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^### ").expect("valid heading pattern"));
static QUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^> ").expect("valid quote pattern"));
static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^- ").expect("valid bullet pattern"));

const BULLET_GLYPH: &str = "•  ";
const RULE: &str = "---";
const HEAVY_RULE: &str = "━━━━━━━━━━━━━━━";

/// Rewrite Markdown report text as plain text.
///
/// Structural markers go first so that stripping `*` can't eat into them.
pub fn to_plain_text(markdown: &str) -> String {
    let text = HEADING.replace_all(markdown, "\n");
    let text = QUOTE.replace_all(&text, "\n\n");
    let text = BULLET.replace_all(&text, BULLET_GLYPH);

    text.replace(RULE, HEAVY_RULE)
        .replace("**", "")
        .replace('*', "")
}
