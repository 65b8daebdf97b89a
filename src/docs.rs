//! Documentation formatting
//!
//! Service definitions carry HTML fragments; emitted code carries plain
//! doc comments. Anchor elements become `@see` references. Markup that
//! survives stripping is a hard error rather than leaking into output.

use lazy_static::lazy_static;
use regex::Regex;

use crate::{Error, Result};

/// hard-wrap column for multi-line doc comments
const WRAP_COLUMN: usize = 117;

lazy_static! {
    static ref TAG_GAP: Regex = Regex::new(r">\s+<").unwrap();
    static ref ANCHOR: Regex = Regex::new(r#"(?s)<a\s+href="([^"]*)"[^>]*>(.*?)</a>"#).unwrap();
}

/// Stripped documentation: plain-text lines plus extracted `(url, label)`
/// pairs in document order.
#[derive(Debug, Default)]
pub(crate) struct DocText {
    pub lines: Vec<String>,
    pub links: Vec<(String, String)>,
}

/// Strip an HTML documentation fragment to plain text.
pub(crate) fn strip(html: &str) -> Result<DocText> {
    let text = TAG_GAP.replace_all(html, "><").to_string();
    let text = text.replace("<p>", "").replace("</p>", "\n");

    let mut links = Vec::new();
    for caps in ANCHOR.captures_iter(&text) {
        links.push((caps[1].to_string(), caps[2].to_string()));
    }
    let text = ANCHOR.replace_all(&text, "$2").to_string();

    let text = text
        .replace("<code>", "`")
        .replace("</code>", "`")
        .replace("<i>", "*")
        .replace("</i>", "*")
        .replace("<b>", "**")
        .replace("</b>", "**")
        .replace("<a>", "")
        .replace("</a>", "");

    if let Some(pos) = text.find('<') {
        let residue: String = text[pos..].chars().take(40).collect();
        return Err(Error::UnsupportedDocumentation(residue));
    }

    let lines = text.lines().map(|l| l.trim().to_string()).collect();
    Ok(DocText { lines, links })
}

/// First non-empty line of the stripped documentation; the primary
/// description used for single-line summaries.
pub(crate) fn first_line(html: &str) -> Result<String> {
    let doc = strip(html)?;
    Ok(doc.lines.into_iter().find(|l| !l.is_empty()).unwrap_or_default())
}

/// Full documentation block: stripped text hard-wrapped at the doc
/// column, followed by one `@see` line per extracted link.
pub(crate) fn block(html: &str) -> Result<Vec<String>> {
    let doc = strip(html)?;
    let mut out = Vec::new();
    for line in doc.lines.iter().filter(|l| !l.is_empty()) {
        out.extend(wrap(line, WRAP_COLUMN));
    }
    for (url, _) in &doc.links {
        out.push(format!("@see {}", url));
    }
    Ok(out)
}

/// greedy word wrap; words longer than the column stand alone
fn wrap(line: &str, column: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > column {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}
