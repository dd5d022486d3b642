//! Wrapping glossary terms in rendered text with interactive markers.
//!
//! Only the first match of each term ID in one call is wrapped. In HTML mode
//! text inside `code`, `pre`, `a`, `script`, `style`, `kbd` and `samp` is
//! left alone.

use std::collections::{BTreeMap, HashSet};

use regex::{Captures, Regex};

use roadmap_shared::Result;

use crate::lookup::{LookupTable, bounded_pattern};

/// Elements whose text content is never wrapped.
pub const SKIP_TAGS: &[&str] = &["code", "pre", "a", "script", "style", "kbd", "samp"];

/// Escape `&`, `<`, `>` and `"` for HTML text.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Compiled alternation over every lookup key, longest first.
pub struct GlossaryLinker {
    pattern: Option<Regex>,
    ids: BTreeMap<String, String>,
}

impl GlossaryLinker {
    pub fn new(lookup: &LookupTable) -> Result<Self> {
        let mut keys: Vec<&str> = lookup.iter().map(|(key, _)| key).collect();
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let pattern = if keys.is_empty() {
            None
        } else {
            let alternatives = keys
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            Some(bounded_pattern(&alternatives)?)
        };

        let ids = lookup
            .iter()
            .map(|(k, id)| (k.to_string(), id.to_string()))
            .collect();
        Ok(Self { pattern, ids })
    }

    /// Escape plain text and wrap first occurrences.
    pub fn wrap_text(&self, text: &str) -> String {
        let escaped = escape_html(text);
        let mut wrapped = HashSet::new();
        self.wrap_segment(&escaped, &mut wrapped)
    }

    /// Wrap first occurrences in the text nodes of an HTML fragment.
    ///
    /// Tags are copied through unchanged. An unterminated `<` copies the
    /// rest of the input verbatim.
    pub fn wrap_html(&self, html: &str) -> String {
        let mut out = String::with_capacity(html.len());
        let mut wrapped = HashSet::new();
        let mut skip_depth = 0usize;
        let mut rest = html;

        while !rest.is_empty() {
            if let Some(inner) = rest.strip_prefix('<') {
                let Some(end) = inner.find('>') else {
                    out.push_str(rest);
                    break;
                };
                let tag = Tag::parse(&inner[..end]);
                if tag.is_skipped() {
                    match tag.kind {
                        TagKind::Open => skip_depth += 1,
                        TagKind::Close => skip_depth = skip_depth.saturating_sub(1),
                        TagKind::SelfClosing => {}
                    }
                }
                // '<' + inner + '>'
                let consumed = end + 2;
                out.push_str(&rest[..consumed]);
                rest = &rest[consumed..];
            } else {
                let end = rest.find('<').unwrap_or(rest.len());
                let text = &rest[..end];
                if skip_depth > 0 || text.trim().is_empty() {
                    out.push_str(text);
                } else {
                    out.push_str(&self.wrap_segment(text, &mut wrapped));
                }
                rest = &rest[end..];
            }
        }

        out
    }

    fn wrap_segment(&self, text: &str, wrapped: &mut HashSet<String>) -> String {
        let Some(pattern) = &self.pattern else {
            return text.to_string();
        };

        pattern
            .replace_all(text, |caps: &Captures| {
                let matched = &caps[0];
                match self.ids.get(&matched.to_lowercase()) {
                    Some(id) if wrapped.insert(id.clone()) => format!(
                        r#"<span class="glossary-link" data-term-id="{id}" role="button" tabindex="0">{matched}</span>"#
                    ),
                    _ => matched.to_string(),
                }
            })
            .into_owned()
    }
}

// ---------------------------------------------------------------------------
// Tag scanning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Open,
    Close,
    SelfClosing,
}

#[derive(Debug)]
struct Tag<'a> {
    name: &'a str,
    kind: TagKind,
}

impl<'a> Tag<'a> {
    /// Parse the text between `<` and `>`.
    fn parse(inner: &'a str) -> Self {
        let (kind, body) = if let Some(body) = inner.strip_prefix('/') {
            (TagKind::Close, body)
        } else if inner.trim_end().ends_with('/') {
            (TagKind::SelfClosing, inner)
        } else {
            (TagKind::Open, inner)
        };

        let name = body
            .trim_start()
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("");
        Self { name, kind }
    }

    fn is_skipped(&self) -> bool {
        SKIP_TAGS.iter().any(|t| t.eq_ignore_ascii_case(self.name))
    }
}
