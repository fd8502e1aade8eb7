//! Splits a generated markdown document into `##` sections.

use serde::Serialize;

pub const UNTITLED_SECTION: &str = "Untitled Section";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    /// Introduced by a `##` heading.
    Headed,
    /// Text before the first heading, or a document with no headings.
    Preamble,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    pub body: String,
    pub kind: SectionKind,
}

impl Section {
    fn headed(title: String, body: &str) -> Self {
        let title = if title.is_empty() { UNTITLED_SECTION.to_string() } else { title };
        Self { title, body: body.trim().to_string(), kind: SectionKind::Headed }
    }

    fn preamble(body: &str) -> Self {
        let body = body.trim();
        Self { title: fallback_title(body), body: body.to_string(), kind: SectionKind::Preamble }
    }
}

/// Returns the title of a second-level heading line.
///
/// Deeper headings (`###`) belong to the enclosing section. Stray `#`
/// characters between the marker and the text, and closing `#` runs,
/// are not part of the title.
fn heading_title(line: &str) -> Option<String> {
    let trimmed = line.trim();
    let rest = trimmed.strip_prefix("##")?;
    if rest.starts_with('#') {
        return None;
    }
    let title = rest
        .trim_start_matches(|c: char| c == '#' || c.is_whitespace())
        .trim_end_matches(|c: char| c == '#' || c.is_whitespace());
    Some(title.to_string())
}

fn fallback_title(text: &str) -> String {
    text.lines()
        .map(|l| l.trim().trim_start_matches('#').trim())
        .find(|l| !l.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| UNTITLED_SECTION.to_string())
}

/// Parses `document` into sections in document order.
///
/// An empty (or whitespace-only) document yields no sections; callers treat
/// that as "no sections found".
pub fn parse_sections(document: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut preamble = String::new();
    let mut current: Option<(String, String)> = None;

    for line in document.lines() {
        if let Some(title) = heading_title(line) {
            match current.take() {
                Some((t, body)) => sections.push(Section::headed(t, &body)),
                None if !preamble.trim().is_empty() => sections.push(Section::preamble(&preamble)),
                None => {}
            }
            current = Some((title, String::new()));
            continue;
        }
        let target = match current.as_mut() {
            Some((_, body)) => body,
            None => &mut preamble,
        };
        target.push_str(line);
        target.push('\n');
    }

    match current {
        Some((t, body)) => sections.push(Section::headed(t, &body)),
        None if !preamble.trim().is_empty() => sections.push(Section::preamble(&preamble)),
        None => {}
    }
    sections
}
