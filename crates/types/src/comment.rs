//! Structured, markup-free post bodies.
//!
//! Every view that shows a comment (thread, reply popup, catalog reply
//! preview) renders the segments produced here, and the reply tree reads
//! its cross-references from the same segments.

use serde::Serialize;

use crate::{post::PostNo, utils};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Segment {
    /// The post had no body at all.
    NoContent,
    /// The body was only markup or whitespace.
    EmptyReply,
    Paragraph(String),
    /// A `>` quoted line.
    Commentary(String),
    /// A `>>123` line pointing at another post.
    CrossReference { no: PostNo, text: String },
}

impl Segment {
    pub fn text(&self) -> &str {
        match self {
            Segment::NoContent => "No content",
            Segment::EmptyReply => ">>Reply",
            Segment::Paragraph(text) | Segment::Commentary(text) => text,
            Segment::CrossReference { text, .. } => text,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Segment::NoContent | Segment::EmptyReply)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Comment {
    segments: Vec<Segment>,
}

impl Comment {
    fn placeholder(segment: Segment) -> Self {
        Comment {
            segments: vec![segment],
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_placeholder(&self) -> bool {
        self.segments.iter().all(Segment::is_placeholder)
    }

    pub fn references(&self) -> impl Iterator<Item = PostNo> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::CrossReference { no, .. } => Some(*no),
            _ => None,
        })
    }

    /// Body text with one line per segment; empty for placeholders.
    pub fn plain_text(&self) -> String {
        if self.is_placeholder() {
            return String::new();
        }
        self.segments
            .iter()
            .map(Segment::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Short single-line excerpt without cross-reference lines.
    pub fn preview(&self, limit: usize) -> String {
        let text = self
            .segments
            .iter()
            .filter(|segment| !matches!(segment, Segment::CrossReference { .. }))
            .map(Segment::text)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        utils::truncate(&text, limit)
    }
}

pub fn sanitize(raw: Option<&str>) -> Comment {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Comment::placeholder(Segment::NoContent),
    };
    let text = utils::remove_html(raw);
    if text.trim().is_empty() {
        return Comment::placeholder(Segment::EmptyReply);
    }
    Comment {
        segments: text.split('\n').map(|line| classify(line.trim())).collect(),
    }
}

/// Classifies one trimmed line.
pub fn classify(line: &str) -> Segment {
    if let Some(rest) = line.strip_prefix(">>") {
        return match reference_target(rest) {
            Some(no) => Segment::CrossReference {
                no,
                text: line.to_string(),
            },
            None => Segment::Paragraph(line.to_string()),
        };
    }
    if line.starts_with('>') {
        return Segment::Commentary(line.to_string());
    }
    Segment::Paragraph(line.to_string())
}

// The digit run must start right after `>>` and must not run into letters.
fn reference_target(rest: &str) -> Option<PostNo> {
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    if rest[end..].chars().next().map_or(false, char::is_alphanumeric) {
        return None;
    }
    rest[..end].parse().ok()
}
