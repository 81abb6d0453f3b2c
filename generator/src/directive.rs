//! Finds `@foreach`, `@if` and `@end` markers in a template and matches them
//! into a tree of [`Control`]s.
//!
//! Each marker has a line form, where the marker sits alone on its line and
//! the surrounding whitespace (including the line break) belongs to the
//! marker, and an inline form that only covers the marker text itself.

use crate::{
    expr::{Condition, ExprError},
    model::EntityKind,
};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::{fmt, ops::Range};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    If,
    Each(EntityKind),
}

impl ControlKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "if" => Some(Self::If),
            tag => EntityKind::from_tag(tag).map(Self::Each),
        }
    }

    pub const fn tag(self) -> &'static str {
        match self {
            Self::If => "if",
            Self::Each(kind) => kind.tag(),
        }
    }
}

impl fmt::Display for ControlKind {
    #[inline(always)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A matched open/close directive pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub kind: ControlKind,
    pub condition: Option<Condition>,
    /// Byte span of the open marker.
    pub open: Range<usize>,
    /// Byte span of the close marker.
    pub close: Range<usize>,
    /// 1-based line of the open marker.
    pub line: usize,
    pub children: Vec<Control>,
}

impl Control {
    /// This control followed by all of its descendants, depth first.
    pub fn walk(&self) -> Vec<&Self> {
        std::iter::once(self)
            .chain(self.children.iter().flat_map(Self::walk))
            .collect()
    }
}

/// A template with its directive tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template<'t> {
    pub text: &'t str,
    pub controls: Vec<Control>,
}

impl<'t> Template<'t> {
    #[inline(always)]
    pub fn parse(text: &'t str) -> Result<Self, ParseError> {
        parse(text)
    }

    pub fn controls(&self) -> impl Iterator<Item=&Control> + '_ {
        self.controls.iter().flat_map(Control::walk)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: `@end {found}` closes `{expected}` opened at line {opened}")]
    Mismatched {
        expected: String,
        found: String,
        line: usize,
        opened: usize,
    },
    #[error("line {line}: `@end {found}` has no matching open directive")]
    UnexpectedEnd { found: String, line: usize },
    #[error("line {line}: `{kind}` is never closed")]
    Unclosed { kind: String, line: usize },
    #[error("line {line}: unknown directive kind `{kind}`")]
    UnknownKind { kind: String, line: usize },
    #[error("line {line}: {source}")]
    Condition {
        line: usize,
        #[source]
        source: ExprError,
    },
}

static_regex! {
    FOREACH_MARKER = r"(?m)(^\s*@foreach\s+([a-z]+)(\s+where\((.*)\))?\s*^)|(@foreach ([a-z]+)(\s+where\((.*)\))?\b)",
    IF_MARKER = r"(?m)(^\s*@if\((.*)\)\s*^)|(@if\((.*)\))",
    END_MARKER = r"(?m)(^\s*@end\s+([a-z]+)\s*^)|(@end ([a-z]+)\b)",
}

#[derive(Debug, Clone, Copy)]
enum MarkerKind<'t> {
    Open {
        tag: &'t str,
        condition: Option<&'t str>,
    },
    Close {
        tag: &'t str,
    },
}

#[derive(Debug, Clone)]
struct Marker<'t> {
    span: Range<usize>,
    /// Offset of the `@`.
    at: usize,
    kind: MarkerKind<'t>,
}

/// 1-based line number of a byte offset.
pub(crate) fn line_of(text: &str, offset: usize) -> usize {
    text.as_bytes()[..offset.min(text.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count() + 1
}

fn group<'t>(caps: &Captures<'t>, line_form: usize, inline_form: usize) -> Option<&'t str> {
    caps.get(line_form)
        .or_else(|| caps.get(inline_form))
        .map(|m| m.as_str())
}

fn markers(text: &str) -> Vec<Marker<'_>> {
    let marker = |caps: &Captures<'_>| {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let at = text[whole.clone()].find('@').map_or(whole.start, |i| whole.start + i);
        (whole, at)
    };
    let opens = FOREACH_MARKER.captures_iter(text)
        .map(|caps| {
            let (span, at) = marker(&caps);
            let kind = MarkerKind::Open {
                tag: group(&caps, 2, 6).unwrap_or_default(),
                condition: group(&caps, 4, 8),
            };
            Marker { span, at, kind }
        });
    let ifs = IF_MARKER.captures_iter(text)
        .map(|caps| {
            let (span, at) = marker(&caps);
            let kind = MarkerKind::Open {
                tag: "if",
                condition: group(&caps, 2, 4),
            };
            Marker { span, at, kind }
        });
    let ends = END_MARKER.captures_iter(text)
        .map(|caps| {
            let (span, at) = marker(&caps);
            let kind = MarkerKind::Close {
                tag: group(&caps, 2, 4).unwrap_or_default(),
            };
            Marker { span, at, kind }
        });
    opens.chain(ifs)
        .chain(ends)
        .sorted_by_key(|m| (m.span.start, m.at))
        .collect()
}

struct OpenControl {
    kind: ControlKind,
    condition: Option<Condition>,
    open: Range<usize>,
    line: usize,
    children: Vec<Control>,
}

/// Parses the directive structure of `text`.
pub fn parse(text: &str) -> Result<Template<'_>, ParseError> {
    let mut stack: Vec<OpenControl> = Vec::new();
    let mut controls = Vec::new();
    for marker in markers(text) {
        let line = line_of(text, marker.at);
        match marker.kind {
            MarkerKind::Open { tag, condition } => {
                let kind = ControlKind::from_tag(tag).ok_or_else(|| ParseError::UnknownKind {
                    kind: tag.to_owned(),
                    line,
                })?;
                let condition = condition
                    .map(Condition::parse)
                    .transpose()
                    .map_err(|source| ParseError::Condition { line, source })?;
                trace!("line {}: open `{}`", line, kind);
                stack.push(OpenControl {
                    kind,
                    condition,
                    open: marker.span,
                    line,
                    children: Vec::new(),
                });
            },
            MarkerKind::Close { tag } => {
                let open = stack.pop().ok_or_else(|| ParseError::UnexpectedEnd {
                    found: tag.to_owned(),
                    line,
                })?;
                if open.kind.tag() != tag {
                    return Err(ParseError::Mismatched {
                        expected: open.kind.tag().to_owned(),
                        found: tag.to_owned(),
                        line,
                        opened: open.line,
                    });
                }
                let control = Control {
                    kind: open.kind,
                    condition: open.condition,
                    open: open.open,
                    close: marker.span,
                    line: open.line,
                    children: open.children,
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(control),
                    None => controls.push(control),
                }
            },
        }
    }
    if let Some(open) = stack.pop() {
        return Err(ParseError::Unclosed {
            kind: open.kind.tag().to_owned(),
            line: open.line,
        });
    }
    debug!("parsed {} top-level directives", controls.len());
    Ok(Template { text, controls })
}
