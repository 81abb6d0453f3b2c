//! `{placeholder}` substitution with `{{` / `}}` escapes.

use crate::model::Values;
use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::char,
    combinator::{map, value},
    multi::many0,
    sequence::delimited,
    IResult,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("unbound placeholder {{{0}}}")]
    Unbound(String),
    #[error("single '}}' encountered at offset {0}")]
    StrayClose(usize),
    #[error("malformed placeholder at offset {0}")]
    Malformed(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Field(&'a str),
}

pub(crate) fn parse_field_name(i: &str) -> IResult<&str, &str> {
    nom::bytes::complete::take_while1(|c: char| c == '_' || c.is_ascii_alphanumeric())(i)
}

fn parse_segment(i: &str) -> IResult<&str, Segment<'_>> {
    alt((
        value(Segment::Text("{"), tag("{{")),
        value(Segment::Text("}"), tag("}}")),
        map(delimited(char('{'), parse_field_name, char('}')), Segment::Field),
        map(is_not("{}"), Segment::Text),
    ))(i)
}

/// Splits `text` into literal runs and placeholder names.
pub fn segments(text: &str) -> Result<Vec<Segment<'_>>, FormatError> {
    let (rest, segments) = many0(parse_segment)(text)
        .map_err(|_| FormatError::Malformed(0))?;
    if rest.is_empty() {
        return Ok(segments);
    }
    let offset = text.len() - rest.len();
    if rest.starts_with('}') {
        Err(FormatError::StrayClose(offset))
    } else {
        Err(FormatError::Malformed(offset))
    }
}

pub fn substitute(text: &str, values: &Values) -> Result<String, FormatError> {
    if !text.contains(['{', '}']) {
        return Ok(text.to_owned());
    }
    let mut out = String::with_capacity(text.len());
    for segment in segments(text)? {
        match segment {
            Segment::Text(s) => out.push_str(s),
            Segment::Field(name) => {
                let v = values.get(name)
                    .ok_or_else(|| FormatError::Unbound(name.to_owned()))?;
                out.push_str(&v.to_string());
            },
        }
    }
    Ok(out)
}
