//! nom parsers for the C declarations found in `vk.xml` members, parameters
//! and prototypes.

use crate::model::Declaration;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit1, multispace0, multispace1},
    combinator::{map, map_res, opt, success, value},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CPointer {
    Mutable,
    /// `const*`
    Const,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CType<'a> {
    pub name: &'a str,
    pub is_const: bool,
    pub pointers: Vec<CPointer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CArraySuffix<'a> {
    Dynamic,
    Static(usize),
    /// Sized by a named constant, e.g. `[VK_UUID_SIZE]`.
    Constant(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CDeclaration<'a> {
    pub type_text: &'a str,
    pub ty: CType<'a>,
    pub name: &'a str,
    pub arrays: Vec<CArraySuffix<'a>>,
    pub bit_width: Option<u32>,
}

impl<'a> CDeclaration<'a> {
    /// Pointer depth, counting a trailing `[]` as one more level.
    pub fn pointer_level(&self) -> usize {
        let dynamic = self.arrays.iter()
            .filter(|&&a| a == CArraySuffix::Dynamic)
            .count();
        self.ty.pointers.len() + dynamic
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed C declaration: {0:?}")]
pub struct DeclarationError(pub String);

pub(crate) fn parse_c_identifier(i: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c == '_' || c.is_alphanumeric())(i)
}

fn parse_c_pointer(i: &str) -> IResult<&str, CPointer> {
    preceded(
        multispace0,
        alt((
            value(CPointer::Const, tuple((tag("const"), multispace0, char('*')))),
            value(CPointer::Mutable, char('*')),
        )),
    )(i)
}

fn parse_c_type(i: &str) -> IResult<&str, CType<'_>> {
    map(
        tuple((
            opt(terminated(tag("const"), multispace1)),
            opt(terminated(tag("struct"), multispace1)),
            parse_c_identifier,
            many0(parse_c_pointer),
        )),
        |(const_, _struct, name, pointers)| CType {
            name,
            is_const: const_.is_some(),
            pointers,
        },
    )(i)
}

fn parse_c_array_suffix(i: &str) -> IResult<&str, CArraySuffix<'_>> {
    delimited(
        pair(multispace0, char('[')),
        alt((
            map(map_res(digit1, str::parse), CArraySuffix::Static),
            map(parse_c_identifier, CArraySuffix::Constant),
            success(CArraySuffix::Dynamic),
        )),
        char(']'),
    )(i)
}

fn parse_c_bit_width(i: &str) -> IResult<&str, u32> {
    preceded(
        tuple((multispace0, char(':'), multispace0)),
        map_res(digit1, str::parse),
    )(i)
}

/// Parses a single declaration, for example:
///
/// ```c
/// const char* const* ppEnabledExtensionNames
/// ```
///
/// Anything after the declarator (comments, initializers) is left in the
/// remainder.
pub fn parse_c_declaration(i: &str) -> IResult<&str, CDeclaration<'_>> {
    let (i, _) = multispace0(i)?;
    let (rest, ty) = parse_c_type(i)?;
    let type_text = i[..i.len() - rest.len()].trim();
    let (rest, name) = preceded(multispace0, parse_c_identifier)(rest)?;
    let (rest, arrays) = many0(parse_c_array_suffix)(rest)?;
    let (rest, bit_width) = opt(parse_c_bit_width)(rest)?;
    Ok((rest, CDeclaration {
        type_text,
        ty,
        name,
        arrays,
        bit_width,
    }))
}

/// Parses `code` into a model [`Declaration`], normalizing whitespace in the
/// type text.
pub fn declaration(code: &str) -> Result<Declaration, DeclarationError> {
    let code = code.split_whitespace().collect::<Vec<_>>().join(" ");
    let (_, decl) = parse_c_declaration(&code)
        .map_err(|_| DeclarationError(code.clone()))?;
    let pointer_level = decl.pointer_level();
    let array_lengths = decl.arrays.iter()
        .filter_map(|a| match *a {
            CArraySuffix::Static(n) => Some(n.to_string()),
            CArraySuffix::Constant(c) => Some(c.to_owned()),
            CArraySuffix::Dynamic => None,
        })
        .collect();
    Ok(Declaration {
        name: decl.name.to_owned(),
        type_text: decl.type_text.to_owned(),
        base_type: decl.ty.name.to_owned(),
        pointer_level: u8::try_from(pointer_level).map_err(|_| DeclarationError(code.clone()))?,
        is_const: decl.ty.is_const,
        array_lengths,
        length: None,
        optional: false,
    })
}
