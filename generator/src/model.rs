//! Typed records describing the selected Vulkan API surface.
//!
//! Entities are plain data. They are projected into [`Values`] only when a
//! template body is substituted, so the rest of the generator works on the
//! typed fields.

use indexmap::{
    IndexMap,
    IndexSet,
};
use itertools::Itertools;
use std::fmt;

/// A typed placeholder payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Bool(bool),
    Int(i64),
}

impl Value {
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Truthiness as understood by template conditions.
    pub fn as_condition(&self) -> Option<bool> {
        match *self {
            Self::Bool(b) => Some(b),
            Self::Int(0) => Some(false),
            Self::Int(1) => Some(true),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Str(..) => "string",
            Self::Bool(..) => "bool",
            Self::Int(..) => "int",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for Value {
    #[inline(always)]
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for Value {
    #[inline(always)]
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&String> for Value {
    #[inline(always)]
    fn from(s: &String) -> Self {
        Self::Str(s.clone())
    }
}

impl From<bool> for Value {
    #[inline(always)]
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    #[inline(always)]
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<usize> for Value {
    #[inline(always)]
    fn from(i: usize) -> Self {
        Self::Int(i as i64)
    }
}

/// Placeholder name to value, in insertion order.
pub type Values = IndexMap<&'static str, Value>;

macro_rules! values {
    ($($key:literal => $value:expr),* $(,)?) => {{
        let mut values = Values::new();
        $(
            values.insert($key, Value::from($value));
        )*
        values
    }};
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Function,
    Parameter,
    Struct,
    Member,
    Union,
    Choice,
    Enum,
    Bitmask,
    Option,
    Flag,
    Handle,
    BaseType,
    FunctionPointer,
    ExternalType,
    Extension,
    SystemType,
}

impl EntityKind {
    pub const ALL: [Self; 16] = [
        Self::Function,
        Self::Parameter,
        Self::Struct,
        Self::Member,
        Self::Union,
        Self::Choice,
        Self::Enum,
        Self::Bitmask,
        Self::Option,
        Self::Flag,
        Self::Handle,
        Self::BaseType,
        Self::FunctionPointer,
        Self::ExternalType,
        Self::Extension,
        Self::SystemType,
    ];

    /// The tag used after `@foreach` and `@end`.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Parameter => "parameter",
            Self::Struct => "struct",
            Self::Member => "member",
            Self::Union => "union",
            Self::Choice => "choice",
            Self::Enum => "enum",
            Self::Bitmask => "bitmask",
            Self::Option => "option",
            Self::Flag => "flag",
            Self::Handle => "handle",
            Self::BaseType => "basetype",
            Self::FunctionPointer => "funcpointer",
            Self::ExternalType => "type",
            Self::Extension => "extension",
            Self::SystemType => "systype",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter()
            .copied()
            .find(|kind| kind.tag() == tag)
    }

    /// Kinds that can only be iterated inside an enclosing owner.
    pub const fn is_scoped(self) -> bool {
        matches!(self, Self::Parameter | Self::Member | Self::Choice | Self::Option)
    }
}

impl fmt::Display for EntityKind {
    #[inline(always)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

pub trait Entity: fmt::Debug {
    const KIND: EntityKind;

    fn name(&self) -> &str;
    fn values(&self) -> Values;
}

macro_rules! impl_entity {
    ($ty:ty, $kind:ident, $field:ident) => {
        impl Entity for $ty {
            const KIND: EntityKind = EntityKind::$kind;
            #[inline(always)]
            fn name(&self) -> &str {
                &self.$field
            }
            fn values(&self) -> Values {
                self.to_values()
            }
        }
    };
}

/// How a command is dispatched by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchType {
    Instance,
    Device,
}

impl DispatchType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Instance => "instance",
            Self::Device => "device",
        }
    }
}

/// Shape of a declared C variable: member, parameter or union choice.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Declaration {
    pub name: String,
    /// Declaration text with the name and array suffix removed.
    pub type_text: String,
    pub base_type: String,
    pub pointer_level: u8,
    pub is_const: bool,
    /// Array dimensions as written, e.g. `["VK_UUID_SIZE"]` or `["3", "4"]`.
    pub array_lengths: Vec<String>,
    /// The `len` attribute for dynamically sized pointers.
    pub length: Option<String>,
    pub optional: bool,
}

impl Declaration {
    pub fn array_length(&self) -> String {
        self.array_lengths.iter()
            .map(|len| format!("[{}]", len))
            .join("")
    }

    /// `type name[len]`, as it would appear in a prototype.
    pub fn full_text(&self) -> String {
        format!("{} {}{}", self.type_text, self.name, self.array_length())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub decl: Declaration,
    pub index: usize,
    /// Expressions handed to the parameter's struct as inherited state.
    pub inherited_conditions: String,
}

impl Parameter {
    fn to_values(&self) -> Values {
        let d = &self.decl;
        values! {
            "prmName" => &d.name,
            "prmType" => &d.type_text,
            "prmBaseType" => &d.base_type,
            "prmPtrLevel" => i64::from(d.pointer_level),
            "prmArrayLength" => d.array_length(),
            "prmLength" => d.length.clone().unwrap_or_default(),
            "prmIsConst" => d.is_const,
            "prmIsOptional" => d.optional,
            "prmIndex" => self.index,
            "prmInheritedConditions" => &self.inherited_conditions,
        }
    }
}

impl Entity for Parameter {
    const KIND: EntityKind = EntityKind::Parameter;
    #[inline(always)]
    fn name(&self) -> &str {
        &self.decl.name
    }
    fn values(&self) -> Values {
        self.to_values()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub return_type: String,
    pub parameters: Vec<Parameter>,
    pub dispatch: DispatchType,
    /// `type` attribute of the extension providing this command, if any.
    pub extension_type: Option<String>,
    /// Canonical command when this entry point is an alias.
    pub alias_of: Option<String>,
    /// Extra statements emitted after the call.
    pub tracked_state: Option<String>,
}

impl Function {
    pub fn short_name(&self) -> &str {
        self.name.strip_prefix("vk").unwrap_or(&self.name)
    }

    pub fn function_type(&self) -> &str {
        self.extension_type.as_deref()
            .filter(|ty| !ty.is_empty())
            .unwrap_or(self.dispatch.as_str())
    }

    pub fn typed_params(&self) -> String {
        self.parameters.iter()
            .map(|p| p.decl.full_text())
            .join(", ")
    }

    pub fn named_params(&self) -> String {
        self.parameters.iter()
            .map(|p| p.decl.name.as_str())
            .join(", ")
    }

    fn to_values(&self) -> Values {
        values! {
            "funcName" => &self.name,
            "funcShortName" => self.short_name(),
            "funcReturn" => &self.return_type,
            "funcTypedParams" => self.typed_params(),
            "funcNamedParams" => self.named_params(),
            "funcDispatchParam" => self.parameters.first().map_or("", |p| p.decl.name.as_str()),
            "funcDispatchType" => self.dispatch.as_str(),
            "funcType" => self.function_type(),
            "funcIsVoid" => self.return_type == "void",
            "funcIsAlias" => self.alias_of.is_some(),
            "funcAlias" => self.alias_of.clone().unwrap_or_default(),
            "funcStateTrackingCode" => self.tracked_state.clone().unwrap_or_default(),
        }
    }
}

impl_entity!(Function, Function, name);

/// State a struct receives from the struct that embeds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InheritedCondition {
    pub name: String,
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub decl: Declaration,
    pub index: usize,
    /// The named length refers to a sibling member.
    pub length_is_member: bool,
    /// C expression that must hold for this member to be valid.
    pub condition: Option<String>,
    /// Expressions handed to the member's struct as inherited state.
    pub inherited_conditions: String,
}

impl Member {
    fn to_values(&self) -> Values {
        let d = &self.decl;
        values! {
            "memName" => &d.name,
            "memType" => &d.type_text,
            "memBaseType" => &d.base_type,
            "memPtrLevel" => i64::from(d.pointer_level),
            "memArrayLength" => d.array_length(),
            "memLength" => d.length.clone().unwrap_or_default(),
            "memLengthIsMember" => self.length_is_member,
            "memIsConst" => d.is_const,
            "memIsOptional" => d.optional,
            "memIndex" => self.index,
            "memCondition" => self.condition.clone().unwrap_or_default(),
            "memHasCondition" => self.condition.is_some(),
            "memInheritedConditions" => &self.inherited_conditions,
        }
    }
}

impl Entity for Member {
    const KIND: EntityKind = EntityKind::Member;
    #[inline(always)]
    fn name(&self) -> &str {
        &self.decl.name
    }
    fn values(&self) -> Values {
        self.to_values()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Struct {
    pub name: String,
    pub members: Vec<Member>,
    pub structure_type: Option<String>,
    pub extends: Vec<String>,
    pub returned_only: bool,
    pub inherited: Vec<InheritedCondition>,
}

impl Struct {
    fn to_values(&self) -> Values {
        values! {
            "sctName" => &self.name,
            "sctStructureType" => self.structure_type.clone().unwrap_or_default(),
            "sctExtends" => self.extends.join(","),
            "sctIsReturnedOnly" => self.returned_only,
            "sctMemberCount" => self.members.len(),
            "sctHasInheritedState" => !self.inherited.is_empty(),
            "sctConditionVars" => self.inherited.iter()
                .map(|c| format!(", {} {}", c.ty, c.name))
                .join(""),
            "sctConditionNames" => self.inherited.iter()
                .map(|c| format!(", {}", c.name))
                .join(""),
        }
    }
}

impl_entity!(Struct, Struct, name);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub decl: Declaration,
    pub index: usize,
}

impl Choice {
    fn to_values(&self) -> Values {
        let d = &self.decl;
        values! {
            "chcName" => &d.name,
            "chcType" => &d.type_text,
            "chcBaseType" => &d.base_type,
            "chcPtrLevel" => i64::from(d.pointer_level),
            "chcArrayLength" => d.array_length(),
            "chcIndex" => self.index,
        }
    }
}

impl Entity for Choice {
    const KIND: EntityKind = EntityKind::Choice;
    #[inline(always)]
    fn name(&self) -> &str {
        &self.decl.name
    }
    fn values(&self) -> Values {
        self.to_values()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Union {
    pub name: String,
    pub choices: Vec<Choice>,
}

impl Union {
    fn to_values(&self) -> Values {
        values! {
            "unName" => &self.name,
            "unChoiceCount" => self.choices.len(),
        }
    }
}

impl_entity!(Union, Union, name);

/// One named value of an enum or bitmask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumOption {
    pub name: String,
    pub value: String,
    /// Bitmask value covering more than one bit.
    pub multi_value: bool,
    pub is_alias: bool,
}

impl EnumOption {
    fn to_values(&self) -> Values {
        values! {
            "optName" => &self.name,
            "optValue" => &self.value,
            "optMultiValue" => self.multi_value,
            "optIsAlias" => self.is_alias,
        }
    }
}

impl_entity!(EnumOption, Option, name);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enum {
    pub name: String,
    pub options: Vec<EnumOption>,
}

impl Enum {
    fn to_values(&self) -> Values {
        values! {
            "enumName" => &self.name,
            "enumOptionCount" => self.options.len(),
        }
    }
}

impl_entity!(Enum, Enum, name);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmask {
    pub name: String,
    pub width: u32,
    pub options: Vec<EnumOption>,
}

impl Bitmask {
    fn to_values(&self) -> Values {
        values! {
            "bitName" => &self.name,
            "bitWidth" => i64::from(self.width),
            "bitOptionCount" => self.options.len(),
        }
    }
}

impl_entity!(Bitmask, Bitmask, name);

/// A `VkFlags` typedef, optionally backed by a bits enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flag {
    pub name: String,
    pub ty: String,
    pub bits_enum: Option<String>,
}

impl Flag {
    fn to_values(&self) -> Values {
        values! {
            "flagName" => &self.name,
            "flagType" => &self.ty,
            "flagEnum" => self.bits_enum.clone().unwrap_or_default(),
            "flagHasEnum" => self.bits_enum.is_some(),
        }
    }
}

impl_entity!(Flag, Flag, name);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handle {
    pub name: String,
    pub ty: String,
    pub dispatchable: bool,
    pub parent: Option<String>,
    pub object_type: String,
}

impl Handle {
    fn to_values(&self) -> Values {
        values! {
            "hdlName" => &self.name,
            "hdlType" => &self.ty,
            "hdlIsDispatchable" => self.dispatchable,
            "hdlParent" => self.parent.clone().unwrap_or_default(),
            "hdlObjectType" => &self.object_type,
        }
    }
}

impl_entity!(Handle, Handle, name);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseType {
    pub name: String,
    pub ty: String,
}

impl BaseType {
    fn to_values(&self) -> Values {
        values! {
            "baseName" => &self.name,
            "baseType" => &self.ty,
        }
    }
}

impl_entity!(BaseType, BaseType, name);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionPointer {
    pub name: String,
    pub return_type: String,
}

impl FunctionPointer {
    fn to_values(&self) -> Values {
        values! {
            "pfnName" => &self.name,
            "pfnReturn" => &self.return_type,
        }
    }
}

impl_entity!(FunctionPointer, FunctionPointer, name);

/// A platform type pulled in from `vk_platform`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalType {
    pub name: String,
    pub header: String,
}

impl ExternalType {
    fn to_values(&self) -> Values {
        values! {
            "etyName" => &self.name,
            "etyHeader" => &self.header,
        }
    }
}

impl_entity!(ExternalType, ExternalType, name);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub name: String,
    pub ext_type: String,
    pub number: i64,
    pub guard: Option<String>,
    pub types: IndexSet<String>,
    pub commands: IndexSet<String>,
}

impl Extension {
    fn to_values(&self) -> Values {
        values! {
            "extName" => &self.name,
            "extType" => &self.ext_type,
            "extNumber" => self.number,
            "extGuard" => self.guard.clone().unwrap_or_default(),
            "extHasGuard" => self.guard.is_some(),
        }
    }
}

impl_entity!(Extension, Extension, name);

/// A platform type used by an extension, keyed by the pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SystemType {
    pub name: String,
    pub extension: String,
    pub guard: Option<String>,
}

impl SystemType {
    fn to_values(&self) -> Values {
        values! {
            "sysName" => &self.name,
            "sysExtension" => &self.extension,
            "sysGuard" => self.guard.clone().unwrap_or_default(),
        }
    }
}

impl_entity!(SystemType, SystemType, name);

/// A borrowed iteration item.
#[derive(Debug, Clone, Copy)]
pub enum Item<'m> {
    /// The single item an `@if` block iterates.
    Sentinel,
    Function(&'m Function),
    Parameter(&'m Parameter),
    Struct(&'m Struct),
    Member(&'m Member),
    Union(&'m Union),
    Choice(&'m Choice),
    Enum(&'m Enum),
    Bitmask(&'m Bitmask),
    Option(&'m EnumOption),
    Flag(&'m Flag),
    Handle(&'m Handle),
    BaseType(&'m BaseType),
    FunctionPointer(&'m FunctionPointer),
    ExternalType(&'m ExternalType),
    Extension(&'m Extension),
    SystemType(&'m SystemType),
}

macro_rules! dispatch_item {
    ($self:ident, $e:ident => $body:expr, $sentinel:expr) => {
        match *$self {
            Item::Sentinel => $sentinel,
            Item::Function($e) => $body,
            Item::Parameter($e) => $body,
            Item::Struct($e) => $body,
            Item::Member($e) => $body,
            Item::Union($e) => $body,
            Item::Choice($e) => $body,
            Item::Enum($e) => $body,
            Item::Bitmask($e) => $body,
            Item::Option($e) => $body,
            Item::Flag($e) => $body,
            Item::Handle($e) => $body,
            Item::BaseType($e) => $body,
            Item::FunctionPointer($e) => $body,
            Item::ExternalType($e) => $body,
            Item::Extension($e) => $body,
            Item::SystemType($e) => $body,
        }
    };
}

impl<'m> Item<'m> {
    pub fn kind(&self) -> Option<EntityKind> {
        fn kind_of<E: Entity>(_: &E) -> EntityKind {
            E::KIND
        }
        dispatch_item!(self, e => Some(kind_of(e)), None)
    }

    pub fn name(&self) -> &'m str {
        dispatch_item!(self, e => e.name(), "")
    }

    pub fn values(&self) -> Values {
        dispatch_item!(self, e => e.values(), Values::new())
    }
}

/// The frozen API model. Collections keep declaration order.
#[derive(Debug, Clone, Default)]
pub struct ApiModel {
    pub functions: Vec<Function>,
    pub structs: Vec<Struct>,
    pub unions: Vec<Union>,
    pub enums: Vec<Enum>,
    pub bitmasks: Vec<Bitmask>,
    pub flags: Vec<Flag>,
    pub handles: Vec<Handle>,
    pub basetypes: Vec<BaseType>,
    pub funcpointers: Vec<FunctionPointer>,
    pub external_types: Vec<ExternalType>,
    pub extensions: Vec<Extension>,
    pub system_types: Vec<SystemType>,
    /// Command name to index into `extensions`.
    pub command_extensions: IndexMap<String, usize>,
    /// Type name to index into `extensions`.
    pub type_extensions: IndexMap<String, usize>,
    /// Alias name to canonical name.
    pub aliases: IndexMap<String, String>,
    /// `API Constants` by name.
    pub constants: IndexMap<String, String>,
}

impl ApiModel {
    /// Top-level items for a kind. Scoped kinds have none.
    pub fn items(&self, kind: EntityKind) -> Vec<Item<'_>> {
        fn collect<'a, T, F>(v: &'a [T], f: F) -> Vec<Item<'a>>
        where
            F: Fn(&'a T) -> Item<'a>,
        {
            v.iter().map(f).collect()
        }
        match kind {
            EntityKind::Function => collect(&self.functions, Item::Function),
            EntityKind::Struct => collect(&self.structs, Item::Struct),
            EntityKind::Union => collect(&self.unions, Item::Union),
            EntityKind::Enum => collect(&self.enums, Item::Enum),
            EntityKind::Bitmask => collect(&self.bitmasks, Item::Bitmask),
            EntityKind::Flag => collect(&self.flags, Item::Flag),
            EntityKind::Handle => collect(&self.handles, Item::Handle),
            EntityKind::BaseType => collect(&self.basetypes, Item::BaseType),
            EntityKind::FunctionPointer => collect(&self.funcpointers, Item::FunctionPointer),
            EntityKind::ExternalType => collect(&self.external_types, Item::ExternalType),
            EntityKind::Extension => collect(&self.extensions, Item::Extension),
            EntityKind::SystemType => collect(&self.system_types, Item::SystemType),
            EntityKind::Parameter
            | EntityKind::Member
            | EntityKind::Choice
            | EntityKind::Option => Vec::new(),
        }
    }

    /// The extension that gates an item, if any.
    pub fn extension_for(&self, item: &Item<'_>) -> Option<&Extension> {
        let name = item.name();
        let index = match item {
            Item::Sentinel => return None,
            Item::SystemType(sys) => {
                return self.extensions.iter().find(|ext| ext.name == sys.extension);
            },
            _ => self.command_extensions.get(name)
                .or_else(|| self.type_extensions.get(name))?,
        };
        self.extensions.get(*index)
    }

    #[inline]
    pub fn constant(&self, name: &str) -> Option<&str> {
        self.constants.get(name).map(String::as_str)
    }

    #[inline]
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    #[inline]
    pub fn structure(&self, name: &str) -> Option<&Struct> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn canonical_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map_or(name, String::as_str)
    }

    /// Item counts per top-level kind.
    pub fn summary(&self) -> Vec<(EntityKind, usize)> {
        EntityKind::ALL.iter()
            .copied()
            .filter(|k| !k.is_scoped())
            .map(|k| (k, self.items(k).len()))
            .collect_vec()
    }
}
