use crate::model::DispatchType;
use heck::ToShoutySnakeCase;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy)]
pub struct StructConfig<'a> {
    /// Member holding the structure type tag, such as `sType`.
    pub ty_name: &'a str,
}

#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig<'a> {
    /// Commands dispatched through the instance regardless of parameters.
    pub instance_fns: &'a [&'a str],
    /// First-parameter types that select instance dispatch.
    pub instance_types: &'a [&'a str],
}

impl<'a> DispatchConfig<'a> {
    pub fn dispatch_type(&self, name: &str, first_param: Option<&str>) -> DispatchType {
        let by_name = self.instance_fns.contains(&name);
        let by_param = first_param.map_or(false, |ty| self.instance_types.contains(&ty));
        if by_name || by_param {
            DispatchType::Instance
        } else {
            DispatchType::Device
        }
    }
}

/// A variable a struct receives from whatever embeds it.
#[derive(Debug, Clone, Copy)]
pub struct InheritedVar<'a> {
    pub name: &'a str,
    pub ty: &'a str,
    /// C expression evaluated in the embedding scope.
    pub expr: &'a str,
}

#[derive(Debug, Clone, Copy)]
pub struct InheritedState<'a> {
    pub structure: &'a str,
    /// Struct or command the state comes from.
    pub source: &'a str,
    pub vars: &'a [InheritedVar<'a>],
}

#[derive(Debug, Clone, Copy)]
pub struct ValidityCheck<'a> {
    pub structure: &'a str,
    pub member: &'a str,
    pub condition: &'a str,
}

/// Static conventions of the API a registry describes.
pub trait ApiConfig {
    const NAME: &'static str;
    const REGISTRY_FILENAME: &'static str;
    const TYPE_PREFIX: &'static str;
    const CONSTANTS_BLOCK: &'static str;
    const PLATFORM_HEADER: &'static str;
    const OBJECT_TYPE_PREFIX: &'static str;
    const TAGGED_STRUCT: StructConfig<'static>;
    const DISPATCH: DispatchConfig<'static>;
    /// Commands never emitted, such as loader-only entry points.
    const EXCLUDED_COMMANDS: &'static [&'static str];
    /// Platform types declared through `#define` rather than a header.
    const DEFINE_TYPES: &'static [&'static str];
    const INHERITED_STATE: &'static [InheritedState<'static>];
    const VALIDITY_CHECKS: &'static [ValidityCheck<'static>];
    /// Extra statements run after a command, keyed by command name.
    const TRACKED_STATE: &'static [(&'static str, &'static str)];

    fn contains_desired_api(api_list: &str) -> bool {
        api_list.split(',').any(|v| v == Self::NAME)
    }

    #[inline(always)]
    fn dispatch_type(name: &str, first_param: Option<&str>) -> DispatchType {
        Self::DISPATCH.dispatch_type(name, first_param)
    }

    #[inline(always)]
    fn is_excluded_command(name: &str) -> bool {
        Self::EXCLUDED_COMMANDS.contains(&name)
    }

    fn inherited_state(structure: &str) -> Option<&'static InheritedState<'static>> {
        Self::INHERITED_STATE.iter().find(|s| s.structure == structure)
    }

    /// Inherited state of `structure` when embedded in `source`.
    fn inherited_from(structure: &str, source: &str) -> Option<&'static InheritedState<'static>> {
        Self::INHERITED_STATE.iter()
            .find(|s| s.structure == structure && s.source == source)
    }

    fn validity_check(structure: &str, member: &str) -> Option<&'static str> {
        Self::VALIDITY_CHECKS.iter()
            .find(|c| c.structure == structure && c.member == member)
            .map(|c| c.condition)
    }

    fn tracked_state(command: &str) -> Option<&'static str> {
        Self::TRACKED_STATE.iter()
            .find(|&&(name, ..)| name == command)
            .map(|&(_, code)| code)
    }

    fn is_define_type(name: &str) -> bool {
        Self::DEFINE_TYPES.contains(&name)
    }

    /// `VkCommandBuffer` -> `VK_OBJECT_TYPE_COMMAND_BUFFER`
    fn object_type(handle: &str) -> String {
        let name = handle.strip_prefix(Self::TYPE_PREFIX).unwrap_or(handle);
        format!("{}{}", Self::OBJECT_TYPE_PREFIX, name.to_shouty_snake_case())
    }
}

/// Which features and extensions of the registry make up the model.
#[derive(Debug, Clone)]
pub struct Selection {
    /// Features whose name matches are included.
    pub versions: Regex,
    /// Extensions whose `supported` list contains this class are included.
    pub default_extensions: Option<String>,
    pub add_extensions: Option<Regex>,
    pub remove_extensions: Option<Regex>,
    /// Included extensions whose name does not match are not emitted.
    pub emit_extensions: Option<Regex>,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid name pattern {pattern:?}: {source}")]
pub struct PatternError {
    pattern: String,
    #[source]
    source: regex::Error,
}

/// Turns a list of names or patterns into `^(a|b)$`.
pub fn list_pattern<S: AsRef<str>>(names: &[S]) -> Result<Option<Regex>, PatternError> {
    if names.is_empty() {
        return Ok(None);
    }
    let pattern = format!(
        "^({})$",
        names.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("|")
    );
    Regex::new(&pattern)
        .map(Some)
        .map_err(|source| PatternError { pattern, source })
}

static_regex! {
    ANY_NAME = ".*",
}

impl Default for Selection {
    fn default() -> Self {
        Selection {
            versions: Regex::clone(&ANY_NAME),
            default_extensions: Some("vulkan".to_owned()),
            add_extensions: None,
            remove_extensions: None,
            emit_extensions: None,
        }
    }
}

impl Selection {
    /// Builds a selection from command-line style name lists. Empty lists
    /// select everything for features and emitted extensions, and nothing
    /// for added or removed extensions.
    pub fn from_lists<S: AsRef<str>>(
        default_extensions: Option<&str>,
        features: &[S],
        extensions: &[S],
        remove_extensions: &[S],
        emit_extensions: &[S],
    ) -> Result<Self, PatternError> {
        let mut ret = Self {
            default_extensions: default_extensions.map(str::to_owned),
            add_extensions: list_pattern(extensions)?,
            remove_extensions: list_pattern(remove_extensions)?,
            emit_extensions: list_pattern(emit_extensions)?,
            ..Self::default()
        };
        if let Some(versions) = list_pattern(features)? {
            ret.versions = versions;
        }
        Ok(ret)
    }

    pub fn includes_feature(&self, name: &str) -> bool {
        self.versions.is_match(name)
    }

    pub fn includes_extension(&self, name: &str, supported: Option<&str>) -> bool {
        let by_class = match (self.default_extensions.as_deref(), supported) {
            (Some(class), Some(supported)) => supported.split(',').any(|s| s == class),
            _ => false,
        };
        let added = self.add_extensions.as_ref().map_or(false, |re| re.is_match(name));
        let removed = self.remove_extensions.as_ref().map_or(false, |re| re.is_match(name));
        (by_class || added) && !removed
    }

    pub fn emits_extension(&self, name: &str) -> bool {
        self.emit_extensions.as_ref().map_or(true, |re| re.is_match(name))
    }
}

/// Per-run options for producing a target.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub directory: PathBuf,
    /// Wrap header targets in an `#ifndef` re-inclusion guard.
    pub protect: bool,
    /// Record per-directive statistics.
    pub profile: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        GeneratorOptions {
            directory: PathBuf::from("."),
            protect: true,
            profile: false,
        }
    }
}
