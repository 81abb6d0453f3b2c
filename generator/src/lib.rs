#![warn(
    clippy::use_self,
    deprecated_in_future,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unused_qualifications
)]

#[macro_use]
extern crate log;

use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    fmt::Write as _,
    fs,
    io,
    path::{Path, PathBuf},
};

#[doc(hidden)]
#[macro_export]
macro_rules! get_variant {
    ($variant:path) => {
        |enum_| match enum_ {
            $variant(inner) => Some(inner),
            _ => None,
        }
    };
    ($variant:path { $($member:ident),+ }) => {
        |enum_| match enum_ {
            $variant { $($member),+, .. } => Some(( $($member),+ )),
            _ => None,
        }
    };
}

macro_rules! static_regex {
    ($($name:ident = $s:expr),+ $(,)?) => {
        $(
            static $name: Lazy<Regex> = Lazy::new(|| Regex::new($s).unwrap());
        )+
    };
}

pub mod cdecl;
pub mod config;
pub mod directive;
pub mod expand;
pub mod expr;
pub mod format;
pub mod logging;
pub mod model;
pub mod registry;
pub mod targets;
pub(crate) mod util;
pub mod vulkan;

pub use config::{ApiConfig, GeneratorOptions, Selection};
pub use directive::{ParseError, Template};
pub use expand::{expand_str, DirectiveStats, ExpandError, Expander};
pub use model::ApiModel;
pub use registry::{build_model, RegistryError};
pub use targets::Target;
pub use vulkan::Vulkan;

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("template: {0}")]
    Parse(#[from] ParseError),
    #[error("expansion: {0}")]
    Expand(#[from] ExpandError),
    #[error("registry: {0}")]
    Registry(#[from] RegistryError),
    #[error("error parsing registry: {0:?}")]
    RegistryParse(vk_parse::FatalError),
    #[error(transparent)]
    Pattern(#[from] config::PatternError),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl GenerateError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_owned(),
            source,
        }
    }
}

/// Parses `vk.xml`, logging any non-fatal problems.
pub fn load_registry<P: AsRef<Path>>(path: P) -> Result<vk_parse::Registry, GenerateError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(GenerateError::Io {
            path: path.to_owned(),
            source: io::ErrorKind::NotFound.into(),
        });
    }
    let (registry, warnings) = vk_parse::parse_file(path)
        .map_err(GenerateError::RegistryParse)?;
    warnings.into_iter().for_each(|w| {
        warn!("warning parsing registry: {:?}", &w);
    });
    Ok(registry)
}

/// A generated target, ready to be written.
#[derive(Debug, Clone)]
pub struct Generated {
    pub target: &'static Target,
    pub text: String,
    pub stats: Option<Vec<DirectiveStats>>,
}

pub fn generate_target(
    target: &'static Target,
    model: &ApiModel,
    options: &GeneratorOptions,
) -> Result<Generated, GenerateError> {
    let template = Template::parse(target.template)?;
    debug!("{}: {} directives", target.name, template.controls().count());
    let mut expander = Expander::new(model);
    if options.profile {
        expander = expander.with_profiling();
    }
    let body = expander.expand_template(&template)?;
    let text = if target.header && options.protect {
        let guard = target.include_guard();
        format!("#ifndef {0}\n#define {0} 1\n\n{1}\n#endif // {0}\n", guard, body)
    } else {
        body
    };
    let stats = expander.stats()
        .map(|stats| stats.into_iter().cloned().collect());
    Ok(Generated {
        target,
        text,
        stats,
    })
}

/// Writes a generated target into `directory`, creating it if needed.
pub fn write_target(generated: &Generated, directory: &Path) -> Result<PathBuf, GenerateError> {
    fs::create_dir_all(directory).map_err(GenerateError::io(directory))?;
    let path = directory.join(generated.target.filename);
    fs::write(&path, &generated.text).map_err(GenerateError::io(&path))?;
    info!("wrote {} ({} bytes)", path.display(), generated.text.len());
    Ok(path)
}

/// Human-readable listing of every entity in the model.
pub fn dump_model(model: &ApiModel) -> String {
    let mut out = String::new();
    for kind in model::EntityKind::ALL.iter().copied().filter(|k| !k.is_scoped()) {
        let items = model.items(kind);
        let _ = writeln!(out, "# {} ({})", kind, items.len());
        for item in items {
            let values = item.values();
            let fields = values.iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(out, "{}\t{}", item.name(), fields);
        }
        out.push('\n');
    }
    if !model.aliases.is_empty() {
        let _ = writeln!(out, "# aliases ({})", model.aliases.len());
        for (alias, target) in &model.aliases {
            let _ = writeln!(out, "{} -> {}", alias, target);
        }
    }
    out
}

static_regex! {
    API_TYPE = r"^Vk[A-Z][A-Za-z0-9]*$",
}

/// Cross-checks type references in the model. Returns one message per
/// reference that names no known type.
pub fn validate_model(model: &ApiModel) -> Vec<String> {
    let known = |name: &str| {
        let name = model.canonical_name(name);
        model.structs.iter().any(|s| s.name == name)
            || model.unions.iter().any(|u| u.name == name)
            || model.enums.iter().any(|e| e.name == name)
            || model.bitmasks.iter().any(|b| b.name == name)
            || model.flags.iter().any(|f| f.name == name)
            || model.handles.iter().any(|h| h.name == name)
            || model.basetypes.iter().any(|b| b.name == name)
            || model.funcpointers.iter().any(|p| p.name == name)
    };
    let mut problems = Vec::new();
    for s in &model.structs {
        for m in &s.members {
            let ty = m.decl.base_type.as_str();
            if API_TYPE.is_match(ty) && !known(ty) {
                problems.push(format!("{}::{} has unknown type {}", s.name, m.decl.name, ty));
            }
        }
    }
    for f in &model.functions {
        for p in &f.parameters {
            let ty = p.decl.base_type.as_str();
            if API_TYPE.is_match(ty) && !known(ty) {
                problems.push(format!("{}({}) has unknown type {}", f.name, p.decl.name, ty));
            }
        }
    }
    for flag in &model.flags {
        if let Some(bits) = &flag.bits_enum {
            if !known(bits) {
                problems.push(format!("{} refers to unknown bits {}", flag.name, bits));
            }
        }
    }
    problems
}
