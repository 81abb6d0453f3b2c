//! Builds an [`ApiModel`] from a parsed `vk.xml`.
//!
//! The registry is first indexed by name, then the requested features and
//! extensions are resolved into the set of required types and commands, and
//! finally every required entity is built in registry declaration order.

use crate::{
    cdecl::{self, DeclarationError},
    config::{ApiConfig, Selection},
    model::*,
    util::*,
};
use indexmap::{IndexMap, IndexSet};
use nom::{
    bytes::complete::{tag, take_until},
    character::complete::multispace1,
    combinator::map,
    sequence::{pair, preceded},
    IResult,
};
use std::{collections::HashSet, marker::PhantomData};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Extensions(#[from] ExtensionsFindError),
    #[error("declaration of `{owner}`: {source}")]
    Declaration {
        owner: String,
        #[source]
        source: DeclarationError,
    },
    #[error("command alias `{alias}` refers to unknown command `{target}`")]
    DanglingAlias { alias: String, target: String },
}

impl RegistryError {
    fn declaration(owner: &str) -> impl FnOnce(DeclarationError) -> Self + '_ {
        move |source| Self::Declaration {
            owner: owner.to_owned(),
            source,
        }
    }
}

/// `typedef void (VKAPI_PTR *PFN_...)(...)` -> `void`
fn parse_funcpointer_return(i: &str) -> IResult<&str, &str> {
    preceded(
        pair(tag("typedef"), multispace1),
        map(take_until("(VKAPI_PTR"), str::trim),
    )(i)
}

/// `optional="true,false"` describes the outermost pointer first.
#[inline]
fn is_optional(optional: Option<&str>) -> bool {
    optional
        .and_then(|o| o.split(',').next())
        .map_or(false, |o| o == "true")
}

/// First component of a `len` attribute, e.g. `enabledLayerCount` out of
/// `enabledLayerCount,null-terminated`.
#[inline]
fn first_length(len: Option<&str>) -> Option<String> {
    len.and_then(|len| len.split(',').next())
        .map(str::to_owned)
}

fn inherited_conditions<C: ApiConfig + ?Sized>(base_type: &str, source: &str) -> String {
    C::inherited_from(base_type, source)
        .map(|state| state.vars.iter().map(|v| format!(", {}", v.expr)).collect())
        .unwrap_or_default()
}

/// `Display` and `Display*` count as uses of `Display`, deeper pointers do not.
#[inline]
fn uses_platform_type(decl: &Declaration, name: &str) -> bool {
    decl.base_type == name && decl.pointer_level <= 1
}

fn enum_option(e: &vk_parse::Enum, extension_number: Option<i64>, bitmask: bool) -> Option<EnumOption> {
    let value = enum_value(e, extension_number)?;
    Some(EnumOption {
        name: e.name.clone(),
        multi_value: bitmask && value.is_literal,
        is_alias: value.is_alias,
        value: value.value,
    })
}

struct ModelBuilder<'r, C: ?Sized> {
    types: IndexMap<&'r str, &'r vk_parse::Type>,
    commands: IndexMap<&'r str, &'r vk_parse::CommandDefinition>,
    command_aliases: IndexMap<&'r str, &'r str>,
    enums: IndexMap<&'r str, &'r vk_parse::Enums>,
    includes: HashSet<&'r str>,
    required_types: IndexSet<&'r str>,
    required_commands: IndexSet<&'r str>,
    /// Options that features and extensions add to an enum, by enum name.
    added_options: IndexMap<&'r str, Vec<EnumOption>>,
    tracked: HashSet<String>,
    model: ApiModel,
    _api: PhantomData<C>,
}

impl<'r, C: ApiConfig + ?Sized> ModelBuilder<'r, C> {
    fn new(registry: &'r vk_parse::Registry) -> Self {
        let mut types = IndexMap::new();
        let mut includes = HashSet::new();
        for ty in registry.types().filter(|ty| ty.is_for_api::<C>()) {
            let Some(name) = ty.type_name() else {
                continue;
            };
            if ty.category.as_deref() == Some("include") {
                includes.insert(name);
            }
            types.entry(name).or_insert(ty);
        }
        let commands = registry.commands()
            .filter_map(get_variant!(vk_parse::Command::Definition))
            .map(|cmd| (cmd.proto.name.as_str(), cmd))
            .collect();
        let command_aliases = registry.commands()
            .filter_map(get_variant!(vk_parse::Command::Alias { name, alias }))
            .map(|(name, alias)| (name.as_str(), alias.as_str()))
            .collect();
        let enums = registry.enums()
            .filter_map(|e| e.name.as_deref().map(|name| (name, e)))
            .collect();
        ModelBuilder {
            types,
            commands,
            command_aliases,
            enums,
            includes,
            required_types: IndexSet::new(),
            required_commands: IndexSet::new(),
            added_options: IndexMap::new(),
            tracked: HashSet::new(),
            model: ApiModel::default(),
            _api: PhantomData,
        }
    }

    fn require<I>(&mut self, items: I, extension_number: Option<i64>)
    where
        I: Iterator<Item=&'r vk_parse::InterfaceItem>,
    {
        for item in items {
            match item {
                vk_parse::InterfaceItem::Type { name, .. } => {
                    self.required_types.insert(name.as_str());
                },
                vk_parse::InterfaceItem::Command { name, .. } => {
                    self.required_commands.insert(name.as_str());
                },
                vk_parse::InterfaceItem::Enum(e) => {
                    if !e.api.as_deref().map_or(true, C::contains_desired_api) {
                        continue;
                    }
                    let Some(extends) = enum_value(e, extension_number).and_then(|v| v.extends) else {
                        continue;
                    };
                    let bitmask = self.enums.get(extends)
                        .map_or(false, |block| block.ty() == Some(EnumType::Bitmask));
                    if let Some(option) = enum_option(e, extension_number, bitmask) {
                        self.added_options.entry(extends).or_default().push(option);
                    }
                },
                _ => {},
            }
        }
    }

    fn select(&mut self, registry: &'r vk_parse::Registry, selection: &Selection) -> Result<(), RegistryError> {
        for feature in registry.features() {
            if !C::contains_desired_api(&feature.api) || !selection.includes_feature(&feature.name) {
                continue;
            }
            debug!("including feature {}", feature.name);
            self.require(feature.required_items::<C>(), None);
        }

        for ext in registry.extensions()? {
            if ext.is_disabled() || !selection.includes_extension(&ext.name, ext.supported.as_deref()) {
                continue;
            }
            if !selection.emits_extension(&ext.name) {
                trace!("extension {} is included but not emitted", ext.name);
                continue;
            }
            let mut types = IndexSet::new();
            let mut commands = IndexSet::new();
            for item in ext.required_items::<C>() {
                match item {
                    vk_parse::InterfaceItem::Type { name, .. } => {
                        types.insert(name.clone());
                    },
                    vk_parse::InterfaceItem::Command { name, .. } => {
                        commands.insert(name.clone());
                    },
                    _ => {},
                }
            }
            self.require(ext.required_items::<C>(), ext.number);

            let index = self.model.extensions.len();
            for name in &types {
                self.model.type_extensions.entry(name.clone()).or_insert(index);
            }
            for name in &commands {
                self.model.command_extensions.entry(name.clone()).or_insert(index);
            }
            debug!("including extension {} ({} types, {} commands)", ext.name, types.len(), commands.len());
            self.model.extensions.push(Extension {
                name: ext.name.clone(),
                ext_type: ext.ext_type.clone().unwrap_or_default(),
                number: ext.number.unwrap_or(0),
                guard: ext.protect.clone(),
                types,
                commands,
            });
        }
        Ok(())
    }

    fn constants(&mut self) {
        let Some(block) = self.enums.get(C::CONSTANTS_BLOCK) else {
            warn!("registry has no `{}` block", C::CONSTANTS_BLOCK);
            return;
        };
        let constants = block.children.iter()
            .filter_map(get_variant!(vk_parse::EnumsChild::Enum))
            .filter_map(|e| enum_value(e, None).map(|v| (e.name.clone(), v.value)));
        self.model.constants.extend(constants);
    }

    /// Extends the required types with everything they and the required
    /// commands refer to.
    fn close_types(&mut self) {
        let mut queue: Vec<&'r str> = self.required_types.iter().copied().collect();
        for &name in &self.required_commands {
            let name = self.command_aliases.get(name).copied().unwrap_or(name);
            let Some(&cmd) = self.commands.get(name) else {
                continue;
            };
            queue.extend(cmd.proto.type_name.as_deref());
            queue.extend(cmd.params.iter().filter_map(|p| p.definition.type_name.as_deref()));
        }

        let mut closure = IndexSet::new();
        while let Some(name) = queue.pop() {
            if !closure.insert(name) {
                continue;
            }
            let Some(&ty) = self.types.get(name) else {
                continue;
            };
            queue.extend(ty.requires.as_deref());
            queue.extend(ty.alias.as_deref());
            queue.extend(ty.bitvalues.as_deref());
            match &ty.spec {
                vk_parse::TypeSpec::Members(members) => {
                    let member_types = members.iter()
                        .filter_map(get_variant!(vk_parse::TypeMember::Definition))
                        .filter(|def| def.is_for_api::<C>())
                        .filter_map(TypeMemberDefinitionExt::type_name);
                    queue.extend(member_types);
                },
                vk_parse::TypeSpec::Code(code) => {
                    let code_types = code.markup.iter()
                        .filter_map(get_variant!(vk_parse::TypeCodeMarkup::Type))
                        .map(String::as_str);
                    queue.extend(code_types);
                },
                _ => {},
            }
        }
        debug!("{} required types close over {} types", self.required_types.len(), closure.len());
        self.required_types = closure;
    }

    /// Records `name` as built. Returns `false` if it already was.
    #[inline]
    fn track(&mut self, name: &str) -> bool {
        self.tracked.insert(name.to_owned())
    }

    fn types(&mut self) -> Result<(), RegistryError> {
        let types: Vec<_> = self.types.iter()
            .filter(|(name, _)| self.required_types.contains(*name))
            .map(|(&name, &ty)| (name, ty))
            .collect();
        for (name, ty) in types {
            if let Some(alias) = &ty.alias {
                self.model.aliases.insert(name.to_owned(), alias.clone());
                continue;
            }
            if !self.track(name) {
                continue;
            }
            match ty.category.as_deref() {
                Some("struct") => {
                    let s = self.structure(name, ty)?;
                    self.model.structs.push(s);
                },
                Some("union") => {
                    let u = Union {
                        name: name.to_owned(),
                        choices: self.declarations(name, ty)?
                            .into_iter()
                            .enumerate()
                            .map(|(index, (decl, _))| Choice { decl, index })
                            .collect(),
                    };
                    self.model.unions.push(u);
                },
                Some("handle") => {
                    let handle_macro = ty.code_type().unwrap_or_default();
                    self.model.handles.push(Handle {
                        name: name.to_owned(),
                        ty: handle_macro.to_owned(),
                        dispatchable: handle_macro == "VK_DEFINE_HANDLE",
                        parent: ty.parent.clone(),
                        object_type: C::object_type(name),
                    });
                },
                Some("basetype") => {
                    self.model.basetypes.push(BaseType {
                        name: name.to_owned(),
                        ty: ty.code_type().unwrap_or_default().to_owned(),
                    });
                },
                Some("bitmask") => {
                    self.model.flags.push(Flag {
                        name: name.to_owned(),
                        ty: ty.code_type().unwrap_or("VkFlags").to_owned(),
                        bits_enum: ty.requires.clone().or_else(|| ty.bitvalues.clone()),
                    });
                },
                Some("funcpointer") => {
                    let return_type = ty.code()
                        .and_then(|code| parse_funcpointer_return(code).ok())
                        .map_or("void", |(_, ret)| ret);
                    self.model.funcpointers.push(FunctionPointer {
                        name: name.to_owned(),
                        return_type: return_type.to_owned(),
                    });
                },
                Some("enum") => self.enumeration(name),
                None if ty.requires.as_deref() == Some(C::PLATFORM_HEADER) => {
                    self.model.external_types.push(ExternalType {
                        name: name.to_owned(),
                        header: C::PLATFORM_HEADER.to_owned(),
                    });
                },
                _ => {},
            }
        }
        Ok(())
    }

    fn enumeration(&mut self, name: &str) {
        let Some(block) = self.enums.get(name).copied() else {
            debug!("enum {} has no values block", name);
            return;
        };
        let bitmask = block.ty() == Some(EnumType::Bitmask);
        let mut seen = HashSet::new();
        let mut options: Vec<EnumOption> = block.children.iter()
            .filter_map(get_variant!(vk_parse::EnumsChild::Enum))
            .filter(|e| e.api.as_deref().map_or(true, C::contains_desired_api))
            .filter_map(|e| enum_option(e, None, bitmask))
            .filter(|opt| seen.insert(opt.name.clone()))
            .collect();
        if let Some(added) = self.added_options.get(name) {
            options.extend(added.iter().filter(|opt| seen.insert(opt.name.clone())).cloned());
        }
        match block.ty() {
            Some(EnumType::Bitmask) => self.model.bitmasks.push(Bitmask {
                name: name.to_owned(),
                width: block.bitwidth.unwrap_or(32),
                options,
            }),
            Some(EnumType::Enum) => self.model.enums.push(Enum {
                name: name.to_owned(),
                options,
            }),
            None => debug!("values block {} is neither an enum nor a bitmask", name),
        }
    }

    /// Member declarations of a struct or union with their registry
    /// definitions.
    fn declarations(&self, owner: &str, ty: &'r vk_parse::Type) -> Result<Vec<(Declaration, &'r vk_parse::TypeMemberDefinition)>, RegistryError> {
        let vk_parse::TypeSpec::Members(members) = &ty.spec else {
            return Ok(Vec::new());
        };
        members.iter()
            .filter_map(get_variant!(vk_parse::TypeMember::Definition))
            .filter(|def| def.is_for_api::<C>())
            .map(|def| {
                let mut decl = cdecl::declaration(&def.code)
                    .map_err(RegistryError::declaration(owner))?;
                decl.length = first_length(def.len.as_deref());
                decl.optional = is_optional(def.optional.as_deref());
                Ok((decl, def))
            })
            .collect()
    }

    fn structure(&self, name: &str, ty: &'r vk_parse::Type) -> Result<Struct, RegistryError> {
        let declarations = self.declarations(name, ty)?;
        let structure_type = declarations.iter()
            .find(|(decl, _)| decl.name == C::TAGGED_STRUCT.ty_name)
            .and_then(|(_, def)| def.values.clone());
        let sibling_names: HashSet<String> = declarations.iter()
            .map(|(decl, _)| decl.name.clone())
            .collect();
        let members = declarations.into_iter()
            .enumerate()
            .map(|(index, (decl, _))| Member {
                length_is_member: decl.length.as_ref().map_or(false, |len| sibling_names.contains(len)),
                condition: C::validity_check(name, &decl.name).map(str::to_owned),
                inherited_conditions: inherited_conditions::<C>(&decl.base_type, name),
                decl,
                index,
            })
            .collect();
        let inherited = C::inherited_state(name)
            .map(|state| {
                state.vars.iter()
                    .map(|v| InheritedCondition {
                        name: v.name.to_owned(),
                        ty: v.ty.to_owned(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(Struct {
            name: name.to_owned(),
            members,
            structure_type,
            extends: ty.structextends.as_deref()
                .map(|e| e.split(',').map(str::to_owned).collect())
                .unwrap_or_default(),
            returned_only: ty.returnedonly.as_deref() == Some("true"),
            inherited,
        })
    }

    fn function(&self, name: &str, cmd: &vk_parse::CommandDefinition, alias_of: Option<&str>) -> Result<Function, RegistryError> {
        let return_type = cdecl::declaration(&cmd.proto.code)
            .map(|decl| decl.type_text)
            .ok()
            .or_else(|| cmd.proto.type_name.clone())
            .unwrap_or_else(|| "void".to_owned());
        let parameters = cmd.params.iter()
            .filter(|p| p.api.as_deref().map_or(true, C::contains_desired_api))
            .enumerate()
            .map(|(index, p)| {
                let mut decl = cdecl::declaration(&p.definition.code)
                    .map_err(RegistryError::declaration(name))?;
                decl.length = first_length(p.len.as_deref());
                decl.optional = is_optional(p.optional.as_deref());
                Ok(Parameter {
                    inherited_conditions: inherited_conditions::<C>(&decl.base_type, name),
                    decl,
                    index,
                })
            })
            .collect::<Result<Vec<_>, RegistryError>>()?;
        let dispatch = C::dispatch_type(name, parameters.first().map(|p| p.decl.base_type.as_str()));
        let extension_type = self.model.command_extensions.get(name)
            .and_then(|&index| self.model.extensions.get(index))
            .map(|ext| ext.ext_type.clone())
            .filter(|ty| !ty.is_empty());
        Ok(Function {
            name: name.to_owned(),
            return_type,
            parameters,
            dispatch,
            extension_type,
            alias_of: alias_of.map(str::to_owned),
            tracked_state: C::tracked_state(name).map(str::to_owned),
        })
    }

    fn commands(&mut self, registry: &'r vk_parse::Registry) -> Result<(), RegistryError> {
        for command in registry.commands() {
            let (name, cmd, alias_of) = match command {
                vk_parse::Command::Definition(cmd) => (cmd.proto.name.as_str(), cmd, None),
                vk_parse::Command::Alias { name, alias } => {
                    if !self.required_commands.contains(name.as_str()) {
                        continue;
                    }
                    let cmd = self.commands.get(alias.as_str())
                        .copied()
                        .ok_or_else(|| RegistryError::DanglingAlias {
                            alias: name.clone(),
                            target: alias.clone(),
                        })?;
                    (name.as_str(), cmd, Some(alias.as_str()))
                },
                _ => continue,
            };
            if !self.required_commands.contains(name) {
                continue;
            }
            if C::is_excluded_command(name) {
                debug!("skipping excluded command {}", name);
                continue;
            }
            if !self.track(name) {
                continue;
            }
            if let Some(alias) = alias_of {
                self.model.aliases.insert(name.to_owned(), alias.to_owned());
            }
            let function = self.function(name, cmd, alias_of)?;
            self.model.functions.push(function);
        }
        Ok(())
    }

    /// Platform types used by the structs or commands an extension
    /// contributes.
    fn system_types(&mut self) {
        let candidates: Vec<&str> = self.types.iter()
            .filter(|&(&name, ty)| {
                let from_header = ty.category.is_none() && ty.requires.as_deref().map_or(false, |header| {
                    header != C::PLATFORM_HEADER && self.includes.contains(header)
                });
                from_header || C::is_define_type(name)
            })
            .map(|(&name, _)| name)
            .collect();
        let mut found = IndexSet::new();
        for name in candidates {
            for ext in &self.model.extensions {
                let in_struct = ext.types.iter()
                    .filter_map(|s| self.model.structure(s))
                    .flat_map(|s| &s.members)
                    .any(|m| uses_platform_type(&m.decl, name));
                let in_function = ext.commands.iter()
                    .filter_map(|f| self.model.function(f))
                    .flat_map(|f| &f.parameters)
                    .any(|p| uses_platform_type(&p.decl, name));
                if in_struct || in_function {
                    found.insert(SystemType {
                        name: name.to_owned(),
                        extension: ext.name.clone(),
                        guard: ext.guard.clone(),
                    });
                }
            }
        }
        self.model.system_types.extend(found);
    }

    fn finish(self) -> ApiModel {
        let model = self.model;
        info!(
            "model: {}",
            model.summary().iter().map(|(kind, count)| format!("{} {}", count, kind)).collect::<Vec<_>>().join(", "),
        );
        model
    }
}

/// Builds the model of the registry's `C` API restricted to `selection`.
pub fn build_model<C>(registry: &vk_parse::Registry, selection: &Selection) -> Result<ApiModel, RegistryError>
where
    C: ApiConfig + ?Sized,
{
    let mut builder = ModelBuilder::<C>::new(registry);
    builder.select(registry, selection)?;
    builder.constants();
    builder.close_types();
    builder.types()?;
    builder.commands(registry)?;
    builder.system_types();
    Ok(builder.finish())
}
