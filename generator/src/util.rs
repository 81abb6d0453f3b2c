use crate::config::ApiConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumType {
    Bitmask,
    Enum,
}

pub trait EnumsExt {
    fn ty(&self) -> Option<EnumType>;
}

impl EnumsExt for vk_parse::Enums {
    fn ty(&self) -> Option<EnumType> {
        match self.kind.as_deref() {
            Some("bitmask") => Some(EnumType::Bitmask),
            Some("enum") => Some(EnumType::Enum),
            _ => None,
        }
    }
}

#[inline]
fn api_matches<C: ApiConfig + ?Sized>(api: Option<&str>) -> bool {
    api.map_or(true, C::contains_desired_api)
}

pub trait TypeExt {
    /// The `name` attribute, or the `<name>` element for code-style types.
    fn type_name(&self) -> Option<&str>;
    /// The first `<type>` referenced by the type's code.
    fn code_type(&self) -> Option<&str>;
    fn code(&self) -> Option<&str>;
    fn is_for_api<C: ApiConfig + ?Sized>(&self) -> bool;
}

impl TypeExt for vk_parse::Type {
    fn type_name(&self) -> Option<&str> {
        self.name.as_deref().or_else(|| match &self.spec {
            vk_parse::TypeSpec::Code(code) => code.markup.iter()
                .find_map(get_variant!(vk_parse::TypeCodeMarkup::Name))
                .map(String::as_str),
            _ => None,
        })
    }
    fn code_type(&self) -> Option<&str> {
        match &self.spec {
            vk_parse::TypeSpec::Code(code) => code.markup.iter()
                .find_map(get_variant!(vk_parse::TypeCodeMarkup::Type))
                .map(String::as_str),
            _ => None,
        }
    }
    fn code(&self) -> Option<&str> {
        match &self.spec {
            vk_parse::TypeSpec::Code(code) => Some(code.code.as_str()),
            _ => None,
        }
    }
    #[inline(always)]
    fn is_for_api<C: ApiConfig + ?Sized>(&self) -> bool {
        api_matches::<C>(self.api.as_deref())
    }
}

pub trait TypeMemberDefinitionExt {
    fn type_name(&self) -> Option<&str>;
    fn is_for_api<C: ApiConfig + ?Sized>(&self) -> bool;
}

impl TypeMemberDefinitionExt for vk_parse::TypeMemberDefinition {
    fn type_name(&self) -> Option<&str> {
        self.markup.iter()
            .find_map(get_variant!(vk_parse::TypeMemberMarkup::Type))
            .map(AsRef::as_ref)
    }
    #[inline(always)]
    fn is_for_api<C: ApiConfig + ?Sized>(&self) -> bool {
        api_matches::<C>(self.api.as_deref())
    }
}

pub trait ExtensionExt {
    fn is_supported(&self, class: &str) -> bool;
    fn is_disabled(&self) -> bool {
        self.is_supported("disabled")
    }
    fn required_items<'a, C>(&'a self) -> Box<dyn Iterator<Item=&'a vk_parse::InterfaceItem> + 'a>
    where
        C: ApiConfig + ?Sized;
}

/// Interface items of every `require` block that applies to the API.
fn required_items<'a, C>(children: &'a [vk_parse::ExtensionChild]) -> Box<dyn Iterator<Item=&'a vk_parse::InterfaceItem> + 'a>
where
    C: ApiConfig + ?Sized,
{
    let items = children.iter()
        .filter_map(get_variant!(vk_parse::ExtensionChild::Require { api, items }))
        .filter(|(api, _items)| api_matches::<C>(api.as_deref()))
        .flat_map(|(_api, items)| items);
    Box::new(items)
}

impl ExtensionExt for vk_parse::Extension {
    fn is_supported(&self, class: &str) -> bool {
        self.supported.as_deref()
            .map_or(false, |supported| supported.split(',').any(|s| s == class))
    }
    fn required_items<'a, C>(&'a self) -> Box<dyn Iterator<Item=&'a vk_parse::InterfaceItem> + 'a>
    where
        C: ApiConfig + ?Sized,
    {
        required_items::<C>(&self.children)
    }
}

pub trait FeatureExt {
    fn required_items<'a, C>(&'a self) -> Box<dyn Iterator<Item=&'a vk_parse::InterfaceItem> + 'a>
    where
        C: ApiConfig + ?Sized;
}

impl FeatureExt for vk_parse::Feature {
    fn required_items<'a, C>(&'a self) -> Box<dyn Iterator<Item=&'a vk_parse::InterfaceItem> + 'a>
    where
        C: ApiConfig + ?Sized,
    {
        required_items::<C>(&self.children)
    }
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("failed to find extensions child in registry")]
pub struct ExtensionsFindError;

pub trait RegistryExt {
    fn extensions(&self) -> Result<&[vk_parse::Extension], ExtensionsFindError>;
    fn features(&self) -> Box<dyn Iterator<Item=&vk_parse::Feature> + '_>;
    fn types(&self) -> Box<dyn Iterator<Item=&vk_parse::Type> + '_>;
    fn commands(&self) -> Box<dyn Iterator<Item=&vk_parse::Command> + '_>;
    fn enums(&self) -> Box<dyn Iterator<Item=&vk_parse::Enums> + '_>;
}

impl RegistryExt for vk_parse::Registry {
    fn extensions(&self) -> Result<&[vk_parse::Extension], ExtensionsFindError> {
        self.0.iter()
            .find_map(get_variant!(vk_parse::RegistryChild::Extensions))
            .map(|extensions| extensions.children.as_slice())
            .ok_or(ExtensionsFindError)
    }
    fn features(&self) -> Box<dyn Iterator<Item=&vk_parse::Feature> + '_> {
        Box::new(self.0.iter().filter_map(get_variant!(vk_parse::RegistryChild::Feature)))
    }
    fn types(&self) -> Box<dyn Iterator<Item=&vk_parse::Type> + '_> {
        let types = self.0.iter()
            .filter_map(get_variant!(vk_parse::RegistryChild::Types))
            .flat_map(|types| &types.children)
            .filter_map(get_variant!(vk_parse::TypesChild::Type));
        Box::new(types)
    }
    fn commands(&self) -> Box<dyn Iterator<Item=&vk_parse::Command> + '_> {
        let commands = self.0.iter()
            .filter_map(get_variant!(vk_parse::RegistryChild::Commands))
            .flat_map(|commands| &commands.children);
        Box::new(commands)
    }
    fn enums(&self) -> Box<dyn Iterator<Item=&vk_parse::Enums> + '_> {
        Box::new(self.0.iter().filter_map(get_variant!(vk_parse::RegistryChild::Enums)))
    }
}

/// The value a registry `<enum>` defines, with the type it extends if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue<'a> {
    pub value: String,
    pub extends: Option<&'a str>,
    pub is_alias: bool,
    /// Defined by a `value` attribute rather than a single bit.
    pub is_literal: bool,
}

pub fn enum_value(e: &vk_parse::Enum, extension_number: Option<i64>) -> Option<EnumValue<'_>> {
    use vk_parse::EnumSpec;
    let ret = match &e.spec {
        EnumSpec::Alias { alias, extends } => EnumValue {
            value: alias.clone(),
            extends: extends.as_deref(),
            is_alias: true,
            is_literal: false,
        },
        EnumSpec::Offset { offset, extends, extnumber, dir } => {
            let extnumber = extnumber.or(extension_number)?;
            let value = 1_000_000_000 + (extnumber - 1) * 1000 + offset;
            let value = if *dir { value } else { -value };
            EnumValue {
                value: value.to_string(),
                extends: Some(extends.as_str()),
                is_alias: false,
                is_literal: true,
            }
        },
        EnumSpec::Bitpos { bitpos, extends } => EnumValue {
            value: format!("0x{:08x}", 1u64 << bitpos),
            extends: extends.as_deref(),
            is_alias: false,
            is_literal: false,
        },
        EnumSpec::Value { value, extends } => EnumValue {
            value: value.clone(),
            extends: extends.as_deref(),
            is_alias: false,
            is_literal: true,
        },
        _ => return None,
    };
    Some(ret)
}
