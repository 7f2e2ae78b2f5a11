use std::{fmt, sync::Arc};

use indexmap::{IndexMap, IndexSet};
use parser::types::{BaseType, Type};
use value::{ConstValue, Name};

use crate::resolver::ResolveFn;

pub type ScalarValidator = Arc<dyn Fn(&ConstValue) -> bool + Send + Sync>;

#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub enum Deprecation {
    #[default]
    NoDeprecated,
    Deprecated { reason: Option<String> },
}

impl Deprecation {
    #[inline]
    pub fn is_deprecated(&self) -> bool {
        matches!(self, Deprecation::Deprecated { .. })
    }

    #[inline]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Deprecation::NoDeprecated => None,
            Deprecation::Deprecated { reason } => reason.as_deref(),
        }
    }
}

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

/// The whole schema as visitors see it before it is turned into an executable schema.
#[derive(Debug, Default)]
pub struct SchemaConfig {
    pub query: Option<Name>,
    pub mutation: Option<Name>,
    pub subscription: Option<Name>,
    pub types: IndexMap<Name, TypeConfig>,
}

impl SchemaConfig {
    pub fn query_type(&self) -> Option<&str> {
        self.query.as_ref().map(|name| name.as_str())
    }

    #[inline]
    pub fn get_type(&self, name: &str) -> Option<&TypeConfig> {
        self.types.get(name)
    }

    pub fn object(&self, name: &str) -> Option<&ObjectConfig> {
        match self.types.get(name) {
            Some(TypeConfig::Object(object)) => Some(object),
            _ => None,
        }
    }

    pub fn object_mut(&mut self, name: &str) -> Option<&mut ObjectConfig> {
        match self.types.get_mut(name) {
            Some(TypeConfig::Object(object)) => Some(object),
            _ => None,
        }
    }

    /// Looks up a field on an object or interface type.
    pub fn field(&self, type_name: &str, field_name: &str) -> Option<&FieldConfig> {
        match self.types.get(type_name)? {
            TypeConfig::Object(object) => object.fields.get(field_name),
            TypeConfig::Interface(interface) => interface.fields.get(field_name),
            _ => None,
        }
    }

    pub fn is_abstract(&self, type_name: &str) -> bool {
        matches!(
            self.types.get(type_name),
            Some(TypeConfig::Interface(_)) | Some(TypeConfig::Union(_))
        )
    }
}

#[derive(Debug)]
pub enum TypeConfig {
    Scalar(ScalarConfig),
    Object(ObjectConfig),
    Interface(InterfaceConfig),
    Union(UnionConfig),
    Enum(EnumConfig),
    InputObject(InputObjectConfig),
}

impl TypeConfig {
    pub fn name(&self) -> &Name {
        match self {
            TypeConfig::Scalar(config) => &config.name,
            TypeConfig::Object(config) => &config.name,
            TypeConfig::Interface(config) => &config.name,
            TypeConfig::Union(config) => &config.name,
            TypeConfig::Enum(config) => &config.name,
            TypeConfig::InputObject(config) => &config.name,
        }
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            TypeConfig::Scalar(_) => TypeKind::Scalar,
            TypeConfig::Object(_) => TypeKind::Object,
            TypeConfig::Interface(_) => TypeKind::Interface,
            TypeConfig::Union(_) => TypeKind::Union,
            TypeConfig::Enum(_) => TypeKind::Enum,
            TypeConfig::InputObject(_) => TypeKind::InputObject,
        }
    }
}

#[derive(Clone)]
pub struct ScalarConfig {
    pub name: Name,
    pub description: Option<String>,
    /// Checks input literals and variables. Every value is accepted when unset.
    pub validator: Option<ScalarValidator>,
}

impl fmt::Debug for ScalarConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarConfig")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ObjectConfig {
    pub name: Name,
    pub description: Option<String>,
    pub implements: IndexSet<Name>,
    pub fields: IndexMap<Name, FieldConfig>,
}

#[derive(Clone)]
pub struct FieldConfig {
    pub name: Name,
    pub description: Option<String>,
    pub ty: Type,
    pub arguments: IndexMap<Name, ArgumentConfig>,
    pub deprecation: Deprecation,
    pub resolve: ResolveFn,
}

impl FieldConfig {
    /// The name of the type at the bottom of any list and non-null wrappers.
    pub fn named_type(&self) -> &Name {
        named_type(&self.ty)
    }
}

impl fmt::Debug for FieldConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldConfig")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("ty", &self.ty)
            .field("arguments", &self.arguments)
            .field("deprecation", &self.deprecation)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentConfig {
    pub name: Name,
    pub description: Option<String>,
    pub ty: Type,
    pub default_value: Option<ConstValue>,
}

#[derive(Debug, Clone)]
pub struct InterfaceConfig {
    pub name: Name,
    pub description: Option<String>,
    pub fields: IndexMap<Name, FieldConfig>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionConfig {
    pub name: Name,
    pub description: Option<String>,
    pub possible_types: IndexSet<Name>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumConfig {
    pub name: Name,
    pub description: Option<String>,
    pub values: IndexMap<Name, EnumValueConfig>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValueConfig {
    pub name: Name,
    pub description: Option<String>,
    pub deprecation: Deprecation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputObjectConfig {
    pub name: Name,
    pub description: Option<String>,
    pub fields: IndexMap<Name, InputFieldConfig>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputFieldConfig {
    pub name: Name,
    pub description: Option<String>,
    pub ty: Type,
    pub default_value: Option<ConstValue>,
}

pub(crate) fn named_type(ty: &Type) -> &Name {
    match &ty.base {
        BaseType::Named(name) => name,
        BaseType::List(ty) => named_type(ty),
    }
}
