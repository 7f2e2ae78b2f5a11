use std::{
    any::Any,
    collections::HashMap,
    fmt,
    str::FromStr,
    sync::{Arc, PoisonError, RwLock},
};

use indexmap::IndexMap;
use parser::types::DirectiveLocation;
use value::{ConstValue, Name};

use crate::{
    config::{
        ArgumentConfig,
        EnumConfig,
        EnumValueConfig,
        FieldConfig,
        InputFieldConfig,
        InputObjectConfig,
        InterfaceConfig,
        ObjectConfig,
        ScalarConfig,
        SchemaConfig,
        UnionConfig,
    },
    DirectiveError,
};

/// Arguments of one directive annotation, coerced to the types of the directive definition.
pub type DirectiveArgs = IndexMap<Name, ConstValue>;

/// Callback mutating one kind of schema element.
pub type VisitFn<T> = Arc<dyn Fn(&mut T, &DirectiveArgs) + Send + Sync>;

/// The schema element category a visitor targets.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum VisitorKind {
    Schema,
    Scalar,
    Object,
    FieldDefinition,
    ArgumentDefinition,
    Interface,
    Union,
    Enum,
    EnumValue,
    InputObject,
    InputFieldDefinition,
}

impl VisitorKind {
    pub const ALL: [VisitorKind; 11] = [
        VisitorKind::Schema,
        VisitorKind::Scalar,
        VisitorKind::Object,
        VisitorKind::FieldDefinition,
        VisitorKind::ArgumentDefinition,
        VisitorKind::Interface,
        VisitorKind::Union,
        VisitorKind::Enum,
        VisitorKind::EnumValue,
        VisitorKind::InputObject,
        VisitorKind::InputFieldDefinition,
    ];

    /// The SDL directive location matching this kind.
    pub fn location(self) -> DirectiveLocation {
        match self {
            VisitorKind::Schema => DirectiveLocation::Schema,
            VisitorKind::Scalar => DirectiveLocation::Scalar,
            VisitorKind::Object => DirectiveLocation::Object,
            VisitorKind::FieldDefinition => DirectiveLocation::FieldDefinition,
            VisitorKind::ArgumentDefinition => DirectiveLocation::ArgumentDefinition,
            VisitorKind::Interface => DirectiveLocation::Interface,
            VisitorKind::Union => DirectiveLocation::Union,
            VisitorKind::Enum => DirectiveLocation::Enum,
            VisitorKind::EnumValue => DirectiveLocation::EnumValue,
            VisitorKind::InputObject => DirectiveLocation::InputObject,
            VisitorKind::InputFieldDefinition => DirectiveLocation::InputFieldDefinition,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VisitorKind::Schema => "SCHEMA",
            VisitorKind::Scalar => "SCALAR",
            VisitorKind::Object => "OBJECT",
            VisitorKind::FieldDefinition => "FIELD_DEFINITION",
            VisitorKind::ArgumentDefinition => "ARGUMENT_DEFINITION",
            VisitorKind::Interface => "INTERFACE",
            VisitorKind::Union => "UNION",
            VisitorKind::Enum => "ENUM",
            VisitorKind::EnumValue => "ENUM_VALUE",
            VisitorKind::InputObject => "INPUT_OBJECT",
            VisitorKind::InputFieldDefinition => "INPUT_FIELD_DEFINITION",
        }
    }
}

impl fmt::Display for VisitorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisitorKind {
    type Err = DirectiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VisitorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DirectiveError::InvalidDirectiveKind(s.to_string()))
    }
}

/// A schema directive visitor. The variant states which schema element it mutates.
#[derive(Clone)]
pub enum DirectiveVisitor {
    Schema(VisitFn<SchemaConfig>),
    Scalar(VisitFn<ScalarConfig>),
    Object(VisitFn<ObjectConfig>),
    FieldDefinition(VisitFn<FieldConfig>),
    ArgumentDefinition(VisitFn<ArgumentConfig>),
    Interface(VisitFn<InterfaceConfig>),
    Union(VisitFn<UnionConfig>),
    Enum(VisitFn<EnumConfig>),
    EnumValue(VisitFn<EnumValueConfig>),
    InputObject(VisitFn<InputObjectConfig>),
    InputFieldDefinition(VisitFn<InputFieldConfig>),
}

impl fmt::Debug for DirectiveVisitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DirectiveVisitor({})", self.kind())
    }
}

/// A schema element configuration a visitor can be applied to.
pub trait SchemaElement: Sized + 'static {
    const KIND: VisitorKind;

    /// Returns the callback when the visitor targets this kind of element.
    fn select(visitor: &DirectiveVisitor) -> Option<&VisitFn<Self>>;
}

macro_rules! schema_elements {
    ($($variant:ident => $config:ty, $ctor:ident;)*) => {
        impl DirectiveVisitor {
            pub fn kind(&self) -> VisitorKind {
                match self {
                    $(DirectiveVisitor::$variant(_) => VisitorKind::$variant,)*
                }
            }

            $(
                pub fn $ctor<F>(f: F) -> Self
                where
                    F: Fn(&mut $config, &DirectiveArgs) + Send + Sync + 'static,
                {
                    DirectiveVisitor::$variant(Arc::new(f))
                }
            )*

            /// Classifies a type-erased callback by its exact callback type.
            pub fn from_any(name: &str, value: Box<dyn Any + Send + Sync>, type_name: &'static str) -> Result<Self, DirectiveError> {
                let value = match value.downcast::<DirectiveVisitor>() {
                    Ok(visitor) => return Ok(*visitor),
                    Err(value) => value,
                };
                $(
                    let value = match value.downcast::<VisitFn<$config>>() {
                        Ok(visit) => return Ok(DirectiveVisitor::$variant(*visit)),
                        Err(value) => value,
                    };
                )*
                drop(value);
                Err(DirectiveError::UnrecognizedDirectiveSignature {
                    name: name.to_string(),
                    type_name,
                })
            }
        }

        $(
            impl SchemaElement for $config {
                const KIND: VisitorKind = VisitorKind::$variant;

                fn select(visitor: &DirectiveVisitor) -> Option<&VisitFn<Self>> {
                    match visitor {
                        DirectiveVisitor::$variant(visit) => Some(visit),
                        _ => None,
                    }
                }
            }
        )*
    };
}

schema_elements! {
    Schema => SchemaConfig, schema;
    Scalar => ScalarConfig, scalar;
    Object => ObjectConfig, object;
    FieldDefinition => FieldConfig, field_definition;
    ArgumentDefinition => ArgumentConfig, argument_definition;
    Interface => InterfaceConfig, interface;
    Union => UnionConfig, union;
    Enum => EnumConfig, enumeration;
    EnumValue => EnumValueConfig, enum_value;
    InputObject => InputObjectConfig, input_object;
    InputFieldDefinition => InputFieldConfig, input_field_definition;
}

#[derive(Debug, Clone)]
pub struct DirectiveEntry {
    pub name: String,
    pub visitor: DirectiveVisitor,
}

impl DirectiveEntry {
    #[inline]
    pub fn kind(&self) -> VisitorKind {
        self.visitor.kind()
    }
}

/// Directive name to visitor mapping.
#[derive(Debug, Default, Clone)]
pub struct DirectiveRegistry {
    entries: HashMap<String, DirectiveEntry>,
}

impl DirectiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry seeded with `builtins`, registered in iteration order.
    pub fn with_builtins<N>(builtins: impl IntoIterator<Item = (N, DirectiveVisitor)>) -> Result<Self, DirectiveError>
    where
        N: Into<String>,
    {
        let mut registry = Self::new();
        for (name, visitor) in builtins {
            registry.register(name, visitor)?;
        }
        Ok(registry)
    }

    /// Inserts the visitor under `name`, replacing any previous entry of that name.
    pub fn register(&mut self, name: impl Into<String>, visitor: DirectiveVisitor) -> Result<(), DirectiveError> {
        let name = name.into();
        if name.is_empty() {
            return Err(DirectiveError::EmptyDirectiveName);
        }
        tracing::debug!(directive = %name, kind = %visitor.kind(), "Register directive visitor.");
        self.entries.insert(name.clone(), DirectiveEntry { name, visitor });
        Ok(())
    }

    /// Registers a type-erased callback.
    ///
    /// `value` must be a [`DirectiveVisitor`] or a [`VisitFn`] of one of the schema element
    /// configurations. Anything else is rejected and the registry is left untouched.
    pub fn register_erased<T>(&mut self, name: impl Into<String>, value: T) -> Result<(), DirectiveError>
    where
        T: Any + Send + Sync,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(DirectiveError::EmptyDirectiveName);
        }
        let visitor = DirectiveVisitor::from_any(&name, Box::new(value), std::any::type_name::<T>())?;
        self.register(name, visitor)
    }

    pub fn unregister(&mut self, name: &str) -> Option<DirectiveEntry> {
        self.entries.remove(name)
    }

    #[inline]
    pub fn exists(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&DirectiveEntry> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A directive registry shared between request handlers and administrative callers.
///
/// Readers work on an immutable snapshot; writers copy the registry when a snapshot is
/// still in use, so an in-flight resolution never observes a half-applied change.
#[derive(Clone, Default)]
pub struct SharedDirectiveRegistry(Arc<RwLock<Arc<DirectiveRegistry>>>);

impl SharedDirectiveRegistry {
    pub fn new(registry: DirectiveRegistry) -> Self {
        Self(Arc::new(RwLock::new(Arc::new(registry))))
    }

    pub fn snapshot(&self) -> Arc<DirectiveRegistry> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn update<R>(&self, f: impl FnOnce(&mut DirectiveRegistry) -> R) -> R {
        let mut registry = self.0.write().unwrap_or_else(PoisonError::into_inner);
        f(Arc::make_mut(&mut registry))
    }

    pub fn register(&self, name: impl Into<String>, visitor: DirectiveVisitor) -> Result<(), DirectiveError> {
        self.update(|registry| registry.register(name, visitor))
    }

    pub fn register_erased<T>(&self, name: impl Into<String>, value: T) -> Result<(), DirectiveError>
    where
        T: Any + Send + Sync,
    {
        self.update(|registry| registry.register_erased(name, value))
    }

    pub fn unregister(&self, name: &str) -> Option<DirectiveEntry> {
        self.update(|registry| registry.unregister(name))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.snapshot().exists(name)
    }
}

impl fmt::Debug for SharedDirectiveRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedDirectiveRegistry").field(&self.snapshot()).finish()
    }
}
