#![forbid(unsafe_code)]

mod builder;
mod config;
mod directive_registry;
mod error;
mod executable;
mod resolver;

pub mod directives;

pub use builder::AppliedDirective;
pub use config::{
    ArgumentConfig,
    Deprecation,
    EnumConfig,
    EnumValueConfig,
    FieldConfig,
    InputFieldConfig,
    InputObjectConfig,
    InterfaceConfig,
    ObjectConfig,
    ScalarConfig,
    ScalarValidator,
    SchemaConfig,
    TypeConfig,
    TypeKind,
    UnionConfig,
};
pub use directive_registry::{
    DirectiveArgs,
    DirectiveEntry,
    DirectiveRegistry,
    DirectiveVisitor,
    SchemaElement,
    SharedDirectiveRegistry,
    VisitFn,
    VisitorKind,
};
pub use error::{DirectiveError, SchemaParseError};
pub use executable::ExecutableSchema;
pub use resolver::{
    default_resolver,
    into_field_value,
    resolve_fn,
    value_resolver,
    ResolveFn,
    ResolveFuture,
    ResolveParams,
    ResolverMap,
};
