use async_graphql::{
    dynamic::{
        Enum,
        EnumItem,
        Field,
        FieldFuture,
        InputObject,
        InputValue,
        Interface,
        InterfaceField,
        Object,
        Scalar,
        Schema,
        TypeRef,
        Union,
    },
    Request,
    Response,
};
use parser::types::{BaseType, Type};
use tracing::instrument;

use crate::{
    builder::{build, AppliedDirective},
    config::{ArgumentConfig, FieldConfig, InputFieldConfig, SchemaConfig, TypeConfig},
    directive_registry::DirectiveRegistry,
    resolver::{ResolveParams, ResolverMap},
    SchemaParseError,
};

const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// A schema document with every registered directive applied, ready to execute queries.
pub struct ExecutableSchema {
    schema: Schema,
    applied: Vec<AppliedDirective>,
}

impl ExecutableSchema {
    /// Parses `sdl`, applies the visitors of `registry` and builds the executable schema.
    ///
    /// Failures are logged at error level before they are returned.
    #[instrument(skip_all, level = "debug")]
    pub fn resolve(sdl: &str, registry: &DirectiveRegistry, resolvers: &ResolverMap) -> Result<Self, SchemaParseError> {
        let result = parser::parse_schema(sdl)
            .map_err(SchemaParseError::from)
            .and_then(|document| build(&document, registry, resolvers))
            .and_then(|(config, applied)| Self::from_config(config, applied));
        if let Err(err) = &result {
            tracing::error!(error = %err, "Failed to resolve schema.");
        }
        result
    }

    fn from_config(config: SchemaConfig, applied: Vec<AppliedDirective>) -> Result<Self, SchemaParseError> {
        let query = config
            .query
            .as_ref()
            .ok_or_else(|| SchemaParseError::semantic("The schema does not define a query root type."))?;
        if let Some(subscription) = &config.subscription {
            tracing::warn!(subscription = %subscription, "Subscriptions are not served, the root type is ignored.");
        }

        let mut builder = Schema::build(query.as_str(), config.mutation.as_ref().map(|name| name.as_str()), None);
        for (name, ty) in config.types {
            if config.subscription.as_ref() == Some(&name) {
                continue;
            }
            builder = match ty {
                TypeConfig::Scalar(scalar) => {
                    if BUILTIN_SCALARS.contains(&scalar.name.as_str()) {
                        continue;
                    }
                    let mut dynamic = Scalar::new(scalar.name.as_str());
                    if let Some(description) = scalar.description {
                        dynamic = dynamic.description(description);
                    }
                    if let Some(validator) = scalar.validator {
                        dynamic = dynamic.validator(move |value| validator(value));
                    }
                    builder.register(dynamic)
                }
                TypeConfig::Object(object) => {
                    let mut dynamic = Object::new(object.name.as_str());
                    if let Some(description) = object.description {
                        dynamic = dynamic.description(description);
                    }
                    for interface in &object.implements {
                        dynamic = dynamic.implement(interface.as_str());
                    }
                    for field in object.fields.into_values() {
                        dynamic = dynamic.field(into_field(field));
                    }
                    builder.register(dynamic)
                }
                TypeConfig::Interface(interface) => {
                    let mut dynamic = Interface::new(interface.name.as_str());
                    if let Some(description) = interface.description {
                        dynamic = dynamic.description(description);
                    }
                    for field in interface.fields.into_values() {
                        dynamic = dynamic.field(into_interface_field(field));
                    }
                    builder.register(dynamic)
                }
                TypeConfig::Union(union) => {
                    let mut dynamic = Union::new(union.name.as_str());
                    if let Some(description) = union.description {
                        dynamic = dynamic.description(description);
                    }
                    for possible_type in &union.possible_types {
                        dynamic = dynamic.possible_type(possible_type.as_str());
                    }
                    builder.register(dynamic)
                }
                TypeConfig::Enum(enum_type) => {
                    let mut dynamic = Enum::new(enum_type.name.as_str());
                    if let Some(description) = enum_type.description {
                        dynamic = dynamic.description(description);
                    }
                    for value in enum_type.values.into_values() {
                        let mut item = EnumItem::new(value.name.as_str());
                        if let Some(description) = value.description {
                            item = item.description(description);
                        }
                        if value.deprecation.is_deprecated() {
                            item = item.deprecation(value.deprecation.reason());
                        }
                        dynamic = dynamic.item(item);
                    }
                    builder.register(dynamic)
                }
                TypeConfig::InputObject(input_object) => {
                    let mut dynamic = InputObject::new(input_object.name.as_str());
                    if let Some(description) = input_object.description {
                        dynamic = dynamic.description(description);
                    }
                    for field in input_object.fields.into_values() {
                        dynamic = dynamic.field(into_input_field(field));
                    }
                    builder.register(dynamic)
                }
            };
        }

        let schema = builder
            .finish()
            .map_err(|err| SchemaParseError::semantic(err.to_string()))?;
        Ok(Self { schema, applied })
    }

    /// Executes one GraphQL request. Field errors are part of the returned response.
    pub async fn execute(&self, request: impl Into<Request>) -> Response {
        self.schema.execute(request).await
    }

    /// The SDL of the executable schema, directives applied.
    pub fn sdl(&self) -> String {
        self.schema.sdl()
    }

    /// Every visitor invocation of the resolution, in application order.
    pub fn applied_directives(&self) -> &[AppliedDirective] {
        &self.applied
    }
}

/// Errors of nullable fields are recorded at the field's path and resolve to null, so that
/// sibling fields keep their data.
fn into_field(field: FieldConfig) -> Field {
    let resolve = field.resolve;
    let nullable = field.ty.nullable;
    let mut dynamic = Field::new(field.name.as_str(), type_ref(&field.ty), move |ctx| {
        let context = ctx.ctx;
        let future = resolve(ResolveParams::new(ctx));
        FieldFuture::new(async move {
            match future.await {
                Err(err) if nullable => {
                    context.add_error(context.set_error_path(err.into_server_error(context.item.pos)));
                    Ok(None)
                }
                result => result,
            }
        })
    });
    if let Some(description) = field.description {
        dynamic = dynamic.description(description);
    }
    if field.deprecation.is_deprecated() {
        dynamic = dynamic.deprecation(field.deprecation.reason());
    }
    for argument in field.arguments.into_values() {
        dynamic = dynamic.argument(into_argument(argument));
    }
    dynamic
}

fn into_interface_field(field: FieldConfig) -> InterfaceField {
    let mut dynamic = InterfaceField::new(field.name.as_str(), type_ref(&field.ty));
    if let Some(description) = field.description {
        dynamic = dynamic.description(description);
    }
    for argument in field.arguments.into_values() {
        dynamic = dynamic.argument(into_argument(argument));
    }
    dynamic
}

fn into_argument(argument: ArgumentConfig) -> InputValue {
    let mut dynamic = InputValue::new(argument.name.as_str(), type_ref(&argument.ty));
    if let Some(description) = argument.description {
        dynamic = dynamic.description(description);
    }
    if let Some(default_value) = argument.default_value {
        dynamic = dynamic.default_value(default_value);
    }
    dynamic
}

fn into_input_field(field: InputFieldConfig) -> InputValue {
    into_argument(ArgumentConfig {
        name: field.name,
        description: field.description,
        ty: field.ty,
        default_value: field.default_value,
    })
}

fn type_ref(ty: &Type) -> TypeRef {
    let base = match &ty.base {
        BaseType::Named(name) => TypeRef::named(name.as_str()),
        BaseType::List(item) => TypeRef::List(Box::new(type_ref(item))),
    };
    if ty.nullable {
        base
    } else {
        TypeRef::NonNull(Box::new(base))
    }
}

#[cfg(test)]
mod tests {
    use async_graphql::{value, PathSegment};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::resolver::value_resolver;

    #[test]
    fn type_ref_keeps_wrappers() {
        assert_eq!(type_ref(&Type::new("[Roles!]!").unwrap()).to_string(), "[Roles!]!");
        assert_eq!(type_ref(&Type::new("User").unwrap()).to_string(), "User");
        assert_eq!(type_ref(&Type::new("[[ID]]").unwrap()).to_string(), "[[ID]]");
    }

    #[tokio::test]
    async fn resolves_and_executes() {
        let schema = ExecutableSchema::resolve(
            "type Query { hello: String }",
            &DirectiveRegistry::new(),
            &ResolverMap::new(),
        )
        .unwrap();
        let response = schema.execute("{ hello }").await;
        assert!(response.errors.is_empty());
        assert_eq!(response.data, value!({ "hello": null }));
        assert!(schema.sdl().contains("hello: String"));
    }

    #[tokio::test]
    async fn nullable_field_error_keeps_sibling_data() {
        let resolvers = ResolverMap::new()
            .with("Query", "ok", value_resolver(|_| Ok(Some(value!("fine")))))
            .with(
                "Query",
                "broken",
                value_resolver(|_| Err(async_graphql::Error::new("broken field"))),
            )
            .with(
                "Query",
                "required",
                value_resolver(|_| Err(async_graphql::Error::new("required field"))),
            );
        let schema = ExecutableSchema::resolve(
            "type Query { ok: String broken: Int required: Int! }",
            &DirectiveRegistry::new(),
            &resolvers,
        )
        .unwrap();

        let response = schema.execute("{ ok broken }").await;
        assert_eq!(response.data, value!({ "ok": "fine", "broken": null }));
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].message, "broken field");
        assert_eq!(
            response.errors[0].path,
            vec![PathSegment::Field("broken".to_string())]
        );

        let response = schema.execute("{ ok required }").await;
        assert_eq!(response.data, value!(null));
        assert_eq!(response.errors[0].message, "required field");
    }

    #[test]
    fn subscription_root_is_dropped() {
        let schema = ExecutableSchema::resolve(
            "type Query { a: Int } type Subscription { ticks: Int }",
            &DirectiveRegistry::new(),
            &ResolverMap::new(),
        )
        .unwrap();
        assert!(!schema.sdl().contains("ticks"));
    }
}
