use std::collections::HashMap;

use indexmap::IndexMap;
use parser::{
    types::{
        BaseType,
        ConstDirective,
        DirectiveDefinition,
        EnumValueDefinition,
        FieldDefinition,
        InputValueDefinition,
        SchemaDefinition,
        ServiceDocument,
        Type,
        TypeDefinition,
        TypeKind,
        TypeSystemDefinition,
    },
    Positioned,
};
use value::{ConstValue, Name, Number};

use crate::{
    config::{
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
        SchemaConfig,
        TypeConfig,
        UnionConfig,
    },
    directive_registry::{DirectiveArgs, DirectiveRegistry, SchemaElement, VisitorKind},
    resolver::{default_resolver, ResolverMap},
    SchemaParseError,
};

type Result<T> = std::result::Result<T, SchemaParseError>;

/// One directive visitor invocation performed while resolving a schema.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AppliedDirective {
    pub directive: Name,
    pub kind: VisitorKind,
    /// `Type`, `Type.field`, `Type.field(arg:)`, `Enum.VALUE` or `schema`.
    pub coordinate: String,
}

/// Builds element configurations and applies directive visitors to them, remembering
/// every visitor it invoked.
struct ElementVisitor<'a> {
    registry: &'a DirectiveRegistry,
    resolvers: &'a ResolverMap,
    definitions: HashMap<Name, &'a DirectiveDefinition>,
    applied: Vec<AppliedDirective>,
}

impl<'a> ElementVisitor<'a> {
    fn apply<'d, T: SchemaElement>(
        &mut self,
        coordinate: &str,
        directives: impl IntoIterator<Item = &'d Positioned<ConstDirective>>,
        element: &mut T,
    ) {
        let registry = self.registry;
        for directive in directives {
            let directive = &directive.node;
            let name = &directive.name.node;

            let Some(entry) = registry.get(name.as_str()) else {
                tracing::trace!(directive = %name, coordinate, "No visitor registered, directive ignored.");
                continue;
            };
            let Some(visit) = T::select(&entry.visitor) else {
                tracing::debug!(
                    directive = %name,
                    coordinate,
                    location = %T::KIND,
                    registered = %entry.kind(),
                    "Directive visitor targets another kind of schema element."
                );
                continue;
            };

            let definition = self.definitions.get(name.as_str()).copied();
            if let Some(definition) = definition {
                if !definition
                    .locations
                    .iter()
                    .any(|location| location.node == T::KIND.location())
                {
                    tracing::warn!(
                        directive = %name,
                        coordinate,
                        location = %T::KIND,
                        "Directive is not declared for this location."
                    );
                }
            }

            let args = coerce_arguments(directive, definition);
            visit(element, &args);
            self.applied.push(AppliedDirective {
                directive: name.clone(),
                kind: T::KIND,
                coordinate: coordinate.to_string(),
            });
        }
    }

    fn build_fields(
        &self,
        parent: &Name,
        definitions: &[Positioned<FieldDefinition>],
        existing: &IndexMap<Name, FieldConfig>,
    ) -> Result<IndexMap<Name, FieldConfig>> {
        let mut fields = IndexMap::new();
        for definition in definitions {
            let field = self.build_field(parent, &definition.node);
            if existing.contains_key(&field.name) || fields.contains_key(&field.name) {
                return Err(SchemaParseError::semantic(format!(
                    "Field '{parent}.{}' is defined more than once.",
                    field.name
                )));
            }
            fields.insert(field.name.clone(), field);
        }
        Ok(fields)
    }

    fn build_field(&self, parent: &Name, definition: &FieldDefinition) -> FieldConfig {
        let name = definition.name.node.clone();

        let arguments = definition
            .arguments
            .iter()
            .map(|argument| {
                let argument = &argument.node;
                let config = ArgumentConfig {
                    name: argument.name.node.clone(),
                    description: argument.description.as_ref().map(|description| description.node.clone()),
                    ty: argument.ty.node.clone(),
                    default_value: argument.default_value.as_ref().map(|value| value.node.clone()),
                };
                (config.name.clone(), config)
            })
            .collect();

        let resolve = self
            .resolvers
            .get(parent, &name)
            .cloned()
            .unwrap_or_else(|| default_resolver(name.clone()));

        FieldConfig {
            name,
            description: definition.description.as_ref().map(|description| description.node.clone()),
            ty: definition.ty.node.clone(),
            arguments,
            deprecation: get_deprecated(&definition.directives),
            resolve,
        }
    }

    fn build_enum_values(
        &self,
        parent: &Name,
        definitions: &[Positioned<EnumValueDefinition>],
        existing: &IndexMap<Name, EnumValueConfig>,
    ) -> Result<IndexMap<Name, EnumValueConfig>> {
        let mut values = IndexMap::new();
        for definition in definitions {
            let definition = &definition.node;
            let value = EnumValueConfig {
                name: definition.value.node.clone(),
                description: definition.description.as_ref().map(|description| description.node.clone()),
                deprecation: get_deprecated(&definition.directives),
            };
            if existing.contains_key(&value.name) || values.contains_key(&value.name) {
                return Err(SchemaParseError::semantic(format!(
                    "Enum value '{parent}.{}' is defined more than once.",
                    value.name
                )));
            }
            values.insert(value.name.clone(), value);
        }
        Ok(values)
    }

    fn build_input_fields(
        &self,
        parent: &Name,
        definitions: &[Positioned<InputValueDefinition>],
        existing: &IndexMap<Name, InputFieldConfig>,
    ) -> Result<IndexMap<Name, InputFieldConfig>> {
        let mut fields = IndexMap::new();
        for definition in definitions {
            let definition = &definition.node;
            let field = InputFieldConfig {
                name: definition.name.node.clone(),
                description: definition.description.as_ref().map(|description| description.node.clone()),
                ty: definition.ty.node.clone(),
                default_value: definition.default_value.as_ref().map(|value| value.node.clone()),
            };
            if existing.contains_key(&field.name) || fields.contains_key(&field.name) {
                return Err(SchemaParseError::semantic(format!(
                    "Input field '{parent}.{}' is defined more than once.",
                    field.name
                )));
            }
            fields.insert(field.name.clone(), field);
        }
        Ok(fields)
    }
}

impl<'a> ElementVisitor<'a> {
    /// Applies the directives of `definitions` to the fields built from them, each field
    /// before its arguments.
    fn visit_fields(
        &mut self,
        parent: &Name,
        definitions: &[Positioned<FieldDefinition>],
        fields: &mut IndexMap<Name, FieldConfig>,
    ) {
        for definition in definitions {
            let definition = &definition.node;
            let Some(field) = fields.get_mut(&definition.name.node) else {
                continue;
            };
            let coordinate = format!("{parent}.{}", definition.name.node);
            self.apply(&coordinate, &definition.directives, field);
            for argument in &definition.arguments {
                let argument = &argument.node;
                if let Some(config) = field.arguments.get_mut(&argument.name.node) {
                    self.apply(
                        &format!("{coordinate}({}:)", argument.name.node),
                        &argument.directives,
                        config,
                    );
                }
            }
        }
    }

    fn visit_enum_values(
        &mut self,
        parent: &Name,
        definitions: &[Positioned<EnumValueDefinition>],
        values: &mut IndexMap<Name, EnumValueConfig>,
    ) {
        for definition in definitions {
            let definition = &definition.node;
            if let Some(value) = values.get_mut(&definition.value.node) {
                self.apply(
                    &format!("{parent}.{}", definition.value.node),
                    &definition.directives,
                    value,
                );
            }
        }
    }

    fn visit_input_fields(
        &mut self,
        parent: &Name,
        definitions: &[Positioned<InputValueDefinition>],
        fields: &mut IndexMap<Name, InputFieldConfig>,
    ) {
        for definition in definitions {
            let definition = &definition.node;
            if let Some(field) = fields.get_mut(&definition.name.node) {
                self.apply(
                    &format!("{parent}.{}", definition.name.node),
                    &definition.directives,
                    field,
                );
            }
        }
    }
}

struct SchemaBuilder<'a> {
    elements: ElementVisitor<'a>,
    config: SchemaConfig,
    schema_defined: bool,
}

/// Walks the document in order, building element configurations and applying visitors.
pub(crate) fn build(
    document: &ServiceDocument,
    registry: &DirectiveRegistry,
    resolvers: &ResolverMap,
) -> Result<(SchemaConfig, Vec<AppliedDirective>)> {
    let definitions = document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            TypeSystemDefinition::Directive(directive) => Some((directive.node.name.node.clone(), &directive.node)),
            _ => None,
        })
        .collect();

    let mut builder = SchemaBuilder {
        elements: ElementVisitor {
            registry,
            resolvers,
            definitions,
            applied: Vec::new(),
        },
        config: SchemaConfig::default(),
        schema_defined: false,
    };
    let mut schema_directives = Vec::new();

    for definition in &document.definitions {
        match definition {
            TypeSystemDefinition::Schema(schema) => {
                builder.merge_schema_definition(&schema.node)?;
                schema_directives.extend(schema.node.directives.iter());
            }
            TypeSystemDefinition::Type(type_definition) => {
                if type_definition.node.extend {
                    builder.extend_type(&type_definition.node)?;
                } else {
                    builder.add_type(&type_definition.node)?;
                }
            }
            TypeSystemDefinition::Directive(_) => {}
        }
    }

    builder.finish(schema_directives)
}

impl<'a> SchemaBuilder<'a> {
    fn merge_schema_definition(&mut self, schema: &SchemaDefinition) -> Result<()> {
        if !schema.extend {
            if self.schema_defined {
                return Err(SchemaParseError::semantic("The schema definition is given more than once."));
            }
            self.schema_defined = true;
        }
        if let Some(query) = &schema.query {
            self.config.query = Some(query.node.clone());
        }
        if let Some(mutation) = &schema.mutation {
            self.config.mutation = Some(mutation.node.clone());
        }
        if let Some(subscription) = &schema.subscription {
            self.config.subscription = Some(subscription.node.clone());
        }
        Ok(())
    }

    fn add_type(&mut self, definition: &TypeDefinition) -> Result<()> {
        let name = definition.name.node.clone();
        if self.config.types.contains_key(&name) {
            return Err(SchemaParseError::semantic(format!("Type '{name}' is defined more than once.")));
        }
        let description = definition.description.as_ref().map(|description| description.node.clone());

        let config = match &definition.kind {
            TypeKind::Scalar => {
                let mut scalar = ScalarConfig {
                    name,
                    description,
                    validator: None,
                };
                self.elements.apply(&definition.name.node, &definition.directives, &mut scalar);
                TypeConfig::Scalar(scalar)
            }
            TypeKind::Object(object_type) => {
                let mut object = ObjectConfig {
                    fields: self.elements.build_fields(&name, &object_type.fields, &IndexMap::new())?,
                    name,
                    description,
                    implements: object_type.implements.iter().map(|name| name.node.clone()).collect(),
                };
                self.elements.apply(&definition.name.node, &definition.directives, &mut object);
                self.elements
                    .visit_fields(&definition.name.node, &object_type.fields, &mut object.fields);
                TypeConfig::Object(object)
            }
            TypeKind::Interface(interface_type) => {
                let mut interface = InterfaceConfig {
                    fields: self.elements.build_fields(&name, &interface_type.fields, &IndexMap::new())?,
                    name,
                    description,
                };
                self.elements.apply(&definition.name.node, &definition.directives, &mut interface);
                self.elements
                    .visit_fields(&definition.name.node, &interface_type.fields, &mut interface.fields);
                TypeConfig::Interface(interface)
            }
            TypeKind::Union(union) => {
                let mut union = UnionConfig {
                    name,
                    description,
                    possible_types: union.members.iter().map(|member| member.node.clone()).collect(),
                };
                self.elements.apply(&definition.name.node, &definition.directives, &mut union);
                TypeConfig::Union(union)
            }
            TypeKind::Enum(enum_type) => {
                let mut enum_config = EnumConfig {
                    values: self.elements.build_enum_values(&name, &enum_type.values, &IndexMap::new())?,
                    name,
                    description,
                };
                self.elements.apply(&definition.name.node, &definition.directives, &mut enum_config);
                self.elements
                    .visit_enum_values(&definition.name.node, &enum_type.values, &mut enum_config.values);
                TypeConfig::Enum(enum_config)
            }
            TypeKind::InputObject(input_type) => {
                let mut input_object = InputObjectConfig {
                    fields: self.elements.build_input_fields(&name, &input_type.fields, &IndexMap::new())?,
                    name,
                    description,
                };
                self.elements.apply(&definition.name.node, &definition.directives, &mut input_object);
                self.elements
                    .visit_input_fields(&definition.name.node, &input_type.fields, &mut input_object.fields);
                TypeConfig::InputObject(input_object)
            }
        };

        let name = config.name().clone();
        if self.config.types.insert(name.clone(), config).is_some() {
            return Err(SchemaParseError::semantic(format!("Type '{name}' is defined more than once.")));
        }
        Ok(())
    }

    /// Merges an `extend` definition into the type it extends.
    fn extend_type(&mut self, definition: &TypeDefinition) -> Result<()> {
        let name = &definition.name.node;
        let directives = &definition.directives;

        match (&definition.kind, self.config.types.get_mut(name)) {
            (TypeKind::Scalar, Some(TypeConfig::Scalar(existing))) => {
                self.elements.apply(name, directives, existing);
            }
            (TypeKind::Object(object), Some(TypeConfig::Object(existing))) => {
                let fields = self.elements.build_fields(name, &object.fields, &existing.fields)?;
                existing.fields.extend(fields);
                existing
                    .implements
                    .extend(object.implements.iter().map(|name| name.node.clone()));
                self.elements.apply(name, directives, existing);
                self.elements.visit_fields(name, &object.fields, &mut existing.fields);
            }
            (TypeKind::Interface(interface), Some(TypeConfig::Interface(existing))) => {
                let fields = self.elements.build_fields(name, &interface.fields, &existing.fields)?;
                existing.fields.extend(fields);
                self.elements.apply(name, directives, existing);
                self.elements.visit_fields(name, &interface.fields, &mut existing.fields);
            }
            (TypeKind::Union(union), Some(TypeConfig::Union(existing))) => {
                existing
                    .possible_types
                    .extend(union.members.iter().map(|member| member.node.clone()));
                self.elements.apply(name, directives, existing);
            }
            (TypeKind::Enum(enum_type), Some(TypeConfig::Enum(existing))) => {
                let values = self.elements.build_enum_values(name, &enum_type.values, &existing.values)?;
                existing.values.extend(values);
                self.elements.apply(name, directives, existing);
                self.elements.visit_enum_values(name, &enum_type.values, &mut existing.values);
            }
            (TypeKind::InputObject(input_object), Some(TypeConfig::InputObject(existing))) => {
                let fields = self
                    .elements
                    .build_input_fields(name, &input_object.fields, &existing.fields)?;
                existing.fields.extend(fields);
                self.elements.apply(name, directives, existing);
                self.elements
                    .visit_input_fields(name, &input_object.fields, &mut existing.fields);
            }
            (_, Some(existing)) => {
                return Err(SchemaParseError::semantic(format!(
                    "Type '{name}' is a {:?} and cannot be extended as another kind.",
                    existing.kind()
                )));
            }
            (_, None) => {
                return Err(SchemaParseError::semantic(format!("Cannot extend unknown type '{name}'.")));
            }
        }
        Ok(())
    }

    fn finish<'d>(
        mut self,
        schema_directives: impl IntoIterator<Item = &'d Positioned<ConstDirective>>,
    ) -> Result<(SchemaConfig, Vec<AppliedDirective>)> {
        let config = &mut self.config;
        for (root, default_name) in [
            (&mut config.query, "Query"),
            (&mut config.mutation, "Mutation"),
            (&mut config.subscription, "Subscription"),
        ] {
            if root.is_none() && config.types.contains_key(default_name) {
                *root = Some(Name::new(default_name));
            }
        }

        self.elements.apply("schema", schema_directives, &mut self.config);

        match self.config.query_type() {
            Some(query) if self.config.object(query).is_some() => {}
            Some(query) => {
                return Err(SchemaParseError::semantic(format!(
                    "Query root type '{query}' is not defined as an object type."
                )));
            }
            None => return Err(SchemaParseError::semantic("The schema does not define a query root type.")),
        }
        if let Some(mutation) = &self.config.mutation {
            if self.config.object(mutation).is_none() {
                return Err(SchemaParseError::semantic(format!(
                    "Mutation root type '{mutation}' is not defined as an object type."
                )));
            }
        }

        Ok((self.config, self.elements.applied))
    }
}

fn get_argument<'a>(arguments: &'a [(Positioned<Name>, Positioned<ConstValue>)], name: &str) -> Option<&'a ConstValue> {
    arguments
        .iter()
        .find_map(|(arg_name, value)| (arg_name.node.as_str() == name).then_some(&value.node))
}

fn get_deprecated(directives: &[Positioned<ConstDirective>]) -> Deprecation {
    directives
        .iter()
        .find(|directive| directive.node.name.node.as_str() == "deprecated")
        .map(|directive| Deprecation::Deprecated {
            reason: match get_argument(&directive.node.arguments, "reason") {
                Some(ConstValue::String(reason)) => Some(reason.clone()),
                _ => None,
            },
        })
        .unwrap_or(Deprecation::NoDeprecated)
}

/// Collects annotation arguments, filling in defaults and coercing to the declared types.
fn coerce_arguments(directive: &ConstDirective, definition: Option<&DirectiveDefinition>) -> DirectiveArgs {
    let mut args: DirectiveArgs = directive
        .arguments
        .iter()
        .map(|(name, value)| (name.node.clone(), value.node.clone()))
        .collect();

    let Some(definition) = definition else {
        return args;
    };
    for input in &definition.arguments {
        let input = &input.node;
        match args.get_mut(&input.name.node) {
            Some(value) => {
                let given = std::mem::replace(value, ConstValue::Null);
                *value = coerce_value(given, &input.ty.node);
            }
            None => {
                if let Some(default_value) = &input.default_value {
                    args.insert(input.name.node.clone(), default_value.node.clone());
                }
            }
        }
    }
    args
}

fn coerce_value(value: ConstValue, ty: &Type) -> ConstValue {
    match (&ty.base, value) {
        (_, ConstValue::Null) => ConstValue::Null,
        (BaseType::List(item_ty), ConstValue::List(items)) => ConstValue::List(
            items
                .into_iter()
                .map(|item| coerce_value(item, item_ty))
                .collect(),
        ),
        (BaseType::List(item_ty), value) => ConstValue::List(vec![coerce_value(value, item_ty)]),
        (BaseType::Named(name), ConstValue::Number(number)) if name.as_str() == "Float" => {
            match number.as_f64().and_then(Number::from_f64) {
                Some(float) => ConstValue::Number(float),
                None => ConstValue::Number(number),
            }
        }
        (BaseType::Named(name), ConstValue::Number(number)) if name.as_str() == "ID" => {
            ConstValue::String(number.to_string())
        }
        (_, value) => value,
    }
}
