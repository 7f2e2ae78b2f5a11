use std::sync::{Arc, Mutex};

use async_graphql::value;
use confucius_schema::{
    value_resolver,
    AppliedDirective,
    DirectiveArgs,
    DirectiveRegistry,
    DirectiveVisitor,
    ExecutableSchema,
    ResolverMap,
    SchemaParseError,
    TypeKind,
    VisitorKind,
};
use pretty_assertions::assert_eq;
use value::{ConstValue, Name, Number};

fn applied(directive: &str, kind: VisitorKind, coordinate: &str) -> AppliedDirective {
    AppliedDirective {
        directive: Name::new(directive),
        kind,
        coordinate: coordinate.to_string(),
    }
}

#[test]
fn unknown_directive_is_inert() {
    let sdl = r#"
    type Query {
        hello: String @notRegistered(reason: "nobody listens")
    }
    "#;
    let schema = ExecutableSchema::resolve(sdl, &DirectiveRegistry::new(), &ResolverMap::new())
        .expect("Unknown directives must not fail resolution");
    assert!(schema.applied_directives().is_empty());
    assert!(schema.sdl().contains("hello: String"));
}

#[test]
fn every_visitor_kind_is_applied_in_document_order() {
    let sdl = r#"
    directive @testSchemaDirective on SCHEMA
    directive @testScalarDirective on SCALAR
    directive @testObjectDirective on OBJECT
    directive @testFieldDefinitionDirective on FIELD_DEFINITION
    directive @testArgumentDefinitionDirective on ARGUMENT_DEFINITION
    directive @testInterfaceDirective on INTERFACE
    directive @testUnionDirective on UNION
    directive @testEnumDirective on ENUM
    directive @testEnumValueDirective on ENUM_VALUE
    directive @testInputObjectDirective on INPUT_OBJECT
    directive @testInputFieldDefinitionDirective on INPUT_FIELD_DEFINITION

    schema @testSchemaDirective {
        query: Query
    }

    scalar Date @testScalarDirective

    interface Node @testInterfaceDirective {
        id: ID!
    }

    type Query @testObjectDirective {
        node(id: ID! @testArgumentDefinitionDirective): Node @testFieldDefinitionDirective
        search(filter: Filter): [SearchResult]
        role: Role
        today: Date
    }

    type User implements Node {
        id: ID!
    }

    union SearchResult @testUnionDirective = User

    enum Role @testEnumDirective {
        ADMIN @testEnumValueDirective
        USER
    }

    input Filter @testInputObjectDirective {
        name: String @testInputFieldDefinitionDirective
    }
    "#;

    let registry = DirectiveRegistry::with_builtins([
        ("testSchemaDirective", DirectiveVisitor::schema(|_, _| {})),
        ("testScalarDirective", DirectiveVisitor::scalar(|_, _| {})),
        ("testObjectDirective", DirectiveVisitor::object(|_, _| {})),
        ("testFieldDefinitionDirective", DirectiveVisitor::field_definition(|_, _| {})),
        ("testArgumentDefinitionDirective", DirectiveVisitor::argument_definition(|_, _| {})),
        ("testInterfaceDirective", DirectiveVisitor::interface(|_, _| {})),
        ("testUnionDirective", DirectiveVisitor::union(|_, _| {})),
        ("testEnumDirective", DirectiveVisitor::enumeration(|_, _| {})),
        ("testEnumValueDirective", DirectiveVisitor::enum_value(|_, _| {})),
        ("testInputObjectDirective", DirectiveVisitor::input_object(|_, _| {})),
        ("testInputFieldDefinitionDirective", DirectiveVisitor::input_field_definition(|_, _| {})),
    ])
    .unwrap();

    let schema = ExecutableSchema::resolve(sdl, &registry, &ResolverMap::new()).unwrap();
    assert_eq!(
        schema.applied_directives(),
        &[
            applied("testScalarDirective", VisitorKind::Scalar, "Date"),
            applied("testInterfaceDirective", VisitorKind::Interface, "Node"),
            applied("testObjectDirective", VisitorKind::Object, "Query"),
            applied("testFieldDefinitionDirective", VisitorKind::FieldDefinition, "Query.node"),
            applied("testArgumentDefinitionDirective", VisitorKind::ArgumentDefinition, "Query.node(id:)"),
            applied("testUnionDirective", VisitorKind::Union, "SearchResult"),
            applied("testEnumDirective", VisitorKind::Enum, "Role"),
            applied("testEnumValueDirective", VisitorKind::EnumValue, "Role.ADMIN"),
            applied("testInputObjectDirective", VisitorKind::InputObject, "Filter"),
            applied("testInputFieldDefinitionDirective", VisitorKind::InputFieldDefinition, "Filter.name"),
            applied("testSchemaDirective", VisitorKind::Schema, "schema"),
        ]
    );
}

#[test]
fn parent_visitors_run_before_member_visitors() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let record = |label: &'static str| {
        let order = order.clone();
        move || order.lock().unwrap().push(label)
    };
    let (obj, fld, arg, extended) = (record("obj"), record("fld"), record("arg"), record("extended"));
    let registry = DirectiveRegistry::with_builtins([
        (
            "obj",
            DirectiveVisitor::object(move |object, _| {
                assert_eq!(object.fields.len(), 2);
                obj();
            }),
        ),
        ("fld", DirectiveVisitor::field_definition(move |_, _| fld())),
        ("arg", DirectiveVisitor::argument_definition(move |_, _| arg())),
        ("extended", DirectiveVisitor::field_definition(move |_, _| extended())),
    ])
    .unwrap();

    let sdl = r#"
    type Query @obj {
        a(limit: Int @arg): Int @fld
        b: Int
    }
    extend type Query {
        c: Int @extended
    }
    "#;
    let schema = ExecutableSchema::resolve(sdl, &registry, &ResolverMap::new()).unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["obj", "fld", "arg", "extended"]);
    let coordinates = schema
        .applied_directives()
        .iter()
        .map(|applied| applied.coordinate.as_str())
        .collect::<Vec<_>>();
    assert_eq!(coordinates, vec!["Query", "Query.a", "Query.a(limit:)", "Query.c"]);
}

#[test]
fn visitor_of_another_kind_is_inert() {
    let registry =
        DirectiveRegistry::with_builtins([("upper", DirectiveVisitor::enumeration(|_, _| unreachable!()))]).unwrap();
    let schema = ExecutableSchema::resolve("type Query { name: String @upper }", &registry, &ResolverMap::new()).unwrap();
    assert!(schema.applied_directives().is_empty());
}

#[test]
fn visitors_mutate_the_schema() {
    let sdl = r#"
    type Query @describe(text: "Entry point") {
        name: String @rename(to: "title")
        secret: String @hide
    }
    "#;
    let registry = DirectiveRegistry::with_builtins([
        (
            "describe",
            DirectiveVisitor::object(|object, args| {
                if let Some(ConstValue::String(text)) = args.get("text") {
                    object.description = Some(text.clone());
                }
            }),
        ),
        (
            "rename",
            DirectiveVisitor::field_definition(|field, args| {
                if let Some(ConstValue::String(to)) = args.get("to") {
                    field.name = Name::new(to);
                }
            }),
        ),
        (
            "hide",
            DirectiveVisitor::schema(|schema, _| {
                if let Some(query) = schema.query.clone() {
                    if let Some(object) = schema.object_mut(&query) {
                        object.fields.shift_remove("secret");
                    }
                }
            }),
        ),
    ])
    .unwrap();

    let schema = ExecutableSchema::resolve(sdl, &registry, &ResolverMap::new()).unwrap();
    let sdl = schema.sdl();
    assert!(sdl.contains("Entry point"));
    assert!(sdl.contains("title: String"));
    assert!(!sdl.contains("name: String"));
    // `hide` is not a schema annotation here, so it never runs.
    assert!(sdl.contains("secret: String"));
}

#[test]
fn schema_visitor_inspects_the_type_tree() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let registry = DirectiveRegistry::with_builtins([(
        "audit",
        DirectiveVisitor::schema({
            let seen = seen.clone();
            move |schema, _| {
                let field = schema.field("Query", "search").expect("Query.search is missing");
                let named = field.named_type().clone();
                let kind = schema.get_type(&named).map(|ty| ty.kind());
                seen.lock().unwrap().push((
                    named.to_string(),
                    kind,
                    schema.is_abstract(&named),
                    schema.is_abstract("Query"),
                ));
            }
        }),
    )])
    .unwrap();

    let sdl = r#"
    schema @audit { query: Query }
    type Query { search: [SearchResult!]! }
    type User { id: ID! }
    union SearchResult = User
    "#;
    ExecutableSchema::resolve(sdl, &registry, &ResolverMap::new()).unwrap();
    assert_eq!(
        *seen.lock().unwrap(),
        vec![("SearchResult".to_string(), Some(TypeKind::Union), true, false)]
    );
}

#[test]
fn arguments_are_coerced_to_the_declared_types() {
    let sdl = r#"
    directive @limit(max: Float = 10, tags: [String!]!, key: ID, weight: Float) on FIELD_DEFINITION

    type Query {
        items: [String] @limit(tags: "hot", key: 5, weight: 2)
    }
    "#;
    let seen: Arc<Mutex<Option<DirectiveArgs>>> = Default::default();
    let registry = DirectiveRegistry::with_builtins([(
        "limit",
        DirectiveVisitor::field_definition({
            let seen = seen.clone();
            move |_, args| {
                *seen.lock().unwrap() = Some(args.clone());
            }
        }),
    )])
    .unwrap();

    ExecutableSchema::resolve(sdl, &registry, &ResolverMap::new()).unwrap();
    let args = seen.lock().unwrap().take().expect("Visitor was not called");
    assert_eq!(args.get("tags"), Some(&value!(["hot"])));
    assert_eq!(args.get("key"), Some(&ConstValue::String("5".to_string())));
    assert_eq!(
        args.get("weight"),
        Some(&ConstValue::Number(Number::from_f64(2.0).unwrap()))
    );
    assert_eq!(args.get("max"), Some(&value!(10)));
}

#[test]
fn extensions_are_merged() {
    let sdl = r#"
    type Query {
        a: Int
    }

    extend type Query {
        b: Int @mark
    }

    enum Color {
        RED
    }

    extend enum Color {
        BLUE
    }
    "#;
    let registry = DirectiveRegistry::with_builtins([("mark", DirectiveVisitor::field_definition(|_, _| {}))]).unwrap();
    let schema = ExecutableSchema::resolve(sdl, &registry, &ResolverMap::new()).unwrap();
    let sdl = schema.sdl();
    assert!(sdl.contains("a: Int"));
    assert!(sdl.contains("b: Int"));
    assert!(sdl.contains("BLUE"));
    assert_eq!(
        schema.applied_directives(),
        &[applied("mark", VisitorKind::FieldDefinition, "Query.b")]
    );
}

#[test]
fn syntax_errors_are_reported() {
    let err = ExecutableSchema::resolve("type Query {", &DirectiveRegistry::new(), &ResolverMap::new())
        .err()
        .unwrap();
    assert!(matches!(err, SchemaParseError::Syntax(_)));
}

#[test]
fn semantic_errors_are_reported() {
    for sdl in [
        "type User { id: ID }",
        "type Query { a: Int } type Query { b: Int }",
        "type Query { a: Int a: Int }",
        "type Query { a: Int } extend type Missing { b: Int }",
        "type Query { a: Int } enum Color { RED } extend type Color { b: Int }",
        "schema { query: Color } enum Color { RED }",
    ] {
        let err = ExecutableSchema::resolve(sdl, &DirectiveRegistry::new(), &ResolverMap::new())
            .err()
            .unwrap_or_else(|| panic!("Expected '{sdl}' to be rejected"));
        assert!(matches!(err, SchemaParseError::Semantic(_)), "{sdl}: {err}");
    }
}

#[test]
fn resolution_is_idempotent() {
    let sdl = include_str!("sample.graphql");
    let registry = DirectiveRegistry::with_builtins([
        ("isGranted", DirectiveVisitor::field_definition(|_, _| {})),
        ("unused", DirectiveVisitor::object(|_, _| {})),
    ])
    .unwrap();

    let first = ExecutableSchema::resolve(sdl, &registry, &ResolverMap::new()).unwrap();
    let second = ExecutableSchema::resolve(sdl, &registry, &ResolverMap::new()).unwrap();
    assert_eq!(first.applied_directives(), second.applied_directives());
    assert_eq!(
        first.applied_directives(),
        &[applied("isGranted", VisitorKind::FieldDefinition, "Query.user")]
    );
    assert_eq!(first.sdl(), second.sdl());
}

#[tokio::test]
async fn default_resolver_reads_parent_properties() {
    let sdl = r#"
    interface Named {
        name: String
    }

    type Cat implements Named {
        name: String
        lives: Int
    }

    type Query {
        pets: [Named]
        tags: [String]
        missing: String
    }
    "#;
    let resolvers = ResolverMap::new()
        .with(
            "Query",
            "pets",
            value_resolver(|_| Ok(Some(value!([{ "__typename": "Cat", "name": "Tom", "lives": 9 }])))),
        )
        .with("Query", "tags", value_resolver(|_| Ok(Some(value!(["a", "b"])))));

    let schema = ExecutableSchema::resolve(sdl, &DirectiveRegistry::new(), &resolvers).unwrap();
    let response = schema
        .execute("{ pets { name ... on Cat { lives } } tags missing }")
        .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data,
        value!({
            "pets": [{ "name": "Tom", "lives": 9 }],
            "tags": ["a", "b"],
            "missing": null
        })
    );
}
