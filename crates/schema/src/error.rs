use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum DirectiveError {
    #[error("Directive name must not be empty.")]
    EmptyDirectiveName,

    #[error(
        "Directive location '{0}' is not a schema element a visitor can target. Expected one of SCHEMA, SCALAR, \
         OBJECT, FIELD_DEFINITION, ARGUMENT_DEFINITION, INTERFACE, UNION, ENUM, ENUM_VALUE, INPUT_OBJECT or \
         INPUT_FIELD_DEFINITION."
    )]
    InvalidDirectiveKind(String),

    #[error(
        "Directive '{name}' was given a value of type '{type_name}', which matches none of the schema directive \
         visitor signatures."
    )]
    UnrecognizedDirectiveSignature { name: String, type_name: &'static str },
}

/// Failure to turn an SDL document into an executable schema.
#[derive(Debug, Error)]
pub enum SchemaParseError {
    #[error("Failed to parse schema document: {0}")]
    Syntax(#[from] parser::Error),

    #[error("Invalid schema document: {0}")]
    Semantic(String),
}

impl SchemaParseError {
    pub(crate) fn semantic(message: impl Into<String>) -> Self {
        SchemaParseError::Semantic(message.into())
    }
}
