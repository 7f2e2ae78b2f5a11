use std::sync::Arc;

use async_graphql::{Context, ErrorExtensions};
use indexmap::IndexMap;
use thiserror::Error;
use value::{ConstValue, Name};

use crate::{
    directive_registry::{DirectiveArgs, DirectiveVisitor},
    resolver::resolve_fn,
};

pub const IS_GRANTED: &str = "isGranted";

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AccessDecision {
    Grant,
    Deny,
}

impl From<bool> for AccessDecision {
    fn from(granted: bool) -> Self {
        if granted {
            AccessDecision::Grant
        } else {
            AccessDecision::Deny
        }
    }
}

/// What a policy gets to see when a gated field is about to be resolved.
pub struct AccessRequest<'r, 'c> {
    /// Name of the gated field.
    pub field: &'r str,
    /// Arguments of the `@isGranted` annotation.
    pub directive_args: &'r DirectiveArgs,
    /// Arguments the caller passed to the field.
    pub arguments: &'r IndexMap<Name, ConstValue>,
    /// Query context. Request data such as HTTP headers is reachable through it.
    pub ctx: &'r Context<'c>,
}

impl<'r, 'c> AccessRequest<'r, 'c> {
    /// The roles listed in the annotation, e.g. `["STUDENT", "TEACHER"]`.
    pub fn roles(&self) -> Vec<&'r str> {
        roles(self.directive_args)
    }
}

fn roles(args: &DirectiveArgs) -> Vec<&str> {
    fn role(value: &ConstValue) -> Option<&str> {
        match value {
            ConstValue::Enum(name) => Some(name.as_str()),
            ConstValue::String(name) => Some(name.as_str()),
            _ => None,
        }
    }

    match args.get("roles") {
        Some(ConstValue::List(values)) => values.iter().filter_map(role).collect(),
        Some(value) => role(value).into_iter().collect(),
        None => Vec::new(),
    }
}

/// Decides whether a gated field may be resolved.
pub trait AccessPolicy: Send + Sync {
    fn decide(&self, request: &AccessRequest<'_, '_>) -> AccessDecision;
}

impl<F> AccessPolicy for F
where
    F: Fn(&AccessRequest<'_, '_>) -> bool + Send + Sync,
{
    fn decide(&self, request: &AccessRequest<'_, '_>) -> AccessDecision {
        self(request).into()
    }
}

/// Wraps a closure as a shared policy.
pub fn policy_fn<F>(f: F) -> Arc<dyn AccessPolicy>
where
    F: Fn(&AccessRequest<'_, '_>) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Grants every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct GrantAll;

impl AccessPolicy for GrantAll {
    fn decide(&self, _request: &AccessRequest<'_, '_>) -> AccessDecision {
        AccessDecision::Grant
    }
}

#[derive(Debug, Error, Clone, Eq, PartialEq)]
#[error("Access to '{field}' is denied.")]
pub struct AccessDenied {
    pub field: String,
}

impl ErrorExtensions for AccessDenied {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, ext| ext.set("code", "ACCESS_DENIED"))
    }
}

/// Gates the annotated field behind `policy`.
///
/// A denied field fails with [`AccessDenied`] and its resolver is never called. A granted
/// field is resolved by the resolver it had before the directive was applied.
pub fn is_granted(policy: Arc<dyn AccessPolicy>) -> DirectiveVisitor {
    DirectiveVisitor::field_definition(move |field, args| {
        let policy = policy.clone();
        let directive_args = args.clone();
        let field_name = field.name.clone();
        let resolve = field.resolve.clone();

        field.resolve = resolve_fn(move |params| {
            let decision = policy.decide(&AccessRequest {
                field: field_name.as_str(),
                directive_args: &directive_args,
                arguments: &params.args,
                ctx: params.ctx,
            });
            match decision {
                AccessDecision::Grant => resolve(params),
                AccessDecision::Deny => {
                    tracing::debug!(field = %field_name, "Access denied.");
                    let err = AccessDenied {
                        field: field_name.to_string(),
                    }
                    .extend();
                    Box::pin(async move { Err(err) })
                }
            }
        });
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn roles_are_read_from_list_or_single_value() {
        let mut args = DirectiveArgs::new();
        assert!(roles(&args).is_empty());

        args.insert(
            Name::new("roles"),
            ConstValue::List(vec![
                ConstValue::Enum(Name::new("STUDENT")),
                ConstValue::String("TEACHER".to_string()),
                ConstValue::Null,
            ]),
        );
        assert_eq!(roles(&args), vec!["STUDENT", "TEACHER"]);

        args.insert(Name::new("roles"), ConstValue::Enum(Name::new("ROOT")));
        assert_eq!(roles(&args), vec!["ROOT"]);
    }

    #[test]
    fn decision_from_bool() {
        assert_eq!(AccessDecision::from(true), AccessDecision::Grant);
        assert_eq!(AccessDecision::from(false), AccessDecision::Deny);
    }

    #[test]
    fn access_denied_carries_code() {
        let err = AccessDenied {
            field: "user".to_string(),
        }
        .extend();
        assert_eq!(err.message, "Access to 'user' is denied.");
        let code = err.extensions.as_ref().and_then(|extensions| extensions.get("code"));
        assert_eq!(code, Some(&ConstValue::String("ACCESS_DENIED".to_string())));
    }
}
