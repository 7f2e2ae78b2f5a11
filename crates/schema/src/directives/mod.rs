mod is_granted;

pub use is_granted::{is_granted, policy_fn, AccessDecision, AccessDenied, AccessPolicy, AccessRequest, GrantAll, IS_GRANTED};

use std::sync::Arc;

use crate::directive_registry::DirectiveVisitor;

/// The directives every service starts with, in registration order.
pub fn builtin_directives(policy: Arc<dyn AccessPolicy>) -> Vec<(&'static str, DirectiveVisitor)> {
    vec![(IS_GRANTED, is_granted(policy))]
}
