use std::{collections::HashMap, sync::Arc};

use async_graphql::{
    dynamic::{FieldValue, ResolverContext},
    Context,
};
use futures_util::future::BoxFuture;
use indexmap::IndexMap;
use value::{ConstValue, Name};

pub type ResolveFuture<'a> = BoxFuture<'a, async_graphql::Result<Option<FieldValue<'a>>>>;

/// Resolve function of a single field.
///
/// Shared so that directive visitors can wrap an existing resolver and delegate to it.
pub type ResolveFn = Arc<dyn for<'a> Fn(ResolveParams<'a>) -> ResolveFuture<'a> + Send + Sync>;

/// Everything a resolver gets to see for one field invocation.
pub struct ResolveParams<'a> {
    pub ctx: &'a Context<'a>,
    pub parent: &'a FieldValue<'a>,
    /// Field arguments after variable substitution and default values.
    pub args: IndexMap<Name, ConstValue>,
}

impl<'a> ResolveParams<'a> {
    pub(crate) fn new(ctx: ResolverContext<'a>) -> Self {
        let args = ctx
            .args
            .iter()
            .map(|(name, value)| (name.clone(), value.as_value().clone()))
            .collect();
        Self {
            ctx: ctx.ctx,
            parent: ctx.parent_value,
            args,
        }
    }

    /// The parent object as a plain GraphQL value, when it is one.
    pub fn parent_value(&self) -> Option<&ConstValue> {
        self.parent.as_value()
    }
}

/// Wraps an asynchronous resolver closure.
///
/// ```ignore
/// let resolve = resolve_fn(|params| Box::pin(async move { Ok(Some(FieldValue::value(1))) }));
/// ```
pub fn resolve_fn<F>(f: F) -> ResolveFn
where
    F: for<'a> Fn(ResolveParams<'a>) -> ResolveFuture<'a> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wraps a synchronous resolver producing an owned value.
pub fn value_resolver<F>(f: F) -> ResolveFn
where
    F: Fn(&ResolveParams<'_>) -> async_graphql::Result<Option<ConstValue>> + Send + Sync + 'static,
{
    resolve_fn(move |params| {
        let result = f(&params);
        Box::pin(async move { result.map(|value| value.map(into_field_value)) })
    })
}

/// Reads the property named like the field from the parent object.
pub fn default_resolver(field_name: Name) -> ResolveFn {
    value_resolver(move |params| {
        Ok(match params.parent_value() {
            Some(ConstValue::Object(object)) => object.get(field_name.as_str()).cloned(),
            _ => None,
        })
    })
}

/// Converts a plain value into a field value the executor can descend into.
///
/// Objects carrying a `__typename` string are tagged with that type so that they can be
/// returned from interface and union fields.
pub fn into_field_value<'a>(value: ConstValue) -> FieldValue<'a> {
    match value {
        ConstValue::List(items) => FieldValue::list(items.into_iter().map(into_field_value)),
        ConstValue::Object(object) => {
            let type_name = match object.get("__typename") {
                Some(ConstValue::String(type_name)) => Some(type_name.clone()),
                _ => None,
            };
            let value = FieldValue::value(ConstValue::Object(object));
            match type_name {
                Some(type_name) => value.with_type(type_name),
                None => value,
            }
        }
        value => FieldValue::value(value),
    }
}

/// Resolvers supplied by the application, keyed by type name and field name.
#[derive(Default, Clone)]
pub struct ResolverMap(HashMap<String, HashMap<String, ResolveFn>>);

impl ResolverMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, type_name: impl Into<String>, field_name: impl Into<String>, resolve: ResolveFn) {
        self.0
            .entry(type_name.into())
            .or_default()
            .insert(field_name.into(), resolve);
    }

    #[must_use]
    pub fn with(mut self, type_name: impl Into<String>, field_name: impl Into<String>, resolve: ResolveFn) -> Self {
        self.insert(type_name, field_name, resolve);
        self
    }

    pub fn get(&self, type_name: &str, field_name: &str) -> Option<&ResolveFn> {
        self.0.get(type_name)?.get(field_name)
    }

    pub fn len(&self) -> usize {
        self.0.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ResolverMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(
                self.0
                    .iter()
                    .map(|(type_name, fields)| (type_name, fields.keys().collect::<Vec<_>>())),
            )
            .finish()
    }
}
