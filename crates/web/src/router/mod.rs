//! The ordered route table.
//!
//! Routes are tried in registration order and the first pattern that matches
//! the whole path wins. Matching ignores the method: every handler checks the
//! methods it accepts itself.

mod pattern;

use std::fmt::Display;

use thiserror::Error;

use crate::handler::RequestHandler;
use crate::request::PathParams;
use pattern::CompiledPattern;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl RouteError {
    pub fn invalid_pattern<P: ToString, R: Display>(pattern: P, reason: R) -> Self {
        Self::InvalidPattern { pattern: pattern.to_string(), reason: reason.to_string() }
    }
}

/// A handler bound to a route, with its display name and whether the auth
/// gate runs before it.
pub struct Endpoint<S> {
    name: String,
    handler: Box<dyn RequestHandler<S>>,
    requires_identity: bool,
}

impl<S> Endpoint<S> {
    pub fn new<H>(name: impl Into<String>, handler: H) -> Self
    where
        H: RequestHandler<S> + 'static,
    {
        Self { name: name.into(), handler: Box::new(handler), requires_identity: false }
    }

    /// Runs the auth gate before this endpoint and attaches the identity it
    /// resolves.
    pub fn with_identity(mut self) -> Self {
        self.requires_identity = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler(&self) -> &dyn RequestHandler<S> {
        self.handler.as_ref()
    }

    pub fn requires_identity(&self) -> bool {
        self.requires_identity
    }
}

struct Route<S> {
    pattern: String,
    compiled: CompiledPattern,
    endpoint: Endpoint<S>,
}

/// Immutable once built.
pub struct Router<S> {
    routes: Vec<Route<S>>,
}

/// The endpoint a path resolved to and the parameters captured on the way.
pub struct RouteMatch<'router, S> {
    endpoint: &'router Endpoint<S>,
    params: PathParams,
}

impl<S> Router<S> {
    pub fn builder() -> RouterBuilder<S> {
        RouterBuilder { routes: Vec::new() }
    }

    /// The first route, in registration order, whose pattern matches `path`.
    pub fn at(&self, path: &str) -> Option<RouteMatch<'_, S>> {
        self.routes.iter().find_map(|route| {
            let captures = route.compiled.regex.captures(path)?;

            let mut params = PathParams::new();
            for (name, value) in route.compiled.param_names.iter().zip(captures.iter().skip(1)) {
                if let Some(value) = value {
                    params.push(name.as_str(), value.as_str());
                }
            }

            Some(RouteMatch { endpoint: &route.endpoint, params })
        })
    }

    /// Registered patterns, in matching order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|route| route.pattern.as_str())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<'router, S> RouteMatch<'router, S> {
    pub fn endpoint(&self) -> &'router Endpoint<S> {
        self.endpoint
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub fn into_params(self) -> PathParams {
        self.params
    }
}

pub struct RouterBuilder<S> {
    routes: Vec<(String, Endpoint<S>)>,
}

impl<S> RouterBuilder<S> {
    /// Appends a route. Registering the same pattern twice keeps both entries;
    /// the earlier one shadows the later.
    pub fn route(mut self, pattern: impl Into<String>, endpoint: Endpoint<S>) -> Self {
        self.routes.push((pattern.into(), endpoint));
        self
    }

    pub fn build(self) -> Result<Router<S>, RouteError> {
        let routes = self
            .routes
            .into_iter()
            .map(|(pattern, endpoint)| {
                let compiled = pattern::compile(&pattern)?;
                Ok(Route { pattern, compiled, endpoint })
            })
            .collect::<Result<Vec<_>, RouteError>>()?;

        Ok(Router { routes })
    }
}
