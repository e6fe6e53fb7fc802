use std::str::FromStr;

use pixel_http::protocol::Request;

use crate::auth::Identity;

/// Parameters captured by a route pattern, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: Vec<(String, String)>,
}

static EMPTY_PARAMS: PathParams = PathParams { params: Vec::new() };

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    /// Parses the parameter, `None` when it is absent or does not parse.
    pub fn get_as<T: FromStr>(&self, name: &str) -> Option<T> {
        self.get(name)?.parse().ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Accessors for what the dispatcher attaches to a request.
pub trait RequestExt {
    fn path_params(&self) -> &PathParams;

    /// The authenticated caller. Only ever present on routes that run the
    /// auth gate.
    fn identity(&self) -> Option<&Identity>;
}

impl RequestExt for Request {
    fn path_params(&self) -> &PathParams {
        self.extensions().get::<PathParams>().unwrap_or(&EMPTY_PARAMS)
    }

    fn identity(&self) -> Option<&Identity> {
        self.extensions().get::<Identity>()
    }
}
