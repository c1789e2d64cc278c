//! Per-request state shared between loading and rendering.

use std::collections::BTreeMap;

use crate::core::RequestPath;
use crate::payload::Value;
use crate::utils::html::{escape, escape_attr};

/// Loader results keyed by the concrete path they were loaded for.
pub type RouteData = BTreeMap<String, Value>;

/// State for one request. Owned by the handling call, never shared.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    pub url: RequestPath,
    /// Starts at 200; rendering may change it (404 from the catch-all).
    pub status_code: u16,
    pub route_data: RouteData,
    /// Head metadata collected during render.
    pub head: Head,
}

impl RequestContext {
    pub fn new(url: RequestPath, route_data: RouteData) -> Self {
        Self {
            url,
            status_code: 200,
            route_data,
            head: Head::default(),
        }
    }

    /// Route data as an object value, for the state payload and JSON replies.
    pub fn route_data_value(&self) -> Value {
        Value::object(self.route_data.iter().map(|(k, v)| (k.clone(), v.clone())))
    }

    /// `{ statusCode, routeData }` as the browser sees it.
    pub fn initial_state(&self) -> Value {
        Value::object([
            ("statusCode", Value::from(i64::from(self.status_code))),
            ("routeData", self.route_data_value()),
        ])
    }
}

/// Document head contributions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Head {
    pub title: Option<String>,
    /// Pre-rendered tags (`<meta>`, `<link>`, ...).
    pub markup: String,
    pub html_attributes: Vec<(String, String)>,
    pub body_attributes: Vec<(String, String)>,
}

impl Head {
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn meta(&mut self, name: &str, content: &str) {
        self.markup.push_str(&format!(
            "<meta name=\"{}\" content=\"{}\">",
            escape_attr(name),
            escape_attr(content)
        ));
    }

    pub fn link(&mut self, rel: &str, href: &str) {
        self.markup.push_str(&format!(
            "<link rel=\"{}\" href=\"{}\">",
            escape_attr(rel),
            escape_attr(href)
        ));
    }

    /// Everything that goes inside `<head>` after the charset.
    pub fn to_markup(&self) -> String {
        match &self.title {
            Some(title) => format!("<title>{}</title>{}", escape(title), self.markup),
            None => self.markup.clone(),
        }
    }
}
