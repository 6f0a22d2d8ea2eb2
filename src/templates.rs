//! The seam where a template engine plugs in.
//!
//! quill does not ship an engine. Install one with
//! [`Router::templates`](crate::Router::templates); until then, template
//! replies are served as the JSON of their data.

use serde_json::Value;

use crate::error::Result;

/// Renders a named template against a JSON context.
pub trait Templates: Send + Sync + 'static {
    fn render(&self, name: &str, context: &Value) -> Result<String>;
}

impl<F> Templates for F
where
    F: Fn(&str, &Value) -> Result<String> + Send + Sync + 'static,
{
    fn render(&self, name: &str, context: &Value) -> Result<String> {
        self(name, context)
    }
}
