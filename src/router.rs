//! Radix-tree request router.
//!
//! One tree per HTTP method, O(path-length) lookup. Each route pairs a
//! handler with the [`Binder`] classified from its [`Signature`] when the
//! route was registered, so a malformed declaration fails at startup rather
//! than on the first request.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use matchit::Router as MatchitRouter;
use percent_encoding::percent_decode_str;
use tracing::{debug, info};

use crate::binder::{Binder, Signature};
use crate::error::{Error, Result};
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::request::Request;
use crate::response::{IntoReply, Response};
use crate::templates::Templates;

struct Route<S> {
    handler: BoxedHandler<S>,
    binder: Binder,
}

/// The application router.
///
/// Holds the application state `S` handed to every handler. Build it once at
/// startup and pass it to [`Server::serve`](crate::Server::serve).
pub struct Router<S> {
    routes: HashMap<Method, MatchitRouter<Arc<Route<S>>>>,
    state: S,
    templates: Option<Arc<dyn Templates>>,
}

impl<S: Clone + Send + Sync + 'static> Router<S> {
    pub fn new(state: S) -> Self {
        Self { routes: HashMap::new(), state, templates: None }
    }

    /// Installs the engine used for [`Reply::template`](crate::Reply::template) replies.
    pub fn templates(mut self, engine: impl Templates) -> Self {
        let engine: Arc<dyn Templates> = Arc::new(engine);
        self.templates = Some(engine);
        self
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Registers a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path variables use `{name}` syntax and bind by name.
    ///
    /// # Panics
    ///
    /// Panics when the path is not a valid route or the signature fails
    /// classification; both are startup declaration errors. Use
    /// [`try_on`](Router::try_on) to handle them instead.
    pub fn on(self, method: Method, path: &str, signature: Signature, handler: impl Handler<S>) -> Self {
        self.try_on(method, path, signature, handler)
            .unwrap_or_else(|e| panic!("invalid route `{method} {path}`: {e}"))
    }

    pub fn get(self, path: &str, signature: Signature, handler: impl Handler<S>) -> Self {
        self.on(Method::Get, path, signature, handler)
    }

    pub fn post(self, path: &str, signature: Signature, handler: impl Handler<S>) -> Self {
        self.on(Method::Post, path, signature, handler)
    }

    pub fn try_on(
        mut self,
        method: Method,
        path: &str,
        signature: Signature,
        handler: impl Handler<S>,
    ) -> Result<Self> {
        let binder = Binder::classify(&signature)?;
        let names: Vec<&str> = signature.params().iter().map(|p| p.name.as_str()).collect();
        let route = Arc::new(Route { handler: handler.into_boxed_handler(), binder });
        self.routes
            .entry(method)
            .or_default()
            .insert(path, route)
            .map_err(|e| Error::declaration(format!("route `{path}`: {e}")))?;
        info!("add route {method} {path} => ({})", names.join(", "));
        Ok(self)
    }

    fn lookup(&self, method: Method, path: &str) -> Option<(Arc<Route<S>>, BTreeMap<String, String>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let route = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), percent_decode_str(v).decode_utf8_lossy().into_owned()))
            .collect();
        Some((route, params))
    }

    /// Whether `path` is routed under any method.
    fn is_routed(&self, path: &str) -> bool {
        self.routes.values().any(|tree| tree.at(path).is_ok())
    }

    /// Routes one buffered request and produces its response: lookup, bind,
    /// call, render.
    pub async fn respond(&self, req: http::Request<Bytes>) -> Response {
        let (parts, body) = req.into_parts();
        let Ok(method) = Method::try_from(&parts.method) else {
            return Response::status(StatusCode::METHOD_NOT_ALLOWED);
        };
        let Some((route, params)) = self.lookup(method, parts.uri.path()) else {
            if self.is_routed(parts.uri.path()) {
                return Response::status(StatusCode::METHOD_NOT_ALLOWED);
            }
            return Response::status(StatusCode::NOT_FOUND);
        };

        let request = Request::new(method, parts, body, params);
        let args = match route.binder.bind(&request) {
            Ok(args) => args,
            Err(e) => return e.into_reply().render(self.templates.as_deref()),
        };
        debug!(args = ?args.values(), "call with args");

        route.handler
            .call(self.state.clone(), args)
            .await
            .render(self.templates.as_deref())
    }
}
