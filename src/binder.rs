//! Request parameter binding.
//!
//! Every route declares the parameters its handler expects with a
//! [`Signature`]. At registration time the signature is classified once into
//! a [`Binder`]; at request time the binder reconciles the query string, the
//! typed body and the path variables into the [`Args`] the handler receives.
//!
//! ```text
//! Signature::new().request().keyword("email").keyword_or("page", "1")
//!        ↓ Binder::classify                      (registration time)
//! Binder { has_request, has_var_keyword, named, required }
//!        ↓ binder.bind(&request)                  (per request)
//! Args { "email": "a@b.com", request: Some(..) }
//! ```
//!
//! Binding rules, in order:
//!
//! 1. A handler that takes keyword parameters reads them from the body of a
//!    mutating request (JSON object or urlencoded form) or from the query
//!    string of a retrieval request (first value per key).
//! 2. If nothing was read, the path variables alone become the arguments.
//! 3. Otherwise, unless the handler takes arbitrary keywords, everything it
//!    did not name is dropped. Path variables are merged on top and win.
//! 4. The request itself is injected when the handler asked for it.
//! 5. Every required keyword must be present.

use std::collections::HashSet;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{Error, Result};
use crate::request::Request;

// ── Declaration ───────────────────────────────────────────────────────────────

/// How one declared parameter receives its value.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamKind {
    /// Filled from path variables (or by keyword).
    Positional,
    /// Collects extra positional values. Never filled by the binder.
    VarPositional,
    /// Keyword-only. Required when `default` is `None`.
    Keyword { default: Option<Value> },
    /// Accepts every supplied key.
    VarKeyword,
    /// The inbound [`Request`] itself.
    Request,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
}

/// The ordered parameter list a handler declares at registration time.
#[derive(Clone, Debug, Default)]
pub struct Signature {
    params: Vec<Param>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional(self, name: &str) -> Self {
        self.push(name, ParamKind::Positional)
    }

    pub fn var_positional(self, name: &str) -> Self {
        self.push(name, ParamKind::VarPositional)
    }

    /// A required keyword-only parameter.
    pub fn keyword(self, name: &str) -> Self {
        self.push(name, ParamKind::Keyword { default: None })
    }

    /// A keyword-only parameter with a default.
    pub fn keyword_or(self, name: &str, default: impl Into<Value>) -> Self {
        self.push(name, ParamKind::Keyword { default: Some(default.into()) })
    }

    pub fn var_keyword(self, name: &str) -> Self {
        self.push(name, ParamKind::VarKeyword)
    }

    /// The request context parameter, always bound under `"request"`.
    pub fn request(self) -> Self {
        self.push("request", ParamKind::Request)
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    fn push(mut self, name: &str, kind: ParamKind) -> Self {
        self.params.push(Param { name: name.to_owned(), kind });
        self
    }
}

// ── Classification ────────────────────────────────────────────────────────────

/// A classified [`Signature`], ready to bind requests.
#[derive(Clone, Debug)]
pub struct Binder {
    has_request: bool,
    has_var_keyword: bool,
    named: Vec<String>,
    required: Vec<String>,
    defaults: Arc<Map<String, Value>>,
}

impl Binder {
    /// Classifies `signature`, rejecting declarations no handler could satisfy.
    ///
    /// Only var-positional, keyword-only and var-keyword parameters may follow
    /// the request parameter.
    pub fn classify(signature: &Signature) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut has_request = false;
        let mut has_var_keyword = false;
        let mut named = Vec::new();
        let mut required = Vec::new();
        let mut defaults = Map::new();

        for param in &signature.params {
            if !seen.insert(param.name.as_str()) {
                return Err(Error::declaration(format!("duplicate parameter `{}`", param.name)));
            }
            if has_request && matches!(param.kind, ParamKind::Positional | ParamKind::Request) {
                return Err(Error::declaration(format!(
                    "request parameter must be the last named parameter, found `{}` after it",
                    param.name
                )));
            }
            match &param.kind {
                ParamKind::Positional | ParamKind::VarPositional => {}
                ParamKind::Keyword { default } => {
                    named.push(param.name.clone());
                    match default {
                        Some(value) => {
                            defaults.insert(param.name.clone(), value.clone());
                        }
                        None => required.push(param.name.clone()),
                    }
                }
                ParamKind::VarKeyword => {
                    if has_var_keyword {
                        return Err(Error::declaration("more than one var-keyword parameter"));
                    }
                    has_var_keyword = true;
                }
                ParamKind::Request => has_request = true,
            }
        }

        Ok(Self { has_request, has_var_keyword, named, required, defaults: Arc::new(defaults) })
    }

    pub fn has_request(&self) -> bool { self.has_request }
    pub fn has_var_keyword(&self) -> bool { self.has_var_keyword }
    pub fn named(&self) -> &[String] { &self.named }
    pub fn required(&self) -> &[String] { &self.required }

    fn takes_keywords(&self) -> bool {
        self.has_var_keyword || !self.named.is_empty()
    }

    // ── Binding ───────────────────────────────────────────────────────────────

    /// Produces the argument mapping for one request, or the reason the
    /// request cannot be served. Binding is pure: the same request always
    /// yields the same arguments.
    pub fn bind(&self, req: &Request) -> Result<Args> {
        let supplied = if self.takes_keywords() { read_supplied(req)? } else { None };

        let mut values = match supplied {
            None => path_values(req),
            Some(mut supplied) => {
                if !self.has_var_keyword && !self.named.is_empty() {
                    supplied.retain(|key, _| self.named.iter().any(|n| n == key));
                }
                for (key, value) in req.params() {
                    if supplied.contains_key(key) {
                        warn!(arg = %key, "duplicate arg name in path and supplied args, path wins");
                    }
                    supplied.insert(key.clone(), Value::String(value.clone()));
                }
                supplied
            }
        };

        let request = self.has_request.then(|| req.clone());

        if let Some(missing) = self.required.iter().find(|name| !values.contains_key(*name)) {
            return Err(Error::bad_request(format!("Missing argument: {missing}")));
        }

        // "request" is bound out of band; a client-supplied value must not shadow it.
        if self.has_request {
            values.remove("request");
        }

        Ok(Args { values, request, defaults: Arc::clone(&self.defaults) })
    }
}

/// Reads keyword values from the body or query string. `None` means the
/// request carried none.
fn read_supplied(req: &Request) -> Result<Option<Map<String, Value>>> {
    let method = req.method();
    if method.is_mutating() {
        let Some(content_type) = req.content_type() else {
            return Err(Error::bad_request("Missing Content-Type."));
        };
        let ct = content_type.to_ascii_lowercase();
        if ct.starts_with("application/json") {
            let body: Value = serde_json::from_slice(req.body())
                .map_err(|e| Error::bad_request(format!("Invalid JSON body: {e}")))?;
            return match body {
                Value::Object(map) => Ok(Some(map)),
                _ => Err(Error::bad_request("JSON body must be object.")),
            };
        }
        if ct.starts_with("application/x-www-form-urlencoded") {
            return Ok(Some(first_values(req.body())));
        }
        return Err(Error::bad_request(format!("Unsupported Content-Type: {content_type}")));
    }
    if method.is_retrieval() {
        return Ok(req.query().filter(|qs| !qs.is_empty()).map(|qs| first_values(qs.as_bytes())));
    }
    Ok(None)
}

/// Decodes `application/x-www-form-urlencoded` pairs, keeping the first value
/// of each key. Blank values are kept.
fn first_values(encoded: &[u8]) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in url::form_urlencoded::parse(encoded) {
        map.entry(key.into_owned()).or_insert_with(|| Value::String(value.into_owned()));
    }
    map
}

fn path_values(req: &Request) -> Map<String, Value> {
    req.params()
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect()
}

// ── Bound arguments ───────────────────────────────────────────────────────────

/// The arguments bound for one handler invocation.
///
/// [`values`](Args::values) holds exactly what the binder produced. The
/// accessors additionally fall back to the defaults declared with
/// [`Signature::keyword_or`].
#[derive(Clone, Debug)]
pub struct Args {
    values: Map<String, Value>,
    request: Option<Request>,
    defaults: Arc<Map<String, Value>>,
}

impl Args {
    /// The bound mapping, without declared defaults.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// The request, when the handler declared the request parameter.
    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// The bound value of `name`, else its declared default.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).or_else(|| self.defaults.get(name))
    }

    /// The value of `name` as text. Strings come back verbatim; numbers and
    /// booleans are formatted; `null`, arrays and objects read as absent.
    pub fn text(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Like [`text`](Args::text), but an absent value is a bad request.
    pub fn require_text(&self, name: &str) -> Result<String> {
        self.text(name).ok_or_else(|| Error::bad_request(format!("Missing argument: {name}")))
    }

    /// Deserializes the value of `name` into `T`.
    pub fn parse<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        self.get(name)
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()
            .map_err(|e| Error::Value(format!("argument `{name}`: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::request::tests::request;

    const JSON: (&str, &str) = ("content-type", "application/json");

    fn binder(signature: Signature) -> Binder {
        Binder::classify(&signature).unwrap()
    }

    #[test]
    fn classifies_keyword_parameters() {
        let b = binder(Signature::new().request().keyword("email").keyword_or("page", "1").var_keyword("kw"));
        assert!(b.has_request());
        assert!(b.has_var_keyword());
        assert_eq!(b.named(), ["email", "page"]);
        assert_eq!(b.required(), ["email"]);
    }

    #[test]
    fn positional_after_request_is_a_declaration_error() {
        let err = Binder::classify(&Signature::new().request().positional("id")).unwrap_err();
        assert!(matches!(err, Error::Declaration(_)));
    }

    #[test]
    fn keyword_and_var_kinds_may_follow_request() {
        let sig = Signature::new()
            .positional("id")
            .request()
            .var_positional("rest")
            .keyword("content")
            .var_keyword("kw");
        assert!(Binder::classify(&sig).is_ok());
    }

    #[test]
    fn duplicate_names_are_a_declaration_error() {
        let err = Binder::classify(&Signature::new().keyword("a").keyword_or("a", 1)).unwrap_err();
        assert!(matches!(err, Error::Declaration(_)));
    }

    #[test]
    fn drops_unnamed_json_fields() {
        let b = binder(Signature::new().keyword("email").keyword("passwd"));
        let req = request(
            "POST",
            "/api/authenticate",
            &[JSON],
            r#"{"email":"a@b.com","passwd":"x","extra":"y"}"#,
            &[],
        );
        let args = b.bind(&req).unwrap();
        assert_eq!(Value::Object(args.values().clone()), json!({"email": "a@b.com", "passwd": "x"}));
        assert!(args.request().is_none());
    }

    #[test]
    fn path_variables_and_request_for_positional_handlers() {
        let b = binder(Signature::new().request().var_positional("rest"));
        let b2 = binder(Signature::new().positional("id").request());
        let req = request("GET", "/item/42", &[], "", &[("id", "42")]);

        let args = b2.bind(&req).unwrap();
        assert_eq!(Value::Object(args.values().clone()), json!({"id": "42"}));
        assert_eq!(args.request().map(Request::path), Some("/item/42"));

        assert!(b.bind(&req).unwrap().request().is_some());
    }

    #[test]
    fn binding_is_repeatable() {
        let b = binder(Signature::new().positional("id").request().keyword("content"));
        let req = request("POST", "/api/blogs/7/comments", &[JSON], r#"{"content":"hi","id":"9"}"#, &[("id", "7")]);
        let first = b.bind(&req).unwrap();
        let second = b.bind(&req).unwrap();
        assert_eq!(first.values(), second.values());
        assert_eq!(Value::Object(first.values().clone()), json!({"content": "hi", "id": "7"}));
    }

    #[test]
    fn path_variables_win_over_supplied_values() {
        let b = binder(Signature::new().var_keyword("kw"));
        let req = request("GET", "/blog/1?id=2&q=rust", &[], "", &[("id", "1")]);
        let args = b.bind(&req).unwrap();
        assert_eq!(Value::Object(args.values().clone()), json!({"id": "1", "q": "rust"}));
    }

    #[test]
    fn query_string_keeps_first_value() {
        let b = binder(Signature::new().keyword_or("page", "1"));
        let req = request("GET", "/api/users?page=3&page=4&blank=", &[], "", &[]);
        let args = b.bind(&req).unwrap();
        assert_eq!(args.text("page").as_deref(), Some("3"));
        assert!(!args.contains("blank"));
    }

    #[test]
    fn defaults_fill_reads_but_not_the_mapping() {
        let b = binder(Signature::new().keyword_or("page", "1"));
        let args = b.bind(&request("GET", "/api/users", &[], "", &[])).unwrap();
        assert!(args.values().is_empty());
        assert_eq!(args.text("page").as_deref(), Some("1"));
    }

    #[test]
    fn form_bodies_bind_like_json() {
        let b = binder(Signature::new().keyword("email").keyword("name"));
        let req = request(
            "POST",
            "/api/users",
            &[("content-type", "application/x-www-form-urlencoded; charset=utf-8")],
            "email=a%40b.com&name=Tom+S&name=ignored",
            &[],
        );
        let args = b.bind(&req).unwrap();
        assert_eq!(Value::Object(args.values().clone()), json!({"email": "a@b.com", "name": "Tom S"}));
    }

    #[test]
    fn mutating_requests_need_a_content_type() {
        let b = binder(Signature::new().keyword("email"));
        let err = b.bind(&request("POST", "/", &[], "{}", &[])).unwrap_err();
        assert_eq!(err.to_string(), "Missing Content-Type.");
    }

    #[test]
    fn rejects_unsupported_content_types() {
        let b = binder(Signature::new().keyword("email"));
        let err = b.bind(&request("POST", "/", &[("content-type", "text/xml")], "<a/>", &[])).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported Content-Type: text/xml");
    }

    #[test]
    fn json_body_must_be_an_object() {
        let b = binder(Signature::new().var_keyword("kw"));
        let err = b.bind(&request("POST", "/", &[JSON], "[1,2]", &[])).unwrap_err();
        assert_eq!(err.to_string(), "JSON body must be object.");
    }

    #[test]
    fn reports_first_missing_required_argument() {
        let b = binder(Signature::new().keyword("email").keyword("name").keyword("passwd"));
        let err = b.bind(&request("POST", "/", &[JSON], r#"{"email":"a@b.com"}"#, &[])).unwrap_err();
        assert!(matches!(&err, Error::BadRequest(msg) if msg == "Missing argument: name"));
    }

    #[test]
    fn handlers_without_keywords_ignore_the_body() {
        let b = binder(Signature::new().positional("id"));
        let req = request("POST", "/x/5", &[("content-type", "text/xml")], "<a/>", &[("id", "5")]);
        let args = b.bind(&req).unwrap();
        assert_eq!(Value::Object(args.values().clone()), json!({"id": "5"}));
    }

    #[test]
    fn parses_typed_values() {
        let b = binder(Signature::new().var_keyword("kw"));
        let req = request("POST", "/", &[JSON], r#"{"n":3,"flag":true}"#, &[]);
        let args = b.bind(&req).unwrap();
        assert_eq!(args.parse::<u32>("n").unwrap(), Some(3));
        assert_eq!(args.text("flag").as_deref(), Some("true"));
        assert!(args.parse::<u32>("flag").is_err());
        assert!(matches!(args.require_text("missing"), Err(Error::BadRequest(_))));
    }
}
