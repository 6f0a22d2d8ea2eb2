//! Outgoing responses and the shapes a handler may return.
//!
//! A handler returns anything that converts into a [`Reply`]. Dispatch then
//! turns the reply into a [`Response`]:
//!
//! | Handler returns | Sent as |
//! |---|---|
//! | a [`Response`] | passed through untouched |
//! | `Vec<u8>` / [`Bytes`] | `application/octet-stream` |
//! | `String` / `&'static str` | `text/html`, or a `302` when it starts with `redirect:` |
//! | [`Reply::json`] / `serde_json::Value` | `application/json` |
//! | [`Reply::template`] | the rendered template, `text/html` |
//! | [`StatusCode`] | that status, empty body |
//! | `(StatusCode, String)` | that status, the message as text |
//! | `Result<R, Error>` | `R`, or the error rendered per [`Error`] |

use bytes::Bytes;
use http::{HeaderValue, StatusCode};
use http_body_util::Full;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::error::Error;
use crate::templates::Templates;

/// Reply strings with this prefix redirect to the remainder.
pub const REDIRECT_PREFIX: &str = "redirect:";

// ── ContentType ───────────────────────────────────────────────────────────────

/// Content-type values quill emits.
#[derive(Clone, Copy, Debug)]
pub enum ContentType {
    Html,        // text/html;charset=utf-8
    Json,        // application/json;charset=utf-8
    OctetStream, // application/octet-stream
    Text,        // text/plain;charset=utf-8
}

impl ContentType {
    fn as_str(self) -> &'static str {
        match self {
            Self::Html        => "text/html;charset=utf-8",
            Self::Json        => "application/json;charset=utf-8",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain;charset=utf-8",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use quill::{ContentType, Response};
/// use http::StatusCode;
///
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
///
/// Response::builder()
///     .status(StatusCode::FOUND)
///     .cookie("awesession", "-deleted-", 86400)
///     .header("location", "/")
///     .no_body();
/// ```
#[derive(Debug)]
pub struct Response {
    pub(crate) body: Bytes,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) status: StatusCode,
}

impl Response {
    /// `200 OK` with `application/json`.
    pub fn json(body: Vec<u8>) -> Self {
        Self::builder().bytes(ContentType::Json, body)
    }

    /// `200 OK` with `text/plain`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// `200 OK` with `text/html`.
    pub fn html(body: impl Into<String>) -> Self {
        Self::builder().html(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { body: Bytes::new(), headers: Vec::new(), status: code }
    }

    /// `302 Found` pointing at `location`.
    pub fn redirect(location: &str) -> Self {
        Self::builder().redirect(location)
    }

    /// Builder for responses that need a custom status, headers or cookies.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: StatusCode::OK }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn body(&self) -> &Bytes { &self.body }

    /// First header value named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Converts into the `http` representation hyper writes to the wire.
    /// Headers whose values are not valid HTTP header text are dropped.
    pub fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut response = http::Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        let headers = response.headers_mut();
        for (name, value) in self.headers {
            match (http::HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => debug!(header = %name, "dropping invalid response header"),
            }
        }
        response
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`]. Defaults to `200 OK`.
/// Terminated by a typed body method.
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Adds an `HttpOnly` cookie scoped to `/` living `max_age` seconds.
    pub fn cookie(self, name: &str, value: &str, max_age: u64) -> Self {
        self.header("set-cookie", &format!("{name}={value}; Max-Age={max_age}; Path=/; HttpOnly"))
    }

    pub fn json(self, body: Vec<u8>) -> Response {
        self.bytes(ContentType::Json, body)
    }

    pub fn text(self, body: impl Into<String>) -> Response {
        self.bytes(ContentType::Text, body.into().into_bytes())
    }

    pub fn html(self, body: impl Into<String>) -> Response {
        self.bytes(ContentType::Html, body.into().into_bytes())
    }

    pub fn bytes(self, content_type: ContentType, body: impl Into<Bytes>) -> Response {
        let mut headers = vec![("content-type".to_owned(), content_type.as_str().to_owned())];
        headers.extend(self.headers);
        Response { body: body.into(), headers, status: self.status }
    }

    /// `302 Found` to `location`, keeping any headers set so far.
    pub fn redirect(self, location: &str) -> Response {
        self.status(StatusCode::FOUND).header("location", location).no_body()
    }

    pub fn no_body(self) -> Response {
        Response { body: Bytes::new(), headers: self.headers, status: self.status }
    }
}

// ── Reply ─────────────────────────────────────────────────────────────────────

/// What a handler produced, before rendering.
#[derive(Debug)]
pub enum Reply {
    /// A finished response, passed through.
    Response(Response),
    Bytes(Bytes),
    /// HTML text, or a redirect when prefixed with [`REDIRECT_PREFIX`].
    Text(String),
    /// Structured data: rendered through `template` when named, else JSON.
    Data { template: Option<String>, data: Value },
    Status(StatusCode),
    StatusText(StatusCode, String),
}

impl Reply {
    /// Serializes `data` as the JSON body. A value that fails to serialize
    /// becomes a 500.
    pub fn json(data: impl Serialize) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self::Data { template: None, data },
            Err(e) => Error::from(e).into_reply(),
        }
    }

    /// Renders `template` with `data` as its context.
    pub fn template(template: &str, data: impl Serialize) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self::Data { template: Some(template.to_owned()), data },
            Err(e) => Error::from(e).into_reply(),
        }
    }

    pub fn redirect(location: &str) -> Self {
        Self::Text(format!("{REDIRECT_PREFIX}{location}"))
    }

    /// Produces the wire response. `templates` renders named templates; when
    /// absent, their data is sent as JSON.
    pub fn render(self, templates: Option<&dyn Templates>) -> Response {
        match self {
            Self::Response(response) => response,
            Self::Bytes(body) => Response::builder().bytes(ContentType::OctetStream, body),
            Self::Text(text) => match text.strip_prefix(REDIRECT_PREFIX) {
                Some(location) => Response::redirect(location),
                None => Response::html(text),
            },
            Self::Data { template: None, data } => json_response(&data),
            Self::Data { template: Some(name), data } => match templates {
                Some(engine) => match engine.render(&name, &data) {
                    Ok(html) => Response::html(html),
                    Err(e) => {
                        error!("render failed: {}", Error::template(&name, e));
                        Response::status(StatusCode::INTERNAL_SERVER_ERROR)
                    }
                },
                None => {
                    debug!(template = %name, "no template engine installed, sending JSON");
                    json_response(&data)
                }
            },
            Self::Status(code) => Response::status(code),
            Self::StatusText(code, message) => Response::builder().status(code).text(message),
        }
    }
}

fn json_response(data: &Value) -> Response {
    match serde_json::to_vec(data) {
        Ok(body) => Response::json(body),
        Err(e) => {
            error!("json encode failed: {e}");
            Response::status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// ── IntoReply ─────────────────────────────────────────────────────────────────

/// Conversion of a handler's return value into a [`Reply`].
pub trait IntoReply {
    fn into_reply(self) -> Reply;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Reply { self }
}

impl IntoReply for Response {
    fn into_reply(self) -> Reply { Reply::Response(self) }
}

impl IntoReply for Vec<u8> {
    fn into_reply(self) -> Reply { Reply::Bytes(self.into()) }
}

impl IntoReply for Bytes {
    fn into_reply(self) -> Reply { Reply::Bytes(self) }
}

impl IntoReply for String {
    fn into_reply(self) -> Reply { Reply::Text(self) }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> Reply { Reply::Text(self.to_owned()) }
}

impl IntoReply for Value {
    fn into_reply(self) -> Reply { Reply::Data { template: None, data: self } }
}

impl IntoReply for StatusCode {
    fn into_reply(self) -> Reply { Reply::Status(self) }
}

impl IntoReply for (StatusCode, String) {
    fn into_reply(self) -> Reply { Reply::StatusText(self.0, self.1) }
}

impl IntoReply for (StatusCode, &'static str) {
    fn into_reply(self) -> Reply { Reply::StatusText(self.0, self.1.to_owned()) }
}

/// Business-rule errors become a structured body; bad requests a `400` with
/// the reason; anything else a `500`.
impl IntoReply for Error {
    fn into_reply(self) -> Reply {
        match self {
            Self::Api(api) => Reply::json(api),
            Self::BadRequest(reason) => Reply::StatusText(StatusCode::BAD_REQUEST, reason),
            Self::Value(reason) => Reply::StatusText(StatusCode::BAD_REQUEST, reason),
            other => {
                error!("handler failed: {other}");
                Reply::Status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

impl<R: IntoReply, E: IntoReply> IntoReply for Result<R, E> {
    fn into_reply(self) -> Reply {
        match self {
            Ok(reply) => reply.into_reply(),
            Err(e) => e.into_reply(),
        }
    }
}
