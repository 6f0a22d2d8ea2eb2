//! # quill
//!
//! A small blogging web application and the framework it runs on.
//!
//! ## The pieces
//!
//! - **Routing and binding.** Each route declares the parameters its handler
//!   takes with a [`Signature`]. The binder fills them from the JSON or form
//!   body, the query string and the path variables, and rejects malformed
//!   requests with a `400` before the handler runs.
//! - **Replies.** Handlers return anything [`IntoReply`]: bytes, text, a
//!   redirect, JSON data or a named template.
//! - **ORM.** [`orm`] maps serde structs onto tables through a pooled
//!   [`orm::Db`].
//! - **Sessions.** [`session`] signs stateless cookie tokens.
//! - **The blog.** [`blog`] wires it all together.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use quill::{Args, Reply, Router, Server, Signature};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> quill::Result<()> {
//!     let app = Router::new(())
//!         .get("/hello/{name}", Signature::new().positional("name"), hello);
//!
//!     Server::bind("127.0.0.1:9000".parse().unwrap()).serve(app).await
//! }
//!
//! async fn hello(_: (), args: Args) -> quill::Result<Reply> {
//!     let name = args.require_text("name")?;
//!     Ok(Reply::json(json!({ "hello": name })))
//! }
//! ```

mod api;
mod binder;
mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod templates;

pub mod blog;
pub mod config;
pub mod orm;
pub mod session;

pub use api::ApiError;
pub use binder::{Args, Binder, Param, ParamKind, Signature};
pub use error::{Error, Result};
pub use handler::Handler;
pub use method::Method;
pub use request::Request;
pub use response::{ContentType, IntoReply, Reply, Response, ResponseBuilder, REDIRECT_PREFIX};
pub use router::Router;
pub use server::Server;
pub use templates::Templates;
