//! The blog application: users, posts and comments behind cookie sessions.

pub mod handlers;
pub mod models;
mod page;

pub use page::Page;

use crate::binder::Signature;
use crate::orm::Db;
use crate::router::Router;
use crate::session::SessionConfig;

/// Shared state every blog handler receives.
#[derive(Clone, Debug)]
pub struct App {
    pub db: Db,
    pub session: SessionConfig,
}

/// The blog's route table.
pub fn routes(app: App) -> Router<App> {
    use handlers::*;

    Router::new(app)
        .get("/", Signature::new().request().keyword_or("page", "1"), index)
        .get("/blog/{id}", Signature::new().positional("id").request(), blog)
        .get("/register", Signature::new(), register)
        .get("/signin", Signature::new(), signin)
        .get("/signout", Signature::new().request(), signout)
        .post("/api/authenticate", Signature::new().keyword("email").keyword("passwd"), authenticate)
        .post(
            "/api/users",
            Signature::new().keyword("email").keyword("name").keyword("passwd"),
            api_register_user,
        )
        .get("/api/users", Signature::new().keyword_or("page", "1"), api_get_users)
        .get("/api/blogs/{id}", Signature::new().positional("id"), api_get_blog)
        .post(
            "/api/blogs",
            Signature::new().request().keyword("name").keyword("summary").keyword("content"),
            api_create_blog,
        )
        .post(
            "/api/blogs/{id}/comments",
            Signature::new().positional("id").request().keyword("content"),
            api_create_comment,
        )
}
