mod common;

use bytes::Bytes;
use http::StatusCode;
use quill::blog::handlers::password_hash;
use quill::blog::models::User;
use quill::blog::{self, App};
use quill::session::{self, SessionConfig, SCRUBBED_PASSWORD};
use quill::{Response, Router};
use serde_json::{json, Value};

use common::memory_db;

async fn app() -> (App, Router<App>) {
    let app = App { db: memory_db().await, session: SessionConfig::default() };
    (app.clone(), blog::routes(app))
}

fn digest(passwd: &str) -> String {
    session::sha256_hex(passwd)
}

fn get(uri: &str, cookie: Option<&str>) -> http::Request<Bytes> {
    let mut req = http::Request::get(uri);
    if let Some(cookie) = cookie {
        req = req.header("cookie", cookie);
    }
    req.body(Bytes::new()).unwrap()
}

fn post(uri: &str, body: Value, cookie: Option<&str>) -> http::Request<Bytes> {
    let mut req = http::Request::post(uri).header("content-type", "application/json");
    if let Some(cookie) = cookie {
        req = req.header("cookie", cookie);
    }
    req.body(Bytes::from(body.to_string())).unwrap()
}

fn body(resp: &Response) -> Value {
    serde_json::from_slice(resp.body()).unwrap()
}

/// The `name=value` pair of the response's session cookie.
fn session_cookie(resp: &Response) -> String {
    let header = resp.header("set-cookie").expect("session cookie");
    header.split(';').next().unwrap().to_owned()
}

async fn register(router: &Router<App>, email: &str) -> (Value, String) {
    let resp = router
        .respond(post(
            "/api/users",
            json!({"email": email, "name": "Tom", "passwd": digest("secret")}),
            None,
        ))
        .await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    (body(&resp), session_cookie(&resp))
}

#[tokio::test]
async fn register_creates_a_signed_in_user() {
    let (app, router) = app().await;
    let (user, cookie) = register(&router, "tom@example.com").await;

    assert_eq!(user["email"], "tom@example.com");
    assert_eq!(user["passwd"], SCRUBBED_PASSWORD);
    assert_eq!(user["admin"], false);
    assert!(cookie.starts_with("awesession="));

    let id = user["id"].as_str().unwrap();
    let stored = app.db.find_by_key::<User>(id).await.unwrap().unwrap();
    assert_eq!(stored.passwd, Some(password_hash(id, &digest("secret"))));
}

#[tokio::test]
async fn register_rejects_bad_input() {
    let (_, router) = app().await;
    register(&router, "tom@example.com").await;

    let again = router
        .respond(post(
            "/api/users",
            json!({"email": "tom@example.com", "name": "Tom", "passwd": digest("x")}),
            None,
        ))
        .await;
    assert_eq!(again.status_code(), StatusCode::OK);
    assert_eq!(body(&again)["error"], "register:failed");

    let bad_email = router
        .respond(post("/api/users", json!({"email": "tom", "name": "Tom", "passwd": digest("x")}), None))
        .await;
    assert_eq!(body(&bad_email), json!({"error": "value:invalid", "data": "email", "message": "Invalid email."}));

    let raw_password = router
        .respond(post("/api/users", json!({"email": "amy@example.com", "name": "Amy", "passwd": "x"}), None))
        .await;
    assert_eq!(body(&raw_password)["data"], "passwd");

    let missing = router
        .respond(post("/api/users", json!({"email": "amy@example.com", "name": "Amy"}), None))
        .await;
    assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(missing.body().as_ref(), b"Missing argument: passwd");
}

#[tokio::test]
async fn authenticate_checks_the_password() {
    let (_, router) = app().await;
    register(&router, "tom@example.com").await;

    let ok = router
        .respond(post("/api/authenticate", json!({"email": "Tom@Example.com", "passwd": digest("secret")}), None))
        .await;
    assert_eq!(body(&ok)["passwd"], SCRUBBED_PASSWORD);
    assert!(session_cookie(&ok).starts_with("awesession="));

    let wrong = router
        .respond(post("/api/authenticate", json!({"email": "tom@example.com", "passwd": digest("nope")}), None))
        .await;
    assert_eq!(body(&wrong)["data"], "passwd");
    assert!(wrong.header("set-cookie").is_none());

    let unknown = router
        .respond(post("/api/authenticate", json!({"email": "amy@example.com", "passwd": digest("secret")}), None))
        .await;
    assert_eq!(body(&unknown)["message"], "Email not exist.");
}

#[tokio::test]
async fn session_token_resolves_until_the_password_changes() {
    let (app, router) = app().await;
    let (user, cookie) = register(&router, "tom@example.com").await;
    let token = cookie.trim_start_matches("awesession=");
    let secret = &app.session.secret;

    let current = session::decode(token, secret, |id| app.db.find_by_key::<User>(id)).await.unwrap().unwrap();
    assert_eq!(current.id.as_deref(), user["id"].as_str());
    assert_eq!(current.passwd.as_deref(), Some(SCRUBBED_PASSWORD));

    let id = current.id.unwrap();
    app.db.update_by_key::<User>(id, &[("passwd", json!("rotated"))]).await.unwrap();
    let after = session::decode(token, secret, |id| app.db.find_by_key::<User>(id)).await.unwrap();
    assert_eq!(after, None);
}

#[tokio::test]
async fn only_admins_publish() {
    let (app, router) = app().await;
    let (user, cookie) = register(&router, "tom@example.com").await;
    let post_blog = || {
        post(
            "/api/blogs",
            json!({"name": "Hello", "summary": "First post", "content": "Body"}),
            Some(&cookie),
        )
    };

    let denied = router.respond(post_blog()).await;
    assert_eq!(body(&denied)["error"], "permission:forbidden");

    let id = user["id"].as_str().unwrap().to_owned();
    app.db.update_by_key::<User>(id.clone(), &[("admin", json!(true))]).await.unwrap();

    let created = body(&router.respond(post_blog()).await);
    assert_eq!(created["user_id"], id.as_str());
    assert_eq!(created["name"], "Hello");

    let blog_id = created["id"].as_str().unwrap();
    let fetched = body(&router.respond(get(&format!("/api/blogs/{blog_id}"), None)).await);
    assert_eq!(fetched, created);

    let missing = body(&router.respond(get("/api/blogs/nope", None)).await);
    assert_eq!(missing["error"], "value:notfound");
}

#[tokio::test]
async fn comments_require_a_session() {
    let (app, router) = app().await;
    let (user, cookie) = register(&router, "tom@example.com").await;
    app.db
        .update_by_key::<User>(user["id"].as_str().unwrap(), &[("admin", json!(true))])
        .await
        .unwrap();
    let created = body(
        &router
            .respond(post("/api/blogs", json!({"name": "Hi", "summary": "s", "content": "c"}), Some(&cookie)))
            .await,
    );
    let blog_id = created["id"].as_str().unwrap();
    let uri = format!("/api/blogs/{blog_id}/comments");

    let anonymous = router.respond(post(&uri, json!({"content": "first!"}), None)).await;
    assert_eq!(body(&anonymous)["error"], "permission:forbidden");

    let empty = router.respond(post(&uri, json!({"content": "  "}), Some(&cookie))).await;
    assert_eq!(body(&empty)["data"], "content");

    let comment = body(&router.respond(post(&uri, json!({"content": "first!", "id": "spoofed"}), Some(&cookie))).await);
    assert_eq!(comment["blog_id"], blog_id);
    assert_eq!(comment["user_name"], "Tom");

    // without a template engine the page data is served as JSON
    let page = body(&router.respond(get(&format!("/blog/{blog_id}"), Some(&cookie))).await);
    assert_eq!(page["blog"]["id"], blog_id);
    assert_eq!(page["comments"].as_array().unwrap().len(), 1);
    assert_eq!(page["__user__"]["email"], "tom@example.com");
}

#[tokio::test]
async fn listings_are_paged() {
    let (_, router) = app().await;
    register(&router, "tom@example.com").await;
    register(&router, "amy@example.com").await;

    let users = body(&router.respond(get("/api/users", None)).await);
    assert_eq!(users["page"]["item_count"], 2);
    assert_eq!(users["page"]["page_index"], 1);
    let listed = users["users"].as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|u| u["passwd"] == SCRUBBED_PASSWORD));

    let beyond = body(&router.respond(get("/api/users?page=9", None)).await);
    assert_eq!(beyond["page"]["page_index"], 1);
    assert_eq!(beyond["users"], json!([]));

    let index = body(&router.respond(get("/", None)).await);
    assert_eq!(index["page"]["item_count"], 0);
    assert_eq!(index["blogs"], json!([]));
    assert_eq!(index["__user__"], Value::Null);
}

#[tokio::test]
async fn signout_clears_the_cookie() {
    let (_, router) = app().await;
    let req = http::Request::get("/signout")
        .header("referer", "/blog/1")
        .body(Bytes::new())
        .unwrap();
    let resp = router.respond(req).await;
    assert_eq!(resp.status_code(), StatusCode::FOUND);
    assert_eq!(resp.header("location"), Some("/blog/1"));
    assert_eq!(session_cookie(&resp), "awesession=-deleted-");

    let resp = router.respond(get("/signout", None)).await;
    assert_eq!(resp.header("location"), Some("/"));
}
