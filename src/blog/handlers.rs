//! Blog routes.

use serde_json::{json, Value};
use tracing::info;

use crate::api::ApiError;
use crate::binder::Args;
use crate::error::Result;
use crate::orm::FindAll;
use crate::request::Request;
use crate::response::{Reply, Response};
use crate::session::{self, Credentials};

use super::models::{Blog, Comment, User};
use super::page::Page;
use super::App;

/// Resolves the signed-in user from the session cookie.
pub async fn current_user(app: &App, request: Option<&Request>) -> Result<Option<User>> {
    let Some(token) = request.and_then(|req| req.cookie(&app.session.cookie_name)) else {
        return Ok(None);
    };
    info!("check user: {}", request.map_or("", |req| req.path()));
    let user = session::decode(token, &app.session.secret, |id| app.db.find_by_key::<User>(id)).await?;
    if let Some(user) = &user {
        info!("set current user: {}", user.email.as_deref().unwrap_or_default());
    }
    Ok(user)
}

/// Stored form of a client password digest.
pub fn password_hash(user_id: &str, passwd: &str) -> String {
    session::sha256_hex(&format!("{user_id}:{passwd}"))
}

pub async fn index(app: App, args: Args) -> Result<Reply> {
    let user = current_user(&app, args.request()).await?;
    let (page, blogs) = paged::<Blog>(&app, args.text("page").as_deref()).await?;
    Ok(Reply::template("blogs.html", json!({ "page": page, "blogs": blogs, "__user__": user })))
}

pub async fn blog(app: App, args: Args) -> Result<Reply> {
    let id = args.require_text("id")?;
    let user = current_user(&app, args.request()).await?;
    let Some(blog) = app.db.find_by_key::<Blog>(id.clone()).await? else {
        return Err(ApiError::not_found("blog", "Blog not found.").into());
    };
    let comments: Vec<Comment> = app
        .db
        .find_all(&FindAll::new().filter("`blog_id`=?", [Value::from(id)]).order_by("created_at desc"))
        .await?;
    Ok(Reply::template("blog.html", json!({ "blog": blog, "comments": comments, "__user__": user })))
}

pub async fn register(_: App, _: Args) -> Reply {
    Reply::template("register.html", json!({}))
}

pub async fn signin(_: App, _: Args) -> Reply {
    Reply::template("signin.html", json!({}))
}

pub async fn signout(app: App, args: Args) -> Response {
    let referer = args.request().and_then(|req| req.header("referer")).unwrap_or("/");
    info!("user signed out.");
    app.session.sign_out(Response::builder()).redirect(referer)
}

pub async fn authenticate(app: App, args: Args) -> Result<Response> {
    let email = args.require_text("email")?.trim().to_lowercase();
    let passwd = args.require_text("passwd")?;
    if email.is_empty() {
        return Err(ApiError::value("email", "Invalid email.").into());
    }
    if passwd.is_empty() {
        return Err(ApiError::value("passwd", "Invalid password.").into());
    }
    let found: Vec<User> = app
        .db
        .find_all(&FindAll::new().filter("`email`=?", [Value::from(email)]))
        .await?;
    let Some(mut user) = found.into_iter().next() else {
        return Err(ApiError::value("email", "Email not exist.").into());
    };
    if password_hash(user.user_id(), &passwd) != user.password_hash() {
        return Err(ApiError::value("passwd", "Invalid password.").into());
    }
    signed_in(&app, &mut user)
}

pub async fn api_register_user(app: App, args: Args) -> Result<Response> {
    let email = args.require_text("email")?.trim().to_lowercase();
    let name = args.require_text("name")?.trim().to_owned();
    let passwd = args.require_text("passwd")?;
    if name.is_empty() {
        return Err(ApiError::value("name", "Invalid name.").into());
    }
    if !valid_email(&email) {
        return Err(ApiError::value("email", "Invalid email.").into());
    }
    if !valid_password_digest(&passwd) {
        return Err(ApiError::value("passwd", "Invalid password.").into());
    }
    let taken: Vec<User> = app
        .db
        .find_all(&FindAll::new().filter("`email`=?", [Value::from(email.clone())]))
        .await?;
    if !taken.is_empty() {
        return Err(ApiError::new("register:failed", "email", "Email is already in use.").into());
    }

    let id = super::models::next_id();
    let mut user = User {
        passwd: Some(password_hash(&id, &passwd)),
        image: Some(format!(
            "http://www.gravatar.com/avatar/{}?d=mm&s=120",
            session::sha256_hex(&email)
        )),
        id: Some(id),
        email: Some(email),
        name: Some(name),
        ..User::default()
    };
    app.db.save(&mut user).await?;
    signed_in(&app, &mut user)
}

pub async fn api_get_users(app: App, args: Args) -> Result<Reply> {
    let (page, mut users) = paged::<User>(&app, args.text("page").as_deref()).await?;
    users.iter_mut().for_each(User::scrub_password);
    Ok(Reply::json(json!({ "page": page, "users": users })))
}

pub async fn api_get_blog(app: App, args: Args) -> Result<Reply> {
    let id = args.require_text("id")?;
    match app.db.find_by_key::<Blog>(id).await? {
        Some(blog) => Ok(Reply::json(blog)),
        None => Err(ApiError::not_found("blog", "Blog not found.").into()),
    }
}

pub async fn api_create_blog(app: App, args: Args) -> Result<Reply> {
    let user = current_user(&app, args.request()).await?;
    let Some(user) = user.filter(User::is_admin) else {
        return Err(ApiError::permission("Only administrators may publish.").into());
    };
    let name = non_empty(&args, "name")?;
    let summary = non_empty(&args, "summary")?;
    let content = non_empty(&args, "content")?;
    let mut blog = Blog {
        user_id: user.id,
        user_name: user.name,
        user_image: user.image,
        name: Some(name),
        summary: Some(summary),
        content: Some(content),
        ..Blog::default()
    };
    app.db.save(&mut blog).await?;
    Ok(Reply::json(blog))
}

pub async fn api_create_comment(app: App, args: Args) -> Result<Reply> {
    let Some(user) = current_user(&app, args.request()).await? else {
        return Err(ApiError::permission("Please signin first.").into());
    };
    let blog_id = args.require_text("id")?;
    let content = non_empty(&args, "content")?;
    if app.db.find_by_key::<Blog>(blog_id.clone()).await?.is_none() {
        return Err(ApiError::not_found("blog", "Blog not found.").into());
    }
    let mut comment = Comment {
        blog_id: Some(blog_id),
        user_id: user.id,
        user_name: user.name,
        user_image: user.image,
        content: Some(content),
        ..Comment::default()
    };
    app.db.save(&mut comment).await?;
    Ok(Reply::json(comment))
}

/// Sets the session cookie and returns `user` with its password scrubbed.
fn signed_in(app: &App, user: &mut User) -> Result<Response> {
    let builder = app.session.sign_in(Response::builder(), &*user);
    user.scrub_password();
    Ok(builder.json(serde_json::to_vec(&*user)?))
}

/// One page of `E`, newest first.
async fn paged<E: crate::orm::Entity>(app: &App, index: Option<&str>) -> Result<(Page, Vec<E>)> {
    let count = app.db.find_number::<E>("count(id)", None, &[]).await?;
    let count = count.and_then(|n| n.as_u64()).unwrap_or(0);
    let page = Page::new(count, Page::index(index), Page::DEFAULT_SIZE);
    if page.limit == 0 {
        return Ok((page, Vec::new()));
    }
    let items = app
        .db
        .find_all(&FindAll::new().order_by("created_at desc").limit((page.offset, page.limit)))
        .await?;
    Ok((page, items))
}

fn non_empty(args: &Args, name: &str) -> Result<String> {
    let value = args.require_text(name)?.trim().to_owned();
    if value.is_empty() {
        return Err(ApiError::value(name, format!("{name} cannot be empty.")).into());
    }
    Ok(value)
}

/// `local@domain.tld`, lowercase, with one to four dot-separated suffixes.
fn valid_email(email: &str) -> bool {
    let word = |s: &str, extra: &[char]| {
        !s.is_empty()
            && s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || extra.contains(&c))
    };
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let labels: Vec<&str> = domain.split('.').collect();
    word(local, &['.', '-', '_'])
        && (2..=5).contains(&labels.len())
        && labels.iter().all(|label| word(label, &['-', '_']))
}

/// A lowercase hex SHA-256 digest, as the sign-in form submits.
fn valid_password_digest(passwd: &str) -> bool {
    passwd.len() == 64 && passwd.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(valid_email("tom@example.com"));
        assert!(valid_email("first.last-1@mail.co.uk"));
        assert!(!valid_email("Tom@example.com"));
        assert!(!valid_email("tom@localhost"));
        assert!(!valid_email("tom@a.b.c.d.e.f"));
        assert!(!valid_email("@example.com"));
        assert!(!valid_email("tom@@example.com"));
    }

    #[test]
    fn password_digests() {
        assert!(valid_password_digest(&session::sha256_hex("secret")));
        assert!(!valid_password_digest("secret"));
        assert!(!valid_password_digest(&session::sha256_hex("secret").to_uppercase()));
    }

    #[test]
    fn stored_hash_binds_the_user_id() {
        assert_ne!(password_hash("a", "pw"), password_hash("b", "pw"));
        assert_eq!(password_hash("a", "pw"), session::sha256_hex("a:pw"));
    }
}
