//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! The router holds handlers of *different* types in one radix tree per
//! method, so each handler hides behind a trait object (`dyn ErasedHandler`).
//!
//! ```text
//! async fn get_blog(app: App, args: Args) -> Result<Reply> { … }   ← user writes this
//!        ↓ router.get("/api/blogs/{id}", Signature::new().positional("id"), get_blog)
//! get_blog.into_boxed_handler()                ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(get_blog))                ← stored as BoxedHandler<App>
//!        ↓
//! handler.call(state.clone(), args)            ← one vtable dispatch per request
//!        ↓
//! Box::pin(async { get_blog(app, args).await.into_reply() })
//! ```
//!
//! Every handler receives the shared application state `S` by value (clone it
//! cheaply: wrap pools and config in `Arc` or use handles that already are)
//! and the [`Args`] bound for this request.
//!
//! A handler returning `Err(Error::Api(..))` is *answered*, not failed: the
//! conversion to [`Reply`] turns business-rule errors into a structured body.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::binder::Args;
use crate::response::{IntoReply, Reply};

/// A heap-allocated, type-erased future that resolves to a [`Reply`].
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Reply> + Send + 'static>>;

/// Internal dispatch interface.
#[doc(hidden)]
pub trait ErasedHandler<S> {
    fn call(&self, state: S, args: Args) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler<S> = Arc<dyn ErasedHandler<S> + Send + Sync + 'static>;

/// Implemented for every valid route handler:
///
/// ```text
/// async fn name(state: S, args: Args) -> impl IntoReply
/// ```
///
/// Sealed: only the blanket impl below can satisfy it.
pub trait Handler<S>: private::Sealed<S> + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler<S>;
}

mod private {
    pub trait Sealed<S> {}
}

impl<S, F, Fut, R> private::Sealed<S> for F
where
    F: Fn(S, Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
}

impl<S, F, Fut, R> Handler<S> for F
where
    S: 'static,
    F: Fn(S, Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler<S> {
        Arc::new(FnHandler(self))
    }
}

/// Holds a concrete handler `F` and implements [`ErasedHandler`].
struct FnHandler<F>(F);

impl<S, F, Fut, R> ErasedHandler<S> for FnHandler<F>
where
    F: Fn(S, Args) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
    fn call(&self, state: S, args: Args) -> BoxFuture {
        let fut = (self.0)(state, args);
        Box::pin(async move { fut.await.into_reply() })
    }
}
