//! Handler and payload type plumbing.

use daedalus_core::{ApiError, BoxFuture};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use crate::context::{Context, Req};

/// A decodable request source (`Q`, `F`, `J`). Use `()` for unused sources.
pub trait Payload: DeserializeOwned + Send + Sync + 'static {}

impl<T> Payload for T where T: DeserializeOwned + Send + Sync + 'static {}

/// An encodable handler response (`P`).
pub trait ReplyPayload: Serialize + Send + Sync + 'static {}

impl<T> ReplyPayload for T where T: Serialize + Send + Sync + 'static {}

/// A business handler: `(context, request) -> Result<response, error>`.
///
/// The returned future may borrow the context for as long as it runs.
pub type HandlerFn<Q, F, J, P> = Arc<
    dyn for<'a> Fn(&'a mut Context<Q, F, J, P>, Req<Q, F, J>) -> BoxFuture<'a, Result<P, ApiError>>
        + Send
        + Sync,
>;

/// Boxes a closure as a [`HandlerFn`].
///
/// Passing the closure through this bound lets the compiler infer the
/// borrowed-future signature:
///
/// ```
/// use daedalus_pipeline::{handler_fn, Context, HandlerFn, Req};
///
/// let hello: HandlerFn<(), (), (), String> =
///     handler_fn(|_ctx: &mut Context<(), (), (), String>, _req: Req<(), (), ()>| {
///         Box::pin(async { Ok("hello".to_string()) })
///     });
/// # let _ = hello;
/// ```
pub fn handler_fn<Q, F, J, P, H>(handler: H) -> HandlerFn<Q, F, J, P>
where
    H: for<'a> Fn(&'a mut Context<Q, F, J, P>, Req<Q, F, J>) -> BoxFuture<'a, Result<P, ApiError>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(handler)
}
