//! The `handle` stage: runs the business handler.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::context::Context;
use crate::error::PipelineError;
use crate::provider::Outcome;
use crate::types::{HandlerFn, Payload, ReplyPayload};

/// Invokes the business handler with the decoded request.
///
/// Aborts with 400 when no `req` stage ran before it or when decoding
/// failed. A handler error does not abort: it is stored in the `handle` slot
/// for the encoder.
pub struct HandleProvider<Q, F, J, P> {
    handler: HandlerFn<Q, F, J, P>,
}

impl<Q, F, J, P> Clone for HandleProvider<Q, F, J, P> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<Q, F, J, P> HandleProvider<Q, F, J, P>
where
    Q: Payload,
    F: Payload,
    J: Payload,
    P: ReplyPayload,
{
    /// Wraps a business handler.
    pub fn new(handler: HandlerFn<Q, F, J, P>) -> Self {
        Self { handler }
    }

    pub(crate) async fn run(&self, ctx: &mut Context<Q, F, J, P>) -> Outcome {
        let request_id = ctx.request_id();
        let request = match ctx.req_slot_mut() {
            None => return Outcome::Abort(PipelineError::missing_request_stage()),
            Some(slot) => {
                if let Some(err) = &slot.error {
                    warn!(%request_id, error = %err, "rejecting request that failed to decode");
                    return Outcome::Abort(PipelineError::Decode(err.clone()));
                }
                match slot.request.take() {
                    Some(request) => request,
                    None => return Outcome::Abort(PipelineError::missing_request_stage()),
                }
            }
        };

        let result = (self.handler)(ctx, request).await;
        if let Err(err) = &result {
            debug!(%request_id, error = %err, "handler returned an error");
        }
        ctx.set_handle_result(result);
        Outcome::Continue
    }
}
