//! The `req` stage: decodes the typed request.

use daedalus_core::Exchange;
use daedalus_extract::{decode_form, decode_json, decode_query, ExtractionError, ExtractionSource};
use tracing::debug;

use crate::context::{Context, Req, ReqSlot};
use crate::error::{PipelineError, PipelineResult};
use crate::provider::Outcome;
use crate::types::Payload;

/// Decodes the query string, form body and JSON body selected by the token
/// value (`req=QFJ`, letters in any case, empty means `Q`).
///
/// The decoder never aborts. It records the request or the decode error and
/// leaves the decision to the stage that consumes the slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReqProvider {
    query: bool,
    form: bool,
    json: bool,
    max_body_size: usize,
}

impl ReqProvider {
    /// Parses a token value.
    ///
    /// ```
    /// use daedalus_pipeline::stages::ReqProvider;
    ///
    /// let req = ReqProvider::parse("qj", 1024).unwrap();
    /// assert!(req.decodes_query() && req.decodes_json() && !req.decodes_form());
    /// assert!(ReqProvider::parse("X", 1024).is_err());
    /// ```
    pub fn parse(value: &str, max_body_size: usize) -> PipelineResult<Self> {
        let mut provider = Self {
            query: false,
            form: false,
            json: false,
            max_body_size,
        };
        let value = value.trim();
        if value.is_empty() {
            provider.query = true;
            return Ok(provider);
        }
        for letter in value.chars() {
            match letter.to_ascii_uppercase() {
                'Q' => provider.query = true,
                'F' => provider.form = true,
                'J' => provider.json = true,
                other => {
                    return Err(PipelineError::Configuration(format!(
                        "req: unknown source `{other}` in `{value}` (expected Q, F or J)"
                    )))
                }
            }
        }
        Ok(provider)
    }

    /// True if the query string is decoded.
    pub fn decodes_query(&self) -> bool {
        self.query
    }

    /// True if a url-encoded form body is decoded.
    pub fn decodes_form(&self) -> bool {
        self.form
    }

    /// True if a JSON body is decoded.
    pub fn decodes_json(&self) -> bool {
        self.json
    }

    /// Largest body or frame accepted, in bytes.
    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    /// Decodes the selected sources of an HTTP request.
    pub fn decode<Q, F, J>(&self, exchange: &Exchange) -> Result<Req<Q, F, J>, ExtractionError>
    where
        Q: Payload,
        F: Payload,
        J: Payload,
    {
        let mut req = Req::empty(exchange.params().clone());
        if self.query {
            req.query = Some(decode_query(exchange)?);
        }
        if self.form {
            req.form = Some(decode_form(exchange, self.max_body_size)?);
        }
        if self.json {
            req.json = Some(decode_json(
                exchange.body(),
                self.max_body_size,
                ExtractionSource::Body,
            )?);
        }
        Ok(req)
    }

    /// Decodes one WebSocket frame.
    ///
    /// The frame is always decoded as the JSON source. Query and path
    /// parameters come from the upgrade request.
    pub fn decode_frame<Q, F, J>(
        &self,
        exchange: &Exchange,
        frame: &[u8],
    ) -> Result<Req<Q, F, J>, ExtractionError>
    where
        Q: Payload,
        F: Payload,
        J: Payload,
    {
        let mut req = Req::empty(exchange.params().clone());
        if self.query {
            req.query = Some(decode_query(exchange)?);
        }
        req.json = Some(decode_json(frame, self.max_body_size, ExtractionSource::Frame)?);
        Ok(req)
    }

    pub(crate) fn run<Q, F, J, P>(&self, ctx: &mut Context<Q, F, J, P>) -> Outcome
    where
        Q: Payload,
        F: Payload,
        J: Payload,
    {
        let slot = match self.decode(ctx.exchange()) {
            Ok(req) => ReqSlot::decoded(req),
            Err(e) => {
                debug!(request_id = %ctx.request_id(), error = %e, "request decode failed");
                ReqSlot::failed(e)
            }
        };
        ctx.set_req_slot(slot);
        Outcome::Continue
    }
}
