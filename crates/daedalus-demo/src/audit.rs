//! A registry-provided stage that records request entry.

use std::sync::Arc;

use daedalus::pipeline::{BoxFuture, Outcome, PipelineResult, Provider, ProviderContext, ProviderRegistry};
use tracing::info;

/// State key under which the audited path is stored on the exchange.
pub const AUDIT_STATE: &str = "audit.path";

/// Logs each request that reaches it and tags the exchange.
///
/// The spec value names the audit channel: `audit=billing`.
#[derive(Debug, Clone)]
pub struct Audit {
    channel: String,
}

impl Audit {
    /// Creates an audit stage for `channel`; empty means `default`.
    pub fn new(channel: &str) -> Self {
        let channel = if channel.is_empty() { "default" } else { channel };
        Self {
            channel: channel.to_string(),
        }
    }

    /// The audit channel.
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl Provider for Audit {
    fn name(&self) -> &str {
        "audit"
    }

    fn handle<'a>(&'a self, ctx: &'a mut dyn ProviderContext) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            let path = ctx.exchange().path().to_string();
            info!(
                request_id = %ctx.request_id(),
                channel = %self.channel,
                method = %ctx.exchange().method(),
                %path,
                "audit"
            );
            ctx.exchange_mut().insert_state(AUDIT_STATE, path);
            Outcome::Continue
        })
    }
}

/// Registers the demo's custom stages.
pub fn register_providers(registry: &ProviderRegistry) -> PipelineResult<()> {
    registry.register("audit", |value: &str| -> Arc<dyn Provider> {
        Arc::new(Audit::new(value))
    })
}
