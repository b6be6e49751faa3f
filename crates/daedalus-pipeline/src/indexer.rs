//! Per-chain lookup of sibling stages.

use std::sync::Arc;

use crate::stages::{ReqProvider, RspProvider};

/// The decoder and encoder participating in one chain.
///
/// Built once when the chain is built and shared read-only by every request
/// on that route. Two chains never share an indexer.
#[derive(Debug, Clone, Default)]
pub struct Indexer {
    req: Option<Arc<ReqProvider>>,
    rsp: Option<Arc<RspProvider>>,
}

impl Indexer {
    /// Records the chain's decoder. The first one wins, so a route's own
    /// `req` shadows one inherited later in the spec.
    pub(crate) fn offer_req(&mut self, provider: &Arc<ReqProvider>) {
        if self.req.is_none() {
            self.req = Some(Arc::clone(provider));
        }
    }

    /// Records the chain's encoder. The first one wins.
    pub(crate) fn offer_rsp(&mut self, provider: &Arc<RspProvider>) {
        if self.rsp.is_none() {
            self.rsp = Some(Arc::clone(provider));
        }
    }

    /// The chain's `req` stage.
    pub fn req(&self) -> Option<&ReqProvider> {
        self.req.as_deref()
    }

    /// The chain's `rsp` stage.
    pub fn rsp(&self) -> Option<&RspProvider> {
        self.rsp.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::Media;

    #[test]
    fn test_first_req_and_rsp_win() {
        let mut indexer = Indexer::default();
        indexer.offer_req(&Arc::new(ReqProvider::parse("J", 1024).unwrap()));
        indexer.offer_req(&Arc::new(ReqProvider::parse("Q", 1024).unwrap()));
        indexer.offer_rsp(&Arc::new(RspProvider::parse("text").unwrap()));
        indexer.offer_rsp(&Arc::new(RspProvider::parse("json").unwrap()));

        let req = indexer.req().unwrap();
        assert!(req.decodes_json());
        assert!(!req.decodes_query());
        assert_eq!(indexer.rsp().unwrap().media(), Media::Text);
    }
}
