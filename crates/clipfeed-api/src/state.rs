//! Shared process state, grounded on the teacher's `agent::api::App` — one
//! plain struct of `Arc`-wrapped resources handed to every handler through
//! axum's `State` extractor.

use std::sync::Arc;

use clipfeed_dialect::DialectHandle;
use clipfeed_ranking::LtrModel;
use clipfeed_security::{CookieVault, RateLimiter};
use clipfeed_topics::TopicGraph;
use ipnetwork::IpNetwork;

use crate::config::Config;
use crate::storage::ObjectStore;

pub struct App {
    pub handle: DialectHandle,
    pub topics: Arc<TopicGraph>,
    pub rate_limiter: Arc<RateLimiter>,
    pub cookie_vault: CookieVault,
    pub storage: Arc<dyn ObjectStore>,
    pub ltr_model: Option<LtrModel>,
    pub trusted_cidrs: Vec<IpNetwork>,
    pub config: Config,
}

impl App {
    pub fn new(
        handle: DialectHandle,
        topics: Arc<TopicGraph>,
        rate_limiter: Arc<RateLimiter>,
        storage: Arc<dyn ObjectStore>,
        ltr_model: Option<LtrModel>,
        config: Config,
    ) -> Self {
        let cookie_vault = CookieVault::new(&config.credential_secret);
        let trusted_cidrs = clipfeed_security::default_trusted_cidrs();
        Self {
            handle,
            topics,
            rate_limiter,
            cookie_vault,
            storage,
            ltr_model,
            trusted_cidrs,
            config,
        }
    }
}
