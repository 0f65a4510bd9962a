//! A `QuoteSource` that always fails at login.
//!
//! Deployments bind the real vendor SDK (out of this crate's scope, per
//! §1/§6 — it is specified only through its interface) by providing their
//! own [`super::QuoteSource`] implementation in its place. This placeholder
//! lets the binary link and run unattended, surfacing the gap as a normal
//! `LoginOrFetchError` the supervisor already knows how to recover from
//! (it retries every iteration) rather than panicking at startup.

use super::QuoteSource;
use crate::error::{BridgeError, BridgeResult};
use std::sync::Arc;

pub struct UnimplementedQuoteSource;

impl UnimplementedQuoteSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for UnimplementedQuoteSource {
    fn default() -> Self {
        Self::new()
    }
}

impl QuoteSource for UnimplementedQuoteSource {
    fn login(&self, _api_key: &str, _secret_key: &str) -> BridgeResult<()> {
        Err(BridgeError::LoginOrFetchError(
            "no vendor SDK binding configured; supply a QuoteSource implementation".into(),
        ))
    }

    fn activate_contract(&self, _code: &str) -> BridgeResult<bool> {
        Ok(false)
    }

    fn subscribe(&self, _code: &str) -> BridgeResult<()> {
        Ok(())
    }

    fn unsubscribe(&self, _code: &str) -> BridgeResult<()> {
        Ok(())
    }

    fn logout(&self) -> BridgeResult<()> {
        Ok(())
    }

    fn register_session_down_handler(&self, _handler: Arc<dyn Fn(String) + Send + Sync>) {
        // No real SDK to fire the callback; nothing to store.
    }
}
