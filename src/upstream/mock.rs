//! A deterministic [`QuoteSource`] test double. Never compiled into a
//! production binary; used only by the Session Manager's unit tests.

use super::QuoteSource;
use crate::error::{BridgeError, BridgeResult};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

pub struct MockQuoteSource {
    fail_login: bool,
    contract_resolves_after: u32,
    attempts: AtomicU32,
    session_down_handler: Mutex<Option<Arc<dyn Fn(String) + Send + Sync>>>,
}

impl MockQuoteSource {
    pub fn always_ok() -> Self {
        Self {
            fail_login: false,
            contract_resolves_after: 0,
            attempts: AtomicU32::new(0),
            session_down_handler: Mutex::new(None),
        }
    }

    pub fn failing_login() -> Self {
        Self {
            fail_login: true,
            contract_resolves_after: 0,
            attempts: AtomicU32::new(0),
            session_down_handler: Mutex::new(None),
        }
    }

    pub fn contract_never_resolves() -> Self {
        Self {
            fail_login: false,
            contract_resolves_after: u32::MAX,
            attempts: AtomicU32::new(0),
            session_down_handler: Mutex::new(None),
        }
    }

    /// Test-only: simulates the SDK firing on-session-down from its own
    /// thread, invoking whatever handler `register_session_down_handler`
    /// last stored (a no-op if nothing registered it yet).
    pub fn trigger_session_down(&self, reason: &str) {
        if let Some(handler) = self.session_down_handler.lock().unwrap().as_ref() {
            handler(reason.to_string());
        }
    }
}

impl QuoteSource for MockQuoteSource {
    fn login(&self, _api_key: &str, _secret_key: &str) -> BridgeResult<()> {
        if self.fail_login {
            Err(BridgeError::LoginOrFetchError("mock login failure".into()))
        } else {
            Ok(())
        }
    }

    fn activate_contract(&self, _code: &str) -> BridgeResult<bool> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(attempt > self.contract_resolves_after)
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

    fn register_session_down_handler(&self, handler: Arc<dyn Fn(String) + Send + Sync>) {
        *self.session_down_handler.lock().unwrap() = Some(handler);
    }
}
