//! Upstream Session Manager: owns the vendor SDK handle, its login/subscription
//! lifecycle, and the `subscribed` state flag.
//!
//! The vendor SDK itself is modeled as the [`QuoteSource`] trait so the state
//! machine can be driven by a deterministic test double as well as a real
//! vendor binding (see [`QuoteSource`] docs for why this crate ships no
//! concrete production implementation).

use crate::config::UpstreamCredentials;
use crate::error::{BridgeError, BridgeResult};
use crate::tick::Tick;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

/// The state machine's position, mirrored here for observability even though
/// the authoritative state is the `subscribed`/`pending_op` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    ConnectedUnsubscribed,
    Subscribing,
    Subscribed,
    Unsubscribing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingOp {
    None,
    Subscribe,
    Unsubscribe,
}

/// The vendor SDK's interface, narrowed to what the Session Manager needs.
///
/// No Rust crate binds the real vendor SDK assumed by §6, and binding one is
/// out of this crate's scope (the specification names the SDK's *interface*,
/// not its implementation, as in-scope). Production deployments supply their
/// own `QuoteSource`; the bundled [`mock::MockQuoteSource`] exists purely so
/// the state machine can be exercised in tests.
pub trait QuoteSource: Send + Sync {
    fn login(&self, api_key: &str, secret_key: &str) -> BridgeResult<()>;
    /// Returns `true` once the target instrument's contract is resolvable.
    fn activate_contract(&self, code: &str) -> BridgeResult<bool>;
    fn subscribe(&self, code: &str) -> BridgeResult<()>;
    fn unsubscribe(&self, code: &str) -> BridgeResult<()>;
    fn logout(&self) -> BridgeResult<()>;

    /// Registers the callback the SDK invokes from its own thread when the
    /// session drops (§4.2's on-session-down). Implementations store the
    /// handler and invoke it with a human-readable reason when that happens.
    fn register_session_down_handler(&self, handler: Arc<dyn Fn(String) + Send + Sync>);
}

pub mod mock;
pub mod placeholder;

const CONTRACT_FETCH_ATTEMPTS: u32 = 10;
const CONTRACT_FETCH_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);
const UNSUBSCRIBE_CONFIRM_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);
const UNSUBSCRIBE_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(100);

/// Owns `UpstreamState` exclusively: `subscribed`, `pending_op`, and the
/// reconnect-in-progress guard.
pub struct SessionManager {
    source: Arc<dyn QuoteSource>,
    credentials: UpstreamCredentials,
    instrument_code: String,
    subscribed: AtomicBool,
    pending_op: AsyncMutex<PendingOp>,
    reconnect_in_progress: AtomicBool,
    on_tick: Arc<dyn Fn(Tick) + Send + Sync>,
    on_subscribed: Arc<dyn Fn() + Send + Sync>,
}

impl SessionManager {
    pub fn new(
        source: Arc<dyn QuoteSource>,
        credentials: UpstreamCredentials,
        instrument_code: String,
        on_tick: Arc<dyn Fn(Tick) + Send + Sync>,
        on_subscribed: Arc<dyn Fn() + Send + Sync>,
    ) -> Self {
        Self {
            source,
            credentials,
            instrument_code,
            subscribed: AtomicBool::new(false),
            pending_op: AsyncMutex::new(PendingOp::None),
            reconnect_in_progress: AtomicBool::new(false),
            on_tick,
            on_subscribed,
        }
    }

    /// Wires the vendor SDK's on-session-down callback to `reconnect`, per
    /// §4.2: "The SDK may invoke on-session-down from its own thread. The
    /// handler calls reconnect(reason)." The callback may fire off the async
    /// runtime, so it spawns the actual reconnect rather than awaiting it
    /// inline.
    pub fn wire_session_down(self: &Arc<Self>) {
        let sm = Arc::clone(self);
        self.source
            .register_session_down_handler(Arc::new(move |reason: String| {
                let sm = Arc::clone(&sm);
                tokio::spawn(async move {
                    sm.reconnect(&reason).await;
                });
            }));
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> SessionState {
        if self.subscribed.load(Ordering::SeqCst) {
            SessionState::Subscribed
        } else {
            SessionState::ConnectedUnsubscribed
        }
    }

    /// Idempotent if already subscribed. Logs in, resolves the instrument's
    /// contract (up to 10 attempts, 1 s apart), then subscribes.
    pub async fn connect_and_subscribe(&self) -> BridgeResult<()> {
        if self.is_subscribed() {
            debug!("connect_and_subscribe: already subscribed, no-op");
            return Ok(());
        }

        self.source
            .login(&self.credentials.api_key, &self.credentials.secret_key)
            .map_err(|e| BridgeError::LoginOrFetchError(format!("login failed: {e}")))?;

        let mut resolved = false;
        for attempt in 1..=CONTRACT_FETCH_ATTEMPTS {
            match self.source.activate_contract(&self.instrument_code) {
                Ok(true) => {
                    resolved = true;
                    break;
                }
                Ok(false) => {
                    debug!(attempt, "contract not yet resolvable, retrying");
                    if attempt < CONTRACT_FETCH_ATTEMPTS {
                        tokio::time::sleep(CONTRACT_FETCH_INTERVAL).await;
                    }
                }
                Err(e) => {
                    return Err(BridgeError::LoginOrFetchError(format!(
                        "contract fetch errored: {e}"
                    )));
                }
            }
        }

        if !resolved {
            return Err(BridgeError::LoginOrFetchError(format!(
                "contract {} not found after {} attempts",
                self.instrument_code, CONTRACT_FETCH_ATTEMPTS
            )));
        }

        *self.pending_op.lock().await = PendingOp::Subscribe;
        self.source
            .subscribe(&self.instrument_code)
            .map_err(|e| BridgeError::UpstreamOperationError(format!("subscribe failed: {e}")))?;
        info!(code = %self.instrument_code, "subscribe request issued");
        Ok(())
    }

    /// No-op if not subscribed. Waits up to 10 s for the confirmation event,
    /// then unconditionally logs out to guarantee resource release.
    pub async fn unsubscribe(&self) -> BridgeResult<()> {
        if !self.is_subscribed() {
            debug!("unsubscribe: not subscribed, no-op");
            return Ok(());
        }

        *self.pending_op.lock().await = PendingOp::Unsubscribe;
        if let Err(e) = self.source.unsubscribe(&self.instrument_code) {
            warn!(error = %e, "unsubscribe request failed");
        }

        let deadline = tokio::time::Instant::now() + UNSUBSCRIBE_CONFIRM_TIMEOUT;
        loop {
            if *self.pending_op.lock().await == PendingOp::None {
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                warn!("unsubscribe confirmation timed out after 10s");
                break;
            }
            tokio::time::sleep(UNSUBSCRIBE_POLL_INTERVAL).await;
        }

        if let Err(e) = self.source.logout() {
            warn!(error = %e, "logout during unsubscribe failed (ignored)");
        }
        Ok(())
    }

    /// Mutually exclusive via a non-blocking CAS guard. If the guard is
    /// already held, returns immediately — never blocks the caller (which
    /// may be a synchronous SDK callback context).
    pub async fn reconnect(self: &Arc<Self>, reason: &str) {
        if self
            .reconnect_in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(reason, "reconnect already in progress, ignoring");
            return;
        }

        info!(reason, "reconnect starting");
        self.subscribed.store(false, Ordering::SeqCst);
        *self.pending_op.lock().await = PendingOp::None;

        if let Err(e) = self.source.logout() {
            warn!(error = %e, "logout before reconnect failed (ignored)");
        }

        match self.connect_and_subscribe().await {
            Ok(()) => info!("reconnect completed"),
            Err(BridgeError::LoginOrFetchError(msg)) => {
                let internet_reachable = crate::diagnostics::is_internet_available().await;
                warn!(
                    error = %msg,
                    internet_reachable,
                    "reconnect failed (login/fetch), will retry next iteration"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "reconnect failed unexpectedly");
            }
        }

        self.reconnect_in_progress.store(false, Ordering::SeqCst);
    }

    /// The SDK emits a single integer event code (`16`) for subscription
    /// state changes.
    pub async fn handle_event(&self, code: i32, _info: &str) {
        if code != 16 {
            return;
        }
        let mut pending = self.pending_op.lock().await;
        match *pending {
            PendingOp::Subscribe => {
                self.subscribed.store(true, Ordering::SeqCst);
                *pending = PendingOp::None;
                drop(pending);
                info!(code = %self.instrument_code, "subscription confirmed");
                (self.on_subscribed)();
            }
            PendingOp::Unsubscribe => {
                self.subscribed.store(false, Ordering::SeqCst);
                *pending = PendingOp::None;
            }
            PendingOp::None => {}
        }
    }

    /// Forwarded from the SDK's on-tick callback to the tick-publishing fast
    /// path owned by the Supervisor.
    pub fn handle_tick(&self, tick: Tick) {
        (self.on_tick)(tick);
    }

    /// Best-effort; swallows errors.
    pub fn logout(&self) -> BridgeResult<()> {
        self.source
            .logout()
            .map_err(|e| BridgeError::UpstreamOperationError(format!("logout failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockQuoteSource;
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn creds() -> UpstreamCredentials {
        UpstreamCredentials {
            api_key: "k".into(),
            secret_key: "s".into(),
        }
    }

    #[tokio::test]
    async fn connect_and_subscribe_is_idempotent() {
        let source = Arc::new(MockQuoteSource::always_ok());
        let sm = Arc::new(SessionManager::new(
            source,
            creds(),
            "TXFF6".into(),
            Arc::new(|_t| {}),
            Arc::new(|| {}),
        ));

        sm.connect_and_subscribe().await.unwrap();
        sm.handle_event(16, "").await;
        assert!(sm.is_subscribed());

        // A second call while already subscribed must be a pure no-op.
        sm.connect_and_subscribe().await.unwrap();
        assert!(sm.is_subscribed());
    }

    #[tokio::test]
    async fn login_failure_surfaces_as_login_or_fetch_error() {
        let source = Arc::new(MockQuoteSource::failing_login());
        let sm = Arc::new(SessionManager::new(
            source,
            creds(),
            "TXFF6".into(),
            Arc::new(|_t| {}),
            Arc::new(|| {}),
        ));

        let err = sm.connect_and_subscribe().await.unwrap_err();
        assert!(matches!(err, BridgeError::LoginOrFetchError(_)));
    }

    #[tokio::test]
    async fn contract_never_resolving_fails_after_ten_attempts() {
        let source = Arc::new(MockQuoteSource::contract_never_resolves());
        let sm = Arc::new(SessionManager::new(
            source,
            creds(),
            "TXFF6".into(),
            Arc::new(|_t| {}),
            Arc::new(|| {}),
        ));

        let err = sm.connect_and_subscribe().await.unwrap_err();
        assert!(matches!(err, BridgeError::LoginOrFetchError(_)));
    }

    #[tokio::test]
    async fn reconnect_guard_prevents_reentrancy() {
        let source = Arc::new(MockQuoteSource::always_ok());
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let sm = Arc::new(SessionManager::new(
            source,
            creds(),
            "TXFF6".into(),
            Arc::new(|_t| {}),
            Arc::new(move || {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            }),
        ));

        // Manually hold the guard to simulate a reconnect already in flight,
        // then confirm a second call returns immediately without side effects.
        sm.reconnect_in_progress.store(true, Ordering::SeqCst);
        sm.reconnect("second caller").await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        sm.reconnect_in_progress.store(false, Ordering::SeqCst);
    }

    #[tokio::test]
    async fn unsubscribe_without_subscription_is_noop() {
        let source = Arc::new(MockQuoteSource::always_ok());
        let sm = Arc::new(SessionManager::new(
            source,
            creds(),
            "TXFF6".into(),
            Arc::new(|_t| {}),
            Arc::new(|| {}),
        ));
        sm.unsubscribe().await.unwrap();
        assert!(!sm.is_subscribed());
    }

    #[tokio::test]
    async fn session_down_callback_triggers_reconnect() {
        let source = Arc::new(MockQuoteSource::always_ok());
        let sm = Arc::new(SessionManager::new(
            source.clone(),
            creds(),
            "TXFF6".into(),
            Arc::new(|_t| {}),
            Arc::new(|| {}),
        ));
        sm.wire_session_down();

        sm.connect_and_subscribe().await.unwrap();
        sm.handle_event(16, "").await;
        assert!(sm.is_subscribed());

        source.trigger_session_down("session dropped");
        // The callback spawns the reconnect; give the runtime a chance to
        // drive it to completion before observing state.
        for _ in 0..100 {
            tokio::task::yield_now().await;
        }
        assert!(!sm.is_subscribed(), "reconnect should have cleared subscribed");

        // The reconnect's connect_and_subscribe re-issued a subscribe request;
        // confirming it proves the whole session-down -> reconnect path ran.
        sm.handle_event(16, "").await;
        assert!(sm.is_subscribed());
    }
}
