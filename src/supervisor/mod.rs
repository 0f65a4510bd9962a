//! The Supervisor: the control loop composing Clock & Schedule, the Upstream
//! Session Manager, and the Downstream Probe. Holds `SupervisorState`
//! exclusively and is the single escalation point — designed never to raise.

use crate::config::Config;
use crate::kafka::TickProducer;
use crate::monotonic::{self, Monotonic};
use crate::probe::DownstreamProbe;
use crate::schedule;
use crate::upstream::SessionManager;
use chrono::NaiveDate;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// `SupervisorState`: created at startup, mutated only by the loop below,
/// destroyed at shutdown.
struct SupervisorState {
    holiday_date: Option<NaiveDate>,
    timeout_retries: u32,
    slow_warning_level: u32,
    was_trading: bool,
}

impl SupervisorState {
    fn new() -> Self {
        Self {
            holiday_date: None,
            timeout_retries: 0,
            slow_warning_level: 0,
            was_trading: false,
        }
    }
}

pub struct Supervisor {
    config: Config,
    session_manager: Arc<SessionManager>,
    producer: Arc<TickProducer>,
    probe: DownstreamProbe,
    monotonic: Arc<Monotonic>,
    last_tick_at: Arc<AtomicU64>,
    state: SupervisorState,
}

impl Supervisor {
    pub fn new(
        config: Config,
        session_manager: Arc<SessionManager>,
        producer: Arc<TickProducer>,
        probe: DownstreamProbe,
        monotonic: Arc<Monotonic>,
        last_tick_at: Arc<AtomicU64>,
    ) -> Self {
        Self {
            config,
            session_manager,
            producer,
            probe,
            monotonic,
            last_tick_at,
            state: SupervisorState::new(),
        }
    }

    /// Runs until `shutdown` is signalled. The interval wait is the sole
    /// cancellable suspension point in the loop cadence.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let now = schedule::now_taipei();
        self.state.was_trading = schedule::is_trading_time(now, self.state.holiday_date, &self.config.session);
        if self.state.was_trading {
            if let Err(e) = self.session_manager.connect_and_subscribe().await {
                warn!(error = %e, "initial connect_and_subscribe failed, will retry on next iteration");
            }
        }

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.config.session.monitor_interval) => {}
                _ = shutdown.changed() => {
                    info!("shutdown signalled, exiting supervisor loop");
                    break;
                }
            }
            if *shutdown.borrow() {
                break;
            }
            self.tick_once().await;
        }
    }

    /// One per-iteration pass of the 7-step algorithm.
    async fn tick_once(&mut self) {
        // 1. Producer service tick.
        self.producer.poll_once();

        // 2. Read the clock.
        let now = schedule::now_taipei();
        let trading = schedule::is_trading_time(now, self.state.holiday_date, &self.config.session);

        // 3. Transition log.
        if trading != self.state.was_trading {
            info!(trading, "market status changed");
            self.state.was_trading = trading;
            if trading {
                // Resumption of trading hours: per §3's last_tick_at
                // invariant, a fresh session boundary must not be read as
                // stale silence on the very next health check.
                monotonic::mark_now(&self.monotonic, &self.last_tick_at);
            }
        }

        // 4. Not trading.
        if !trading {
            if self.session_manager.is_subscribed() {
                if let Err(e) = self.session_manager.unsubscribe().await {
                    warn!(error = %e, "unsubscribe during closed session failed");
                }
            }
            self.state.timeout_retries = 0;
            self.state.slow_warning_level = 0;
            return;
        }

        // 5. Trading — clear holiday.
        self.state.holiday_date = None;

        // 6. Ensure subscription.
        if !self.session_manager.is_subscribed() {
            if let Err(e) = self.session_manager.connect_and_subscribe().await {
                warn!(error = %e, "connect_and_subscribe failed, retrying next iteration");
                return;
            }
        }

        // 7. Health check.
        let silence_ms = self
            .monotonic
            .now_millis()
            .saturating_sub(self.last_tick_at.load(Ordering::SeqCst));
        let silence = Duration::from_millis(silence_ms);
        let threshold = schedule::slow_tick_threshold(now, &self.config.session);

        if silence > self.config.session.critical_timeout {
            // 7a. Critical timeout.
            self.state.slow_warning_level = 0;
            self.state.timeout_retries += 1;

            if self.state.timeout_retries > self.config.session.max_timeout_retries {
                let found = self
                    .probe
                    .has_opening_log_messages(now, &self.config.kafka.topic, &self.config.session)
                    .await;

                if !found {
                    info!("no opening log messages found; declaring holiday");
                    self.state.holiday_date = Some(now.date());
                    if let Err(e) = self.session_manager.unsubscribe().await {
                        warn!(error = %e, "unsubscribe on holiday declaration failed");
                    }
                    self.state.timeout_retries = 0;
                    return;
                }
                info!("probe confirms log activity; connection fault, not holiday");
            }

            warn!(
                silence_secs = silence.as_secs(),
                retries = self.state.timeout_retries,
                "critical tick timeout, reconnecting"
            );
            self.session_manager.reconnect("Tick Timeout").await;
        } else if silence > threshold + Duration::from_secs(60 * self.state.slow_warning_level as u64) {
            // 7b. Escalating slow-tick warning.
            self.state.slow_warning_level += 1;
            warn!(
                silence_secs = silence.as_secs(),
                level = self.state.slow_warning_level,
                "slow tick warning"
            );
        } else if silence < threshold && self.state.slow_warning_level > 0 {
            // 7c. Recovery.
            info!("tick flow recovered");
            self.state.slow_warning_level = 0;
        }
    }

    /// §4.5: unsubscribe, drain 2s, logout, flush up to 15s.
    pub async fn shutdown(&self) {
        if let Err(e) = self.session_manager.unsubscribe().await {
            warn!(error = %e, "unsubscribe during shutdown failed");
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
        if let Err(e) = self.session_manager.logout() {
            warn!(error = %e, "logout during shutdown failed");
        }
        self.producer.flush(Duration::from_secs(15));
    }
}
