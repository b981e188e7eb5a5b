use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::watch;
use tracing::{debug, info};

use crate::domain::{AttemptState, Clock};
use crate::gateway::PayoutGateway;
use crate::orchestrator::WithdrawalOrchestrator;

#[derive(Debug, Clone, Copy)]
pub struct SweepConfig {
    /// A held attempt older than this is re-submitted to the gateway.
    pub submit_retry_after: Duration,
    /// A submitted attempt unconfirmed for this long gets a status poll.
    pub poll_after: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            submit_retry_after: Duration::from_secs(60),
            poll_after: Duration::from_secs(120),
        }
    }
}

/// Background reconciler for attempts stuck in an indeterminate state.
///
/// Every action funnels through the orchestrator's compare-and-swap
/// transitions, so running several sweep instances over the same attempts
/// is safe: the losers of each race observe a stale state and do nothing.
pub struct ReconciliationSweep<G: PayoutGateway> {
    orchestrator: Arc<WithdrawalOrchestrator<G>>,
    clock: Arc<dyn Clock>,
    config: SweepConfig,
}

impl<G: PayoutGateway> ReconciliationSweep<G> {
    pub fn new(
        orchestrator: Arc<WithdrawalOrchestrator<G>>,
        clock: Arc<dyn Clock>,
        config: SweepConfig,
    ) -> Self {
        Self {
            orchestrator,
            clock,
            config,
        }
    }

    /// One pass over all non-terminal attempts.
    pub async fn run_once(&self) {
        let now = self.clock.now();
        let attempts = self.orchestrator.non_terminal_attempts();
        debug!(count = attempts.len(), "reconciliation sweep pass");
        for attempt in attempts {
            if now >= attempt.expires_at {
                self.orchestrator.expire(attempt.id);
                continue;
            }
            let age = elapsed_since(attempt.updated_at, now);
            match attempt.state {
                AttemptState::Held if age >= self.config.submit_retry_after => {
                    info!(attempt = %attempt.id, "re-submitting held attempt");
                    self.orchestrator.submit(attempt.id).await;
                }
                AttemptState::GatewaySubmitted if age >= self.config.poll_after => {
                    info!(attempt = %attempt.id, "polling gateway for settlement");
                    self.orchestrator.poll_settlement(attempt.id).await;
                }
                _ => {}
            }
        }
        // Expired attempts keep their hold; keep asking the gateway until
        // a definitive answer commits or releases it.
        for attempt in self.orchestrator.unresolved_expired() {
            if elapsed_since(attempt.updated_at, now) >= self.config.poll_after {
                info!(attempt = %attempt.id, "polling gateway for expired attempt");
                self.orchestrator.poll_settlement(attempt.id).await;
            }
        }
    }

    /// Interval loop, intended to be spawned once per process. Stops when
    /// the shutdown channel flips to `true` or its sender is dropped.
    pub async fn run(&self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut tick = tokio::time::interval(period);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = tick.tick() => self.run_once().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("reconciliation sweep shutting down");
                        return;
                    }
                }
            }
        }
    }
}

fn elapsed_since(earlier: SystemTime, now: SystemTime) -> Duration {
    now.duration_since(earlier).unwrap_or_default()
}
