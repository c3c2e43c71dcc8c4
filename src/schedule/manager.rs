use chrono::Utc;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::retention::{HttpLogChannelApi, LogChannelApi, sweep};
use super::types::SweepState;
use crate::{constants::RETENTION_SWEEP_PERIOD, store::GuildConfigStore};

/// Start the retention task. It sweeps right away once `ready` turns true, then
/// once per period for as long as the process lives. Readiness is checked again
/// before every sweep; while it is false, sweeps wait for it.
pub fn start_retention_scheduler(
    http: Arc<serenity::Http>,
    store: Arc<GuildConfigStore>,
    ready: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let api = Arc::new(HttpLogChannelApi::new(http));
    tokio::spawn(run_retention_loop(api, store, ready, RETENTION_SWEEP_PERIOD))
}

fn transition(from: SweepState, to: SweepState) -> SweepState {
    debug!("Retention scheduler: {} -> {}", from, to);
    to
}

async fn run_retention_loop<A>(
    api: Arc<A>,
    store: Arc<GuildConfigStore>,
    mut ready: watch::Receiver<bool>,
    period: Duration,
) where
    A: LogChannelApi + ?Sized,
{
    let mut state = SweepState::AwaitingReadiness;
    info!("Log retention scheduler started, {}", state);

    // The first tick completes immediately
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        if !*ready.borrow_and_update() {
            if state != SweepState::AwaitingReadiness {
                state = transition(state, SweepState::AwaitingReadiness);
            }
            if ready.wait_for(|is_ready| *is_ready).await.is_err() {
                warn!("Readiness signal dropped while the bot was not ready, retention scheduler stopped");
                return;
            }
            // Next sweep one full period after this one
            interval.reset();
        }
        state = transition(state, SweepState::Sweeping);

        let entries = store.entries();
        let summary = sweep(api.as_ref(), &entries, Utc::now()).await;
        info!(
            "Retention sweep done: {} guild(s) swept, {} failed, {} message(s) deleted",
            summary.guilds_swept, summary.guilds_failed, summary.messages_deleted
        );

        state = transition(state, SweepState::Idle);
    }
}
