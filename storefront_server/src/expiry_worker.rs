//! The expiry worker
//!
//! Orders that reserve stock but are never paid hold that stock hostage. The worker runs an expiry sweep once at
//! start-up and then on a fixed interval, cancelling every unpaid order older than the configured timeout and
//! returning its stock.
//!
//! Each sweep is a sequence of guarded transitions, so the worker can run alongside payment confirmations (and
//! alongside other server instances) without any coordination.
use std::time::Duration as StdDuration;

use chrono::Duration;
use log::*;
use storefront_engine::{
    db_types::Order,
    traits::{ExpiryResult, PaymentGateway, StorefrontDatabase},
    OrderFlowApi,
};
use tokio::{sync::oneshot, task::JoinHandle, time::MissedTickBehavior};

/// Handle to a running expiry worker. Dropping the handle leaves the worker running until the runtime shuts down.
pub struct ExpiryWorkerHandle {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl ExpiryWorkerHandle {
    /// Asks the worker to stop and waits for it. A sweep that is already running is allowed to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.handle.await {
            warn!("🕰️ Expiry worker did not shut down cleanly. {e}");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Starts the expiry worker on the current actix runtime. The first sweep runs immediately.
pub fn start_expiry_worker<B, G>(
    api: OrderFlowApi<B, G>,
    interval: StdDuration,
    unpaid_timeout: Duration,
) -> ExpiryWorkerHandle
where
    B: StorefrontDatabase + 'static,
    G: PaymentGateway + 'static,
{
    let (shutdown, mut shutdown_rx) = oneshot::channel::<()>();
    let handle = actix_web::rt::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            "🕰️ Unpaid order expiry worker started. Orders unpaid after {} minutes are cancelled. Sweeping every {}s",
            unpaid_timeout.num_minutes(),
            interval.as_secs()
        );
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("🕰️ Expiry worker shutting down");
                    break;
                },
                _ = timer.tick() => {
                    run_expiry_job(&api, unpaid_timeout).await;
                },
            }
        }
    });
    ExpiryWorkerHandle { shutdown, handle }
}

/// Runs a single expiry sweep and logs the outcome. Errors are logged and the next sweep tries again.
pub async fn run_expiry_job<B, G>(api: &OrderFlowApi<B, G>, unpaid_timeout: Duration) -> Option<ExpiryResult>
where
    B: StorefrontDatabase,
    G: PaymentGateway,
{
    debug!("🕰️ Running unpaid order expiry job");
    match api.expire_stale_orders(unpaid_timeout).await {
        Ok(result) => {
            if result.total_count() > 0 {
                info!(
                    "🕰️ {} orders expired, {} skipped, {} failed",
                    result.cancelled_count(),
                    result.skipped.len(),
                    result.failed.len()
                );
                debug!("🕰️ Expired orders: {}", order_list(&result.cancelled));
                for (order_id, reason) in &result.failed {
                    warn!("🕰️ Could not expire order {order_id}. {reason}");
                }
            } else {
                trace!("🕰️ No stale orders found");
            }
            Some(result)
        },
        Err(e) => {
            error!("🕰️ Error running unpaid order expiry job: {e}");
            None
        },
    }
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] order_id: {} email: {}", o.id, o.order_id, o.email))
        .collect::<Vec<String>>()
        .join(", ")
}
