//! Background price-alert evaluator.
//!
//! Every tick loads the untriggered alerts, fires the ones whose stock price
//! has crossed the target, and publishes one notification per fired alert.
//! The persisted `is_triggered` flag is written before the notification is
//! attempted, so a crash in between loses the message but never produces a
//! second trigger.

use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};

use futures_util::FutureExt;
use rust_decimal::Decimal;
use tokio::{task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use crate::{
    error::StoreError,
    models::{PriceAlert, Stock},
};

use super::{
    alert_store::AlertStore,
    notifier::{Category, NotificationGateway},
};

/// Counters for one evaluation pass, logged at the end of each tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub evaluated: usize,
    pub skipped: usize,
    pub triggered: usize,
    pub mark_failed: usize,
    pub notified: usize,
    pub notify_failed: usize,
}

pub fn should_trigger(alert: &PriceAlert, price: Decimal) -> bool {
    !alert.is_triggered && alert.is_met_by(price)
}

/// Returns `(subject, message)` for a fired alert.
pub fn compose_alert_message(alert: &PriceAlert, stock: &Stock) -> (String, String) {
    let direction = if alert.is_above_target {
        "risen above"
    } else {
        "fallen below"
    };

    let subject = format!(
        "Price Alert: {} {} ${} (now ${})",
        stock.symbol,
        alert.direction_word(),
        alert.target_price,
        stock.price
    );
    let message = format!(
        "Price Alert: {} has {} your target price of ${}. Current price: ${}.",
        stock.symbol, direction, alert.target_price, stock.price
    );

    (subject, message)
}

pub async fn run_tick(
    store: &dyn AlertStore,
    notifier: &dyn NotificationGateway,
) -> Result<TickReport, StoreError> {
    let pending = store.list_untriggered_alerts_with_stock_and_user().await?;
    let mut report = TickReport::default();

    for item in pending {
        let alert = &item.alert;

        let (Some(stock), Some(user)) = (item.stock.as_ref(), item.user.as_ref()) else {
            tracing::debug!(alert_id = %alert.id, "skipping alert with missing stock or user");
            report.skipped += 1;
            continue;
        };

        report.evaluated += 1;

        if !should_trigger(alert, stock.price) {
            continue;
        }

        match store.mark_triggered(alert.id).await {
            Ok(true) => {}
            Ok(false) => {
                // Another evaluator got there first
                tracing::debug!(alert_id = %alert.id, "alert already triggered");
                continue;
            }
            Err(e) => {
                tracing::error!(alert_id = %alert.id, error = %e, "failed to mark alert triggered");
                report.mark_failed += 1;
                continue;
            }
        }

        report.triggered += 1;
        tracing::info!(
            alert_id = %alert.id,
            symbol = %stock.symbol,
            target = %alert.target_price,
            price = %stock.price,
            "price alert triggered"
        );

        if !user.has_deliverable_channel() {
            continue;
        }

        let (subject, message) = compose_alert_message(alert, stock);
        match notifier.publish(&message, &subject, Category::Alert).await {
            Ok(()) => report.notified += 1,
            Err(e) => {
                tracing::warn!(alert_id = %alert.id, error = %e, "alert notification failed");
                report.notify_failed += 1;
            }
        }
    }

    Ok(report)
}

/// Spawns the evaluator loop. It runs until `shutdown` is cancelled; a failed
/// or panicking tick is logged and the next tick runs on schedule.
pub fn spawn_price_alert_monitor(
    store: Arc<dyn AlertStore>,
    notifier: Arc<dyn NotificationGateway>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(period_secs = period.as_secs_f64(), "price alert monitor starting");

        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }

            let tick = AssertUnwindSafe(run_tick(store.as_ref(), notifier.as_ref())).catch_unwind();

            match tick.await {
                Ok(Ok(report)) => {
                    if report.triggered > 0 || report.mark_failed > 0 {
                        tracing::info!(?report, "alert tick finished");
                    } else {
                        tracing::debug!(?report, "alert tick finished");
                    }
                }
                Ok(Err(e)) => tracing::error!(error = %e, "alert tick failed"),
                Err(_) => tracing::error!("alert tick panicked"),
            }
        }

        tracing::info!("price alert monitor stopped");
    })
}
