//! Resolution of bookings left pending by an interrupted saga run.
//!
//! A crash between the pending write and the outcome write leaves a
//! PENDING reservation next to a PENDING payment. Once the pair is older than
//! the grace window it is resolved the same way as an unreachable bank:
//! CANCELLED and FAILED.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use rental_store::{BookingOutcome, RentalStore, StoreError};

use crate::error::Result;

/// Counts from one reconciliation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Pending payments older than the grace window.
    pub scanned: usize,
    /// Pairs moved to CANCELLED/FAILED.
    pub resolved: usize,
    /// Pairs left alone because they were no longer pending or incomplete.
    pub skipped: usize,
}

/// Periodically fails pending bookings whose saga never finished.
pub struct PendingReconciler<S: RentalStore> {
    store: S,
    grace: Duration,
}

impl<S: RentalStore> PendingReconciler<S> {
    /// Creates a reconciler.
    ///
    /// `grace` is raised to twice `gateway_timeout` when shorter, so a pair
    /// whose payment call is still in flight is never swept.
    pub fn new(store: S, grace: Duration, gateway_timeout: StdDuration) -> Self {
        let floor = Duration::from_std(gateway_timeout.saturating_mul(2))
            .unwrap_or(Duration::MAX);
        let grace = if grace < floor {
            tracing::warn!(
                requested_ms = grace.num_milliseconds(),
                floor_ms = floor.num_milliseconds(),
                "reconcile grace shorter than twice the gateway timeout, raising it"
            );
            floor
        } else {
            grace
        };
        Self { store, grace }
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Resolves every pending pair created before `now - grace`.
    #[tracing::instrument(skip(self))]
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let cutoff = now - self.grace;
        let stale = self.store.stale_pending_payments(cutoff).await?;
        let mut report = SweepReport {
            scanned: stale.len(),
            ..SweepReport::default()
        };

        for mut payment in stale {
            let Some(mut reservation) = self.store.get_reservation(payment.reservation_id).await?
            else {
                tracing::warn!(payment_id = %payment.id, "pending payment without reservation");
                report.skipped += 1;
                continue;
            };
            if !reservation.status.awaits_outcome() {
                report.skipped += 1;
                continue;
            }

            reservation.decline()?;
            payment.mark_failed()?;
            let committed = self
                .store
                .commit_outcome(BookingOutcome {
                    reservation: &reservation,
                    payment: &payment,
                    vehicle_available: None,
                })
                .await;

            match committed {
                Ok(()) => {
                    report.resolved += 1;
                    metrics::counter!("reconciler_resolved_total").increment(1);
                    tracing::info!(
                        reservation_id = %reservation.id,
                        payment_id = %payment.id,
                        "orphaned pending booking cancelled"
                    );
                }
                // The saga finished between the scan and the commit
                Err(StoreError::StaleState { .. }) => report.skipped += 1,
                Err(e) => return Err(e.into()),
            }
        }

        if report.scanned > 0 {
            tracing::info!(?report, "reconciliation sweep finished");
        }
        Ok(report)
    }

    /// Sweeps every `period` until the task is dropped.
    pub async fn run(self, period: StdDuration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.sweep(Utc::now()).await {
                tracing::error!(error = %e, "reconciliation sweep failed");
            }
        }
    }
}
