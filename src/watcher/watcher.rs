//! The watch loop — detects appended rows, resolves duplicates, invokes
//! fulfillment, and writes the status trail back to the sheet.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::{Error, StoreError};
use crate::fulfillment::Fulfillment;
use crate::sheet::SubmissionStore;
use crate::submission::{COL_PROCESSED_AT, COL_STATUS, RowStatus, Submission};
use crate::watcher::ledger::DedupLedger;

/// Pause after each status/timestamp write pair, to stay under the sheet
/// API's rate limits.
const WRITE_PAUSE: Duration = Duration::from_secs(1);

/// Upper bound on a single store call.
const STORE_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on one certificate delivery.
const FULFILLMENT_TIMEOUT: Duration = Duration::from_secs(75);

/// Watcher state shared with the read endpoints: the dedup ledger plus the
/// high-water mark and in-flight flag as atomics. Read paths take snapshots;
/// only the watch loop mutates.
#[derive(Debug, Default)]
pub struct WatcherState {
    pub ledger: DedupLedger,
    high_water_mark: AtomicUsize,
    in_flight: AtomicBool,
}

impl WatcherState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count of rows (header included) already inspected for newness.
    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark.load(Ordering::Acquire)
    }

    /// Whether a watch tick is currently executing.
    pub fn in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn set_high_water_mark(&self, mark: usize) {
        self.high_water_mark.store(mark, Ordering::Release);
    }
}

/// Releases the single-flight flag on every exit path, including errors.
struct FlightGuard<'a> {
    state: &'a WatcherState,
}

impl<'a> FlightGuard<'a> {
    /// Try to claim the flag. `None` means a prior tick is still running and
    /// this tick must be skipped, not queued.
    fn acquire(state: &'a WatcherState) -> Option<Self> {
        state
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { state })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.state.in_flight.store(false, Ordering::Release);
    }
}

/// Single-flight polling engine over the submission sheet.
pub struct Watcher {
    store: Arc<dyn SubmissionStore>,
    fulfillment: Arc<dyn Fulfillment>,
    state: Arc<WatcherState>,
    poll_interval: Duration,
    write_pause: Duration,
    store_timeout: Duration,
    fulfillment_timeout: Duration,
}

impl Watcher {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        fulfillment: Arc<dyn Fulfillment>,
        state: Arc<WatcherState>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            fulfillment,
            state,
            poll_interval,
            write_pause: WRITE_PAUSE,
            store_timeout: STORE_TIMEOUT,
            fulfillment_timeout: FULFILLMENT_TIMEOUT,
        }
    }

    /// Override the built-in pauses and timeouts (tests).
    pub fn with_timings(
        mut self,
        write_pause: Duration,
        store_timeout: Duration,
        fulfillment_timeout: Duration,
    ) -> Self {
        self.write_pause = write_pause;
        self.store_timeout = store_timeout;
        self.fulfillment_timeout = fulfillment_timeout;
        self
    }

    /// One-shot startup initialization: read all existing rows, seed the
    /// ledger with their identities, and set the high-water mark past them so
    /// only rows appended from now on count as new.
    pub async fn seed(&self) -> Result<(), Error> {
        let rows = self.list_rows().await?;
        let identities = self.state.ledger.seed(&rows);
        self.state.set_high_water_mark(rows.len());
        info!(
            identities,
            rows = rows.len(),
            "Seeded dedup ledger from existing rows"
        );
        Ok(())
    }

    /// Run one watch tick: fetch rows and process everything appended since
    /// the high-water mark. Skipped entirely if a prior tick is in flight.
    pub async fn poll_once(&self) -> Result<(), Error> {
        let Some(_guard) = FlightGuard::acquire(&self.state) else {
            debug!("Previous tick still in flight; skipping");
            return Ok(());
        };

        let rows = self.list_rows().await?;
        let count = rows.len();
        let mark = self.state.high_water_mark();
        if count <= mark {
            return Ok(());
        }

        info!(new = count - mark, total = count, "New submissions detected");

        for index in (mark + 1)..=count {
            self.process_row(index, &rows[index - 1]).await?;
            // Advance only after the row completes so a store error above
            // leaves it to be retried next tick.
            self.state.set_high_water_mark(index);
        }
        Ok(())
    }

    /// Decide and act on a single appended row.
    async fn process_row(&self, index: usize, row: &[String]) -> Result<(), Error> {
        let Some(submission) = Submission::from_row(row) else {
            debug!(row = index, "Row below minimum field set; skipping");
            return Ok(());
        };

        // A re-inspected row that already carries a terminal status (e.g. a
        // retry after a mid-tick store error) is never written again.
        if submission.status.is_terminal() {
            debug!(row = index, status = %submission.status, "Row already terminal; skipping");
            return Ok(());
        }

        if !submission.has_identity() {
            info!(row = index, "Row missing email or first name; skipping");
            return Ok(());
        }

        let key = submission.identity_key();
        if self.state.ledger.contains(&key) {
            info!(row = index, name = %submission.full_name(), "Duplicate submission; no certificate sent");
            self.write_status(index, RowStatus::Duplicate).await?;
            return Ok(());
        }

        info!(
            row = index,
            email = %submission.email,
            course = %submission.course,
            "Processing new submission"
        );
        self.write_status(index, RowStatus::Processing).await?;

        let delivery = tokio::time::timeout(
            self.fulfillment_timeout,
            self.fulfillment
                .send(&submission.email, &submission.full_name(), &submission.course),
        )
        .await;

        let sent = match delivery {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!(row = index, email = %submission.email, error = %e, "Certificate delivery failed");
                false
            }
            Err(_) => {
                error!(row = index, email = %submission.email, "Certificate delivery timed out");
                false
            }
        };

        // Both outcomes count as processed; failures are terminal and never
        // retried. Recorded before the terminal write so a write error cannot
        // lead to a second delivery on retry.
        self.state.ledger.record(key);

        let terminal = if sent {
            RowStatus::CertificateSent
        } else {
            RowStatus::EmailFailed
        };
        self.write_status(index, terminal).await?;
        Ok(())
    }

    /// Write the status cell and stamp processed-at, then pause for the
    /// store's rate limit.
    async fn write_status(&self, row: usize, status: RowStatus) -> Result<(), Error> {
        self.update_cell(row, COL_STATUS + 1, status.as_cell())
            .await?;
        let stamp = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        self.update_cell(row, COL_PROCESSED_AT + 1, &stamp).await?;
        tokio::time::sleep(self.write_pause).await;
        Ok(())
    }

    async fn list_rows(&self) -> Result<Vec<Vec<String>>, Error> {
        let rows = tokio::time::timeout(self.store_timeout, self.store.list_rows())
            .await
            .map_err(|_| StoreError::Timeout(self.store_timeout))??;
        Ok(rows)
    }

    async fn update_cell(&self, row: usize, col: usize, value: &str) -> Result<(), Error> {
        tokio::time::timeout(self.store_timeout, self.store.update_cell(row, col, value))
            .await
            .map_err(|_| StoreError::Timeout(self.store_timeout))??;
        Ok(())
    }
}

/// Spawn the watch loop on a background task.
///
/// Seeding is retried every tick until the first successful read; rows are
/// only processed after that. Tick errors are logged and never escape the
/// loop. Returns a `JoinHandle` and a shutdown flag — set the flag to stop.
pub fn spawn_watcher(watcher: Watcher) -> (JoinHandle<()>, Arc<AtomicBool>) {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);

    let handle = tokio::spawn(async move {
        info!(
            "Sheet watcher started — polling every {}s",
            watcher.poll_interval.as_secs()
        );

        let mut tick = tokio::time::interval(watcher.poll_interval);
        let mut seeded = false;

        loop {
            tick.tick().await;

            if shutdown.load(Ordering::Relaxed) {
                info!("Sheet watcher shutting down");
                return;
            }

            if !seeded {
                match watcher.seed().await {
                    Ok(()) => seeded = true,
                    Err(e) => error!(error = %e, "Initial sheet read failed; will retry"),
                }
                continue;
            }

            if let Err(e) = watcher.poll_once().await {
                error!(error = %e, "Watch tick failed");
            }
        }
    });

    (handle, shutdown_flag)
}
