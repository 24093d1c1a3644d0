use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use abi::{batch_records, Error, ReconcilerConfig, ReservationId, ReservationStatus};
use futures::{stream, FutureExt, StreamExt};
use reservation::{Normalized, Normalizer, Reconciler, Reconciliation, ReservationStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::Notifier;

/// Result of one invocation, shaped the way the eventing system expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResponse {
    pub status_code: u16,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecordOutcome {
    Confirmed {
        reservation_id: ReservationId,
        persisted: bool,
    },
    Conflict {
        reservation_id: ReservationId,
        conflicts: Vec<ReservationId>,
        persisted: bool,
        notified: bool,
    },
    /// Not pending, which includes the reconciler's own writes coming back.
    Ignored {
        reservation_id: ReservationId,
        status: Option<ReservationStatus>,
    },
    Unsupported {
        event_name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordReport {
    pub index: usize,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<RecordOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub confirmed: usize,
    pub conflicts: usize,
    pub ignored: usize,
    pub skipped: usize,
    pub failed: usize,
    pub records: Vec<RecordReport>,
}

impl HandlerResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            body: body.into(),
        }
    }

    pub fn bad_request(body: impl Into<String>) -> Self {
        Self {
            status_code: 400,
            body: body.into(),
        }
    }

    pub fn internal_error(body: impl Into<String>) -> Self {
        Self {
            status_code: 500,
            body: body.into(),
        }
    }
}

impl From<&Result<RecordOutcome, Error>> for HandlerResponse {
    fn from(result: &Result<RecordOutcome, Error>) -> Self {
        match result {
            Ok(RecordOutcome::Confirmed { reservation_id, .. }) => {
                Self::ok(format!("reservation {reservation_id} confirmed"))
            }
            Ok(RecordOutcome::Conflict {
                reservation_id,
                conflicts,
                ..
            }) => Self::ok(format!(
                "reservation {reservation_id} conflicts with {} reservation(s)",
                conflicts.len()
            )),
            Ok(RecordOutcome::Ignored { .. }) => {
                Self::ok("event ignored: reservation is not pending")
            }
            Ok(RecordOutcome::Unsupported { event_name }) => {
                Self::ok(format!("event ignored: unsupported event type {event_name}"))
            }
            Err(e) if e.is_input_error() => Self::bad_request(e.to_string()),
            Err(e) => Self::internal_error(format!("processing failed: {e}")),
        }
    }
}

impl BatchReport {
    fn push(&mut self, index: usize, result: Result<RecordOutcome, Error>) {
        let status_code = HandlerResponse::from(&result).status_code;
        self.total += 1;
        let report = match result {
            Ok(outcome) => {
                match &outcome {
                    RecordOutcome::Confirmed { .. } => self.confirmed += 1,
                    RecordOutcome::Conflict { .. } => self.conflicts += 1,
                    RecordOutcome::Ignored { .. } | RecordOutcome::Unsupported { .. } => {
                        self.ignored += 1
                    }
                }
                RecordReport {
                    index,
                    status_code,
                    outcome: Some(outcome),
                    error: None,
                }
            }
            Err(e) => {
                if e.is_input_error() {
                    self.skipped += 1;
                } else {
                    self.failed += 1;
                }
                RecordReport {
                    index,
                    status_code,
                    outcome: None,
                    error: Some(e.to_string()),
                }
            }
        };
        self.records.push(report);
    }

    /// A batch always completes; record failures only show up in the counters.
    pub fn to_response(&self) -> HandlerResponse {
        HandlerResponse::ok(format!(
            "processed {} record(s): {} confirmed, {} conflict(s), {} ignored, {} skipped, {} failed",
            self.total, self.confirmed, self.conflicts, self.ignored, self.skipped, self.failed
        ))
    }
}

/// Runs normalization, the pending guard, validation, reconciliation and alerting for each
/// incoming event. Nothing that goes wrong while handling one event escapes as an error or a
/// panic; it becomes a 400/500 result instead.
pub struct ReconciliationDriver {
    store: Arc<dyn ReservationStore>,
    notifier: Notifier,
    source_table: Option<String>,
    batch_concurrency: usize,
}

impl ReconciliationDriver {
    pub fn new(store: Arc<dyn ReservationStore>, notifier: Notifier) -> Self {
        Self {
            store,
            notifier,
            source_table: None,
            batch_concurrency: 1,
        }
    }

    pub fn with_config(mut self, config: &ReconcilerConfig) -> Self {
        self.source_table = config.source_table.clone();
        self.batch_concurrency = config.batch_concurrency.max(1);
        self
    }

    pub fn store(&self) -> &dyn ReservationStore {
        self.store.as_ref()
    }

    /// Entry point for anything the eventing system delivers: a `Records` envelope is handled
    /// as a batch, anything else as a single event.
    pub async fn handle(&self, raw: &Value) -> HandlerResponse {
        match batch_records(raw) {
            Some(records) => self.handle_batch(records).await.to_response(),
            None => self.handle_event(raw).await,
        }
    }

    pub async fn handle_event(&self, raw: &Value) -> HandlerResponse {
        let result = self.guarded(raw).await;
        HandlerResponse::from(&result)
    }

    /// Every record is attempted. Records may run concurrently up to `batch_concurrency`, but
    /// the report keeps input order.
    pub async fn handle_batch(&self, records: &[Value]) -> BatchReport {
        let pending: Vec<_> = records.iter().map(|raw| self.guarded(raw)).collect();
        let results: Vec<_> = stream::iter(pending)
            .buffered(self.batch_concurrency)
            .collect()
            .await;

        let mut report = BatchReport::default();
        for (index, result) in results.into_iter().enumerate() {
            report.push(index, result);
        }
        info!(
            total = report.total,
            confirmed = report.confirmed,
            conflicts = report.conflicts,
            ignored = report.ignored,
            skipped = report.skipped,
            failed = report.failed,
            "batch finished"
        );
        report
    }

    async fn guarded(&self, raw: &Value) -> Result<RecordOutcome, Error> {
        match AssertUnwindSafe(self.process(raw)).catch_unwind().await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(e)) if e.is_input_error() => {
                warn!(error = %e, event = %raw, "skipping event");
                Err(e)
            }
            Ok(Err(e)) => {
                error!(error = %e, event = %raw, "reconciliation failed");
                Err(e)
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(panic = %reason, event = %raw, "reconciliation panicked");
                Err(Error::Unexpected(reason))
            }
        }
    }

    async fn process(&self, raw: &Value) -> Result<RecordOutcome, Error> {
        let normalizer = Normalizer::new(self.store.as_ref())
            .with_source_table(self.source_table.as_deref());
        let rsvp = match normalizer.normalize(raw).await? {
            Normalized::Reservation(rsvp) => rsvp,
            Normalized::Unsupported(event_name) => {
                return Ok(RecordOutcome::Unsupported { event_name })
            }
        };

        if !Reconciler::is_eligible(&rsvp) {
            info!(reservation_id = %rsvp.id, status = ?rsvp.status, "ignoring reservation that is not pending");
            return Ok(RecordOutcome::Ignored {
                reservation_id: rsvp.id,
                status: rsvp.status,
            });
        }

        rsvp.validate()?;

        match Reconciler::new(self.store.as_ref()).reconcile(&rsvp).await? {
            Reconciliation::Ineligible(status) => Ok(RecordOutcome::Ignored {
                reservation_id: rsvp.id,
                status,
            }),
            Reconciliation::Decided {
                status: ReservationStatus::Conflict,
                conflicts,
                persisted,
            } => {
                let notified = match self.notifier.notify_conflict(&rsvp, &conflicts).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(reservation_id = %rsvp.id, error = %e, "conflict alert not sent");
                        false
                    }
                };
                Ok(RecordOutcome::Conflict {
                    reservation_id: rsvp.id,
                    conflicts: conflicts.into_iter().map(|c| c.id).collect(),
                    persisted,
                    notified,
                })
            }
            Reconciliation::Decided { persisted, .. } => Ok(RecordOutcome::Confirmed {
                reservation_id: rsvp.id,
                persisted,
            }),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
