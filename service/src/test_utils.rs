#![allow(dead_code)]

use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use abi::{ReconcilerConfig, Reservation, ReservationStatus};
use async_trait::async_trait;
use reservation::InMemoryStore;
use reservation_service::{Alert, AlertChannel, Notifier, ReconciliationDriver};
use serde_json::{json, Value};
use tracing::subscriber::DefaultGuard;

/// Alert channel that keeps what it was asked to publish.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    alerts: Mutex<Vec<Alert>>,
    fail: AtomicBool,
}

impl RecordingChannel {
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl AlertChannel for RecordingChannel {
    async fn publish(&self, subject: &str, message: &str) -> Result<(), abi::Error> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(abi::Error::Notification("topic unreachable".into()));
        }
        self.alerts.lock().unwrap().push(Alert {
            subject: subject.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }
}

pub struct TestContext {
    pub store: Arc<InMemoryStore>,
    pub channel: Arc<RecordingChannel>,
    pub driver: ReconciliationDriver,
}

impl TestContext {
    pub fn new(rows: impl IntoIterator<Item = Reservation>) -> Self {
        Self::build(rows, true, ReconcilerConfig::default())
    }

    pub fn without_channel(rows: impl IntoIterator<Item = Reservation>) -> Self {
        Self::build(rows, false, ReconcilerConfig::default())
    }

    pub fn with_config(rows: impl IntoIterator<Item = Reservation>, config: ReconcilerConfig) -> Self {
        Self::build(rows, true, config)
    }

    fn build(
        rows: impl IntoIterator<Item = Reservation>,
        with_channel: bool,
        config: ReconcilerConfig,
    ) -> Self {
        let store = Arc::new(InMemoryStore::with_reservations(rows));
        let channel = Arc::new(RecordingChannel::default());
        let notifier = if with_channel {
            Notifier::new(Some(channel.clone() as Arc<dyn AlertChannel>))
        } else {
            Notifier::new(None)
        };
        let driver = ReconciliationDriver::new(store.clone(), notifier).with_config(&config);
        Self {
            store,
            channel,
            driver,
        }
    }

    pub async fn status_of(&self, id: &str) -> Option<ReservationStatus> {
        self.store
            .snapshot()
            .await
            .into_iter()
            .find(|r| r.id == id)
            .and_then(|r| r.status)
    }
}

pub fn booking(id: &str, room: &str, check_in: &str, check_out: &str) -> Reservation {
    Reservation::new_pending(
        id,
        room,
        check_in,
        check_out,
        format!("Guest {id}"),
        format!("{id}@example.com"),
    )
}

pub fn put_item_event(id: &str) -> Value {
    json!({
        "source": "aws.dynamodb",
        "detail": {
            "eventName": "PutItem",
            "requestParameters": {"key": {"ReservationID": {"S": id}}}
        }
    })
}

pub fn update_item_event(id: &str) -> Value {
    json!({
        "detail": {
            "eventName": "UpdateItem",
            "requestParameters": {"key": {"ReservationID": id}}
        }
    })
}

pub fn batch_write_event(table: &str, id: &str) -> Value {
    let mut request_items = serde_json::Map::new();
    request_items.insert(
        table.to_string(),
        json!([{"putRequest": {"item": {"ReservationID": {"S": id}}}}]),
    );
    json!({
        "detail": {
            "eventName": "BatchWriteItem",
            "requestParameters": {"requestItems": request_items}
        }
    })
}

/// Change-feed record carrying `rsvp` as its new image.
pub fn change_record(event_name: &str, rsvp: &Reservation) -> Value {
    let mut image = serde_json::Map::new();
    image.insert("ReservationID".into(), json!({"S": rsvp.id}));
    let fields = [
        ("RoomNumber", &rsvp.room_number),
        ("CheckInDate", &rsvp.check_in),
        ("CheckOutDate", &rsvp.check_out),
        ("GuestName", &rsvp.guest_name),
        ("ContactEmail", &rsvp.contact_email),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            image.insert(name.into(), json!({"S": value}));
        }
    }
    if let Some(status) = rsvp.status {
        image.insert("Status".into(), json!({"S": status.as_str()}));
    }
    json!({"eventName": event_name, "dynamodb": {"NewImage": image}})
}

/// Log output captured from the current thread.
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Routes this thread's logs into a buffer until the guard is dropped.
pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(move || writer.clone())
        .finish();
    (logs, tracing::subscriber::set_default(subscriber))
}
