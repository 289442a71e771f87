//! Test logging utilities
//!
//! [`init_test_logging`] installs a global `tracing` subscriber that writes
//! through the test harness. [`capture_logs`] installs a thread-local one that
//! keeps events in memory so a test can assert on what was logged.

use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Once};
use tracing::Level;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt as _};

static INIT: Once = Once::new();

/// Initialize logging for tests (call once)
///
/// The filter is read from `RUST_LOG`, defaulting to `debug` for the
/// serializer crates.
///
/// # Examples
///
/// ```
/// use reinhardt_test::logging::init_test_logging;
///
/// init_test_logging();
/// init_test_logging();
/// ```
pub fn init_test_logging() {
	INIT.call_once(|| {
		let filter = EnvFilter::try_from_default_env()
			.unwrap_or_else(|_| EnvFilter::new("reinhardt_serializers=debug,reinhardt_db=debug"));
		let _ = tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_test_writer()
			.try_init();
	});
}

/// One captured event
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedEvent {
	pub level: Level,
	pub target: String,
	pub message: String,
	/// Other fields, rendered with `Debug`, in recording order
	pub fields: Vec<(String, String)>,
}

impl CapturedEvent {
	pub fn field(&self, name: &str) -> Option<&str> {
		self.fields
			.iter()
			.find(|(field, _)| field == name)
			.map(|(_, value)| value.as_str())
	}
}

#[derive(Default)]
struct EventVisitor {
	message: String,
	fields: Vec<(String, String)>,
}

impl Visit for EventVisitor {
	fn record_str(&mut self, field: &Field, value: &str) {
		if field.name() == "message" {
			self.message = value.to_string();
		} else {
			self.fields.push((field.name().to_string(), value.to_string()));
		}
	}

	fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
		if field.name() == "message" {
			self.message = format!("{:?}", value);
		} else {
			self.fields
				.push((field.name().to_string(), format!("{:?}", value)));
		}
	}
}

struct CaptureLayer {
	events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S: tracing::Subscriber> Layer<S> for CaptureLayer {
	fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
		let mut visitor = EventVisitor::default();
		event.record(&mut visitor);
		self.events.lock().push(CapturedEvent {
			level: *event.metadata().level(),
			target: event.metadata().target().to_string(),
			message: visitor.message,
			fields: visitor.fields,
		});
	}
}

/// Events captured on the current thread while the guard is alive
pub struct LogCapture {
	events: Arc<Mutex<Vec<CapturedEvent>>>,
	_guard: DefaultGuard,
}

impl LogCapture {
	pub fn events(&self) -> Vec<CapturedEvent> {
		self.events.lock().clone()
	}

	/// Captured events at exactly `level`
	pub fn at_level(&self, level: Level) -> Vec<CapturedEvent> {
		self.events
			.lock()
			.iter()
			.filter(|event| event.level == level)
			.cloned()
			.collect()
	}

	pub fn contains(&self, level: Level, message: &str) -> bool {
		self.events
			.lock()
			.iter()
			.any(|event| event.level == level && event.message.contains(message))
	}
}

/// Capture every event logged on this thread until the returned value is dropped
///
/// Works with `#[tokio::test]`, whose runtime polls on the test thread.
///
/// # Examples
///
/// ```
/// use reinhardt_test::logging::capture_logs;
/// use tracing::Level;
///
/// let logs = capture_logs();
/// tracing::warn!(entries = 2, "nested save failed, compensating");
///
/// assert!(logs.contains(Level::WARN, "compensating"));
/// assert_eq!(logs.events()[0].field("entries"), Some("2"));
/// ```
pub fn capture_logs() -> LogCapture {
	let events = Arc::new(Mutex::new(Vec::new()));
	let layer = CaptureLayer {
		events: Arc::clone(&events),
	};
	let subscriber = tracing_subscriber::registry().with(layer);
	LogCapture {
		events,
		_guard: tracing::subscriber::set_default(subscriber),
	}
}
