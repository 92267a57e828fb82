use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::Level;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_FILTER: &str = "info,dealer_server=debug,dealer_engine=info";

/// A tracing event captured by [`TestLogSubscriber`].
#[derive(Debug, Clone)]
pub struct CapturedLog {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl CapturedLog {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Collects tracing events so tests can assert on what was logged.
#[derive(Debug, Clone, Default)]
pub struct TestLogSubscriber {
    entries: Arc<Mutex<Vec<CapturedLog>>>,
}

impl TestLogSubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<CapturedLog> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn into_layer<S>(self) -> TestLayer<S>
    where
        S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    {
        TestLayer {
            subscriber: self,
            _phantom: PhantomData,
        }
    }
}

pub struct TestLayer<S> {
    subscriber: TestLogSubscriber,
    _phantom: PhantomData<S>,
}

impl<S> Layer<S> for TestLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let entry = CapturedLog {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message: visitor.message.unwrap_or_default(),
            fields: visitor.fields,
        };

        self.subscriber
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Vec<(String, String)>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let value_str = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(value_str);
        } else {
            self.fields.push((field.name().to_string(), value_str));
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides the default filter;
/// `json` switches to one JSON object per line.
///
/// Calling it twice is harmless: the second call keeps the first subscriber.
pub fn init_logging(json: bool) {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let result = if json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_current_span(false)
            .try_init()
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .try_init()
    };

    if let Err(err) = result {
        tracing::debug!(error = %err, "global subscriber already installed");
    }
}

/// Reads `DEALER_LOG_FORMAT`; only `json` changes the output.
pub fn json_from_env() -> bool {
    std::env::var("DEALER_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{debug, error, info, warn};
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    fn capture(f: impl FnOnce()) -> Vec<CapturedLog> {
        let subscriber = TestLogSubscriber::new();
        let registry = Registry::default().with(subscriber.clone().into_layer::<Registry>());
        tracing::subscriber::with_default(registry, f);
        subscriber.entries()
    }

    #[test]
    fn captures_levels_in_order() {
        let entries = capture(|| {
            debug!("debug message");
            info!("info message");
            warn!("warn message");
            error!("error message");
        });

        let levels: Vec<Level> = entries.iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![Level::DEBUG, Level::INFO, Level::WARN, Level::ERROR]);
        assert!(entries[1].message.contains("info message"));
    }

    #[test]
    fn captures_structured_fields() {
        let entries = capture(|| {
            info!(game_id = 3, team = "bots", "team registered");
        });

        assert_eq!(entries.len(), 1);
        assert!(entries[0].message.contains("team registered"));
        assert_eq!(entries[0].field("game_id"), Some("3"));
        assert_eq!(entries[0].field("team"), Some("bots"));
    }

    #[test]
    fn clear_forgets_previous_events() {
        let subscriber = TestLogSubscriber::new();
        let registry = Registry::default().with(subscriber.clone().into_layer::<Registry>());
        tracing::subscriber::with_default(registry, || info!("first"));
        assert_eq!(subscriber.entries().len(), 1);

        subscriber.clear();
        assert!(subscriber.entries().is_empty());
    }
}
