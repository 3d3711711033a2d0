use std::fmt::{self, Debug, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::event::Event;
use tracing::field::{Field, Visit};
use tracing::{span, Id, Level, Metadata, Subscriber};

/// Prints informational events to stdout, one line each. Spans are accepted but not shown.
pub struct VerboseSubscriber {
    ids: AtomicUsize,
}

impl VerboseSubscriber {
    pub fn new() -> Self {
        VerboseSubscriber {
            ids: AtomicUsize::new(1),
        }
    }
}

// https://docs.rs/tracing/0.1/tracing/subscriber/trait.Subscriber.html
impl Subscriber for VerboseSubscriber {
    // Frame-level tracing from the session is too noisy for a terminal
    fn enabled(&self, metadata: &Metadata) -> bool {
        *metadata.level() <= Level::INFO
    }

    fn new_span(&self, _span: &span::Attributes) -> Id {
        let id = self.ids.fetch_add(1, Ordering::SeqCst);
        Id::from_u64(id as u64)
    }

    fn record(&self, _span: &Id, _values: &span::Record) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event) {
        let mut line = LineVisitor::default();
        event.record(&mut line);
        let level = event.metadata().level();
        if *level == Level::INFO {
            println!("{}", line.0);
        } else {
            println!("{}: {}", level, line.0);
        }
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Renders the message first, then any other fields as `name=value`.
#[derive(Default)]
struct LineVisitor(String);

impl Visit for LineVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        let _ = self.append(field, value);
    }
}

impl LineVisitor {
    fn append(&mut self, field: &Field, value: &dyn Debug) -> fmt::Result {
        if field.name() == "message" {
            if self.0.is_empty() {
                write!(self.0, "{:?}", value)
            } else {
                let fields = std::mem::take(&mut self.0);
                write!(self.0, "{:?} {}", value, fields)
            }
        } else {
            if !self.0.is_empty() {
                self.0.push(' ');
            }
            write!(self.0, "{}={:?}", field.name(), value)
        }
    }
}
