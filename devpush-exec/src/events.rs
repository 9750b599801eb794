//! Execution events and the sinks that consume them.
//!
//! The engine never formats output itself: it reports begin/complete pairs
//! and container output to an injected [`EventSink`].

use std::io::Write;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use devpush_core::{ContainerAlias, ExecCommand, GroupKind, Preferences};

use crate::output::{OutputWriter, Stream};

/// One side of a begin/complete pair emitted per leaf exec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionEvent {
    pub command_id: String,
    /// Alias of the container the command ran in.
    pub component_name: ContainerAlias,
    pub command_line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_kind: Option<GroupKind>,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionEvent {
    pub fn begin(command_id: &str, exec: &ExecCommand) -> Self {
        Self {
            command_id: command_id.to_string(),
            component_name: exec.component.clone(),
            command_line: exec.command_line.clone(),
            group_kind: exec.group.map(|g| g.kind),
            timestamp: Utc::now(),
        }
    }

    /// Same command, stamped now.
    pub fn completed(&self) -> Self {
        Self {
            timestamp: Utc::now(),
            ..self.clone()
        }
    }
}

pub trait EventSink: Send + Sync {
    fn command_execution_begin(&self, event: &ExecutionEvent);

    /// `error` is the rendered failure, if the command failed.
    fn command_execution_complete(&self, event: &ExecutionEvent, error: Option<&str>);

    /// Fresh stdout/stderr pair for one exec.
    fn create_output_writer(&self) -> OutputWriter;
}

// ---------------------------------------------------------------------------
// No-op
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn command_execution_begin(&self, _event: &ExecutionEvent) {}

    fn command_execution_complete(&self, _event: &ExecutionEvent, _error: Option<&str>) {}

    fn create_output_writer(&self) -> OutputWriter {
        OutputWriter::discard()
    }
}

// ---------------------------------------------------------------------------
// tracing
// ---------------------------------------------------------------------------

/// Routes events and container output into `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn command_execution_begin(&self, event: &ExecutionEvent) {
        tracing::info!(
            command = %event.command_id,
            container = %event.component_name,
            command_line = %event.command_line,
            "executing command",
        );
    }

    fn command_execution_complete(&self, event: &ExecutionEvent, error: Option<&str>) {
        match error {
            Some(error) => tracing::warn!(
                command = %event.command_id,
                container = %event.component_name,
                error = %error,
                "command failed",
            ),
            None => tracing::info!(
                command = %event.command_id,
                container = %event.component_name,
                "command finished",
            ),
        }
    }

    fn create_output_writer(&self) -> OutputWriter {
        OutputWriter::lines(|stream, line| {
            tracing::info!(target: "devpush::output", stream = %stream, "{line}");
        })
    }
}

// ---------------------------------------------------------------------------
// JSON lines
// ---------------------------------------------------------------------------

/// Machine-readable sink: one JSON object per line on `W`.
pub struct JsonEventSink<W: Write + Send + 'static> {
    out: Arc<Mutex<W>>,
}

impl<W: Write + Send + 'static> JsonEventSink<W> {
    pub fn new(out: W) -> Self {
        Self::shared(Arc::new(Mutex::new(out)))
    }

    pub fn shared(out: Arc<Mutex<W>>) -> Self {
        Self { out }
    }

    fn emit(&self, value: Value) {
        write_json_line(&self.out, &value);
    }
}

fn write_json_line<W: Write>(out: &Mutex<W>, value: &Value) {
    let mut out = match out.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Err(err) = writeln!(out, "{value}").and_then(|_| out.flush()) {
        tracing::warn!(error = %err, "failed to write machine event");
    }
}

fn event_value(event: &ExecutionEvent) -> Value {
    match serde_json::to_value(event) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(error = %err, "failed to encode execution event");
            Value::Null
        }
    }
}

impl<W: Write + Send + 'static> EventSink for JsonEventSink<W> {
    fn command_execution_begin(&self, event: &ExecutionEvent) {
        self.emit(json!({ "devFileCommandExecutionBegin": event_value(event) }));
    }

    fn command_execution_complete(&self, event: &ExecutionEvent, error: Option<&str>) {
        let mut body = event_value(event);
        if let (Some(error), Value::Object(map)) = (error, &mut body) {
            map.insert("error".to_string(), Value::String(error.to_string()));
        }
        self.emit(json!({ "devFileCommandExecutionComplete": body }));
    }

    fn create_output_writer(&self) -> OutputWriter {
        let out = self.out.clone();
        OutputWriter::lines(move |stream: Stream, line: &str| {
            let value = json!({
                "logText": {
                    "text": line,
                    "stream": stream,
                    "timestamp": Utc::now(),
                }
            });
            write_json_line(&out, &value);
        })
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// JSON lines on stdout when `machine_output` is set, tracing otherwise.
pub fn sink_for(prefs: &Preferences) -> Arc<dyn EventSink> {
    sink_with_output(prefs, std::io::stdout())
}

/// [`sink_for`] with machine events written to `out`.
pub fn sink_with_output<W: Write + Send + 'static>(
    prefs: &Preferences,
    out: W,
) -> Arc<dyn EventSink> {
    if prefs.machine_output {
        Arc::new(JsonEventSink::new(out))
    } else {
        Arc::new(TracingEventSink)
    }
}
