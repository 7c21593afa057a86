//! Telemetry sinks for permission screen events
//!
//! Provides a trait-based event system that embedders can point at their
//! preferred analytics destination. The session emits a viewed event once
//! per lifetime and a toggle/changed event per user decision.

use chrono::Utc;
use permlens_model::{ChangeRequest, Control};
use serde::Serialize;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use thiserror::Error;

use crate::logger::ChangeRecord;

/// Timestamp type (ISO 8601 string for portability)
pub type Timestamp = String;

fn now_iso8601() -> Timestamp {
    Utc::now().to_rfc3339()
}

/// One permission screen telemetry event.
#[derive(Debug, Clone, Serialize)]
pub struct ScreenEvent {
    pub timestamp: Timestamp,
    /// Session the event belongs to.
    pub session_id: i64,
    pub package: String,
    pub group: String,
    pub details: EventDetails,
}

impl ScreenEvent {
    pub fn new(
        session_id: i64,
        package: impl Into<String>,
        group: impl Into<String>,
        details: EventDetails,
    ) -> Self {
        Self {
            timestamp: now_iso8601(),
            session_id,
            package: package.into(),
            group: group.into(),
            details,
        }
    }
}

/// What happened on the screen.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum EventDetails {
    /// The screen became visible with resolved state for the first time.
    Viewed { uid: u32 },
    /// The user selected a control.
    ControlSelected {
        control: Control,
        request: ChangeRequest,
    },
    /// A grant state change was committed.
    ChangeLogged { record: ChangeRecord },
    /// A confirmation dialog was shown instead of applying directly.
    ConfirmationShown { request: ChangeRequest },
}

/// Error type for telemetry operations
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Failed to write telemetry event: {0}")]
    WriteError(#[from] std::io::Error),

    #[error("Failed to serialize telemetry event: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Trait for telemetry event sinks
///
/// Embedders implement this trait to customize where screen events are sent.
pub trait TelemetrySink: Send + Sync {
    /// Record an event
    fn record(&self, event: ScreenEvent) -> Result<(), TelemetryError>;

    /// Flush any buffered events
    fn flush(&self) -> Result<(), TelemetryError> {
        Ok(())
    }
}

// ============================================================================
// Default Implementations
// ============================================================================

/// File-based telemetry sink (JSONL format)
pub struct FileTelemetrySink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileTelemetrySink {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, TelemetryError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TelemetrySink for FileTelemetrySink {
    fn record(&self, event: ScreenEvent) -> Result<(), TelemetryError> {
        let json = serde_json::to_string(&event)?;
        let mut writer = self.writer.lock().unwrap();
        writeln!(writer, "{}", json)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), TelemetryError> {
        let mut writer = self.writer.lock().unwrap();
        writer.flush()?;
        Ok(())
    }
}

impl fmt::Debug for FileTelemetrySink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileTelemetrySink")
            .field("path", &self.path)
            .finish()
    }
}

/// In-memory telemetry sink for testing
pub struct MemoryTelemetrySink {
    events: RwLock<Vec<ScreenEvent>>,
    max_events: usize,
}

impl MemoryTelemetrySink {
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    pub fn with_capacity(max_events: usize) -> Self {
        Self {
            events: RwLock::new(Vec::with_capacity(max_events.min(1000))),
            max_events,
        }
    }

    pub fn events(&self) -> Vec<ScreenEvent> {
        self.events.read().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.events.read().unwrap().len()
    }

    pub fn clear(&self) {
        self.events.write().unwrap().clear();
    }

    /// Count events whose details match the predicate.
    pub fn count_matching(&self, pred: impl Fn(&EventDetails) -> bool) -> usize {
        self.events
            .read()
            .unwrap()
            .iter()
            .filter(|e| pred(&e.details))
            .count()
    }
}

impl Default for MemoryTelemetrySink {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySink for MemoryTelemetrySink {
    fn record(&self, event: ScreenEvent) -> Result<(), TelemetryError> {
        let mut events = self.events.write().unwrap();
        if events.len() >= self.max_events {
            events.remove(0); // FIFO eviction
        }
        events.push(event);
        Ok(())
    }
}

impl fmt::Debug for MemoryTelemetrySink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTelemetrySink")
            .field("count", &self.count())
            .field("max_events", &self.max_events)
            .finish()
    }
}

/// Null telemetry sink (discards all events)
#[derive(Debug, Default)]
pub struct NullTelemetrySink;

impl NullTelemetrySink {
    pub fn new() -> Self {
        Self
    }
}

impl TelemetrySink for NullTelemetrySink {
    fn record(&self, _event: ScreenEvent) -> Result<(), TelemetryError> {
        Ok(())
    }
}

/// Composite telemetry sink that fans out to multiple sinks
pub struct CompositeTelemetrySink {
    sinks: Vec<Box<dyn TelemetrySink>>,
}

impl CompositeTelemetrySink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with_sink(mut self, sink: impl TelemetrySink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl Default for CompositeTelemetrySink {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySink for CompositeTelemetrySink {
    fn record(&self, event: ScreenEvent) -> Result<(), TelemetryError> {
        for sink in &self.sinks {
            sink.record(event.clone())?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), TelemetryError> {
        for sink in &self.sinks {
            sink.flush()?;
        }
        Ok(())
    }
}

impl fmt::Debug for CompositeTelemetrySink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeTelemetrySink")
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}
