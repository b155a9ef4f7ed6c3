//! # Telemetry
//!
//! JSON-lines telemetry sink. Each published item becomes one line holding a
//! tagged record, so a session's telemetry file can be replayed or plotted
//! after the run.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

// Internal
use crate::geom::{Pose, Twist};
use crate::interfaces::{SinkError, TelemetrySink};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Writes telemetry as one JSON object per line.
pub struct JsonTelemetry<W: Write + Send> {
    writer: W
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Record<'a> {
    Reference {
        frame_id: &'a str,
        stamp_s: f64,
        pose: &'a Pose
    },
    Trajectory {
        frame_id: &'a str,
        stamp_s: f64,
        waypoints: &'a [Pose]
    },
    Command {
        frame_id: &'a str,
        stamp_s: f64,
        actuation_pose: &'a Pose,
        cmd: &'a Twist
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl JsonTelemetry<BufWriter<File>> {
    /// Create the telemetry file at `path`, truncating any existing file.
    ///
    /// Records are buffered and reach the file when the buffer fills or the
    /// sink is dropped.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write + Send> JsonTelemetry<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_record(&mut self, record: &Record) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write + Send> TelemetrySink for JsonTelemetry<W> {
    fn publish_reference(
        &mut self, frame_id: &str, stamp_s: f64, ref_pose: &Pose
    ) -> Result<(), SinkError> {
        self.write_record(&Record::Reference {
            frame_id,
            stamp_s,
            pose: ref_pose
        })
    }

    fn publish_trajectory(
        &mut self, frame_id: &str, stamp_s: f64, waypoints: &[Pose]
    ) -> Result<(), SinkError> {
        self.write_record(&Record::Trajectory {
            frame_id,
            stamp_s,
            waypoints
        })
    }

    fn publish_command(
        &mut self, frame_id: &str, stamp_s: f64, actuation_pose: &Pose, cmd: &Twist
    ) -> Result<(), SinkError> {
        self.write_record(&Record::Command {
            frame_id,
            stamp_s,
            actuation_pose,
            cmd
        })
    }
}
