//! Structured run log.
//!
//! Every noteworthy decision of a run lands as one JSON object per line in
//! `run.log.jsonl`: uncertain captions, gate rejections, naming
//! collisions, prunes. The log also owns the run's counters, threaded
//! through by value instead of living in ambient state. Log I/O failures
//! degrade to tracing warnings; they never fail the run.

use crate::error::Result;
use serde_json::{json, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

pub const RUN_LOG_FILE: &str = "run.log.jsonl";

/// Run-owned counters plus the jsonl sink.
pub struct RunLog {
    sink: Option<BufWriter<File>>,
    pub warnings: u32,
    pub rejections: u32,
}

impl RunLog {
    /// Create the log in `out_dir`, or a counter-only log when disabled.
    pub fn create(out_dir: &Path, enabled: bool) -> Result<Self> {
        let sink = if enabled {
            Some(BufWriter::new(File::create(out_dir.join(RUN_LOG_FILE))?))
        } else {
            None
        };
        Ok(Self {
            sink,
            warnings: 0,
            rejections: 0,
        })
    }

    /// Emit one event line. `fields` must be a JSON object.
    pub fn event(&mut self, level: &str, event: &str, fields: Value) {
        let mut line = json!({
            "ts": SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0),
            "level": level,
            "event": event,
        });
        if let (Some(obj), Some(extra)) = (line.as_object_mut(), fields.as_object()) {
            for (k, v) in extra {
                obj.insert(k.clone(), v.clone());
            }
        }
        if let Some(sink) = self.sink.as_mut()
            && writeln!(sink, "{}", line).is_err()
        {
            warn!(event, "failed to write run log line");
            self.sink = None;
        }
    }

    pub fn warning(&mut self, event: &str, fields: Value) {
        self.warnings += 1;
        self.event("warn", event, fields);
    }

    pub fn rejection(&mut self, event: &str, fields: Value) {
        self.rejections += 1;
        self.event("info", event, fields);
    }

    /// Flush and drop the sink.
    pub fn finish(mut self) -> (u32, u32) {
        if let Some(sink) = self.sink.as_mut()
            && sink.flush().is_err()
        {
            warn!("failed to flush run log");
        }
        (self.warnings, self.rejections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_written_as_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = RunLog::create(dir.path(), true).unwrap();
        log.event("info", "run_started", json!({"pages": 3}));
        log.warning("uncertain_caption", json!({"ident": "9", "score": 18.0}));
        log.rejection("gate_reject", json!({"reason": "height"}));
        let (warnings, rejections) = log.finish();
        assert_eq!(warnings, 1);
        assert_eq!(rejections, 1);

        let content = std::fs::read_to_string(dir.path().join(RUN_LOG_FILE)).unwrap();
        let lines: Vec<Value> = content.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["event"], "run_started");
        assert_eq!(lines[0]["pages"], 3);
        assert_eq!(lines[1]["level"], "warn");
        assert_eq!(lines[2]["reason"], "height");
    }

    #[test]
    fn test_disabled_log_counts_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = RunLog::create(dir.path(), false).unwrap();
        log.warning("uncertain_caption", json!({}));
        let (warnings, _) = log.finish();
        assert_eq!(warnings, 1);
        assert!(!dir.path().join(RUN_LOG_FILE).exists());
    }
}
