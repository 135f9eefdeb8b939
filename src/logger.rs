use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

use crate::merge::changed_paths;

pub enum MessageLogMode {
    Full,
    Diffed,
}

/// NDJSON trace of cloud traffic: one line per request, command, and
/// poll body. `Diffed` mode logs the first poll in full and only the
/// changed paths afterwards.
pub(crate) struct MessageLogger {
    mode: MessageLogMode,
    file: File,
    previous_payload: Option<Value>,
}

impl MessageLogger {
    pub fn new(mode: MessageLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            mode,
            file,
            previous_payload: None,
        })
    }

    pub fn log_request(&mut self, method: &str, path: &str, body: Option<&Value>) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "req",
            "method": method,
            "path": path,
            "body": body,
        });
        self.write_line(&entry);
    }

    pub fn log_command(&mut self, action: &str, device: &str, body: &Value) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "cmd",
            "action": action,
            "device": device,
            "body": body,
        });
        self.write_line(&entry);
    }

    pub fn log_poll(&mut self, status: u16, body: &Value) {
        match self.mode {
            MessageLogMode::Full => {
                let entry = json!({
                    "ts": Utc::now().to_rfc3339(),
                    "dir": "poll",
                    "status": status,
                    "body": body,
                });
                self.write_line(&entry);
            }
            MessageLogMode::Diffed => {
                let keyed = key_by_device(body);
                let entry = match self.previous_payload.as_ref() {
                    None => json!({
                        "ts": Utc::now().to_rfc3339(),
                        "dir": "poll",
                        "status": status,
                        "full": true,
                        "body": body,
                    }),
                    Some(previous) => {
                        let changes: Vec<Value> = changed_paths(previous, &keyed)
                            .into_iter()
                            .map(|(path, value)| json!({"path": path, "value": value}))
                            .collect();
                        json!({
                            "ts": Utc::now().to_rfc3339(),
                            "dir": "poll",
                            "status": status,
                            "changes": changes,
                        })
                    }
                };
                self.write_line(&entry);
                self.previous_payload = Some(keyed);
            }
        }
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write log entry: {e}");
        }
    }
}

/// Keys a device-list payload by device id so the diff tracks each device
/// separately. Non-array payloads pass through unchanged.
fn key_by_device(body: &Value) -> Value {
    match body.as_array() {
        Some(devices) => {
            let mut keyed = serde_json::Map::new();
            for (index, doc) in devices.iter().enumerate() {
                let key = doc
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| index.to_string());
                keyed.insert(key, doc.clone());
            }
            Value::Object(keyed)
        }
        None => body.clone(),
    }
}
