use serde_json::{json, Value};

use crate::document::{Device, ManagementPoint};
use crate::{Error, Result};

/// Sentinel option shown when the active schedule mode can be disabled.
pub const OFF_OPTION: &str = "off";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSelect {
    pub key: String,
    pub embedded_id: String,
    pub options: Vec<String>,
    pub current: String,
}

/// A resolved schedule selection, ready to PUT and to echo locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleCommand {
    pub embedded_id: String,
    pub mode: String,
    pub schedule_id: String,
    pub enabled: bool,
}

impl ScheduleCommand {
    pub fn body(&self) -> Value {
        json!({"scheduleId": self.schedule_id, "enabled": self.enabled})
    }

    pub fn request_path(&self, device_id: &str) -> String {
        format!(
            "/gateway-devices/{device_id}/management-points/{}/schedule",
            self.embedded_id
        )
    }

    /// Pointer updates mirroring an accepted selection, relative to the
    /// management point object.
    pub fn document_updates(&self) -> Vec<(String, Value)> {
        let mut updates = vec![(
            format!("/schedule/value/modes/{}/enabled/value", self.mode),
            Value::Bool(self.enabled),
        )];
        if self.enabled {
            updates.push((
                format!("/schedule/value/modes/{}/currentSchedule/value", self.mode),
                Value::String(self.schedule_id.clone()),
            ));
        }
        updates
    }
}

/// One select per management point that carries a schedule.
pub fn project(device: &Device) -> Vec<ScheduleSelect> {
    let mut selects = Vec::new();
    for point in device.management_points() {
        if let Some(select) = project_point(&point) {
            selects.push(select);
        }
    }
    selects
}

pub fn project_point(point: &ManagementPoint<'_>) -> Option<ScheduleSelect> {
    let (_, node) = mode_node(point)?;

    let mut options = Vec::new();
    if let Some(schedules) = node.get("schedules").and_then(Value::as_object) {
        for id in schedules.keys() {
            options.push(schedule_name(node, id));
        }
    }
    if enabled_settable(node) {
        options.push(OFF_OPTION.to_string());
    }

    let enabled = node
        .pointer("/enabled/value")
        .and_then(Value::as_bool)
        .unwrap_or(true);
    let current = if enabled {
        node.pointer("/currentSchedule/value")
            .and_then(Value::as_str)
            .map(|id| schedule_name(node, id))
            .unwrap_or_default()
    } else {
        OFF_OPTION.to_string()
    };

    Some(ScheduleSelect {
        key: format!("{}:schedule", point.embedded_id()),
        embedded_id: point.embedded_id().to_string(),
        options,
        current,
    })
}

/// Resolves a displayed option back to a schedule id, or to "disable the
/// active mode" for the off sentinel.
pub fn select(point: &ManagementPoint<'_>, option: &str) -> Result<ScheduleCommand> {
    let (mode, node) =
        mode_node(point).ok_or_else(|| Error::MissingCapability("schedule".to_string()))?;
    let embedded_id = point.embedded_id().to_string();

    if option == OFF_OPTION {
        if !enabled_settable(node) {
            return Err(Error::NotSettable("schedule.enabled".to_string()));
        }
        let schedule_id = node
            .pointer("/currentSchedule/value")
            .and_then(Value::as_str)
            .unwrap_or("0")
            .to_string();
        return Ok(ScheduleCommand {
            embedded_id,
            mode: mode.to_string(),
            schedule_id,
            enabled: false,
        });
    }

    if let Some(schedules) = node.get("schedules").and_then(Value::as_object) {
        for id in schedules.keys() {
            if id == option || schedule_name(node, id) == option {
                return Ok(ScheduleCommand {
                    embedded_id,
                    mode: mode.to_string(),
                    schedule_id: id.clone(),
                    enabled: true,
                });
            }
        }
    }

    Err(Error::InvalidOption {
        name: "schedule".to_string(),
        value: option.to_string(),
    })
}

fn mode_node<'a>(point: &ManagementPoint<'a>) -> Option<(&'a str, &'a Value)> {
    let schedule = point.characteristic("schedule")?.structured()?;
    let mode = schedule.at("/currentMode/value")?.as_str()?;
    let node = schedule.at(&format!("/modes/{mode}"))?;
    Some((mode, node))
}

fn enabled_settable(node: &Value) -> bool {
    node.pointer("/enabled/settable")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn schedule_name(node: &Value, id: &str) -> String {
    node.pointer(&format!("/schedules/{id}/name/value"))
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .unwrap_or(id)
        .to_string()
}
