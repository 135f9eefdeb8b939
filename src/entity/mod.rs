//! Projections of the capability document onto platform entity kinds.
//!
//! Each submodule is a set of pure functions: given a device (or one of
//! its management points) they derive the observable state for one entity
//! kind, and turn user commands into ordered characteristic writes. No
//! module here performs I/O; the coordinator executes the plans.

use serde_json::{json, Value};

use crate::document::{ManagementPoint, Ranged, Scalar};
use crate::{Error, Result};

pub mod binary_sensor;
pub mod button;
pub mod climate;
pub mod select;
pub mod sensor;
pub mod switch;
pub mod water_heater;

/// One step of a command: the payload for the characteristics endpoint
/// plus the pointer math to echo an accepted value into the cached
/// document.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacteristicWrite {
    pub embedded_id: String,
    pub characteristic: String,
    pub value: Value,
    /// Sub-path for nested writes, e.g.
    /// `/operationModes/heating/setpoints/roomTemperature`.
    pub path: Option<String>,
}

impl CharacteristicWrite {
    pub fn scalar(
        embedded_id: impl Into<String>,
        characteristic: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        CharacteristicWrite {
            embedded_id: embedded_id.into(),
            characteristic: characteristic.into(),
            value: value.into(),
            path: None,
        }
    }

    pub fn nested(
        embedded_id: impl Into<String>,
        characteristic: impl Into<String>,
        path: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        CharacteristicWrite {
            embedded_id: embedded_id.into(),
            characteristic: characteristic.into(),
            value: value.into(),
            path: Some(path.into()),
        }
    }

    /// Request body for the characteristics endpoint.
    pub fn body(&self) -> Value {
        match &self.path {
            Some(path) => json!({"value": self.value, "path": path}),
            None => json!({"value": self.value}),
        }
    }

    /// URL path of the characteristics endpoint for the given device.
    pub fn request_path(&self, device_id: &str) -> String {
        format!(
            "/gateway-devices/{device_id}/management-points/{}/characteristics/{}",
            self.embedded_id, self.characteristic
        )
    }

    /// JSON pointer of the written value inside the management point
    /// object. A scalar write lands at the characteristic's `value`; a
    /// nested write lands at the `value` of the addressed sub-node.
    pub fn document_pointer(&self) -> String {
        match &self.path {
            Some(path) => format!("/{}/value{path}/value", self.characteristic),
            None => format!("/{}/value", self.characteristic),
        }
    }
}

/// Mirrors an accepted write into the cached device document. False when
/// the target path does not exist locally; the next poll then brings the
/// authoritative state.
pub fn apply_write(document: &mut Value, write: &CharacteristicWrite) -> bool {
    apply_pointer_update(
        document,
        &write.embedded_id,
        &write.document_pointer(),
        write.value.clone(),
    )
}

/// Sets one value inside a management point, addressed by embedded id and
/// a JSON pointer relative to the point object.
pub fn apply_pointer_update(
    document: &mut Value,
    embedded_id: &str,
    pointer: &str,
    value: Value,
) -> bool {
    let points = match document
        .get_mut("managementPoints")
        .and_then(Value::as_array_mut)
    {
        Some(points) => points,
        None => return false,
    };
    for point in points {
        if point.get("embeddedId").and_then(Value::as_str) == Some(embedded_id) {
            return match point.pointer_mut(pointer) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            };
        }
    }
    false
}

/// Looks up a settable enumerated scalar, failing with a typed error
/// before any request goes out.
pub(crate) fn settable_scalar<'a>(point: &ManagementPoint<'a>, name: &str) -> Result<Scalar<'a>> {
    let scalar = point
        .characteristic(name)
        .and_then(|c| c.scalar())
        .ok_or_else(|| Error::MissingCapability(name.to_string()))?;
    if !scalar.settable() {
        return Err(Error::NotSettable(name.to_string()));
    }
    Ok(scalar)
}

pub(crate) fn validate_option(name: &str, scalar: &Scalar<'_>, value: &str) -> Result<()> {
    if scalar.values().contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidOption {
            name: name.to_string(),
            value: value.to_string(),
        })
    }
}

/// True when the scalar's enumerated values are exactly on and off.
pub(crate) fn has_on_off_values(scalar: &Scalar<'_>) -> bool {
    let mut values = scalar.values();
    values.sort_unstable();
    values == ["off", "on"]
}

/// Whole numbers go on the wire as integers, the way the cloud itself
/// reports them; fractional setpoints stay floats.
pub(crate) fn json_number(value: f64) -> Value {
    if value.fract() == 0.0 && value.is_finite() && value.abs() <= i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

pub(crate) fn validate_ranged(name: &str, ranged: &Ranged<'_>, value: f64) -> Result<()> {
    if !ranged.settable() {
        return Err(Error::NotSettable(name.to_string()));
    }
    if !ranged.accepts(value) {
        return Err(Error::InvalidSetpoint {
            value,
            min: ranged.min().unwrap_or(f64::NEG_INFINITY),
            max: ranged.max().unwrap_or(f64::INFINITY),
        });
    }
    Ok(())
}
