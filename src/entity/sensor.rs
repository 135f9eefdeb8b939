use serde_json::Value;

use super::has_on_off_values;
use crate::document::{ConsumptionKind, ConsumptionPeriod, Device};

/// Display metadata for characteristic names we recognize. Anything else
/// still becomes a sensor, just without unit or class.
const SENSOR_META: &[(&str, SensorMeta)] = &[
    ("roomTemperature", SensorMeta::temperature()),
    ("outdoorTemperature", SensorMeta::temperature()),
    ("tankTemperature", SensorMeta::temperature()),
    ("leavingWaterTemperature", SensorMeta::temperature()),
    ("leavingWaterOffset", SensorMeta::temperature()),
    ("heatExchangerTemperature", SensorMeta::temperature()),
    ("suctionTemperature", SensorMeta::temperature()),
    ("deltaD", SensorMeta::temperature()),
    (
        "roomHumidity",
        SensorMeta {
            unit: Some("%"),
            device_class: Some("humidity"),
            state_class: Some("measurement"),
        },
    ),
    (
        "wifiConnectionStrength",
        SensorMeta {
            unit: Some("dBm"),
            device_class: Some("signal_strength"),
            state_class: Some("measurement"),
        },
    ),
    (
        "fanMotorRotationSpeed",
        SensorMeta {
            unit: Some("rpm"),
            device_class: None,
            state_class: Some("measurement"),
        },
    ),
];

#[derive(Debug, Clone, Copy)]
struct SensorMeta {
    unit: Option<&'static str>,
    device_class: Option<&'static str>,
    state_class: Option<&'static str>,
}

impl SensorMeta {
    const fn temperature() -> Self {
        SensorMeta {
            unit: Some("°C"),
            device_class: Some("temperature"),
            state_class: Some("measurement"),
        }
    }

    const fn none() -> Self {
        SensorMeta {
            unit: None,
            device_class: None,
            state_class: None,
        }
    }
}

fn meta_for(name: &str) -> SensorMeta {
    SENSOR_META
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, meta)| *meta)
        .unwrap_or(SensorMeta::none())
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub key: String,
    pub embedded_id: String,
    pub name: String,
    pub value: Value,
    pub unit: Option<&'static str>,
    pub device_class: Option<&'static str>,
    pub state_class: Option<&'static str>,
}

/// Plain sensors for a device: every `sensoryData` sub-value, plus
/// string/numeric scalar characteristics that are not switch or binary
/// material.
pub fn project(device: &Device) -> Vec<SensorReading> {
    let mut readings = Vec::new();

    for point in device.management_points() {
        let embedded_id = point.embedded_id();

        if let Some(data) = point
            .characteristic("sensoryData")
            .and_then(|c| c.structured())
            .and_then(|s| s.value())
            .and_then(Value::as_object)
        {
            for (name, raw) in data {
                let value = raw.get("value").cloned().unwrap_or(Value::Null);
                if value.is_null() {
                    continue;
                }
                readings.push(reading(embedded_id, name, value));
            }
        }

        for (name, characteristic) in point.characteristics() {
            if name == "name" || name == "sensoryData" || name == "consumptionData" {
                continue;
            }
            let Some(scalar) = characteristic.scalar() else {
                continue;
            };
            let Some(value) = scalar.value() else {
                continue;
            };
            if !(value.is_string() || value.is_number()) {
                continue;
            }
            if has_on_off_values(&scalar) {
                continue;
            }
            if scalar.settable() && !scalar.has_values() {
                continue;
            }
            readings.push(reading(embedded_id, name, value.clone()));
        }
    }

    readings
}

fn reading(embedded_id: &str, name: &str, value: Value) -> SensorReading {
    let meta = meta_for(name);
    SensorReading {
        key: format!("{embedded_id}:{name}"),
        embedded_id: embedded_id.to_string(),
        name: name.to_string(),
        value,
        unit: meta.unit,
        device_class: meta.device_class,
        state_class: meta.state_class,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnergyReading {
    pub key: String,
    pub embedded_id: String,
    pub kind: ConsumptionKind,
    pub mode: String,
    pub period: ConsumptionPeriod,
    /// kWh over the completed span of the period's bucket list.
    pub total: f64,
}

pub fn energy(device: &Device) -> Vec<EnergyReading> {
    let mut readings = Vec::new();
    for point in device.management_points() {
        let embedded_id = point.embedded_id();
        for kind in [ConsumptionKind::Electrical, ConsumptionKind::Gas] {
            for mode in point.consumption_modes(kind) {
                for period in [
                    ConsumptionPeriod::Daily,
                    ConsumptionPeriod::Weekly,
                    ConsumptionPeriod::Monthly,
                ] {
                    if let Some(total) = point.consumption(kind, mode, period) {
                        readings.push(EnergyReading {
                            key: format!("{embedded_id}:{}:{mode}:{}", kind.as_str(), period.key()),
                            embedded_id: embedded_id.to_string(),
                            kind,
                            mode: mode.to_string(),
                            period,
                            total,
                        });
                    }
                }
            }
        }
    }
    readings
}
