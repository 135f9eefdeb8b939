use super::{json_number, settable_scalar, validate_option, validate_ranged, CharacteristicWrite};
use crate::document::{Device, ManagementPoint};
use crate::{Error, Result};

pub const MANAGEMENT_POINT_TYPE: &str = "domesticHotWaterTank";

const TANK_SETPOINT: &str = "domesticHotWaterTemperature";

/// Tank operation as the platform presents it: off, normal heat-pump
/// operation, or powerful reheat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TankOperation {
    Off,
    HeatPump,
    Performance,
}

impl TankOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            TankOperation::Off => "off",
            TankOperation::HeatPump => "heat_pump",
            TankOperation::Performance => "performance",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "off" => Some(TankOperation::Off),
            "heat_pump" => Some(TankOperation::HeatPump),
            "performance" => Some(TankOperation::Performance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaterHeaterState {
    pub embedded_id: String,
    pub operation: TankOperation,
    pub operations: Vec<TankOperation>,
    pub current_temperature: Option<f64>,
    pub target_temperature: Option<f64>,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    pub target_step: Option<f64>,
}

pub fn project(device: &Device) -> Option<WaterHeaterState> {
    let point = device.management_point(MANAGEMENT_POINT_TYPE)?;

    let powered_on = point
        .characteristic("onOffMode")
        .and_then(|c| c.value_str())
        != Some("off");
    let powerful = point
        .characteristic("powerfulMode")
        .and_then(|c| c.value_str())
        == Some("on");
    let operation = if !powered_on {
        TankOperation::Off
    } else if powerful {
        TankOperation::Performance
    } else {
        TankOperation::HeatPump
    };

    let mut operations = vec![TankOperation::Off, TankOperation::HeatPump];
    if point.characteristic("powerfulMode").is_some() {
        operations.push(TankOperation::Performance);
    }

    let setpoint = point.setpoint(TANK_SETPOINT);

    Some(WaterHeaterState {
        embedded_id: point.embedded_id().to_string(),
        operation,
        operations,
        current_temperature: point.sensory("tankTemperature").and_then(|c| c.value_f64()),
        target_temperature: setpoint.as_ref().and_then(|sp| sp.value()),
        min_temp: setpoint.as_ref().and_then(|sp| sp.min()),
        max_temp: setpoint.as_ref().and_then(|sp| sp.max()),
        target_step: setpoint.as_ref().and_then(|sp| sp.step()),
    })
}

pub fn set_operation(
    point: &ManagementPoint<'_>,
    operation: TankOperation,
) -> Result<Vec<CharacteristicWrite>> {
    let on_off = settable_scalar(point, "onOffMode")?;
    let embedded_id = point.embedded_id();

    match operation {
        TankOperation::Off => {
            if on_off.as_str() == Some("off") {
                return Ok(Vec::new());
            }
            Ok(vec![CharacteristicWrite::scalar(
                embedded_id,
                "onOffMode",
                "off",
            )])
        }
        TankOperation::HeatPump => {
            let mut plan = Vec::new();
            if on_off.as_str() != Some("on") {
                plan.push(CharacteristicWrite::scalar(embedded_id, "onOffMode", "on"));
            }
            // Selecting heat_pump cancels an active powerful reheat.
            if point
                .characteristic("powerfulMode")
                .and_then(|c| c.value_str())
                == Some("on")
            {
                let powerful = settable_scalar(point, "powerfulMode")?;
                validate_option("powerfulMode", &powerful, "off")?;
                plan.push(CharacteristicWrite::scalar(embedded_id, "powerfulMode", "off"));
            }
            Ok(plan)
        }
        TankOperation::Performance => {
            let powerful = settable_scalar(point, "powerfulMode")?;
            validate_option("powerfulMode", &powerful, "on")?;
            let mut plan = Vec::new();
            if on_off.as_str() != Some("on") {
                plan.push(CharacteristicWrite::scalar(embedded_id, "onOffMode", "on"));
            }
            if powerful.as_str() != Some("on") {
                plan.push(CharacteristicWrite::scalar(embedded_id, "powerfulMode", "on"));
            }
            Ok(plan)
        }
    }
}

pub fn set_target_temperature(
    point: &ManagementPoint<'_>,
    value: f64,
) -> Result<Vec<CharacteristicWrite>> {
    let mode = point
        .current_operation_mode()
        .ok_or_else(|| Error::MissingCapability("operationMode".to_string()))?;
    let setpoint = point
        .setpoint(TANK_SETPOINT)
        .ok_or_else(|| Error::MissingCapability(TANK_SETPOINT.to_string()))?;
    validate_ranged(TANK_SETPOINT, &setpoint, value)?;
    Ok(vec![CharacteristicWrite::nested(
        point.embedded_id(),
        "temperatureControl",
        format!("/operationModes/{mode}/setpoints/{TANK_SETPOINT}"),
        json_number(value),
    )])
}
