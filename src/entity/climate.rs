use serde_json::Value;

use super::{
    json_number, settable_scalar, validate_option, validate_ranged, CharacteristicWrite,
};
use crate::document::{Device, ManagementPoint, Ranged, Scalar};
use crate::{Error, Result};

pub const MANAGEMENT_POINT_TYPE: &str = "climateControl";

/// Setpoint names a climate zone may steer, tried in order. Air units
/// expose a room setpoint, floor-heating units steer the leaving water.
const SETPOINT_NAMES: &[&str] = &[
    "roomTemperature",
    "leavingWaterOffset",
    "leavingWaterTemperature",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HvacMode {
    Off,
    Heating,
    Cooling,
    Auto,
    Dry,
    FanOnly,
}

impl HvacMode {
    /// Vendor operation-mode string. `Off` is not an operation mode; it is
    /// expressed through `onOffMode`.
    pub fn as_operation_mode(&self) -> Option<&'static str> {
        match self {
            HvacMode::Off => None,
            HvacMode::Heating => Some("heating"),
            HvacMode::Cooling => Some("cooling"),
            HvacMode::Auto => Some("auto"),
            HvacMode::Dry => Some("dry"),
            HvacMode::FanOnly => Some("fanOnly"),
        }
    }

    pub fn from_operation_mode(s: &str) -> Option<Self> {
        match s {
            "heating" => Some(HvacMode::Heating),
            "cooling" => Some(HvacMode::Cooling),
            "auto" => Some(HvacMode::Auto),
            "dry" => Some(HvacMode::Dry),
            "fanOnly" => Some(HvacMode::FanOnly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Boost,
    Eco,
    Away,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Boost => "boost",
            Preset::Eco => "eco",
            Preset::Away => "away",
        }
    }

    /// Backing characteristic for presets driven by a plain on/off
    /// scalar. `Away` runs through the holiday-mode resource instead.
    fn characteristic(&self) -> Option<&'static str> {
        match self {
            Preset::Boost => Some("powerfulMode"),
            Preset::Eco => Some("econoMode"),
            Preset::Away => None,
        }
    }
}

/// Everything a climate entity shows at once.
#[derive(Debug, Clone, PartialEq)]
pub struct ClimateState {
    pub embedded_id: String,
    /// `None` when the cloud reports an operation mode this crate does
    /// not know.
    pub hvac_mode: Option<HvacMode>,
    pub hvac_modes: Vec<HvacMode>,
    pub current_temperature: Option<f64>,
    pub target_temperature: Option<f64>,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    pub target_step: Option<f64>,
    pub fan_mode: Option<String>,
    pub fan_modes: Vec<String>,
    pub swing_horizontal: Option<String>,
    pub swing_horizontal_modes: Vec<String>,
    pub swing_vertical: Option<String>,
    pub swing_vertical_modes: Vec<String>,
    pub preset: Option<Preset>,
    pub presets: Vec<Preset>,
}

pub fn project(device: &Device) -> Option<ClimateState> {
    let point = device.management_point(MANAGEMENT_POINT_TYPE)?;

    let off = point
        .characteristic("onOffMode")
        .and_then(|c| c.value_str())
        == Some("off");
    let hvac_mode = if off {
        Some(HvacMode::Off)
    } else {
        point
            .current_operation_mode()
            .and_then(HvacMode::from_operation_mode)
    };

    let mut hvac_modes = vec![HvacMode::Off];
    if let Some(op) = point.characteristic("operationMode").and_then(|c| c.scalar()) {
        hvac_modes.extend(op.values().iter().filter_map(|v| HvacMode::from_operation_mode(v)));
    }

    let setpoint = target_setpoint(&point);
    let (fan_mode, fan_modes) = fan_state(&point);
    let (swing_horizontal, swing_horizontal_modes) = swing_state(&point, SwingAxis::Horizontal);
    let (swing_vertical, swing_vertical_modes) = swing_state(&point, SwingAxis::Vertical);

    Some(ClimateState {
        embedded_id: point.embedded_id().to_string(),
        hvac_mode,
        hvac_modes,
        current_temperature: point.sensory("roomTemperature").and_then(|c| c.value_f64()),
        target_temperature: setpoint.as_ref().and_then(|(_, sp)| sp.value()),
        min_temp: setpoint.as_ref().and_then(|(_, sp)| sp.min()),
        max_temp: setpoint.as_ref().and_then(|(_, sp)| sp.max()),
        target_step: setpoint.as_ref().and_then(|(_, sp)| sp.step()),
        fan_mode,
        fan_modes,
        swing_horizontal,
        swing_horizontal_modes,
        swing_vertical,
        swing_vertical_modes,
        preset: current_preset(&point),
        presets: available_presets(&point),
    })
}

/// Resolves which setpoint this unit steers in its current mode.
pub fn target_setpoint<'a>(point: &ManagementPoint<'a>) -> Option<(&'static str, Ranged<'a>)> {
    for name in SETPOINT_NAMES {
        if let Some(setpoint) = point.setpoint(name) {
            return Some((name, setpoint));
        }
    }
    None
}

/// On/off before the mode change: the unit ignores an operation-mode
/// write while powered off.
pub fn set_hvac_mode(point: &ManagementPoint<'_>, mode: HvacMode) -> Result<Vec<CharacteristicWrite>> {
    let on_off = settable_scalar(point, "onOffMode")?;
    let embedded_id = point.embedded_id();

    if mode == HvacMode::Off {
        if on_off.as_str() == Some("off") {
            return Ok(Vec::new());
        }
        return Ok(vec![CharacteristicWrite::scalar(
            embedded_id,
            "onOffMode",
            "off",
        )]);
    }

    let target = mode
        .as_operation_mode()
        .expect("non-off mode maps to an operation mode");
    let operation = settable_scalar(point, "operationMode")?;
    validate_option("operationMode", &operation, target)?;

    let mut plan = Vec::new();
    if on_off.as_str() != Some("on") {
        plan.push(CharacteristicWrite::scalar(embedded_id, "onOffMode", "on"));
    }
    if operation.as_str() != Some(target) {
        plan.push(CharacteristicWrite::scalar(embedded_id, "operationMode", target));
    }
    Ok(plan)
}

pub fn set_target_temperature(
    point: &ManagementPoint<'_>,
    value: f64,
) -> Result<Vec<CharacteristicWrite>> {
    let mode = point
        .current_operation_mode()
        .ok_or_else(|| Error::MissingCapability("operationMode".to_string()))?;
    let (name, setpoint) = target_setpoint(point)
        .ok_or_else(|| Error::MissingCapability("temperatureControl".to_string()))?;
    validate_ranged(name, &setpoint, value)?;
    Ok(vec![CharacteristicWrite::nested(
        point.embedded_id(),
        "temperatureControl",
        format!("/operationModes/{mode}/setpoints/{name}"),
        json_number(value),
    )])
}

/// Fan modes are the enumerated speed modes plus, when `fixed` is
/// offered, one numbered entry per fixed speed step.
pub fn set_fan_mode(point: &ManagementPoint<'_>, mode: &str) -> Result<Vec<CharacteristicWrite>> {
    let op_mode = point
        .current_operation_mode()
        .ok_or_else(|| Error::MissingCapability("operationMode".to_string()))?;
    let node = fan_speed_node(point, op_mode)
        .ok_or_else(|| Error::MissingCapability("fanControl".to_string()))?;
    let current_mode = Scalar::from_raw(
        node.get("currentMode")
            .ok_or_else(|| Error::MissingCapability("fanControl".to_string()))?,
    );
    if !current_mode.settable() {
        return Err(Error::NotSettable("fanControl".to_string()));
    }
    let embedded_id = point.embedded_id();

    if let Ok(speed) = mode.parse::<i64>() {
        validate_option("fanSpeed", &current_mode, "fixed")?;
        let fixed = node
            .pointer("/modes/fixed")
            .map(Ranged::from_raw)
            .ok_or_else(|| Error::MissingCapability("fanSpeed".to_string()))?;
        if !fixed.accepts(speed as f64) {
            return Err(Error::InvalidOption {
                name: "fanSpeed".to_string(),
                value: mode.to_string(),
            });
        }
        return Ok(vec![
            CharacteristicWrite::nested(
                embedded_id,
                "fanControl",
                format!("/operationModes/{op_mode}/fanSpeed/currentMode"),
                "fixed",
            ),
            CharacteristicWrite::nested(
                embedded_id,
                "fanControl",
                format!("/operationModes/{op_mode}/fanSpeed/modes/fixed"),
                speed,
            ),
        ]);
    }

    validate_option("fanSpeed", &current_mode, mode)?;
    Ok(vec![CharacteristicWrite::nested(
        embedded_id,
        "fanControl",
        format!("/operationModes/{op_mode}/fanSpeed/currentMode"),
        mode,
    )])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwingAxis {
    Horizontal,
    Vertical,
}

impl SwingAxis {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwingAxis::Horizontal => "horizontal",
            SwingAxis::Vertical => "vertical",
        }
    }
}

/// Each axis is written on its own; devices expose one, both, or neither.
pub fn set_swing(
    point: &ManagementPoint<'_>,
    axis: SwingAxis,
    mode: &str,
) -> Result<Vec<CharacteristicWrite>> {
    let op_mode = point
        .current_operation_mode()
        .ok_or_else(|| Error::MissingCapability("operationMode".to_string()))?;
    let current_mode = swing_node(point, op_mode, axis)
        .map(Scalar::from_raw)
        .ok_or_else(|| Error::MissingCapability(format!("fanDirection.{}", axis.as_str())))?;
    if !current_mode.settable() {
        return Err(Error::NotSettable(format!("fanDirection.{}", axis.as_str())));
    }
    validate_option("fanDirection", &current_mode, mode)?;
    Ok(vec![CharacteristicWrite::nested(
        point.embedded_id(),
        "fanControl",
        format!(
            "/operationModes/{op_mode}/fanDirection/{}/currentMode",
            axis.as_str()
        ),
        mode,
    )])
}

/// Boost and eco are plain scalar presets; away is the holiday-mode
/// resource and is handled by the coordinator.
pub fn set_preset(
    point: &ManagementPoint<'_>,
    preset: Preset,
    enable: bool,
) -> Result<Vec<CharacteristicWrite>> {
    let name = preset
        .characteristic()
        .ok_or_else(|| Error::MissingCapability("holidayMode".to_string()))?;
    let scalar = settable_scalar(point, name)?;
    let value = if enable { "on" } else { "off" };
    validate_option(name, &scalar, value)?;
    if scalar.as_str() == Some(value) {
        return Ok(Vec::new());
    }
    Ok(vec![CharacteristicWrite::scalar(
        point.embedded_id(),
        name,
        value,
    )])
}

pub fn available_presets(point: &ManagementPoint<'_>) -> Vec<Preset> {
    let mut presets = Vec::new();
    for preset in [Preset::Boost, Preset::Eco] {
        let name = preset.characteristic().expect("scalar preset");
        if point
            .characteristic(name)
            .map(|c| c.settable())
            .unwrap_or(false)
        {
            presets.push(preset);
        }
    }
    if point
        .characteristic("holidayMode")
        .map(|c| c.settable())
        .unwrap_or(false)
    {
        presets.push(Preset::Away);
    }
    presets
}

pub fn current_preset(point: &ManagementPoint<'_>) -> Option<Preset> {
    if holiday_enabled(point) == Some(true) {
        return Some(Preset::Away);
    }
    for preset in [Preset::Boost, Preset::Eco] {
        let name = preset.characteristic().expect("scalar preset");
        if point.characteristic(name).and_then(|c| c.value_str()) == Some("on") {
            return Some(preset);
        }
    }
    None
}

pub fn holiday_enabled(point: &ManagementPoint<'_>) -> Option<bool> {
    point
        .characteristic("holidayMode")?
        .structured()?
        .at("/enabled")?
        .as_bool()
}

fn fan_speed_node<'a>(point: &ManagementPoint<'a>, op_mode: &str) -> Option<&'a Value> {
    point
        .characteristic("fanControl")?
        .structured()?
        .at(&format!("/operationModes/{op_mode}/fanSpeed"))
}

fn swing_node<'a>(
    point: &ManagementPoint<'a>,
    op_mode: &str,
    axis: SwingAxis,
) -> Option<&'a Value> {
    point
        .characteristic("fanControl")?
        .structured()?
        .at(&format!(
            "/operationModes/{op_mode}/fanDirection/{}/currentMode",
            axis.as_str()
        ))
}

fn fan_state(point: &ManagementPoint<'_>) -> (Option<String>, Vec<String>) {
    let Some(op_mode) = point.current_operation_mode() else {
        return (None, Vec::new());
    };
    let Some(node) = fan_speed_node(point, op_mode) else {
        return (None, Vec::new());
    };

    let current = node
        .pointer("/currentMode/value")
        .and_then(Value::as_str)
        .map(|mode| {
            if mode == "fixed" {
                node.pointer("/modes/fixed/value")
                    .and_then(Value::as_f64)
                    .map(format_speed)
                    .unwrap_or_else(|| mode.to_string())
            } else {
                mode.to_string()
            }
        });

    let mut modes = Vec::new();
    let mode_values = node
        .pointer("/currentMode/values")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str);
    for mode in mode_values {
        if mode == "fixed" {
            if let Some(fixed) = node.pointer("/modes/fixed").map(Ranged::from_raw) {
                modes.extend(speed_steps(&fixed));
            }
        } else {
            modes.push(mode.to_string());
        }
    }
    (current, modes)
}

fn swing_state(point: &ManagementPoint<'_>, axis: SwingAxis) -> (Option<String>, Vec<String>) {
    let Some(op_mode) = point.current_operation_mode() else {
        return (None, Vec::new());
    };
    let Some(current_mode) = swing_node(point, op_mode, axis).map(Scalar::from_raw) else {
        return (None, Vec::new());
    };
    (
        current_mode.as_str().map(str::to_string),
        current_mode.values().iter().map(|v| v.to_string()).collect(),
    )
}

fn speed_steps(fixed: &Ranged<'_>) -> Vec<String> {
    let (Some(min), Some(max)) = (fixed.min(), fixed.max()) else {
        return Vec::new();
    };
    let step = fixed.step().filter(|s| *s > 0.0).unwrap_or(1.0);
    let mut speeds = Vec::new();
    let mut speed = min;
    while speed <= max + 1e-9 {
        speeds.push(format_speed(speed));
        speed += step;
    }
    speeds
}

fn format_speed(speed: f64) -> String {
    if speed.fract() == 0.0 {
        format!("{}", speed as i64)
    } else {
        speed.to_string()
    }
}
