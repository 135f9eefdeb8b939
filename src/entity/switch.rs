use super::{has_on_off_values, settable_scalar, validate_option, CharacteristicWrite};
use crate::document::{Device, ManagementPoint};
use crate::Result;

/// Claimed by the climate and water-heater entities; projecting them as
/// switches too would duplicate the controls.
const RESERVED: &[&str] = &["onOffMode", "powerfulMode"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchState {
    pub key: String,
    pub embedded_id: String,
    pub name: String,
    pub on: bool,
}

/// Settable scalars whose legal values are exactly on and off.
pub fn project(device: &Device) -> Vec<SwitchState> {
    let mut switches = Vec::new();
    for point in device.management_points() {
        for (name, characteristic) in point.characteristics() {
            if RESERVED.contains(&name) {
                continue;
            }
            let Some(scalar) = characteristic.scalar() else {
                continue;
            };
            if !scalar.settable() || !has_on_off_values(&scalar) {
                continue;
            }
            switches.push(SwitchState {
                key: format!("{}:{name}", point.embedded_id()),
                embedded_id: point.embedded_id().to_string(),
                name: name.to_string(),
                on: scalar.as_str() == Some("on"),
            });
        }
    }
    switches
}

pub fn set(point: &ManagementPoint<'_>, name: &str, on: bool) -> Result<Vec<CharacteristicWrite>> {
    let scalar = settable_scalar(point, name)?;
    let value = if on { "on" } else { "off" };
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
