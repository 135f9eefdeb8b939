use crate::document::Device;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryReading {
    pub key: String,
    pub embedded_id: String,
    pub name: String,
    pub on: bool,
}

/// Boolean scalars with no value enumeration are read-only on/off
/// indicators: error flags, connectivity, active-mode markers.
pub fn project(device: &Device) -> Vec<BinaryReading> {
    let mut readings = Vec::new();
    for point in device.management_points() {
        for (name, characteristic) in point.characteristics() {
            let Some(scalar) = characteristic.scalar() else {
                continue;
            };
            let Some(on) = scalar.as_bool() else {
                continue;
            };
            if scalar.has_values() {
                continue;
            }
            readings.push(BinaryReading {
                key: format!("{}:{name}", point.embedded_id()),
                embedded_id: point.embedded_id().to_string(),
                name: name.to_string(),
                on,
            });
        }
    }
    readings
}
