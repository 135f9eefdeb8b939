use crate::document::Device;

/// Per-device refresh button. Pressing it requests an immediate poll from
/// the coordinator; the scan-ignore window may still suppress it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshButton {
    pub key: String,
    pub device_id: String,
    pub name: String,
}

pub fn project(device: &Device) -> RefreshButton {
    RefreshButton {
        key: format!("{}:refresh", device.id),
        device_id: device.id.clone(),
        name: format!("{} refresh", device.name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn one_button_per_device() {
        let device = Device::new("dev-1", json!({"managementPoints": []}));
        let button = project(&device);
        assert_eq!(button.key, "dev-1:refresh");
        assert_eq!(button.device_id, "dev-1");
        assert_eq!(button.name, "dev-1 refresh");
    }
}
