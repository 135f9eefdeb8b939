use serde_json::Value;

/// One appliance as the cloud reports it. The document is the full nested
/// capability JSON for the device and is kept alive across polls; updates
/// merge into it rather than replacing it.
#[derive(Debug, Clone)]
pub struct Device {
    pub id: String,
    pub document: Value,
}

impl Device {
    pub fn new(id: impl Into<String>, document: Value) -> Self {
        Device {
            id: id.into(),
            document,
        }
    }

    /// Display name. The first management point carrying a non-empty `name`
    /// characteristic wins, then the gateway's `modelInfo`, then the id.
    pub fn name(&self) -> String {
        for point in self.management_points() {
            if let Some(name) = point
                .characteristic("name")
                .and_then(|c| c.scalar())
                .and_then(|s| s.as_str())
            {
                let name = name.trim();
                if !name.is_empty() {
                    return name.to_string();
                }
            }
        }
        if let Some(model) = self
            .management_point("gateway")
            .and_then(|p| p.characteristic("modelInfo"))
            .and_then(|c| c.scalar())
            .and_then(|s| s.as_str())
        {
            if !model.is_empty() {
                return model.to_string();
            }
        }
        self.id.clone()
    }

    pub fn management_points(&self) -> impl Iterator<Item = ManagementPoint<'_>> {
        self.document
            .get("managementPoints")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .map(|raw| ManagementPoint { raw })
    }

    /// First management point of the given type. Absence means the device
    /// does not support that capability.
    pub fn management_point(&self, kind: &str) -> Option<ManagementPoint<'_>> {
        self.management_points().find(|p| p.kind() == kind)
    }

    pub fn management_point_by_id(&self, embedded_id: &str) -> Option<ManagementPoint<'_>> {
        self.management_points()
            .find(|p| p.embedded_id() == embedded_id)
    }
}

/// Borrowed view over one management point object. Cheap to copy; nothing
/// is parsed ahead of time.
#[derive(Debug, Clone, Copy)]
pub struct ManagementPoint<'a> {
    raw: &'a Value,
}

impl<'a> ManagementPoint<'a> {
    pub fn embedded_id(&self) -> &'a str {
        self.raw
            .get("embeddedId")
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    pub fn kind(&self) -> &'a str {
        self.raw
            .get("managementPointType")
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    pub fn characteristic(&self, name: &str) -> Option<Characteristic<'a>> {
        let raw = self.raw.get(name)?;
        if !raw.is_object() {
            return None;
        }
        Some(classify(name, raw))
    }

    /// All characteristics of this point. Plain-string metadata keys are
    /// not characteristics and are skipped.
    pub fn characteristics(&self) -> impl Iterator<Item = (&'a str, Characteristic<'a>)> {
        self.raw
            .as_object()
            .into_iter()
            .flatten()
            .filter(|(_, v)| v.is_object())
            .map(|(name, raw)| (name.as_str(), classify(name, raw)))
    }

    pub fn current_operation_mode(&self) -> Option<&'a str> {
        self.raw.get("operationMode")?.get("value")?.as_str()
    }

    /// Sub-value of `sensoryData`, e.g. `roomTemperature`.
    pub fn sensory(&self, name: &str) -> Option<Characteristic<'a>> {
        let raw = self.raw.get("sensoryData")?.get("value")?.get(name)?;
        if !raw.is_object() {
            return None;
        }
        Some(classify(name, raw))
    }

    /// Setpoint of the current operation mode, resolved through
    /// `temperatureControl`. Not every mode exposes every setpoint.
    pub fn setpoint(&self, name: &str) -> Option<Ranged<'a>> {
        let mode = self.current_operation_mode()?;
        let raw = self
            .raw
            .get("temperatureControl")?
            .pointer(&format!("/value/operationModes/{mode}/setpoints/{name}"))?;
        if raw.get("minValue").is_some() || raw.get("value").is_some() {
            Some(Ranged { raw })
        } else {
            None
        }
    }

    /// Aggregated consumption for one kind/mode/period. Buckets before the
    /// period's fixed offset are still filling and are excluded; null
    /// buckets count as zero. `None` when the device reports no such
    /// series.
    pub fn consumption(
        &self,
        kind: ConsumptionKind,
        mode: &str,
        period: ConsumptionPeriod,
    ) -> Option<f64> {
        let buckets = self
            .raw
            .get("consumptionData")?
            .pointer(&format!("/value/{}/{mode}/{}", kind.as_str(), period.key()))?
            .as_array()?;
        let start = period.offset().min(buckets.len());
        Some(
            buckets[start..]
                .iter()
                .map(|v| v.as_f64().unwrap_or(0.0))
                .sum(),
        )
    }

    /// Operation modes that have a consumption series of the given kind.
    pub fn consumption_modes(&self, kind: ConsumptionKind) -> Vec<&'a str> {
        self.raw
            .get("consumptionData")
            .and_then(|c| c.pointer(&format!("/value/{}", kind.as_str())))
            .and_then(Value::as_object)
            .map(|m| m.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

fn classify<'a>(name: &str, raw: &'a Value) -> Characteristic<'a> {
    if raw.get("minValue").is_some() && raw.get("maxValue").is_some() {
        Characteristic::Ranged(Ranged { raw })
    } else if name == "consumptionData" {
        Characteristic::TimeSeries(TimeSeries { raw })
    } else if raw.get("value").map(Value::is_object).unwrap_or(false) {
        Characteristic::Structured(Structured { raw })
    } else {
        Characteristic::Scalar(Scalar { raw })
    }
}

/// A characteristic is self-describing: its JSON shape tells us whether it
/// is a plain scalar, a stepped numeric range, a nested mode-keyed tree,
/// or a consumption bucket series.
#[derive(Debug, Clone, Copy)]
pub enum Characteristic<'a> {
    Scalar(Scalar<'a>),
    Ranged(Ranged<'a>),
    Structured(Structured<'a>),
    TimeSeries(TimeSeries<'a>),
}

impl<'a> Characteristic<'a> {
    pub fn settable(&self) -> bool {
        match self {
            Characteristic::Scalar(c) => c.settable(),
            Characteristic::Ranged(c) => c.settable(),
            Characteristic::Structured(c) => c.settable(),
            Characteristic::TimeSeries(_) => false,
        }
    }

    pub fn value_f64(&self) -> Option<f64> {
        match self {
            Characteristic::Scalar(c) => c.as_f64(),
            Characteristic::Ranged(c) => c.value(),
            _ => None,
        }
    }

    pub fn value_str(&self) -> Option<&'a str> {
        match self {
            Characteristic::Scalar(c) => c.as_str(),
            _ => None,
        }
    }

    pub fn value_bool(&self) -> Option<bool> {
        match self {
            Characteristic::Scalar(c) => c.as_bool(),
            _ => None,
        }
    }

    pub fn scalar(&self) -> Option<Scalar<'a>> {
        match self {
            Characteristic::Scalar(c) => Some(*c),
            _ => None,
        }
    }

    pub fn ranged(&self) -> Option<Ranged<'a>> {
        match self {
            Characteristic::Ranged(c) => Some(*c),
            _ => None,
        }
    }

    pub fn structured(&self) -> Option<Structured<'a>> {
        match self {
            Characteristic::Structured(c) => Some(*c),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Scalar<'a> {
    raw: &'a Value,
}

impl<'a> Scalar<'a> {
    pub(crate) fn from_raw(raw: &'a Value) -> Self {
        Scalar { raw }
    }

    pub fn value(&self) -> Option<&'a Value> {
        self.raw.get("value")
    }

    pub fn as_str(&self) -> Option<&'a str> {
        self.value()?.as_str()
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value()?.as_bool()
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.value()?.as_f64()
    }

    pub fn settable(&self) -> bool {
        self.raw
            .get("settable")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Enumerated legal values, empty when the scalar is not enumerated.
    pub fn values(&self) -> Vec<&'a str> {
        self.raw
            .get("values")
            .and_then(Value::as_array)
            .map(|vals| vals.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn has_values(&self) -> bool {
        self.raw
            .get("values")
            .and_then(Value::as_array)
            .map(|v| !v.is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Ranged<'a> {
    raw: &'a Value,
}

impl<'a> Ranged<'a> {
    pub(crate) fn from_raw(raw: &'a Value) -> Self {
        Ranged { raw }
    }

    pub fn value(&self) -> Option<f64> {
        self.raw.get("value")?.as_f64()
    }

    pub fn settable(&self) -> bool {
        self.raw
            .get("settable")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn min(&self) -> Option<f64> {
        self.raw.get("minValue")?.as_f64()
    }

    pub fn max(&self) -> Option<f64> {
        self.raw.get("maxValue")?.as_f64()
    }

    pub fn step(&self) -> Option<f64> {
        self.raw.get("stepValue")?.as_f64()
    }

    /// Range and step check. Bounds the schema does not declare are not
    /// enforced.
    pub fn accepts(&self, value: f64) -> bool {
        if let Some(min) = self.min() {
            if value < min {
                return false;
            }
            if let Some(step) = self.step() {
                if step > 0.0 {
                    let steps = (value - min) / step;
                    if (steps - steps.round()).abs() > 1e-6 {
                        return false;
                    }
                }
            }
        }
        if let Some(max) = self.max() {
            if value > max {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Structured<'a> {
    raw: &'a Value,
}

impl<'a> Structured<'a> {
    pub fn settable(&self) -> bool {
        self.raw
            .get("settable")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn value(&self) -> Option<&'a Value> {
        self.raw.get("value")
    }

    /// JSON-pointer lookup inside the nested value, e.g.
    /// `/operationModes/heating/fanSpeed/currentMode`.
    pub fn at(&self, pointer: &str) -> Option<&'a Value> {
        self.value()?.pointer(pointer)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TimeSeries<'a> {
    raw: &'a Value,
}

impl<'a> TimeSeries<'a> {
    pub fn buckets(
        &self,
        kind: ConsumptionKind,
        mode: &str,
        period: ConsumptionPeriod,
    ) -> Option<&'a Vec<Value>> {
        self.raw
            .pointer(&format!("/value/{}/{mode}/{}", kind.as_str(), period.key()))?
            .as_array()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumptionKind {
    Electrical,
    Gas,
}

impl ConsumptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumptionKind::Electrical => "electrical",
            ConsumptionKind::Gas => "gas",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumptionPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl ConsumptionPeriod {
    pub fn key(&self) -> &'static str {
        match self {
            ConsumptionPeriod::Daily => "d",
            ConsumptionPeriod::Weekly => "w",
            ConsumptionPeriod::Monthly => "m",
        }
    }

    /// Index of the first bucket that belongs to the completed span. The
    /// cloud pads each series with leading buckets that are still filling.
    pub fn offset(&self) -> usize {
        match self {
            ConsumptionPeriod::Daily => 12,
            ConsumptionPeriod::Weekly => 7,
            ConsumptionPeriod::Monthly => 12,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn heat_pump() -> Device {
        Device::new(
            "dev-1",
            json!({
                "managementPoints": [
                    {
                        "embeddedId": "gateway",
                        "managementPointType": "gateway",
                        "modelInfo": {"settable": false, "value": "BRP069A62"}
                    },
                    {
                        "embeddedId": "climateControlMainZone",
                        "managementPointType": "climateControl",
                        "name": {"settable": true, "value": "Living room"},
                        "onOffMode": {"settable": true, "value": "on", "values": ["on", "off"]},
                        "operationMode": {"settable": true, "value": "heating", "values": ["heating", "cooling", "auto"]},
                        "isInErrorState": {"settable": false, "value": false},
                        "temperatureControl": {
                            "settable": true,
                            "value": {"operationModes": {"heating": {"setpoints": {
                                "roomTemperature": {"settable": true, "value": 21.0, "minValue": 12.0, "maxValue": 30.0, "stepValue": 0.5}
                            }}}}
                        },
                        "sensoryData": {
                            "settable": false,
                            "value": {
                                "roomTemperature": {"settable": false, "value": 20.5},
                                "outdoorTemperature": {"settable": false, "value": 4.0, "minValue": -25.0, "maxValue": 50.0, "stepValue": 1.0}
                            }
                        },
                        "consumptionData": {
                            "settable": false,
                            "value": {"electrical": {"heating": {
                                "d": [null,0.1,0.2,0.3,0.4,0.5,0.6,0.7,0.8,0.9,1.0,1.1,2.5],
                                "w": [1.0,1.0,1.0,1.0,1.0,1.0,1.0,2.0,2.0,2.0,2.0,2.0,2.0],
                                "m": [0.0,0.0,0.0,0.0,0.0,0.0,0.0,0.0,0.0,0.0,0.0,0.0,7.5]
                            }}}
                        }
                    }
                ]
            }),
        )
    }

    #[test]
    fn name_prefers_name_characteristic() {
        assert_eq!(heat_pump().name(), "Living room");
    }

    #[test]
    fn name_falls_back_to_gateway_model() {
        let mut device = heat_pump();
        device.document["managementPoints"][1]["name"]["value"] = json!("  ");
        assert_eq!(device.name(), "BRP069A62");
    }

    #[test]
    fn name_falls_back_to_id() {
        let device = Device::new("dev-9", json!({"managementPoints": []}));
        assert_eq!(device.name(), "dev-9");
    }

    #[test]
    fn management_point_lookup() {
        let device = heat_pump();
        let climate = device.management_point("climateControl").unwrap();
        assert_eq!(climate.embedded_id(), "climateControlMainZone");
        assert!(device.management_point("domesticHotWaterTank").is_none());
        assert!(device
            .management_point_by_id("climateControlMainZone")
            .is_some());
    }

    #[test]
    fn scalar_characteristic() {
        let device = heat_pump();
        let climate = device.management_point("climateControl").unwrap();
        let on_off = climate.characteristic("onOffMode").unwrap();
        assert!(on_off.settable());
        let scalar = on_off.scalar().unwrap();
        assert_eq!(scalar.as_str(), Some("on"));
        assert_eq!(scalar.values(), vec!["on", "off"]);
    }

    #[test]
    fn flag_scalar_has_no_values() {
        let device = heat_pump();
        let climate = device.management_point("climateControl").unwrap();
        let flag = climate
            .characteristic("isInErrorState")
            .unwrap()
            .scalar()
            .unwrap();
        assert_eq!(flag.as_bool(), Some(false));
        assert!(!flag.has_values());
        assert!(!flag.settable());
    }

    #[test]
    fn setpoint_resolves_through_current_mode() {
        let device = heat_pump();
        let climate = device.management_point("climateControl").unwrap();
        let setpoint = climate.setpoint("roomTemperature").unwrap();
        assert_eq!(setpoint.value(), Some(21.0));
        assert_eq!(setpoint.min(), Some(12.0));
        assert_eq!(setpoint.max(), Some(30.0));
        assert_eq!(setpoint.step(), Some(0.5));
    }

    #[test]
    fn setpoint_absent_for_other_modes() {
        let mut device = heat_pump();
        device.document["managementPoints"][1]["operationMode"]["value"] = json!("cooling");
        let climate = device.management_point("climateControl").unwrap();
        assert!(climate.setpoint("roomTemperature").is_none());
    }

    #[test]
    fn setpoint_step_validation() {
        let device = heat_pump();
        let climate = device.management_point("climateControl").unwrap();
        let setpoint = climate.setpoint("roomTemperature").unwrap();
        assert!(setpoint.accepts(21.5));
        assert!(setpoint.accepts(12.0));
        assert!(setpoint.accepts(30.0));
        assert!(!setpoint.accepts(21.3));
        assert!(!setpoint.accepts(30.5));
        assert!(!setpoint.accepts(11.5));
    }

    #[test]
    fn sensory_values_classify_by_shape() {
        let device = heat_pump();
        let climate = device.management_point("climateControl").unwrap();
        match climate.sensory("roomTemperature").unwrap() {
            Characteristic::Scalar(s) => assert_eq!(s.as_f64(), Some(20.5)),
            other => panic!("expected scalar, got {other:?}"),
        }
        match climate.sensory("outdoorTemperature").unwrap() {
            Characteristic::Ranged(r) => assert_eq!(r.value(), Some(4.0)),
            other => panic!("expected ranged, got {other:?}"),
        }
        assert!(climate.sensory("tankTemperature").is_none());
    }

    #[test]
    fn weekly_consumption_sums_completed_buckets() {
        let device = heat_pump();
        let climate = device.management_point("climateControl").unwrap();
        let weekly = climate
            .consumption(
                ConsumptionKind::Electrical,
                "heating",
                ConsumptionPeriod::Weekly,
            )
            .unwrap();
        assert_eq!(weekly, 12.0);
    }

    #[test]
    fn daily_and_monthly_take_trailing_bucket() {
        let device = heat_pump();
        let climate = device.management_point("climateControl").unwrap();
        let daily = climate
            .consumption(
                ConsumptionKind::Electrical,
                "heating",
                ConsumptionPeriod::Daily,
            )
            .unwrap();
        assert_eq!(daily, 2.5);
        let monthly = climate
            .consumption(
                ConsumptionKind::Electrical,
                "heating",
                ConsumptionPeriod::Monthly,
            )
            .unwrap();
        assert_eq!(monthly, 7.5);
    }

    #[test]
    fn null_buckets_count_as_zero() {
        let mut device = heat_pump();
        device.document["managementPoints"][1]["consumptionData"]["value"]["electrical"]
            ["heating"]["d"] = json!([null, null, null, null, null, null, null, null, null, null, null, null, null]);
        let climate = device.management_point("climateControl").unwrap();
        let daily = climate
            .consumption(
                ConsumptionKind::Electrical,
                "heating",
                ConsumptionPeriod::Daily,
            )
            .unwrap();
        assert_eq!(daily, 0.0);
    }

    #[test]
    fn consumption_absent_series() {
        let device = heat_pump();
        let climate = device.management_point("climateControl").unwrap();
        assert!(climate
            .consumption(ConsumptionKind::Gas, "heating", ConsumptionPeriod::Daily)
            .is_none());
        assert_eq!(
            climate.consumption_modes(ConsumptionKind::Electrical),
            vec!["heating"]
        );
        assert!(climate.consumption_modes(ConsumptionKind::Gas).is_empty());
    }
}
