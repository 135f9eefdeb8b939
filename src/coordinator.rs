use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::{debug, trace, warn};

use crate::client::{OnectaClient, DEFAULT_BASE_URL};
use crate::config::ScheduleConfig;
use crate::document::{Device, ManagementPoint};
use crate::entity::climate::{self, HvacMode, Preset, SwingAxis};
use crate::entity::water_heater::{self, TankOperation};
use crate::entity::{self, select, switch, CharacteristicWrite};
use crate::limits::RateLimitSnapshot;
use crate::logger::{MessageLogMode, MessageLogger};
use crate::merge::{changed_paths, merge_tree};
use crate::schedule;
use crate::token::TokenProvider;
use crate::{Error, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

type ChangeCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Outcome of one poll attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// At least one device document changed.
    Updated,
    /// The cloud answered but nothing differed from the cache.
    Unchanged,
    /// Suppressed by the scan-ignore window; no request was made.
    Skipped,
}

pub struct DeviceCoordinatorBuilder {
    tokens: Arc<dyn TokenProvider>,
    base_url: String,
    timeout: Duration,
    config: ScheduleConfig,
    change_callbacks: Vec<ChangeCallback>,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl DeviceCoordinatorBuilder {
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            tokens,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            config: ScheduleConfig::default(),
            change_callbacks: Vec::new(),
            log_mode: None,
            log_path: None,
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn schedule_config(mut self, config: ScheduleConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a callback fired with the device id whenever a poll or
    /// an accepted command changes that device's document.
    pub fn on_change(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.change_callbacks.push(Box::new(f));
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> DeviceCoordinator {
        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => {
                Some(MessageLogger::new(mode, &path).expect("failed to open log file"))
            }
            _ => None,
        };

        DeviceCoordinator {
            client: OnectaClient::with_options(self.tokens, self.base_url, self.timeout),
            devices: Mutex::new(Vec::new()),
            last_payload: Mutex::new(None),
            config: Mutex::new(self.config),
            change_callbacks: self.change_callbacks,
            logger: Mutex::new(logger),
        }
    }
}

/// Single owner of the cached device documents. Polls merge into them,
/// accepted commands patch them, and every change is announced through
/// the registered callbacks.
pub struct DeviceCoordinator {
    client: OnectaClient,
    devices: Mutex<Vec<Device>>,
    last_payload: Mutex<Option<Value>>,
    config: Mutex<ScheduleConfig>,
    change_callbacks: Vec<ChangeCallback>,
    logger: Mutex<Option<MessageLogger>>,
}

impl DeviceCoordinator {
    pub fn builder(tokens: Arc<dyn TokenProvider>) -> DeviceCoordinatorBuilder {
        DeviceCoordinatorBuilder::new(tokens)
    }

    /// One poll: fetch the device list and merge it into the cache.
    /// Documents absent from the response are left untouched, and a poll
    /// shortly after an accepted write is skipped because the cloud still
    /// serves the pre-write state.
    pub async fn poll_once(&self) -> Result<PollOutcome> {
        let scan_ignore = self.config.lock().scan_ignore;
        if schedule::should_skip(Instant::now(), self.client.last_write(), scan_ignore) {
            debug!("poll skipped inside scan-ignore window");
            return Ok(PollOutcome::Skipped);
        }

        self.log_request("GET", "/gateway-devices");
        let payload = self.client.get("/gateway-devices").await?;
        self.log_poll(&payload);

        let mut changed_ids = Vec::new();
        {
            let mut devices = self.devices.lock();
            for doc in payload.as_array().into_iter().flatten() {
                let id = match doc.get("id").and_then(Value::as_str) {
                    Some(id) => id,
                    None => {
                        warn!("poll response contained a device without an id");
                        continue;
                    }
                };
                match devices.iter_mut().find(|d| d.id == id) {
                    Some(device) => {
                        let before = device.document.clone();
                        merge_tree(&mut device.document, doc);
                        if !changed_paths(&before, &device.document).is_empty() {
                            changed_ids.push(device.id.clone());
                        }
                    }
                    None => {
                        debug!(id, "discovered device");
                        devices.push(Device::new(id, doc.clone()));
                        changed_ids.push(id.to_string());
                    }
                }
            }
        }
        *self.last_payload.lock() = Some(payload);

        for id in &changed_ids {
            self.notify(id);
        }
        if changed_ids.is_empty() {
            trace!("poll: no changes");
            Ok(PollOutcome::Unchanged)
        } else {
            debug!(devices = changed_ids.len(), "poll applied changes");
            Ok(PollOutcome::Updated)
        }
    }

    /// Manual poll, e.g. from a refresh button. Subject to the same
    /// scan-ignore suppression as scheduled polls.
    pub async fn refresh(&self) -> Result<PollOutcome> {
        self.poll_once().await
    }

    /// Endless poll loop. Failures are logged and retried on the next
    /// interval; a skipped poll reschedules after the scan-ignore window.
    pub async fn run(&self) {
        loop {
            let outcome = self.poll_once().await;
            if let Err(ref e) = outcome {
                warn!(error = %e, "poll failed");
            }
            let config = self.config.lock().clone();
            let interval = match outcome {
                Ok(PollOutcome::Skipped) => config.scan_ignore,
                _ => schedule::next_interval_now(
                    Local::now().time(),
                    &config,
                    self.client.rate_limits(),
                ),
            };
            debug!(seconds = interval.as_secs(), "next poll");
            tokio::time::sleep(interval).await;
        }
    }

    pub async fn set_hvac_mode(&self, device_id: &str, mode: HvacMode) -> Result<()> {
        let writes = self.plan(device_id, |device| {
            let point = point_of(device, climate::MANAGEMENT_POINT_TYPE)?;
            climate::set_hvac_mode(&point, mode)
        })?;
        self.execute(device_id, "set_hvac_mode", writes).await
    }

    pub async fn set_target_temperature(&self, device_id: &str, value: f64) -> Result<()> {
        let writes = self.plan(device_id, |device| {
            let point = point_of(device, climate::MANAGEMENT_POINT_TYPE)?;
            climate::set_target_temperature(&point, value)
        })?;
        self.execute(device_id, "set_target_temperature", writes)
            .await
    }

    pub async fn set_fan_mode(&self, device_id: &str, mode: &str) -> Result<()> {
        let writes = self.plan(device_id, |device| {
            let point = point_of(device, climate::MANAGEMENT_POINT_TYPE)?;
            climate::set_fan_mode(&point, mode)
        })?;
        self.execute(device_id, "set_fan_mode", writes).await
    }

    pub async fn set_swing(&self, device_id: &str, axis: SwingAxis, mode: &str) -> Result<()> {
        let writes = self.plan(device_id, |device| {
            let point = point_of(device, climate::MANAGEMENT_POINT_TYPE)?;
            climate::set_swing(&point, axis, mode)
        })?;
        self.execute(device_id, "set_swing", writes).await
    }

    /// Boost and eco patch their scalar characteristic; away maps to the
    /// holiday-mode resource.
    pub async fn set_preset(&self, device_id: &str, preset: Preset, enable: bool) -> Result<()> {
        if preset == Preset::Away {
            return self.set_holiday_mode(device_id, enable, None, None).await;
        }
        let writes = self.plan(device_id, |device| {
            let point = point_of(device, climate::MANAGEMENT_POINT_TYPE)?;
            climate::set_preset(&point, preset, enable)
        })?;
        self.execute(device_id, "set_preset", writes).await
    }

    pub async fn set_switch(
        &self,
        device_id: &str,
        embedded_id: &str,
        name: &str,
        on: bool,
    ) -> Result<()> {
        let writes = self.plan(device_id, |device| {
            let point = point_by_id(device, embedded_id)?;
            switch::set(&point, name, on)
        })?;
        self.execute(device_id, "set_switch", writes).await
    }

    pub async fn set_tank_operation(&self, device_id: &str, operation: TankOperation) -> Result<()> {
        let writes = self.plan(device_id, |device| {
            let point = point_of(device, water_heater::MANAGEMENT_POINT_TYPE)?;
            water_heater::set_operation(&point, operation)
        })?;
        self.execute(device_id, "set_tank_operation", writes).await
    }

    pub async fn set_tank_temperature(&self, device_id: &str, value: f64) -> Result<()> {
        let writes = self.plan(device_id, |device| {
            let point = point_of(device, water_heater::MANAGEMENT_POINT_TYPE)?;
            water_heater::set_target_temperature(&point, value)
        })?;
        self.execute(device_id, "set_tank_temperature", writes).await
    }

    /// Enables or disables holiday mode via its own resource endpoint.
    /// Dates are optional; the cloud treats an omitted start as "now".
    pub async fn set_holiday_mode(
        &self,
        device_id: &str,
        enabled: bool,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<()> {
        let (embedded_id, body) = {
            let devices = self.devices.lock();
            let device = find(&devices, device_id)?;
            let point = point_of(device, climate::MANAGEMENT_POINT_TYPE)?;
            let holiday = point
                .characteristic("holidayMode")
                .ok_or_else(|| Error::MissingCapability("holidayMode".to_string()))?;
            if !holiday.settable() {
                return Err(Error::NotSettable("holidayMode".to_string()));
            }
            let mut body = json!({"enabled": enabled});
            if let Some(start) = start_date {
                body["startDate"] = json!(start.to_string());
            }
            if let Some(end) = end_date {
                body["endDate"] = json!(end.to_string());
            }
            (point.embedded_id().to_string(), body)
        };

        let path = format!("/gateway-devices/{device_id}/management-points/{embedded_id}/holiday-mode");
        self.log_command("set_holiday_mode", device_id, &body);
        if let Err(e) = self.client.post(&path, &body).await {
            warn!(device_id, error = %e, "holiday mode change failed, cached state unchanged");
            return Err(e);
        }

        {
            let mut devices = self.devices.lock();
            if let Some(device) = devices.iter_mut().find(|d| d.id == device_id) {
                entity::apply_pointer_update(
                    &mut device.document,
                    &embedded_id,
                    "/holidayMode/value/enabled",
                    Value::Bool(enabled),
                );
            }
        }
        self.notify(device_id);
        Ok(())
    }

    /// Selects a schedule (or the off sentinel) on one management point
    /// via the schedule resource endpoint.
    pub async fn select_schedule(
        &self,
        device_id: &str,
        embedded_id: &str,
        option: &str,
    ) -> Result<()> {
        let command = {
            let devices = self.devices.lock();
            let device = find(&devices, device_id)?;
            let point = point_by_id(device, embedded_id)?;
            select::select(&point, option)?
        };

        let path = command.request_path(device_id);
        let body = command.body();
        self.log_command("select_schedule", device_id, &body);
        if let Err(e) = self.client.put(&path, &body).await {
            warn!(device_id, option, error = %e, "schedule selection failed, cached state unchanged");
            return Err(e);
        }

        {
            let mut devices = self.devices.lock();
            if let Some(device) = devices.iter_mut().find(|d| d.id == device_id) {
                for (pointer, value) in command.document_updates() {
                    entity::apply_pointer_update(
                        &mut device.document,
                        &command.embedded_id,
                        &pointer,
                        value,
                    );
                }
            }
        }
        self.notify(device_id);
        Ok(())
    }

    /// Snapshot of the cached devices.
    pub fn devices(&self) -> Vec<Device> {
        self.devices.lock().clone()
    }

    pub fn device(&self, id: &str) -> Option<Device> {
        self.devices.lock().iter().find(|d| d.id == id).cloned()
    }

    /// Raw body of the most recent poll, for diagnostics dumps.
    pub fn last_payload(&self) -> Option<Value> {
        self.last_payload.lock().clone()
    }

    pub fn rate_limits(&self) -> RateLimitSnapshot {
        self.client.rate_limits()
    }

    pub fn schedule_config(&self) -> ScheduleConfig {
        self.config.lock().clone()
    }

    /// Replaces the cadence settings; picked up at the next scheduling
    /// decision.
    pub fn set_schedule_config(&self, config: ScheduleConfig) {
        *self.config.lock() = config;
    }

    fn plan<F>(&self, device_id: &str, build: F) -> Result<Vec<CharacteristicWrite>>
    where
        F: FnOnce(&Device) -> Result<Vec<CharacteristicWrite>>,
    {
        let devices = self.devices.lock();
        let device = find(&devices, device_id)?;
        build(device)
    }

    /// Runs a plan step by step. Each accepted write is echoed into the
    /// cached document before the next one goes out; a failed write stops
    /// the plan and leaves the remaining state as it was.
    async fn execute(
        &self,
        device_id: &str,
        action: &str,
        writes: Vec<CharacteristicWrite>,
    ) -> Result<()> {
        if writes.is_empty() {
            trace!(device_id, action, "already at requested state");
            return Ok(());
        }
        for write in writes {
            let path = write.request_path(device_id);
            let body = write.body();
            self.log_command(action, device_id, &body);
            if let Err(e) = self.client.patch(&path, &body).await {
                warn!(device_id, action, path = %path, error = %e, "command failed, cached state unchanged");
                return Err(e);
            }
            {
                let mut devices = self.devices.lock();
                if let Some(device) = devices.iter_mut().find(|d| d.id == device_id)
                    && !entity::apply_write(&mut device.document, &write)
                {
                    debug!(device_id, pointer = %write.document_pointer(), "accepted write had no local slot");
                }
            }
            self.notify(device_id);
        }
        Ok(())
    }

    fn notify(&self, device_id: &str) {
        for callback in &self.change_callbacks {
            callback(device_id);
        }
    }

    fn log_request(&self, method: &str, path: &str) {
        if let Some(logger) = self.logger.lock().as_mut() {
            logger.log_request(method, path, None);
        }
    }

    fn log_command(&self, action: &str, device_id: &str, body: &Value) {
        if let Some(logger) = self.logger.lock().as_mut() {
            logger.log_command(action, device_id, body);
        }
    }

    fn log_poll(&self, body: &Value) {
        if let Some(logger) = self.logger.lock().as_mut() {
            logger.log_poll(200, body);
        }
    }
}

fn find<'a>(devices: &'a [Device], id: &str) -> Result<&'a Device> {
    devices
        .iter()
        .find(|d| d.id == id)
        .ok_or_else(|| Error::UnknownDevice(id.to_string()))
}

fn point_of<'a>(device: &'a Device, kind: &str) -> Result<ManagementPoint<'a>> {
    device
        .management_point(kind)
        .ok_or_else(|| Error::MissingCapability(kind.to_string()))
}

fn point_by_id<'a>(device: &'a Device, embedded_id: &str) -> Result<ManagementPoint<'a>> {
    device
        .management_point_by_id(embedded_id)
        .ok_or_else(|| Error::MissingCapability(embedded_id.to_string()))
}
