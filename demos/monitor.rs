use daikin_onecta::entity::{climate, sensor, water_heater};
use daikin_onecta::{Device, DeviceCoordinator, StaticTokenProvider};
use std::env;
use std::sync::Arc;
use tokio::sync::mpsc;

fn print_device(device: &Device) {
    if let Some(state) = climate::project(device) {
        println!(
            "[{}] {} \u{2192} {} | mode: {} | fan: {}",
            device.name(),
            state
                .current_temperature
                .map_or("?".to_string(), |t| format!("{t:.1}\u{00b0}C")),
            state
                .target_temperature
                .map_or("?".to_string(), |t| format!("{t:.1}\u{00b0}C")),
            state
                .hvac_mode
                .and_then(|m| m.as_operation_mode())
                .unwrap_or("off"),
            state.fan_mode.as_deref().unwrap_or("-"),
        );
    }
    if let Some(tank) = water_heater::project(device) {
        println!(
            "[{} tank] {} \u{2192} {} | {}",
            device.name(),
            tank.current_temperature
                .map_or("?".to_string(), |t| format!("{t:.1}\u{00b0}C")),
            tank.target_temperature
                .map_or("?".to_string(), |t| format!("{t:.1}\u{00b0}C")),
            tank.operation.as_str(),
        );
    }
    for reading in sensor::project(device) {
        println!(
            "  {} = {}{}",
            reading.name,
            reading.value,
            reading.unit.map_or(String::new(), |u| format!(" {u}")),
        );
    }
}

#[tokio::main]
async fn main() -> daikin_onecta::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let token = args
        .get(1)
        .cloned()
        .or_else(|| env::var("DAIKIN_TOKEN").ok())
        .expect("usage: monitor <access-token> [base-url]");

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let mut builder = DeviceCoordinator::builder(Arc::new(StaticTokenProvider::new(token)))
        .on_change(move |id| {
            let _ = tx.send(id.to_string());
        });
    if let Some(url) = args.get(2) {
        builder = builder.base_url(url);
    }
    let coordinator = Arc::new(builder.build());

    let printer = coordinator.clone();
    tokio::spawn(async move {
        while let Some(id) = rx.recv().await {
            if let Some(device) = printer.device(&id) {
                print_device(&device);
            }
        }
    });

    println!("Polling the Daikin cloud...");
    coordinator.refresh().await?;
    println!(
        "Found {} device(s). Watching for changes...",
        coordinator.devices().len()
    );

    coordinator.run().await;
    Ok(())
}
