//! Simulated substation IED with one SCADA client.
//!
//! Builds a `Protection/MMXU1` measurement node, subscribes to its report
//! control block and lets two simulated sensors push phase voltages.
//!
//! Run with `RUST_LOG=debug cargo run --example substation` to see the
//! engine's tracing output.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use voltage_iec61850::{
    DeviceDescription, MmsClient, ModelDescription, NodeDescription, ObjectDescription, Quality,
    ReportControlConfig, Server, ServerConfig,
};

const PHS_A: &str = "Protection/MMXU1.PhV.phsA.cVal.mag.f";
const PHS_B: &str = "Protection/MMXU1.PhV.phsB.cVal.mag.f";
const RPT_ID: &str = "MySubstation_IED_001/Protection/MMXU1$RP$urcb01";

fn build_server() -> voltage_iec61850::Result<Arc<Server>> {
    let model = ModelDescription::new("MySubstation_IED_001").device(
        DeviceDescription::new("Protection").node(
            NodeDescription::new("MMXU1")
                .object(
                    ObjectDescription::new("PhV")
                        .attribute("phsA.cVal.mag.f", 220.0)
                        .attribute("phsB.cVal.mag.f", 219.5),
                )
                .object(ObjectDescription::new("Health").attribute("stVal", 1)),
        ),
    );

    let server = Server::build(&model, ServerConfig::new().report_queue_capacity(16))?;
    server.create_dataset("Protection/MMXU1", "dsMeas", [PHS_A, PHS_B])?;
    server.create_report_control(
        "Protection/MMXU1",
        ReportControlConfig::new("urcb01", "dsMeas").rpt_id(RPT_ID),
    )?;
    Ok(server)
}

/// Simulated voltage sensor writing a slowly drifting value.
async fn sensor(server: Arc<Server>, path: &'static str, base: f64, samples: u32) {
    let mut interval = tokio::time::interval(Duration::from_millis(200));
    for step in 0..samples {
        interval.tick().await;
        let drift = ((step as f64) * 0.7).sin() * 3.0;
        let value = ((base + drift) * 10.0).round() / 10.0;
        if let Err(e) = server.write(path, value) {
            tracing::error!(path, error = %e, "sensor write failed");
        }
    }
    // Mark the measurement stale once the sensor stops.
    server.write_quality(path, Quality::Good.set_old_data(true)).ok();
}

#[tokio::main]
async fn main() -> voltage_iec61850::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let server = build_server()?;

    let mut client = MmsClient::new();
    client.connect(server.clone())?;

    println!("Model directory:");
    for snapshot in client.discover()? {
        println!("  {} = {} ({})", snapshot.reference, snapshot.value, snapshot.quality);
    }
    println!("Read {} = {}", PHS_A, client.read(PHS_A)?);

    let mut inbox = client.subscribe(RPT_ID)?;

    let sensors = [
        tokio::spawn(sensor(server.clone(), PHS_A, 225.0, 10)),
        tokio::spawn(sensor(server.clone(), PHS_B, 219.5, 10)),
    ];

    while let Some(report) = inbox.recv_timeout(Duration::from_secs(1)).await {
        println!("{}", report);
    }
    for handle in sensors {
        handle.await.ok();
    }

    if inbox.missed() > 0 {
        println!("{} reports lost to queue overflow", inbox.missed());
    }

    client.unsubscribe(RPT_ID)?;
    client.disconnect()?;
    Ok(())
}
