//! Keep a connection alive with periodic heart beats

use std::time::Duration;

use tuyalan::{Device, DeviceCredential, ProtocolVersion};

#[tokio::main]
async fn main() -> tuyalan::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    let ip = std::env::var("DEVICE_IP").unwrap_or_else(|_| "192.168.0.100".to_string());
    let id = std::env::var("DEVICE_ID").unwrap_or_else(|_| "13684365e0980607986f".to_string());
    let key = std::env::var("DEVICE_KEY").unwrap_or_else(|_| "f33444a6362a9664".to_string());
    let version: ProtocolVersion = std::env::var("DEVICE_VERSION")
        .unwrap_or_else(|_| "3.3".to_string())
        .parse()?;

    let credential = DeviceCredential::new(ip, id, key, version)?;
    let mut device = Device::new(credential)?.with_timeout(Duration::from_secs(3));

    device.connect().await?;
    println!("✓ Connected!");

    for _ in 0..3 {
        let pong = device.heart_beat().await?;
        println!("✓ {}", pong);

        tokio::time::sleep(Duration::from_secs(10)).await;
    }

    device.disconnect().await?;
    println!("✓ Disconnected");

    Ok(())
}
