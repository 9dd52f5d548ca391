//! Query data-point status of a device

use tuyalan::{Device, DeviceCredential, ProtocolVersion};

#[tokio::main]
async fn main() -> tuyalan::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // Change to your device
    let ip = std::env::var("DEVICE_IP").unwrap_or_else(|_| "192.168.0.100".to_string());
    let id = std::env::var("DEVICE_ID").unwrap_or_else(|_| "13684365e0980607986f".to_string());
    let key = std::env::var("DEVICE_KEY").unwrap_or_else(|_| "f33444a6362a9664".to_string());
    let version: ProtocolVersion = std::env::var("DEVICE_VERSION")
        .unwrap_or_else(|_| "3.3".to_string())
        .parse()?;

    let credential = DeviceCredential::new(ip, id.clone(), key, version)?;
    println!("Querying {}...", credential);

    let mut device = Device::new(credential)?;
    device.connect().await?;
    println!("✓ Connected!");

    let payload = format!(r#"{{"gwId":"{id}","devId":"{id}"}}"#);
    let status = device.query_status(payload).await?;
    println!("✓ Status: {}", status.payload_str());

    device.disconnect().await?;
    println!("✓ Disconnected");

    Ok(())
}
