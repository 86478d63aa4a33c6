/// Bluetooth Low Energy discovery of the breath sensor by advertised name
use futures_util::StreamExt;
use log::{debug, error, info, warn};
use tokio::time::{timeout, Duration};

const SCAN_TIMEOUT_SECS: u64 = 30; // Give up if the device does not show up

/// Discover LE devices until one advertises `device_name`
///
/// # Arguments
/// * `adapter` - Powered adapter to scan with
/// * `device_name` - Advertised name to match exactly
///
/// # Returns
/// The matching device, or an error if the scan fails or times out
pub async fn find_device(
    adapter: &bluer::Adapter,
    device_name: &str,
) -> Result<bluer::Device, Box<dyn std::error::Error>> {
    // Configure discovery filter for Low Energy devices only
    let filter = bluer::DiscoveryFilter {
        transport: bluer::DiscoveryTransport::Le,
        duplicate_data: false,
        ..Default::default()
    };

    // Apply the discovery filter (warn if it fails, but continue)
    if let Err(e) = adapter.set_discovery_filter(filter).await {
        warn!("Failed to set discovery filter: {}", e);
    }

    let events = match adapter.discover_devices().await {
        Ok(events) => events,
        Err(e) => {
            error!("Failed to start device discovery: {}", e);
            return Err(e.into());
        }
    };
    let mut events = Box::pin(events);

    info!("Scanning for '{}'...", device_name);

    let search = async {
        while let Some(event) = events.next().await {
            let addr = match event {
                bluer::AdapterEvent::DeviceAdded(addr) => addr,
                other => {
                    debug!("Discovery event: {:?}", other);
                    continue;
                }
            };

            let device = match adapter.device(addr) {
                Ok(device) => device,
                Err(_) => continue,
            };

            match device.name().await {
                Ok(Some(name)) if name == device_name => {
                    info!("Found {} ({})", name, addr);
                    return Some(device);
                }
                Ok(name) => debug!("Skipping {} ({:?})", addr, name),
                Err(e) => debug!("Failed to read name of {}: {}", addr, e),
            }
        }
        None
    };

    match timeout(Duration::from_secs(SCAN_TIMEOUT_SECS), search).await {
        Ok(Some(device)) => Ok(device),
        Ok(None) => Err("Discovery stream ended before the device was found".into()),
        Err(_) => Err(format!(
            "Device '{}' not found within {} seconds",
            device_name, SCAN_TIMEOUT_SECS
        )
        .into()),
    }
}
