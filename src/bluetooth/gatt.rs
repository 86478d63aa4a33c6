/// GATT session with the breath sensor: clock sync and stream subscriptions
use futures_util::StreamExt;
use log::{error, info, warn};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::bluetooth::scanner::find_device;
use crate::codec::clock;
use crate::models::{Channel, Notification};

// Current Time characteristic (Bluetooth SIG 0x2A2B)
const CURRENT_TIME_CHAR_UUID: bluer::Uuid =
    bluer::Uuid::from_u128(0x0000_2a2b_0000_1000_8000_0080_5f9b_34fb);

const TEMPERATURE_STREAM_CHAR_UUID: bluer::Uuid =
    bluer::Uuid::from_u128(0x07e5_d6f7_6f18_4dce_bb5b_732c_ab4e_8474);
const HUMIDITY_STREAM_CHAR_UUID: bluer::Uuid =
    bluer::Uuid::from_u128(0x97dc_e133_0916_4d5c_a1e3_217b_10b3_7d58);
const PRESSURE_STREAM_CHAR_UUID: bluer::Uuid =
    bluer::Uuid::from_u128(0x55fc_d9b7_63b3_4820_a26c_73a8_a7bb_8d6f);
const MICROPHONE_STREAM_CHAR_UUID: bluer::Uuid =
    bluer::Uuid::from_u128(0xb0ce_3c07_aa05_4c8c_8e89_6f62_ecd7_dac2);

/// Notify characteristic carrying `channel`'s sample stream
pub fn stream_uuid(channel: Channel) -> bluer::Uuid {
    match channel {
        Channel::Temperature => TEMPERATURE_STREAM_CHAR_UUID,
        Channel::Humidity => HUMIDITY_STREAM_CHAR_UUID,
        Channel::Pressure => PRESSURE_STREAM_CHAR_UUID,
        Channel::Microphone => MICROPHONE_STREAM_CHAR_UUID,
    }
}

/// Connected device plus the tasks forwarding its notifications.
pub struct DeviceLink {
    _session: bluer::Session,
    device: bluer::Device,
    forwarders: Vec<JoinHandle<()>>,
}

impl DeviceLink {
    /// Stop forwarding notifications and drop the connection.
    pub async fn close(self) {
        for task in &self.forwarders {
            task.abort();
        }
        if let Err(e) = self.device.disconnect().await {
            warn!("Failed to disconnect: {}", e);
        }
    }
}

/// Connect to `device_name`, synchronise its clock and forward every stream
/// notification into `tx`
///
/// Channels whose characteristic is missing stay silent.
pub async fn connect(
    device_name: &str,
    tx: mpsc::Sender<Notification>,
) -> Result<DeviceLink, Box<dyn std::error::Error>> {
    // Initialize Bluetooth session
    let session = match bluer::Session::new().await {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to create Bluetooth session: {}", e);
            return Err(e.into());
        }
    };

    // Get the default Bluetooth adapter
    let adapter = match session.default_adapter().await {
        Ok(adapter) => adapter,
        Err(e) => {
            error!("Failed to get default Bluetooth adapter: {}", e);
            return Err(e.into());
        }
    };

    // Ensure Bluetooth adapter is powered on
    if let Err(e) = adapter.set_powered(true).await {
        error!("Failed to power on adapter: {}", e);
        return Err(e.into());
    }

    let device = find_device(&adapter, device_name).await?;
    if !device.is_connected().await? {
        device.connect().await?;
    }
    info!("Connected to {}", device.address());

    let mut characteristics = HashMap::new();
    for service in device.services().await? {
        for characteristic in service.characteristics().await? {
            characteristics.insert(characteristic.uuid().await?, characteristic);
        }
    }

    match characteristics.get(&CURRENT_TIME_CHAR_UUID) {
        Some(characteristic) => {
            if let Err(e) = sync_clock(characteristic).await {
                warn!("Clock sync failed: {}", e);
            }
        }
        None => warn!("Device has no Current Time characteristic, clock not synced"),
    }

    let mut forwarders = Vec::new();
    for channel in Channel::ALL {
        let Some(characteristic) = characteristics.get(&stream_uuid(channel)) else {
            warn!("No {} stream characteristic, channel stays silent", channel);
            continue;
        };

        let stream = characteristic.notify().await?;
        let tx = tx.clone();
        forwarders.push(tokio::spawn(async move {
            let mut stream = Box::pin(stream);
            while let Some(bytes) = stream.next().await {
                if tx.send(Notification { channel, bytes }).await.is_err() {
                    break;
                }
            }
            warn!("{} notifications stopped", channel);
        }));
        info!("Subscribed to {} stream", channel);
    }

    Ok(DeviceLink {
        _session: session,
        device,
        forwarders,
    })
}

/// Write the current time to the device and log what it reads back.
async fn sync_clock(
    characteristic: &bluer::gatt::remote::Characteristic,
) -> Result<(), Box<dyn std::error::Error>> {
    characteristic.write(&clock::encode_now()).await?;

    let readback = characteristic.read().await?;
    let record = clock::decode(&readback)?;
    info!("Device clock: {}", record);
    Ok(())
}
