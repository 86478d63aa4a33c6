pub mod gatt;
pub mod scanner;

pub use gatt::{connect, DeviceLink};
