pub mod clock;
pub mod frame;

pub use frame::decode as decode_frame;
