//! Compute device selection

mod device;

pub use device::{device_label, select_device};
