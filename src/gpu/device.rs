use candle_core::utils::{cuda_is_available, metal_is_available};
use candle_core::Device;
use tracing::info;

use crate::error::{Result, StorytellerError};

/// Pick the compute device once at startup: CUDA, then Metal, then CPU.
pub fn select_device(force_cpu: bool) -> Result<Device> {
    let device = if force_cpu {
        Device::Cpu
    } else if cuda_is_available() {
        Device::new_cuda(0).map_err(device_error)?
    } else if metal_is_available() {
        Device::new_metal(0).map_err(device_error)?
    } else {
        Device::Cpu
    };

    info!(device = device_label(&device), "Compute device selected");
    Ok(device)
}

/// Short upper-case name of the device, for the console banner.
pub fn device_label(device: &Device) -> &'static str {
    if device.is_cuda() {
        "CUDA"
    } else if device.is_metal() {
        "METAL"
    } else {
        "CPU"
    }
}

fn device_error(e: candle_core::Error) -> StorytellerError {
    StorytellerError::InitializationError {
        message: format!("Failed to initialize compute device: {}", e),
        source: Some(Box::new(e)),
    }
}
