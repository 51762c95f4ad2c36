use candle_core::Device;
use tracing::{debug, warn};

use super::error::EmbeddingError;

/// Picks the best compute device available for local inference, trying accelerators in
/// order and falling back to CPU if none of them are usable. Never fails outright: CPU is
/// always a valid fallback, which is why the return type carries `EmbeddingError` only for
/// API symmetry with the rest of the provider setup path.
pub fn select_device() -> Result<Device, EmbeddingError> {
    let mut attempts: Vec<String> = Vec::new();

    if let Some(device) = try_metal(&mut attempts) {
        return Ok(device);
    }
    if let Some(device) = try_cuda(&mut attempts) {
        return Ok(device);
    }

    if attempts.is_empty() {
        debug!("no GPU backend compiled in, using CPU");
    } else {
        warn!(attempts = %attempts.join("; "), "no GPU device usable, falling back to CPU");
    }

    Ok(Device::Cpu)
}

#[cfg(feature = "metal")]
fn try_metal(attempts: &mut Vec<String>) -> Option<Device> {
    match Device::new_metal(0) {
        Ok(device) => {
            tracing::info!("using Metal for local embedding inference");
            Some(device)
        }
        Err(e) => {
            attempts.push(format!("metal: {e}"));
            None
        }
    }
}

#[cfg(not(feature = "metal"))]
fn try_metal(_attempts: &mut [String]) -> Option<Device> {
    None
}

#[cfg(feature = "cuda")]
fn try_cuda(attempts: &mut Vec<String>) -> Option<Device> {
    match Device::new_cuda(0) {
        Ok(device) => {
            tracing::info!("using CUDA for local embedding inference");
            Some(device)
        }
        Err(e) => {
            attempts.push(format!("cuda: {e}"));
            None
        }
    }
}

#[cfg(not(feature = "cuda"))]
fn try_cuda(_attempts: &mut [String]) -> Option<Device> {
    None
}
