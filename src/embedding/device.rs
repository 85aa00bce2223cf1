use candle_core::Device;
use tracing::{debug, warn};

/// Picks the first usable accelerator compiled in (Metal, then CUDA), else CPU.
///
/// Both the dense encoder and the cross-encoder call this once at load time.
pub fn select_device() -> Device {
    let mut failures: Vec<String> = Vec::new();

    #[cfg(feature = "metal")]
    match Device::new_metal(0) {
        Ok(device) => {
            tracing::info!("Using Metal GPU acceleration");
            return device;
        }
        Err(e) => {
            warn!(error = %e, "Metal device unavailable");
            failures.push(format!("metal failed: {e}"));
        }
    }

    #[cfg(feature = "cuda")]
    match Device::new_cuda(0) {
        Ok(device) => {
            tracing::info!("Using CUDA GPU acceleration");
            return device;
        }
        Err(e) => {
            warn!(error = %e, "CUDA device unavailable");
            failures.push(format!("cuda failed: {e}"));
        }
    }

    if !cfg!(any(feature = "metal", feature = "cuda")) {
        debug!("No GPU backend compiled, using CPU");
        return Device::Cpu;
    }

    if failures.is_empty() {
        failures.push("no GPU device available".to_string());
    }
    warn!(reason = %failures.join("; "), "Falling back to CPU device");
    Device::Cpu
}
