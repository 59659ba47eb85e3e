//! Accelerator telemetry through NVML.

use crate::context::TelemetryError;

use super::AcceleratorSample;

#[cfg(feature = "nvidia")]
use nvml_wrapper::{Nvml, enum_wrappers::device::TemperatureSensor};

/// Handle to the first NVML device
pub struct AcceleratorSource {
    #[cfg(feature = "nvidia")]
    nvml: Nvml,
    name: String,
}

impl AcceleratorSource {
    const DEVICE_INDEX: u32 = 0;

    #[cfg(feature = "nvidia")]
    pub fn init() -> Result<Self, TelemetryError> {
        let nvml = Nvml::init()?;
        let device = nvml.device_by_index(Self::DEVICE_INDEX)?;
        let name = device
            .name()
            .unwrap_or_else(|_| format!("GPU {}", Self::DEVICE_INDEX));
        Ok(Self { nvml, name })
    }

    #[cfg(not(feature = "nvidia"))]
    pub fn init() -> Result<Self, TelemetryError> {
        Err(TelemetryError::NotCompiled)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read all accelerator fields. Any failing field fails the whole read.
    #[cfg(feature = "nvidia")]
    pub fn read(&self) -> Result<AcceleratorSample, TelemetryError> {
        let device = self.nvml.device_by_index(Self::DEVICE_INDEX)?;
        let utilization = device.utilization_rates()?;
        let temp = device.temperature(TemperatureSensor::Gpu)?;
        let memory = device.memory_info()?;

        Ok(AcceleratorSample {
            usage_percent: utilization.gpu as f64,
            temp_celsius: temp as f64,
            used_bytes: memory.used,
            total_bytes: memory.total,
        })
    }

    #[cfg(not(feature = "nvidia"))]
    pub fn read(&self) -> Result<AcceleratorSample, TelemetryError> {
        Err(TelemetryError::NotCompiled)
    }
}
