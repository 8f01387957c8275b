use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComputeDevice {
    Accelerator,
    Host,
}

/// Numeric precision models are loaded with.
///
/// `Reduced` is half precision, only worthwhile on an accelerator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Precision {
    Reduced,
    Standard,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceSelection {
    pub device: ComputeDevice,
    pub precision: Precision,
}

impl DeviceSelection {
    pub const HOST: DeviceSelection = DeviceSelection {
        device: ComputeDevice::Host,
        precision: Precision::Standard,
    };

    pub const ACCELERATOR: DeviceSelection = DeviceSelection {
        device: ComputeDevice::Accelerator,
        precision: Precision::Reduced,
    };

    pub fn is_accelerator(&self) -> bool {
        self.device == ComputeDevice::Accelerator
    }
}

impl fmt::Display for DeviceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let device = match self.device {
            ComputeDevice::Accelerator => "accelerator",
            ComputeDevice::Host => "host",
        };
        let precision = match self.precision {
            Precision::Reduced => "float16",
            Precision::Standard => "float32",
        };
        write!(f, "{device} ({precision})")
    }
}

/// Free and total accelerator memory in GiB.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AcceleratorMemory {
    pub free_gib: f64,
    pub total_gib: f64,
}

impl AcceleratorMemory {
    pub fn from_bytes(free: u64, total: u64) -> Self {
        const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
        Self {
            free_gib: free as f64 / GIB,
            total_gib: total as f64 / GIB,
        }
    }
}

/// Pick the device and precision for a run.
///
/// The accelerator is chosen only when one is present and its free memory
/// meets `min_free_gib`; everything else runs on the host at standard
/// precision.
pub fn select_device(memory: Option<AcceleratorMemory>, min_free_gib: f64) -> DeviceSelection {
    match memory {
        Some(m) if m.free_gib >= min_free_gib => DeviceSelection::ACCELERATOR,
        _ => DeviceSelection::HOST,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn memory(free_gib: f64) -> Option<AcceleratorMemory> {
        Some(AcceleratorMemory {
            free_gib,
            total_gib: 8.0,
        })
    }

    #[test]
    fn test_enough_free_memory_selects_accelerator() {
        let selection = select_device(memory(6.0), 5.0);
        assert_eq!(selection.device, ComputeDevice::Accelerator);
        assert_eq!(selection.precision, Precision::Reduced);
    }

    #[test]
    fn test_low_free_memory_falls_back_to_host() {
        let selection = select_device(memory(3.0), 5.0);
        assert_eq!(selection.device, ComputeDevice::Host);
        assert_eq!(selection.precision, Precision::Standard);
    }

    #[rstest]
    #[case::exactly_threshold(5.0, ComputeDevice::Accelerator)]
    #[case::just_below(4.999, ComputeDevice::Host)]
    #[case::zero(0.0, ComputeDevice::Host)]
    fn test_threshold_boundary(#[case] free: f64, #[case] expected: ComputeDevice) {
        assert_eq!(select_device(memory(free), 5.0).device, expected);
    }

    #[test]
    fn test_no_accelerator_selects_host() {
        assert_eq!(select_device(None, 5.0), DeviceSelection::HOST);
    }

    #[test]
    fn test_from_bytes() {
        let m = AcceleratorMemory::from_bytes(6 * 1024 * 1024 * 1024, 8 * 1024 * 1024 * 1024);
        approx::assert_relative_eq!(m.free_gib, 6.0);
        approx::assert_relative_eq!(m.total_gib, 8.0);
    }

    #[test]
    fn test_display() {
        assert_eq!(DeviceSelection::ACCELERATOR.to_string(), "accelerator (float16)");
        assert_eq!(DeviceSelection::HOST.to_string(), "host (float32)");
    }
}
