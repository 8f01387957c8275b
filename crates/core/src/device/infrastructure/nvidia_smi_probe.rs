use std::process::Command;

use crate::device::domain::device_selection::AcceleratorMemory;
use crate::device::domain::memory_probe::MemoryProbe;

const MIB: u64 = 1024 * 1024;

/// Queries free/total memory of the first NVIDIA GPU through `nvidia-smi`.
///
/// A missing binary or a failing query means "no accelerator".
pub struct NvidiaSmiProbe {
    binary: String,
}

impl NvidiaSmiProbe {
    pub fn new() -> Self {
        Self {
            binary: "nvidia-smi".to_string(),
        }
    }

    pub fn with_binary(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
        }
    }
}

impl Default for NvidiaSmiProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for NvidiaSmiProbe {
    fn query(&self) -> Result<Option<AcceleratorMemory>, Box<dyn std::error::Error>> {
        let output = match Command::new(&self.binary)
            .args([
                "--query-gpu=memory.free,memory.total",
                "--format=csv,noheader,nounits",
            ])
            .output()
        {
            Ok(o) => o,
            Err(e) => {
                log::debug!("{} unavailable: {e}", self.binary);
                return Ok(None);
            }
        };

        if !output.status.success() {
            log::debug!("{} exited with {}", self.binary, output.status);
            return Ok(None);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_memory_line(&stdout)
            .map(Some)
            .ok_or_else(|| format!("Unexpected {} output: {stdout:?}", self.binary).into())
    }
}

/// Parse `"<free MiB>, <total MiB>"` from the first output line.
fn parse_memory_line(output: &str) -> Option<AcceleratorMemory> {
    let line = output.lines().next()?;
    let mut fields = line.split(',').map(str::trim);
    let free: u64 = fields.next()?.parse().ok()?;
    let total: u64 = fields.next()?.parse().ok()?;
    Some(AcceleratorMemory::from_bytes(free * MIB, total * MIB))
}
