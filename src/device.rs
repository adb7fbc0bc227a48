use serde::Serialize;
use std::fmt;

/// Where model weights are placed. Serialized with the short names clients
/// already expect (`cuda`, `mps`, `cpu`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Discrete GPU (CUDA build of llama.cpp).
    Cuda,
    /// Apple silicon through Metal.
    Mps,
    Cpu,
}

/// Runtime capability flags probed from the inference backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub cuda: bool,
    pub metal: bool,
}

impl Device {
    /// Picks the best device for the given capabilities: CUDA, then Metal, then CPU.
    pub fn select(caps: Capabilities) -> Self {
        if caps.cuda {
            Device::Cuda
        } else if caps.metal {
            Device::Mps
        } else {
            Device::Cpu
        }
    }

    pub fn is_accelerator(self) -> bool {
        !matches!(self, Device::Cpu)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Device::Cuda => "cuda",
            Device::Mps => "mps",
            Device::Cpu => "cpu",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuda_wins_over_metal() {
        let caps = Capabilities { cuda: true, metal: true };
        assert_eq!(Device::select(caps), Device::Cuda);
    }

    #[test]
    fn metal_then_cpu() {
        assert_eq!(Device::select(Capabilities { cuda: false, metal: true }), Device::Mps);
        assert_eq!(Device::select(Capabilities::default()), Device::Cpu);
    }

    #[test]
    fn serializes_short_names() {
        assert_eq!(serde_json::to_value(Device::Mps).unwrap(), "mps");
        assert_eq!(Device::Cuda.to_string(), "cuda");
        assert!(!Device::Cpu.is_accelerator());
    }
}
