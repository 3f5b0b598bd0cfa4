// ============================================================
// Layer 5 — Device Check
// ============================================================
// `use_gpu: true` in the config selects Burn's WGPU backend,
// otherwise training runs on the NdArray CPU backend.
//
// WGPU support is a cargo feature (`gpu`, on by default). A
// config that asks for a GPU in a build without it is a hard
// error up front, not a silent CPU run.

use anyhow::{bail, Result};

/// Which Burn backend a run will use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Cpu,
    Gpu,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu (ndarray)"),
            Self::Gpu => write!(f, "gpu (wgpu)"),
        }
    }
}

/// True when this binary was built with the WGPU backend
pub fn gpu_compiled() -> bool {
    cfg!(feature = "gpu")
}

/// Resolve the `use_gpu` flag against what this build supports.
pub fn check_device(use_gpu: bool) -> Result<DeviceKind> {
    if !use_gpu {
        return Ok(DeviceKind::Cpu);
    }
    if !gpu_compiled() {
        bail!(
            "use_gpu is set to true, but this binary was built without the `gpu` feature. \
             Set use_gpu: false or rebuild with --features gpu"
        );
    }
    Ok(DeviceKind::Gpu)
}
