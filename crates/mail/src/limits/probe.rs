use std::sync::atomic::{AtomicU64, Ordering};

/// Source of the current memory footprint in bytes
pub trait MemoryProbe: Send + Sync {
    fn resident_bytes(&self) -> u64;
}

/// Reads the resident set size of the current process.
///
/// Only Linux exposes this through `/proc`; elsewhere the probe reports 0 and
/// the memory ceiling never trips.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessMemoryProbe;

impl MemoryProbe for ProcessMemoryProbe {
    #[cfg(target_os = "linux")]
    fn resident_bytes(&self) -> u64 {
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|status| parse_vm_rss(&status))
            .unwrap_or(0)
    }

    #[cfg(not(target_os = "linux"))]
    fn resident_bytes(&self) -> u64 {
        0
    }
}

/// Extract `VmRSS` (reported in kB) from `/proc/<pid>/status` content
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_vm_rss(status: &str) -> Option<u64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: u64 = line
        .trim_start_matches("VmRSS:")
        .split_whitespace()
        .next()?
        .parse()
        .ok()?;
    kb.checked_mul(1024)
}

/// Probe reporting a caller-controlled value
#[derive(Debug, Default)]
pub struct FixedMemoryProbe {
    bytes: AtomicU64,
}

impl FixedMemoryProbe {
    pub fn new(bytes: u64) -> Self {
        Self {
            bytes: AtomicU64::new(bytes),
        }
    }

    pub fn from_mb(mb: u64) -> Self {
        Self::new(mb * 1024 * 1024)
    }

    pub fn set(&self, bytes: u64) {
        self.bytes.store(bytes, Ordering::SeqCst);
    }

    pub fn set_mb(&self, mb: u64) {
        self.set(mb * 1024 * 1024);
    }
}

impl MemoryProbe for FixedMemoryProbe {
    fn resident_bytes(&self) -> u64 {
        self.bytes.load(Ordering::SeqCst)
    }
}
