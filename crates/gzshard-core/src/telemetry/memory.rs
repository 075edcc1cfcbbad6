#[cfg(target_os = "linux")]
use std::fs;

/// System-wide physical memory figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryInfo {
    pub total_bytes: Option<u64>,
    /// Memory the kernel reports as available for new allocations.
    pub available_bytes: Option<u64>,
}

/// Reads system memory from `/proc/meminfo`. Returns default (None) elsewhere.
pub fn system_memory() -> MemoryInfo {
    #[cfg(target_os = "linux")]
    {
        let contents = match fs::read_to_string("/proc/meminfo") {
            Ok(contents) => contents,
            Err(_) => return MemoryInfo::default(),
        };

        MemoryInfo {
            total_bytes: parse_kib_field(&contents, "MemTotal:"),
            available_bytes: parse_kib_field(&contents, "MemAvailable:"),
        }
    }

    #[cfg(not(target_os = "linux"))]
    {
        MemoryInfo::default()
    }
}

#[cfg(target_os = "linux")]
fn parse_kib_field(status: &str, field: &str) -> Option<u64> {
    let line = status.lines().find(|line| line.starts_with(field))?;
    let value_kib = line
        .split_whitespace()
        .nth(1)
        .and_then(|value| value.parse::<u64>().ok())?;

    value_kib.checked_mul(1024)
}
