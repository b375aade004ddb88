//! Configuration types for the bootloader.

use serde::{Deserialize, Serialize};

/// Boot cycle parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootConfig {
    /// Initial guest memory size (64 KiB pages)
    pub memory_size_pages: u32,
    /// Reboot automatically after a verified generation
    pub auto_reboot: bool,
    /// Delay before rebooting a verified kernel (milliseconds)
    pub reboot_delay_ms: u64,
    /// Delay before rebooting after a repair (milliseconds)
    pub repair_delay_ms: u64,
    /// Maximum history entries retained in memory
    pub max_history_entries: usize,
    /// Seed for the mutation RNG
    pub rng_seed: u64,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            memory_size_pages: 1,
            auto_reboot: true,
            reboot_delay_ms: 2000,
            repair_delay_ms: 1500,
            max_history_entries: 1000,
            rng_seed: 0,
        }
    }
}

/// Guest execution limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeLimits {
    /// Maximum WASM instructions per run
    pub max_fuel: u64,
    /// Maximum guest memory (bytes)
    pub max_memory_bytes: usize,
}

impl Default for RuntimeLimits {
    fn default() -> Self {
        Self {
            max_fuel: 10_000,
            max_memory_bytes: 65536, // 64 KiB
        }
    }
}

/// Snapshot persistence parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Snapshot directory
    pub snapshot_dir: String,
    /// Snapshots retained by cleanup
    pub keep_count: usize,
    /// Snapshot every N generations (0 disables periodic snapshots)
    pub interval_generations: u64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: "./data/snapshots".to_string(),
            keep_count: 5,
            interval_generations: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs() {
        let boot = BootConfig::default();
        assert_eq!(boot.memory_size_pages, 1);
        assert!(boot.auto_reboot);
        assert_eq!(boot.reboot_delay_ms, 2000);
        assert_eq!(boot.repair_delay_ms, 1500);
        assert_eq!(boot.rng_seed, 0);

        let limits = RuntimeLimits::default();
        assert_eq!(limits.max_fuel, 10_000);
        assert_eq!(limits.max_memory_bytes, 65536);

        let snap = SnapshotConfig::default();
        assert_eq!(snap.keep_count, 5);
    }

    #[test]
    fn test_boot_config_serialization() {
        let config = BootConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: BootConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.reboot_delay_ms, config.reboot_delay_ms);
        assert_eq!(deserialized.auto_reboot, config.auto_reboot);
    }
}
