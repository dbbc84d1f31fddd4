//! Root filesystem mount step.

use crate::devices::DeviceNameService;
use crate::fs::{FsError, Volume};
use alloc::string::String;
use core::fmt;

/// Why the root filesystem could not be mounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountError {
    /// No block device is registered under the partition name.
    NotFound(String),
    /// The partition exists but the volume could not be mounted on it.
    Mount {
        /// Partition name.
        partition: String,
        /// Filesystem error.
        error: FsError,
    },
}

impl fmt::Display for MountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountError::NotFound(partition) => write!(f, "Partition not found: {}", partition),
            MountError::Mount { partition, error } => {
                write!(f, "Cannot mount partition: {} ({})", partition, error)
            }
        }
    }
}

/// Mount `volume` on the block device registered as `partition`.
pub fn mount_partition(
    devices: &DeviceNameService,
    volume: &Volume,
    partition: &str,
) -> Result<(), MountError> {
    let device = devices
        .get_block(partition)
        .ok_or_else(|| MountError::NotFound(String::from(partition)))?;
    volume.mount(device).map_err(|error| MountError::Mount {
        partition: String::from(partition),
        error,
    })?;
    log::info!(target: "fs", "mounted {}", partition);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{RamDisk, BLOCK_SIZE};
    use crate::testutil::doubles::ScriptedConsole;
    use alloc::sync::Arc;
    use spin::Mutex;

    #[test]
    fn test_mount_registered_partition() {
        let devices = DeviceNameService::new();
        devices.add_block("emmc1-1", Arc::new(Mutex::new(RamDisk::new(BLOCK_SIZE, 8))));
        let volume = Volume::new();

        assert_eq!(mount_partition(&devices, &volume, "emmc1-1"), Ok(()));
        assert!(volume.is_mounted());
    }

    #[test]
    fn test_missing_partition() {
        let devices = DeviceNameService::new();
        let volume = Volume::new();

        let err = mount_partition(&devices, &volume, "emmc1-1").unwrap_err();

        assert_eq!(err, MountError::NotFound(String::from("emmc1-1")));
        assert_eq!(alloc::format!("{}", err), "Partition not found: emmc1-1");
        assert!(!volume.is_mounted());
    }

    #[test]
    fn test_char_device_is_not_a_partition() {
        let devices = DeviceNameService::new();
        devices.add_char("emmc1-1", ScriptedConsole::shared(""));

        let err = mount_partition(&devices, &Volume::new(), "emmc1-1").unwrap_err();

        assert!(matches!(err, MountError::NotFound(_)));
    }

    #[test]
    fn test_second_mount_fails() {
        let devices = DeviceNameService::new();
        devices.add_block("emmc1-1", Arc::new(Mutex::new(RamDisk::new(BLOCK_SIZE, 8))));
        let volume = Volume::new();
        mount_partition(&devices, &volume, "emmc1-1").unwrap();

        let err = mount_partition(&devices, &volume, "emmc1-1").unwrap_err();

        assert_eq!(
            err,
            MountError::Mount {
                partition: String::from("emmc1-1"),
                error: FsError::AlreadyMounted
            }
        );
    }
}
