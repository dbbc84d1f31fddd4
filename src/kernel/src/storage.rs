//! RAM-backed storage controller.
//!
//! Stands in for removable storage: one disk (`emmc1`) with a single
//! partition (`emmc1-1`) that starts after a reserved first block.

use crate::devices::DeviceNameService;
use alloc::sync::Arc;
use alloc::vec::Vec;
use probeos_hal::{BlockDevice, Device, DeviceError};
use spin::Mutex;

/// Block size of the RAM disk.
pub const BLOCK_SIZE: usize = 512;

/// Name of the whole disk.
pub const DISK_NAME: &str = "emmc1";

/// Name of the first partition.
pub const PARTITION_NAME: &str = "emmc1-1";

/// A block device backed by heap memory.
pub struct RamDisk {
    block_size: usize,
    data: Vec<u8>,
}

impl RamDisk {
    /// Create a zeroed disk.
    pub fn new(block_size: usize, blocks: usize) -> Self {
        Self {
            block_size,
            data: alloc::vec![0; block_size * blocks],
        }
    }

    /// Create a zeroed disk, failing instead of aborting if the heap is short.
    pub fn try_new(block_size: usize, blocks: usize) -> Result<Self, DeviceError> {
        let len = block_size
            .checked_mul(blocks)
            .ok_or(DeviceError::NoMemory)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| DeviceError::NoMemory)?;
        data.resize(len, 0);
        Ok(Self { block_size, data })
    }

    fn range(&self, lba: u64, len: usize) -> Result<core::ops::Range<usize>, DeviceError> {
        if len != self.block_size {
            return Err(DeviceError::BadBufferSize);
        }
        if lba >= self.block_count() {
            return Err(DeviceError::OutOfRange);
        }
        let start = lba as usize * self.block_size;
        Ok(start..start + self.block_size)
    }
}

impl BlockDevice for RamDisk {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn block_count(&self) -> u64 {
        (self.data.len() / self.block_size) as u64
    }

    fn read_block(&mut self, lba: u64, buf: &mut [u8]) -> Result<(), DeviceError> {
        let range = self.range(lba, buf.len())?;
        buf.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn write_block(&mut self, lba: u64, buf: &[u8]) -> Result<(), DeviceError> {
        let range = self.range(lba, buf.len())?;
        self.data[range].copy_from_slice(buf);
        Ok(())
    }
}

/// A contiguous window onto a shared disk.
pub struct Partition {
    disk: Arc<Mutex<RamDisk>>,
    first_lba: u64,
    blocks: u64,
}

impl Partition {
    /// Create a partition of `blocks` blocks starting at `first_lba`.
    pub fn new(disk: Arc<Mutex<RamDisk>>, first_lba: u64, blocks: u64) -> Result<Self, DeviceError> {
        let end = first_lba.checked_add(blocks).ok_or(DeviceError::OutOfRange)?;
        if end > disk.lock().block_count() {
            return Err(DeviceError::OutOfRange);
        }
        Ok(Self {
            disk,
            first_lba,
            blocks,
        })
    }

    fn translate(&self, lba: u64) -> Result<u64, DeviceError> {
        if lba < self.blocks {
            Ok(self.first_lba + lba)
        } else {
            Err(DeviceError::OutOfRange)
        }
    }
}

impl BlockDevice for Partition {
    fn block_size(&self) -> usize {
        self.disk.lock().block_size()
    }

    fn block_count(&self) -> u64 {
        self.blocks
    }

    fn read_block(&mut self, lba: u64, buf: &mut [u8]) -> Result<(), DeviceError> {
        let lba = self.translate(lba)?;
        self.disk.lock().read_block(lba, buf)
    }

    fn write_block(&mut self, lba: u64, buf: &[u8]) -> Result<(), DeviceError> {
        let lba = self.translate(lba)?;
        self.disk.lock().write_block(lba, buf)
    }
}

/// Storage controller that creates the RAM disk and registers its devices.
pub struct StorageController<'a> {
    devices: &'a DeviceNameService,
    size_kib: usize,
    disk: Option<Arc<Mutex<RamDisk>>>,
}

impl<'a> StorageController<'a> {
    /// Create a controller for a disk of `size_kib` KiB.
    pub fn new(devices: &'a DeviceNameService, size_kib: usize) -> Self {
        Self {
            devices,
            size_kib,
            disk: None,
        }
    }
}

impl Device for StorageController<'_> {
    fn name(&self) -> &'static str {
        "storage"
    }

    fn initialize(&mut self) -> Result<(), DeviceError> {
        if self.disk.is_some() {
            return Err(DeviceError::AlreadyInitialized);
        }
        let bytes = self
            .size_kib
            .checked_mul(1024)
            .ok_or(DeviceError::Unsupported)?;
        let blocks = bytes / BLOCK_SIZE;
        // Block 0 is reserved, so a usable disk needs at least two.
        if blocks < 2 {
            return Err(DeviceError::Unsupported);
        }
        let disk = Arc::new(Mutex::new(RamDisk::try_new(BLOCK_SIZE, blocks)?));
        let partition = Partition::new(disk.clone(), 1, blocks as u64 - 1)?;

        self.devices.add_block(DISK_NAME, disk.clone());
        self.devices
            .add_block(PARTITION_NAME, Arc::new(Mutex::new(partition)));
        log::debug!(target: "storage", "{} blocks of {} bytes", blocks, BLOCK_SIZE);

        self.disk = Some(disk);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramdisk_bounds() {
        let mut disk = RamDisk::new(BLOCK_SIZE, 4);
        let mut buf = [0u8; BLOCK_SIZE];

        assert_eq!(disk.block_count(), 4);
        assert_eq!(disk.read_block(4, &mut buf), Err(DeviceError::OutOfRange));
        assert_eq!(
            disk.read_block(0, &mut buf[..16]),
            Err(DeviceError::BadBufferSize)
        );

        buf[0] = 0xAB;
        disk.write_block(3, &buf).unwrap();
        let mut back = [0u8; BLOCK_SIZE];
        disk.read_block(3, &mut back).unwrap();
        assert_eq!(back[0], 0xAB);
    }

    #[test]
    fn test_partition_offsets_into_disk() {
        let disk = Arc::new(Mutex::new(RamDisk::new(BLOCK_SIZE, 8)));
        let mut partition = Partition::new(disk.clone(), 1, 7).unwrap();

        let block = [7u8; BLOCK_SIZE];
        partition.write_block(0, &block).unwrap();

        let mut raw = [0u8; BLOCK_SIZE];
        disk.lock().read_block(1, &mut raw).unwrap();
        assert_eq!(raw, block);
        disk.lock().read_block(0, &mut raw).unwrap();
        assert_eq!(raw, [0u8; BLOCK_SIZE]);

        assert_eq!(partition.write_block(7, &block), Err(DeviceError::OutOfRange));
        assert!(Partition::new(disk, 2, 7).is_err());
    }

    #[test]
    fn test_controller_registers_partition() {
        let devices = DeviceNameService::new();
        let mut controller = StorageController::new(&devices, 16);

        assert!(devices.get_block(PARTITION_NAME).is_none());
        controller.initialize().unwrap();

        let partition = devices.get_block(PARTITION_NAME).unwrap();
        assert_eq!(partition.lock().block_count(), 31);
        assert!(devices.get_block(DISK_NAME).is_some());
        assert_eq!(
            controller.initialize(),
            Err(DeviceError::AlreadyInitialized)
        );
    }

    #[test]
    fn test_controller_rejects_tiny_disk() {
        let devices = DeviceNameService::new();
        let mut controller = StorageController::new(&devices, 0);
        assert_eq!(controller.initialize(), Err(DeviceError::Unsupported));
    }

    #[test]
    fn test_controller_rejects_oversized_disk() {
        let devices = DeviceNameService::new();
        let mut controller = StorageController::new(&devices, usize::MAX);
        assert_eq!(controller.initialize(), Err(DeviceError::Unsupported));
        assert!(devices.get_block(DISK_NAME).is_none());
    }
}
