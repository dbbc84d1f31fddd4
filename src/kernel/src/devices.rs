//! Device name service.
//!
//! Maps device names (`tty1`, `ttyS1`, `emmc1-1`, ...) to shared handles so
//! that later boot stages can find devices registered by earlier ones.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use probeos_hal::{BlockDevice, CharDevice};
use spin::Mutex;

/// A shared character device.
pub type SharedCharDevice = Arc<Mutex<dyn CharDevice + Send>>;

/// A shared block device.
pub type SharedBlockDevice = Arc<Mutex<dyn BlockDevice + Send>>;

/// A registered device.
#[derive(Clone)]
pub enum DeviceHandle {
    /// Byte-stream device (screen, serial port, console).
    Char(SharedCharDevice),
    /// Block-addressed storage device or partition.
    Block(SharedBlockDevice),
}

/// Registry of named devices.
pub struct DeviceNameService {
    devices: Mutex<BTreeMap<String, DeviceHandle>>,
}

impl Default for DeviceNameService {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceNameService {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            devices: Mutex::new(BTreeMap::new()),
        }
    }

    /// Register a character device. Replaces any device of the same name.
    pub fn add_char(&self, name: &str, device: SharedCharDevice) {
        self.add(name, DeviceHandle::Char(device));
    }

    /// Register a block device. Replaces any device of the same name.
    pub fn add_block(&self, name: &str, device: SharedBlockDevice) {
        self.add(name, DeviceHandle::Block(device));
    }

    fn add(&self, name: &str, handle: DeviceHandle) {
        if self
            .devices
            .lock()
            .insert(String::from(name), handle)
            .is_some()
        {
            log::warn!(target: "devices", "device {} re-registered", name);
        }
    }

    /// Look up a character device by name.
    pub fn get_char(&self, name: &str) -> Option<SharedCharDevice> {
        match self.devices.lock().get(name) {
            Some(DeviceHandle::Char(device)) => Some(device.clone()),
            _ => None,
        }
    }

    /// Look up a block device by name.
    pub fn get_block(&self, name: &str) -> Option<SharedBlockDevice> {
        match self.devices.lock().get(name) {
            Some(DeviceHandle::Block(device)) => Some(device.clone()),
            _ => None,
        }
    }

    /// Names of all registered devices, sorted.
    pub fn names(&self) -> alloc::vec::Vec<String> {
        self.devices.lock().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RamDisk;

    struct Sink;

    impl CharDevice for Sink {
        fn write_str(&mut self, _s: &str) {}

        fn read_byte(&mut self) -> Option<u8> {
            None
        }
    }

    #[test]
    fn test_lookup_by_kind() {
        let devices = DeviceNameService::new();
        devices.add_char("tty1", Arc::new(Mutex::new(Sink)));
        devices.add_block("emmc1", Arc::new(Mutex::new(RamDisk::new(512, 4))));

        assert!(devices.get_char("tty1").is_some());
        assert!(devices.get_block("tty1").is_none());
        assert!(devices.get_block("emmc1").is_some());
        assert!(devices.get_char("emmc1").is_none());
        assert!(devices.get_block("emmc1-1").is_none());
    }

    #[test]
    fn test_names_are_sorted() {
        let devices = DeviceNameService::new();
        devices.add_char("ttyS1", Arc::new(Mutex::new(Sink)));
        devices.add_char("tty1", Arc::new(Mutex::new(Sink)));

        assert_eq!(devices.names(), ["tty1", "ttyS1"]);
    }
}
