//! PCI configuration space access for x86_64.
//!
//! Uses the legacy configuration mechanism (ports 0xCF8/0xCFC) to enumerate
//! functions and locate USB host controllers.

use alloc::vec::Vec;
use core::fmt;
use x86_64::instructions::port::{Port, PortWriteOnly};

/// PCI configuration address port.
const PCI_CONFIG_ADDRESS: u16 = 0x0CF8;

/// PCI configuration data port.
const PCI_CONFIG_DATA: u16 = 0x0CFC;

/// Vendor ID read back from an empty slot.
pub const PCI_VENDOR_ID_NONE: u16 = 0xFFFF;

/// Serial bus controller base class.
pub const CLASS_SERIAL_BUS: u8 = 0x0C;

/// USB controller subclass of [`CLASS_SERIAL_BUS`].
pub const SUBCLASS_USB: u8 = 0x03;

/// Configuration space register offsets.
pub mod reg {
    /// Vendor ID (16-bit).
    pub const VENDOR_ID: u8 = 0x00;
    /// Device ID (16-bit).
    pub const DEVICE_ID: u8 = 0x02;
    /// Command register (16-bit).
    pub const COMMAND: u8 = 0x04;
    /// Revision ID followed by the 24-bit class code.
    pub const CLASS_REVISION: u8 = 0x08;
    /// Header type (8-bit).
    pub const HEADER_TYPE: u8 = 0x0E;
    /// Interrupt line (8-bit).
    pub const INTERRUPT_LINE: u8 = 0x3C;
}

/// Command register bits.
pub mod cmd {
    /// Enable memory space access.
    pub const MEM_SPACE: u16 = 1 << 1;
    /// Enable bus mastering.
    pub const BUS_MASTER: u16 = 1 << 2;
}

/// A PCI function address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PciAddress {
    /// Bus number.
    pub bus: u8,
    /// Device number (0-31).
    pub device: u8,
    /// Function number (0-7).
    pub function: u8,
}

impl PciAddress {
    /// Create a new PCI address.
    pub const fn new(bus: u8, device: u8, function: u8) -> Self {
        Self {
            bus,
            device,
            function,
        }
    }

    /// CONFIG_ADDRESS value selecting the dword that contains `offset`.
    fn config_address(self, offset: u8) -> u32 {
        0x8000_0000
            | (u32::from(self.bus) << 16)
            | (u32::from(self.device & 0x1F) << 11)
            | (u32::from(self.function & 0x07) << 8)
            | u32::from(offset & 0xFC)
    }
}

impl fmt::Display for PciAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}:{:02x}.{}", self.bus, self.device, self.function)
    }
}

/// Read a 32-bit value from configuration space.
pub fn read_config_u32(addr: PciAddress, offset: u8) -> u32 {
    // SAFETY: Configuration mechanism #1 ports. Reading does not touch memory.
    unsafe {
        let mut addr_port: PortWriteOnly<u32> = PortWriteOnly::new(PCI_CONFIG_ADDRESS);
        let mut data_port: Port<u32> = Port::new(PCI_CONFIG_DATA);

        addr_port.write(addr.config_address(offset));
        data_port.read()
    }
}

/// Write a 32-bit value to configuration space.
pub fn write_config_u32(addr: PciAddress, offset: u8, value: u32) {
    // SAFETY: Configuration mechanism #1 ports. Callers only write registers
    // of functions they own.
    unsafe {
        let mut addr_port: PortWriteOnly<u32> = PortWriteOnly::new(PCI_CONFIG_ADDRESS);
        let mut data_port: Port<u32> = Port::new(PCI_CONFIG_DATA);

        addr_port.write(addr.config_address(offset));
        data_port.write(value);
    }
}

/// Read a 16-bit value from configuration space.
pub fn read_config_u16(addr: PciAddress, offset: u8) -> u16 {
    let shift = u32::from(offset & 2) * 8;
    (read_config_u32(addr, offset) >> shift) as u16
}

/// Write a 16-bit value to configuration space.
pub fn write_config_u16(addr: PciAddress, offset: u8, value: u16) {
    let shift = u32::from(offset & 2) * 8;
    let mut dword = read_config_u32(addr, offset);
    dword &= !(0xFFFF << shift);
    dword |= u32::from(value) << shift;
    write_config_u32(addr, offset, dword);
}

/// Read an 8-bit value from configuration space.
pub fn read_config_u8(addr: PciAddress, offset: u8) -> u8 {
    let shift = u32::from(offset & 3) * 8;
    (read_config_u32(addr, offset) >> shift) as u8
}

/// USB host controller interface, from the programming interface byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsbKind {
    /// USB 1.x, Intel style.
    Uhci,
    /// USB 1.x, open host controller.
    Ohci,
    /// USB 2.0.
    Ehci,
    /// USB 3.x.
    Xhci,
    /// Anything else in the USB subclass.
    Other(u8),
}

impl UsbKind {
    /// Decode a programming interface value.
    pub fn from_prog_if(prog_if: u8) -> Self {
        match prog_if {
            0x00 => UsbKind::Uhci,
            0x10 => UsbKind::Ohci,
            0x20 => UsbKind::Ehci,
            0x30 => UsbKind::Xhci,
            other => UsbKind::Other(other),
        }
    }
}

impl fmt::Display for UsbKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsbKind::Uhci => write!(f, "UHCI"),
            UsbKind::Ohci => write!(f, "OHCI"),
            UsbKind::Ehci => write!(f, "EHCI"),
            UsbKind::Xhci => write!(f, "xHCI"),
            UsbKind::Other(prog_if) => write!(f, "USB (prog-if {:#04x})", prog_if),
        }
    }
}

/// A discovered PCI function.
#[derive(Debug, Clone, Copy)]
pub struct PciDevice {
    /// Bus/device/function.
    pub addr: PciAddress,
    /// Vendor ID.
    pub vendor_id: u16,
    /// Device ID.
    pub device_id: u16,
    /// Class code (class << 16 | subclass << 8 | prog_if).
    pub class_code: u32,
    /// Interrupt line.
    pub irq: u8,
}

impl PciDevice {
    /// Read the function at `addr`, or `None` if the slot is empty.
    pub fn read(addr: PciAddress) -> Option<Self> {
        let vendor_id = read_config_u16(addr, reg::VENDOR_ID);
        if vendor_id == PCI_VENDOR_ID_NONE {
            return None;
        }

        Some(Self {
            addr,
            vendor_id,
            device_id: read_config_u16(addr, reg::DEVICE_ID),
            class_code: read_config_u32(addr, reg::CLASS_REVISION) >> 8,
            irq: read_config_u8(addr, reg::INTERRUPT_LINE),
        })
    }

    /// Base class byte.
    pub fn class(&self) -> u8 {
        (self.class_code >> 16) as u8
    }

    /// Subclass byte.
    pub fn subclass(&self) -> u8 {
        (self.class_code >> 8) as u8
    }

    /// Programming interface byte.
    pub fn prog_if(&self) -> u8 {
        self.class_code as u8
    }

    /// Controller interface, if this is a USB host controller.
    pub fn usb_kind(&self) -> Option<UsbKind> {
        (self.class() == CLASS_SERIAL_BUS && self.subclass() == SUBCLASS_USB)
            .then(|| UsbKind::from_prog_if(self.prog_if()))
    }

    /// Enable bus mastering and memory space access.
    pub fn enable(&self) {
        let current = read_config_u16(self.addr, reg::COMMAND);
        write_config_u16(
            self.addr,
            reg::COMMAND,
            current | cmd::MEM_SPACE | cmd::BUS_MASTER,
        );
    }
}

/// Scan every bus and call `callback` for each function found.
pub fn scan<F>(mut callback: F)
where
    F: FnMut(PciDevice),
{
    for bus in 0..=255u8 {
        for device in 0..32u8 {
            let addr = PciAddress::new(bus, device, 0);
            let Some(dev) = PciDevice::read(addr) else {
                continue;
            };
            callback(dev);

            if read_config_u8(addr, reg::HEADER_TYPE) & 0x80 != 0 {
                (1..8u8)
                    .filter_map(|function| PciDevice::read(PciAddress::new(bus, device, function)))
                    .for_each(&mut callback);
            }
        }
    }
}

/// All USB host controllers on the bus, in scan order.
pub fn find_usb_controllers() -> Vec<PciDevice> {
    let mut found = Vec::new();
    scan(|dev| {
        if dev.usb_kind().is_some() {
            found.push(dev);
        }
    });
    found
}
