//! Mountable flat filesystem.
//!
//! Files live in memory while mounted. Mounting loads the volume image from
//! the block device and unmounting writes it back.
//!
//! Image layout, all integers little endian:
//!
//! ```text
//! header:  magic "PROBEFS1" | entry count u32 | image length u32
//! entry:   name length u16 | name | data length u32 | data
//! ```

use super::{FileHandle, FileSystem, FsError, OpenFlags};
use crate::devices::SharedBlockDevice;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};
use spin::Mutex;

const MAGIC: &[u8; 8] = b"PROBEFS1";
const HEADER_LEN: usize = 16;

struct OpenFile {
    path: String,
    flags: OpenFlags,
    position: usize,
}

struct Mounted {
    device: SharedBlockDevice,
    files: BTreeMap<String, Vec<u8>>,
    open_handles: BTreeMap<FileHandle, OpenFile>,
    dirty: bool,
}

/// A flat, root-only filesystem mounted on a block device.
pub struct Volume {
    state: Mutex<Option<Mounted>>,
    next_handle: AtomicU32,
}

impl Default for Volume {
    fn default() -> Self {
        Self::new()
    }
}

impl Volume {
    /// Create an unmounted volume.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(None),
            next_handle: AtomicU32::new(1),
        }
    }

    /// Mount onto `device`, loading any image already stored there.
    ///
    /// A device without a valid image mounts as an empty volume.
    pub fn mount(&self, device: SharedBlockDevice) -> Result<(), FsError> {
        let mut state = self.state.lock();
        if state.is_some() {
            return Err(FsError::AlreadyMounted);
        }
        let files = load_image(&device)?;
        log::debug!(target: "fs", "mounted volume with {} files", files.len());
        *state = Some(Mounted {
            device,
            files,
            open_handles: BTreeMap::new(),
            dirty: false,
        });
        Ok(())
    }

    /// Flush the image back to the device and detach from it.
    ///
    /// Handles still open are closed. On a flush error the volume stays mounted.
    pub fn unmount(&self) -> Result<(), FsError> {
        let mut state = self.state.lock();
        let mounted = state.as_mut().ok_or(FsError::NotMounted)?;
        if !mounted.open_handles.is_empty() {
            log::warn!(
                target: "fs",
                "unmounting with {} open handles",
                mounted.open_handles.len()
            );
            mounted.open_handles.clear();
        }
        if mounted.dirty {
            store_image(&mounted.device, &mounted.files)?;
        }
        *state = None;
        Ok(())
    }

    /// Whether the volume is mounted.
    pub fn is_mounted(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Number of handles currently open.
    pub fn open_handles(&self) -> usize {
        self.state
            .lock()
            .as_ref()
            .map_or(0, |mounted| mounted.open_handles.len())
    }

    fn with_mounted<T>(
        &self,
        f: impl FnOnce(&mut Mounted) -> Result<T, FsError>,
    ) -> Result<T, FsError> {
        let mut state = self.state.lock();
        f(state.as_mut().ok_or(FsError::NotMounted)?)
    }
}

impl FileSystem for Volume {
    fn open(&self, path: &str, flags: OpenFlags) -> Result<FileHandle, FsError> {
        if path.is_empty() || path.contains('/') {
            return Err(FsError::InvalidPath);
        }
        self.with_mounted(|mounted| {
            match mounted.files.get_mut(path) {
                Some(content) => {
                    if flags.contains(OpenFlags::TRUNCATE) {
                        if !flags.contains(OpenFlags::WRITE) {
                            return Err(FsError::PermissionDenied);
                        }
                        content.clear();
                        mounted.dirty = true;
                    }
                }
                None if flags.contains(OpenFlags::CREATE) => {
                    mounted.files.insert(String::from(path), Vec::new());
                    mounted.dirty = true;
                }
                None => return Err(FsError::NotFound),
            }

            let handle = FileHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
            mounted.open_handles.insert(
                handle,
                OpenFile {
                    path: String::from(path),
                    flags,
                    position: 0,
                },
            );
            Ok(handle)
        })
    }

    fn read(&self, handle: FileHandle, buffer: &mut [u8], offset: usize) -> Result<usize, FsError> {
        self.with_mounted(|mounted| {
            let file = mounted
                .open_handles
                .get(&handle)
                .ok_or(FsError::InvalidHandle)?;
            if !file.flags.contains(OpenFlags::READ) {
                return Err(FsError::PermissionDenied);
            }
            let content = mounted.files.get(&file.path).ok_or(FsError::NotFound)?;
            if offset >= content.len() {
                return Ok(0);
            }
            let end = core::cmp::min(offset + buffer.len(), content.len());
            let bytes_read = end - offset;
            buffer[..bytes_read].copy_from_slice(&content[offset..end]);
            Ok(bytes_read)
        })
    }

    fn write(&self, handle: FileHandle, data: &[u8]) -> Result<usize, FsError> {
        self.with_mounted(|mounted| {
            let file = mounted
                .open_handles
                .get_mut(&handle)
                .ok_or(FsError::InvalidHandle)?;
            if !file.flags.contains(OpenFlags::WRITE) {
                return Err(FsError::PermissionDenied);
            }
            let content = mounted
                .files
                .get_mut(&file.path)
                .ok_or(FsError::NotFound)?;
            if file.flags.contains(OpenFlags::APPEND) {
                file.position = content.len();
            }
            let start = file.position.min(content.len());
            let overlap = core::cmp::min(data.len(), content.len() - start);
            content[start..start + overlap].copy_from_slice(&data[..overlap]);
            content.extend_from_slice(&data[overlap..]);
            file.position = start + data.len();
            mounted.dirty = true;
            Ok(data.len())
        })
    }

    fn size(&self, handle: FileHandle) -> Result<usize, FsError> {
        self.with_mounted(|mounted| {
            let file = mounted
                .open_handles
                .get(&handle)
                .ok_or(FsError::InvalidHandle)?;
            mounted
                .files
                .get(&file.path)
                .map(|content| content.len())
                .ok_or(FsError::NotFound)
        })
    }

    fn close(&self, handle: FileHandle) -> Result<(), FsError> {
        self.with_mounted(|mounted| {
            mounted
                .open_handles
                .remove(&handle)
                .map(|_| ())
                .ok_or(FsError::InvalidHandle)
        })
    }
}

fn load_image(device: &SharedBlockDevice) -> Result<BTreeMap<String, Vec<u8>>, FsError> {
    let mut device = device.lock();
    let block_size = device.block_size();
    if block_size < HEADER_LEN || device.block_count() == 0 {
        return Err(FsError::NoSpace);
    }

    let mut block = alloc::vec![0; block_size];
    device.read_block(0, &mut block)?;
    if &block[..8] != MAGIC {
        return Ok(BTreeMap::new());
    }

    let count = u32::from_le_bytes([block[8], block[9], block[10], block[11]]) as usize;
    let len = u32::from_le_bytes([block[12], block[13], block[14], block[15]]) as usize;
    let blocks = len.div_ceil(block_size) as u64;
    if len < HEADER_LEN || blocks > device.block_count() {
        return Err(FsError::Corrupt);
    }

    let mut image = Vec::with_capacity(blocks as usize * block_size);
    image.extend_from_slice(&block);
    for lba in 1..blocks {
        device.read_block(lba, &mut block)?;
        image.extend_from_slice(&block);
    }
    image.truncate(len);
    parse_entries(&image[HEADER_LEN..], count)
}

fn parse_entries(mut rest: &[u8], count: usize) -> Result<BTreeMap<String, Vec<u8>>, FsError> {
    fn take<'a>(rest: &mut &'a [u8], n: usize) -> Result<&'a [u8], FsError> {
        if rest.len() < n {
            return Err(FsError::Corrupt);
        }
        let (head, tail) = rest.split_at(n);
        *rest = tail;
        Ok(head)
    }

    let mut files = BTreeMap::new();
    for _ in 0..count {
        let name_len = take(&mut rest, 2)?;
        let name_len = u16::from_le_bytes([name_len[0], name_len[1]]) as usize;
        let name = core::str::from_utf8(take(&mut rest, name_len)?)
            .map_err(|_| FsError::Corrupt)?;
        let data_len = take(&mut rest, 4)?;
        let data_len =
            u32::from_le_bytes([data_len[0], data_len[1], data_len[2], data_len[3]]) as usize;
        let data = take(&mut rest, data_len)?;
        files.insert(String::from(name), data.to_vec());
    }
    Ok(files)
}

fn store_image(device: &SharedBlockDevice, files: &BTreeMap<String, Vec<u8>>) -> Result<(), FsError> {
    let mut image = Vec::new();
    image.extend_from_slice(MAGIC);
    image.extend_from_slice(&(files.len() as u32).to_le_bytes());
    image.extend_from_slice(&[0; 4]);
    for (name, data) in files {
        let name_len = u16::try_from(name.len()).map_err(|_| FsError::InvalidPath)?;
        let data_len = u32::try_from(data.len()).map_err(|_| FsError::NoSpace)?;
        image.extend_from_slice(&name_len.to_le_bytes());
        image.extend_from_slice(name.as_bytes());
        image.extend_from_slice(&data_len.to_le_bytes());
        image.extend_from_slice(data);
    }
    let len = u32::try_from(image.len()).map_err(|_| FsError::NoSpace)?;
    image[12..16].copy_from_slice(&len.to_le_bytes());

    let mut device = device.lock();
    let block_size = device.block_size();
    let blocks = image.len().div_ceil(block_size);
    if blocks as u64 > device.block_count() {
        return Err(FsError::NoSpace);
    }
    image.resize(blocks * block_size, 0);
    for (lba, chunk) in image.chunks(block_size).enumerate() {
        device.write_block(lba as u64, chunk)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::read_all;
    use crate::storage::{RamDisk, BLOCK_SIZE};
    use alloc::sync::Arc;

    fn device(blocks: usize) -> SharedBlockDevice {
        Arc::new(Mutex::new(RamDisk::new(BLOCK_SIZE, blocks)))
    }

    fn write_file(volume: &Volume, path: &str, data: &[u8]) {
        let handle = volume.open(path, OpenFlags::write_truncate()).unwrap();
        volume.write(handle, data).unwrap();
        volume.close(handle).unwrap();
    }

    #[test]
    fn test_requires_mount() {
        let volume = Volume::new();
        assert_eq!(
            volume.open("a.txt", OpenFlags::write_truncate()),
            Err(FsError::NotMounted)
        );
        assert_eq!(volume.unmount(), Err(FsError::NotMounted));

        let dev = device(4);
        volume.mount(dev.clone()).unwrap();
        assert_eq!(volume.mount(dev), Err(FsError::AlreadyMounted));
    }

    #[test]
    fn test_truncate_and_write() {
        let volume = Volume::new();
        volume.mount(device(4)).unwrap();

        write_file(&volume, "test.txt", b"first version, long\n");
        write_file(&volume, "test.txt", b"second\n");
        assert_eq!(read_all(&volume, "test.txt").unwrap(), b"second\n");
        assert_eq!(volume.open_handles(), 0);
    }

    #[test]
    fn test_open_modes() {
        let volume = Volume::new();
        volume.mount(device(4)).unwrap();

        assert_eq!(volume.open("missing", OpenFlags::READ), Err(FsError::NotFound));
        assert_eq!(
            volume.open("dir/file", OpenFlags::write_truncate()),
            Err(FsError::InvalidPath)
        );

        write_file(&volume, "log", b"abc");
        let handle = volume.open("log", OpenFlags::WRITE | OpenFlags::APPEND).unwrap();
        volume.write(handle, b"def").unwrap();
        let mut buf = [0u8; 3];
        assert_eq!(
            volume.read(handle, &mut buf, 0),
            Err(FsError::PermissionDenied)
        );
        volume.close(handle).unwrap();
        assert_eq!(volume.close(handle), Err(FsError::InvalidHandle));
        assert_eq!(read_all(&volume, "log").unwrap(), b"abcdef");
    }

    #[test]
    fn test_image_survives_remount() {
        let dev = device(8);
        let volume = Volume::new();
        volume.mount(dev.clone()).unwrap();
        write_file(&volume, "test.txt", b"lorem ipsum\n");
        let big: Vec<u8> = (0..1500).map(|i| i as u8).collect();
        write_file(&volume, "big.bin", &big);
        volume.unmount().unwrap();
        assert!(!volume.is_mounted());

        let again = Volume::new();
        again.mount(dev).unwrap();
        assert_eq!(read_all(&again, "test.txt").unwrap(), b"lorem ipsum\n");
        assert_eq!(read_all(&again, "big.bin").unwrap(), big);
    }

    #[test]
    fn test_image_too_large() {
        let volume = Volume::new();
        volume.mount(device(1)).unwrap();
        write_file(&volume, "big.bin", &[1u8; 2 * BLOCK_SIZE]);
        assert_eq!(volume.unmount(), Err(FsError::NoSpace));
        assert!(volume.is_mounted());
    }

    #[test]
    fn test_corrupt_image() {
        let dev = device(2);
        let mut block = [0u8; BLOCK_SIZE];
        block[..8].copy_from_slice(MAGIC);
        block[8..12].copy_from_slice(&1u32.to_le_bytes());
        block[12..16].copy_from_slice(&20u32.to_le_bytes());
        block[16..18].copy_from_slice(&200u16.to_le_bytes());
        dev.lock().write_block(0, &block).unwrap();

        assert_eq!(Volume::new().mount(dev), Err(FsError::Corrupt));
    }
}
