//! # WAD Format
//!
//! ```text
//! Header (12 bytes):
//! [4 bytes: identification "IWAD" | "PWAD"]
//! [4 bytes: numlumps, little-endian]
//! [4 bytes: infotableofs, little-endian]
//!
//! Lump record (16 bytes), numlumps of them at infotableofs:
//! [4 bytes: filepos, little-endian]
//! [4 bytes: size, little-endian]
//! [8 bytes: name, not necessarily NUL-terminated]
//! ```

use bytemuck::{Pod, Zeroable};

use crate::name::{LumpName, NAME_LEN};

/// Identification of a complete game WAD.
pub const IWAD_MAGIC: &[u8; 4] = b"IWAD";

/// Identification of a patch WAD.
pub const PWAD_MAGIC: &[u8; 4] = b"PWAD";

/// Size of [`WadInfo`] on disk.
pub const HEADER_SIZE: usize = std::mem::size_of::<WadInfo>();

/// Size of [`FileLump`] on disk.
pub const RECORD_SIZE: usize = std::mem::size_of::<FileLump>();

/// WAD file header, exactly as laid out on disk.
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct WadInfo {
    /// `IWAD` or `PWAD`.
    pub identification: [u8; 4],
    /// Lump count (little-endian on disk).
    pub numlumps: u32,
    /// Offset of the lump table (little-endian on disk).
    pub infotableofs: u32,
}

impl WadInfo {
    /// Builds a header in on-disk byte order.
    #[must_use]
    pub fn new(identification: [u8; 4], numlumps: u32, infotableofs: u32) -> Self {
        Self {
            identification,
            numlumps: numlumps.to_le(),
            infotableofs: infotableofs.to_le(),
        }
    }

    /// Decodes a header from the first [`HEADER_SIZE`] bytes of `bytes`.
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        bytes
            .get(..HEADER_SIZE)
            .map(bytemuck::pod_read_unaligned::<Self>)
    }

    /// Returns `true` for `IWAD` and `PWAD`.
    #[must_use]
    pub fn has_valid_magic(&self) -> bool {
        is_wad_magic(&self.identification)
    }

    /// Returns `true` for an `IWAD`.
    #[must_use]
    pub fn is_iwad(&self) -> bool {
        &self.identification == IWAD_MAGIC
    }

    /// Lump count in host order.
    #[must_use]
    pub fn lump_count(&self) -> u32 {
        u32::from_le(self.numlumps)
    }

    /// Lump table offset in host order.
    #[must_use]
    pub fn table_offset(&self) -> u32 {
        u32::from_le(self.infotableofs)
    }

    /// Size of the lump table in bytes, if it fits in memory.
    #[must_use]
    pub fn table_len(&self) -> Option<usize> {
        (self.lump_count() as usize).checked_mul(RECORD_SIZE)
    }
}

/// One lump table record, exactly as laid out on disk.
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct FileLump {
    /// Offset of the lump data (little-endian on disk).
    pub filepos: u32,
    /// Size of the lump data (little-endian on disk).
    pub size: u32,
    /// Raw name field.
    pub name: [u8; NAME_LEN],
}

impl FileLump {
    /// Builds a record in on-disk byte order.
    #[must_use]
    pub fn new(name: LumpName, filepos: u32, size: u32) -> Self {
        Self {
            filepos: filepos.to_le(),
            size: size.to_le(),
            name: name.to_raw(),
        }
    }

    /// Decodes every record in a lump table.
    #[must_use]
    pub fn parse_table(bytes: &[u8]) -> Vec<Self> {
        bytes
            .chunks_exact(RECORD_SIZE)
            .map(bytemuck::pod_read_unaligned::<Self>)
            .collect()
    }

    /// Data offset in host order.
    #[must_use]
    pub fn position(&self) -> u32 {
        u32::from_le(self.filepos)
    }

    /// Data size in host order.
    #[must_use]
    pub fn length(&self) -> u32 {
        u32::from_le(self.size)
    }

    /// Normalized lump name.
    #[must_use]
    pub fn lump_name(&self) -> LumpName {
        LumpName::from_raw(self.name)
    }
}

/// Returns `true` if `magic` is `IWAD` or `PWAD`.
#[must_use]
pub fn is_wad_magic(magic: &[u8; 4]) -> bool {
    magic == IWAD_MAGIC || magic == PWAD_MAGIC
}

/// Serializes a complete WAD image: header, lump data, then the table.
///
/// Used to build test containers and by tools that repack lumps.
#[must_use]
pub fn build_wad(identification: [u8; 4], lumps: &[(LumpName, &[u8])]) -> Vec<u8> {
    let data_len: usize = lumps.iter().map(|(_, data)| data.len()).sum();
    let mut image = Vec::with_capacity(HEADER_SIZE + data_len + lumps.len() * RECORD_SIZE);
    image.extend_from_slice(bytemuck::bytes_of(&WadInfo::zeroed()));

    let mut records = Vec::with_capacity(lumps.len());
    for (name, data) in lumps {
        records.push(FileLump::new(*name, image.len() as u32, data.len() as u32));
        image.extend_from_slice(data);
    }

    let header = WadInfo::new(identification, lumps.len() as u32, image.len() as u32);
    image[..HEADER_SIZE].copy_from_slice(bytemuck::bytes_of(&header));
    image.extend_from_slice(bytemuck::cast_slice(&records));
    image
}
