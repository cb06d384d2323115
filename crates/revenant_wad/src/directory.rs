//! # Lump Directory
//!
//! Every loaded file is flattened into one table of lumps, in load order.
//! Names are resolved against the whole table, and later files override
//! earlier ones:
//!
//! ```text
//! doom.wad  : [PLAYPAL][E1M1][THINGS][FLOOR4_8] ...
//! patch.wad :                                   [E1M1][THINGS]
//!                                                 ^ "E1M1" resolves here
//! ```
//!
//! Lookups scan backwards until [`WadDirectory::generate_hash_table`] is
//! called; after that they walk a hash chain whose head is always the
//! newest entry, so both paths agree. Adding a file drops the hash table.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use revenant_core::OwnerSlot;
use tracing::{debug, error, info, warn};

use crate::cache::CacheStats;
use crate::config::WadConfig;
use crate::error::{WadError, WadResult};
use crate::file::{open_file, WadFile, WadFileId};
use crate::format::{is_wad_magic, FileLump, WadInfo, HEADER_SIZE};
use crate::name::LumpName;

/// One directory entry.
#[derive(Debug)]
pub struct LumpInfo {
    /// Normalized name.
    pub name: LumpName,
    /// File holding the data.
    pub file: WadFileId,
    /// Byte offset of the data in `file`.
    pub position: u32,
    /// Data size in bytes.
    pub size: u32,
    /// Zone block holding the cached payload, if resident.
    pub(crate) cache: OwnerSlot,
    /// Next entry in the same hash bucket.
    pub(crate) next: Option<usize>,
}

impl LumpInfo {
    fn new(name: LumpName, file: WadFileId, position: u32, size: u32) -> Self {
        Self {
            name,
            file,
            position,
            size,
            cache: OwnerSlot::new(),
            next: None,
        }
    }

    /// Returns `true` if the payload is resident in the zone.
    #[inline]
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.cache.is_set()
    }
}

/// All lumps of all loaded files.
pub struct WadDirectory {
    config: WadConfig,
    pub(crate) lumps: Vec<LumpInfo>,
    pub(crate) files: Vec<Box<dyn WadFile>>,
    paths: Vec<PathBuf>,
    hash: Option<Vec<Option<usize>>>,
    pub(crate) stats: CacheStats,
}

impl Default for WadDirectory {
    fn default() -> Self {
        Self::new(WadConfig::default())
    }
}

impl std::fmt::Debug for WadDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WadDirectory")
            .field("files", &self.paths)
            .field("lumps", &self.lumps.len())
            .field("hashed", &self.hash.is_some())
            .finish_non_exhaustive()
    }
}

impl WadDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new(config: WadConfig) -> Self {
        Self {
            config,
            lumps: Vec::new(),
            files: Vec::new(),
            paths: Vec::new(),
            hash: None,
            stats: CacheStats::default(),
        }
    }

    /// Opens `path` and appends its lumps.
    ///
    /// # Errors
    ///
    /// - [`WadError::Open`] (not fatal) if the file cannot be opened.
    /// - Anything [`add_backend`](Self::add_backend) returns.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> WadResult<WadFileId> {
        let path = path.as_ref();
        let backend = open_file(path, &self.config).map_err(|e| {
            warn!(error = %e, "couldn't open {}", path.display());
            e
        })?;
        self.add_backend(path, backend)
    }

    /// Appends the lumps of an already open file.
    ///
    /// A `.wad` extension means an archive with a lump table. Any other
    /// file is an archive if it starts with `IWAD` or `PWAD`, and a single
    /// lump named after its base name otherwise.
    ///
    /// # Errors
    ///
    /// - [`WadError::BadMagic`] for a `.wad` file without a valid id.
    /// - [`WadError::TruncatedDirectory`] if the header or table is short,
    ///   or the table lies past the end of the file.
    /// - [`WadError::LumpTooLarge`] for a single-lump file of 4 GiB or more.
    /// - [`WadError::DirectoryRead`] if the backend fails.
    pub fn add_backend(
        &mut self,
        path: impl AsRef<Path>,
        mut backend: Box<dyn WadFile>,
    ) -> WadResult<WadFileId> {
        let path = path.as_ref();
        let id = WadFileId::new(self.files.len() as u32);
        let read_err = |source: io::Error| WadError::DirectoryRead {
            path: path.to_path_buf(),
            source,
        };

        let mut header = [0u8; HEADER_SIZE];
        let got = backend.read(0, &mut header).map_err(read_err)?;
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&header[..4]);

        let wad_extension = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wad"));
        let archive = got >= magic.len() && is_wad_magic(&magic);

        if wad_extension && !archive {
            error!(path = %path.display(), ?magic, "wad file has no IWAD or PWAD id");
            return Err(WadError::BadMagic {
                path: path.to_path_buf(),
                found: magic,
            });
        }

        let entries: Vec<LumpInfo> = if archive {
            let Some(info) = WadInfo::parse(&header[..got]) else {
                return Err(Self::truncated(path, HEADER_SIZE, got));
            };
            let Some(table_len) = info.table_len() else {
                return Err(Self::truncated(path, usize::MAX, 0));
            };

            let table_offset = u64::from(info.table_offset());
            let available = backend.length().saturating_sub(table_offset);
            if available < table_len as u64 {
                let available = usize::try_from(available).unwrap_or(usize::MAX);
                return Err(Self::truncated(path, table_len, available));
            }

            let mut table = vec![0u8; table_len];
            let read = backend.read(table_offset, &mut table).map_err(read_err)?;
            if read < table_len {
                return Err(Self::truncated(path, table_len, read));
            }

            FileLump::parse_table(&table)
                .iter()
                .map(|rec| LumpInfo::new(rec.lump_name(), id, rec.position(), rec.length()))
                .collect()
        } else {
            let Ok(size) = u32::try_from(backend.length()) else {
                error!(path = %path.display(), size = backend.length(), "file too large for a lump");
                return Err(WadError::LumpTooLarge {
                    path: path.to_path_buf(),
                    size: backend.length(),
                });
            };
            vec![LumpInfo::new(LumpName::from_file_base(path), id, 0, size)]
        };

        info!(
            path = %path.display(),
            class = %backend.class(),
            lumps = entries.len(),
            "added wad file"
        );

        self.lumps.extend(entries);
        self.files.push(backend);
        self.paths.push(path.to_path_buf());
        self.hash = None;

        Ok(id)
    }

    fn truncated(path: &Path, expected: usize, read: usize) -> WadError {
        error!(path = %path.display(), expected, read, "wad directory is truncated");
        WadError::TruncatedDirectory {
            path: path.to_path_buf(),
            expected,
            read,
        }
    }

    /// Number of lumps across all files.
    #[inline]
    #[must_use]
    pub fn num_lumps(&self) -> usize {
        self.lumps.len()
    }

    /// Number of files loaded.
    #[inline]
    #[must_use]
    pub fn num_files(&self) -> usize {
        self.files.len()
    }

    /// Path a file was loaded from.
    #[must_use]
    pub fn file_path(&self, file: WadFileId) -> Option<&Path> {
        self.paths.get(file.index()).map(PathBuf::as_path)
    }

    /// Returns `true` once a hash table is in place.
    #[inline]
    #[must_use]
    pub fn has_hash_table(&self) -> bool {
        self.hash.is_some()
    }

    /// Directory entry for `lump`.
    #[must_use]
    pub fn lump_info(&self, lump: usize) -> Option<&LumpInfo> {
        self.lumps.get(lump)
    }

    /// Name of `lump`.
    #[must_use]
    pub fn lump_name(&self, lump: usize) -> Option<LumpName> {
        self.lumps.get(lump).map(|l| l.name)
    }

    /// Iterates over all entries in load order.
    pub fn lumps(&self) -> impl Iterator<Item = &LumpInfo> + '_ {
        self.lumps.iter()
    }

    /// Directory entry for `lump`, or the fatal range error.
    pub(crate) fn entry(&self, lump: usize) -> WadResult<&LumpInfo> {
        self.lumps.get(lump).ok_or_else(|| {
            error!(lump, numlumps = self.lumps.len(), "lump index out of range");
            WadError::LumpOutOfRange {
                lump,
                numlumps: self.lumps.len(),
            }
        })
    }

    /// Resolves a name to the newest lump carrying it.
    ///
    /// Only the first eight bytes are significant, compared
    /// case-insensitively.
    #[must_use]
    pub fn check_num_for_name(&self, name: &str) -> Option<usize> {
        self.check_num_for_lump_name(&LumpName::new(name))
    }

    /// Resolves a normalized name to the newest lump carrying it.
    #[must_use]
    pub fn check_num_for_lump_name(&self, name: &LumpName) -> Option<usize> {
        match &self.hash {
            Some(buckets) => {
                let bucket = (name.name_hash() as usize).checked_rem(buckets.len())?;
                let mut cursor = buckets[bucket];
                while let Some(index) = cursor {
                    let lump = &self.lumps[index];
                    if lump.name == *name {
                        return Some(index);
                    }
                    cursor = lump.next;
                }
                None
            }
            None => self.lumps.iter().rposition(|l| l.name == *name),
        }
    }

    /// Resolves a name that must exist.
    ///
    /// # Errors
    ///
    /// Returns [`WadError::LumpNotFound`] (fatal) if no lump has the name.
    pub fn get_num_for_name(&self, name: &str) -> WadResult<usize> {
        self.check_num_for_name(name).ok_or_else(|| {
            error!(name, "lump not found");
            WadError::LumpNotFound {
                name: name.to_string(),
            }
        })
    }

    /// Buffer size needed to load `lump`.
    ///
    /// # Errors
    ///
    /// Returns [`WadError::LumpOutOfRange`] (fatal) for a bad index.
    pub fn lump_length(&self, lump: usize) -> WadResult<u32> {
        self.entry(lump).map(|l| l.size)
    }

    /// Builds the name hash table over the current entries.
    ///
    /// There are as many buckets as lumps. Entries are inserted in load
    /// order at the head of their chain, so each chain starts at its
    /// newest entry.
    pub fn generate_hash_table(&mut self) {
        let count = self.lumps.len();
        let mut buckets = vec![None; count];

        for index in 0..count {
            let bucket = self.lumps[index].name.name_hash() as usize % count;
            self.lumps[index].next = buckets[bucket];
            buckets[bucket] = Some(index);
        }

        debug!(lumps = count, "generated lump hash table");
        self.hash = Some(buckets);
    }

    /// Reads `lump` into the front of `dest`, bypassing the cache.
    ///
    /// # Errors
    ///
    /// - [`WadError::LumpOutOfRange`] for a bad index.
    /// - [`WadError::BufferTooSmall`] if `dest` is shorter than the lump.
    /// - [`WadError::ShortRead`] or [`WadError::ReadFailed`] on a torn read.
    pub fn read_lump(&mut self, lump: usize, dest: &mut [u8]) -> WadResult<()> {
        let info = self.entry(lump)?;
        let (file, position, size) = (info.file, info.position, info.size as usize);

        if dest.len() < size {
            error!(lump, needed = size, provided = dest.len(), "lump buffer too small");
            return Err(WadError::BufferTooSmall {
                lump,
                needed: size,
                provided: dest.len(),
            });
        }

        read_exact_at(self.files[file.index()].as_mut(), lump, position, &mut dest[..size])
    }

    /// Fingerprint of the directory layout.
    ///
    /// CRC-32 over every entry's name, file number, position and size.
    /// Files are numbered by first appearance in the table, so two
    /// processes that loaded the same files in the same order agree.
    #[must_use]
    pub fn checksum(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        let mut numbers: Vec<Option<u32>> = vec![None; self.files.len()];
        let mut next_number = 0u32;

        for lump in &self.lumps {
            let number = *numbers[lump.file.index()].get_or_insert_with(|| {
                next_number += 1;
                next_number - 1
            });

            hasher.update(lump.name.as_bytes());
            hasher.update(&[0]);
            hasher.update(&number.to_le_bytes());
            hasher.update(&lump.position.to_le_bytes());
            hasher.update(&lump.size.to_le_bytes());
        }

        hasher.finalize()
    }

    /// Writes a human-readable listing of every file and lump.
    ///
    /// # Errors
    ///
    /// Any error from `out`.
    pub fn print_directory<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for (index, (path, file)) in self.paths.iter().zip(&self.files).enumerate() {
            writeln!(
                out,
                "file {index}: {} ({}, {} bytes)",
                path.display(),
                file.class(),
                file.length()
            )?;
        }

        writeln!(out, "{:>6} {:<8} {:>4} {:>10} {:>10}", "lump", "name", "file", "offset", "size")?;
        for (index, lump) in self.lumps.iter().enumerate() {
            writeln!(
                out,
                "{index:>6} {:<8} {:>4} {:>10} {:>10}{}",
                lump.name.to_string(),
                lump.file.index(),
                lump.position,
                lump.size,
                if lump.is_cached() { " cached" } else { "" }
            )?;
        }
        Ok(())
    }

    /// Closes every file, in load order.
    pub fn close(self) {
        for file in self.files {
            file.close();
        }
    }
}

/// Fills `dest` from `file` at `position`. Anything short is fatal.
pub(crate) fn read_exact_at(
    file: &mut dyn WadFile,
    lump: usize,
    position: u32,
    dest: &mut [u8],
) -> WadResult<()> {
    let read = file
        .read(u64::from(position), dest)
        .map_err(|source| {
            error!(lump, error = %source, "lump read failed");
            WadError::ReadFailed { lump, source }
        })?;

    if read < dest.len() {
        error!(lump, read, expected = dest.len(), "short lump read");
        return Err(WadError::ShortRead {
            lump,
            read,
            expected: dest.len(),
        });
    }
    Ok(())
}
