//! # Cache Tests
//!
//! Caching against a zone under pressure: idempotence, eviction and reload,
//! and zero-copy access to mapped files.

use std::cell::Cell;
use std::io;
use std::rc::Rc;

use bytemuck::{bytes_of, cast_slice};
use revenant_core::{PurgeTag, Zone};
use revenant_wad::format::{build_wad, FileLump, WadInfo, HEADER_SIZE, IWAD_MAGIC, PWAD_MAGIC};
use revenant_wad::{
    FileClass, LumpName, LumpRef, MemoryFile, WadConfig, WadDirectory, WadFile,
};

const ZONE_SIZE: usize = 64 * 1024;

/// Backend that counts reads past the directory load.
struct CountingFile {
    inner: MemoryFile,
    reads: Rc<Cell<usize>>,
}

impl CountingFile {
    fn new(data: Vec<u8>) -> (Self, Rc<Cell<usize>>) {
        let reads = Rc::new(Cell::new(0));
        let file = Self {
            inner: MemoryFile::new(data),
            reads: Rc::clone(&reads),
        };
        (file, reads)
    }
}

impl WadFile for CountingFile {
    fn class(&self) -> FileClass {
        FileClass::Memory
    }

    fn length(&self) -> u64 {
        self.inner.length()
    }

    fn read(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.reads.set(self.reads.get() + 1);
        self.inner.read(offset, buf)
    }
}

/// A WAD image whose lumps sit at explicit offsets.
///
/// The image is `body_len` bytes of a repeating pattern, with the header
/// written over the start and the table appended.
fn wad_with_layout(magic: [u8; 4], body_len: usize, lumps: &[(&str, u32, u32)]) -> Vec<u8> {
    let mut image: Vec<u8> = (0..body_len).map(|i| (i % 251) as u8).collect();
    let header = WadInfo::new(magic, lumps.len() as u32, body_len as u32);
    image[..HEADER_SIZE].copy_from_slice(bytes_of(&header));

    let records: Vec<FileLump> = lumps
        .iter()
        .map(|&(name, pos, size)| FileLump::new(LumpName::new(name), pos, size))
        .collect();
    image.extend_from_slice(cast_slice(&records));
    image
}

fn pattern(offset: usize, len: usize) -> Vec<u8> {
    (offset..offset + len).map(|i| (i % 251) as u8).collect()
}

/// Allocates the whole zone without an owner, forcing eviction of
/// everything purgeable, then gives it back.
fn squeeze(zone: &mut Zone) {
    let big = zone.malloc(zone.total_size(), PurgeTag::Static, None).unwrap();
    zone.free(big).unwrap();
}

#[test]
fn test_floor_override_scenario() {
    let x = wad_with_layout(*IWAD_MAGIC, 256, &[("FLOOR", 0, 64)]);
    let y = wad_with_layout(*PWAD_MAGIC, 256, &[("FLOOR", 100, 64)]);
    let (y_file, y_reads) = CountingFile::new(y);

    let mut zone = Zone::new(ZONE_SIZE).unwrap();
    let mut dir = WadDirectory::default();
    dir.add_backend("x.wad", Box::new(MemoryFile::new(x))).unwrap();
    dir.add_backend("y.wad", Box::new(y_file)).unwrap();
    dir.generate_hash_table();
    y_reads.set(0);

    let index = dir.check_num_for_name("floor").unwrap();
    assert_eq!(index, 1);

    let lump = dir.cache_lump_num(&mut zone, index, PurgeTag::Static).unwrap();
    assert_eq!(dir.lump_bytes(&zone, lump).unwrap(), pattern(100, 64).as_slice());
    assert_eq!(y_reads.get(), 1);

    dir.release_lump_num(&mut zone, index).unwrap();
    squeeze(&mut zone);
    assert!(!dir.is_cached(index));
    assert_eq!(dir.lump_bytes(&zone, lump), None);

    let bytes = dir.cache_lump_bytes(&mut zone, index, PurgeTag::Static).unwrap();
    assert_eq!(bytes, pattern(100, 64).as_slice());
    assert_eq!(y_reads.get(), 2);
    zone.check_heap().unwrap();
}

#[test]
fn test_cache_is_idempotent() {
    let image = build_wad(*PWAD_MAGIC, &[(LumpName::new("SKY1"), &[9u8; 500])]);
    let (file, reads) = CountingFile::new(image);

    let mut zone = Zone::new(ZONE_SIZE).unwrap();
    let mut dir = WadDirectory::default();
    dir.add_backend("sky.wad", Box::new(file)).unwrap();
    reads.set(0);

    let first = dir.cache_lump_name(&mut zone, "sky1", PurgeTag::Static).unwrap();
    let first_bytes = dir.lump_bytes(&zone, first).unwrap().to_vec();
    let second = dir.cache_lump_name(&mut zone, "SKY1", PurgeTag::Static).unwrap();
    assert_eq!(first, second);
    assert_eq!(dir.lump_bytes(&zone, second).unwrap(), first_bytes.as_slice());

    // Release then recache without eviction: same block, no second read.
    dir.release_lump_name(&mut zone, "SKY1").unwrap();
    let third = dir.cache_lump_name(&mut zone, "SKY1", PurgeTag::Static).unwrap();
    assert_eq!(third, first);
    assert_eq!(dir.lump_bytes(&zone, third).unwrap(), first_bytes.as_slice());

    assert_eq!(reads.get(), 1);
    assert_eq!(dir.cache_stats().reads, 1);
    assert_eq!(dir.cache_stats().hits, 2);
}

#[test]
fn test_static_lumps_survive_pressure() {
    let image = build_wad(
        *IWAD_MAGIC,
        &[(LumpName::new("KEEP"), &[1u8; 2048]), (LumpName::new("DROP"), &[2u8; 2048])],
    );
    let mut zone = Zone::new(ZONE_SIZE).unwrap();
    let mut dir = WadDirectory::default();
    dir.add_backend("mix.wad", Box::new(MemoryFile::new(image))).unwrap();

    let keep = dir.cache_lump_name(&mut zone, "KEEP", PurgeTag::Static).unwrap();
    dir.cache_lump_name(&mut zone, "DROP", PurgeTag::Cache).unwrap();

    // Fits only once the cached lump is gone.
    let big = zone
        .malloc(zone.total_size() - 2048 - 512, PurgeTag::Static, None)
        .unwrap();

    assert!(dir.is_cached(0));
    assert!(!dir.is_cached(1));
    assert_eq!(dir.lump_bytes(&zone, keep).unwrap(), &[1u8; 2048][..]);

    zone.free(big).unwrap();
    let reloaded = dir.cache_lump_bytes(&mut zone, 1, PurgeTag::Cache).unwrap();
    assert_eq!(reloaded, &[2u8; 2048][..]);
    zone.check_heap().unwrap();
}

#[test]
fn test_eviction_reload_matches_source() {
    let lumps: Vec<(LumpName, Vec<u8>)> = (0..24u8)
        .map(|i| (LumpName::new(&format!("LUMP{i}")), vec![i; 4000 + usize::from(i) * 37]))
        .collect();
    let table: Vec<(LumpName, &[u8])> = lumps.iter().map(|(n, d)| (*n, d.as_slice())).collect();
    let image = build_wad(*PWAD_MAGIC, &table);

    let mut zone = Zone::new(ZONE_SIZE).unwrap();
    let mut dir = WadDirectory::default();
    dir.add_backend("many.wad", Box::new(MemoryFile::new(image))).unwrap();
    dir.generate_hash_table();

    // Twice through a working set bigger than the zone.
    for _ in 0..2 {
        for (index, (_, data)) in lumps.iter().enumerate() {
            let bytes = dir.cache_lump_bytes(&mut zone, index, PurgeTag::Cache).unwrap();
            assert_eq!(bytes, data.as_slice());
            zone.check_heap().unwrap();
        }
    }

    let stats = dir.cache_stats();
    assert!(stats.reads > lumps.len() as u64, "the zone must have evicted");
    assert_eq!(stats.mapped_hits, 0);
}

#[test]
fn test_mapped_lumps_bypass_the_zone() {
    let id = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = std::env::temp_dir().join(format!("revenant_cache_{id}.wad"));
    std::fs::write(&path, build_wad(*IWAD_MAGIC, &[(LumpName::new("COLORMAP"), b"shades")]))
        .unwrap();

    let mut zone = Zone::new(ZONE_SIZE).unwrap();
    let mut dir = WadDirectory::new(WadConfig::mapped());
    dir.add_file(&path).unwrap();

    let lump = dir.cache_lump_name(&mut zone, "COLORMAP", PurgeTag::Static).unwrap();
    assert!(matches!(lump, LumpRef::Mapped { len: 6, .. }));
    assert_eq!(dir.lump_bytes(&zone, lump), Some(&b"shades"[..]));
    assert_eq!(zone.block_count(), 1, "no zone block for a mapped lump");
    assert!(!dir.is_cached(0));

    // Release is a no-op, and the slice stays valid under pressure.
    dir.release_lump_name(&mut zone, "COLORMAP").unwrap();
    squeeze(&mut zone);
    assert_eq!(dir.lump_bytes(&zone, lump), Some(&b"shades"[..]));
    assert_eq!(dir.cache_stats().mapped_hits, 1);

    dir.close();
    std::fs::remove_file(&path).ok();
}
