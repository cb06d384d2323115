//! # Directory Tests
//!
//! Name resolution over layered files: the override law, hashed and linear
//! lookups agreeing, and the fatal paths.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use revenant_wad::format::{build_wad, IWAD_MAGIC, PWAD_MAGIC};
use revenant_wad::{LumpName, MemoryFile, WadConfig, WadDirectory, WadError};

const NAME_POOL: [&str; 12] = [
    "PLAYPAL", "COLORMAP", "E1M1", "THINGS", "LINEDEFS", "FLOOR4_8", "F_START", "F_END", "STBAR",
    "D_E1M1", "DSPISTOL", "TEXTURE1",
];

fn temp_path(name: &str) -> std::path::PathBuf {
    let id = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("revenant_dir_{id}_{name}"))
}

fn add_memory_wad(dir: &mut WadDirectory, path: &str, names: &[&str]) {
    let lumps: Vec<(LumpName, &[u8])> = names
        .iter()
        .map(|n| (LumpName::new(n), n.as_bytes()))
        .collect();
    let magic = if dir.num_files() == 0 { IWAD_MAGIC } else { PWAD_MAGIC };
    dir.add_backend(path, Box::new(MemoryFile::new(build_wad(*magic, &lumps))))
        .unwrap();
}

#[test]
fn test_hash_and_linear_lookups_agree() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5741_4453);

    for round in 0..50 {
        let mut dir = WadDirectory::default();
        let files = rng.gen_range(1..6);
        for file in 0..files {
            let count = rng.gen_range(0..40);
            let names: Vec<&str> = (0..count)
                .map(|_| NAME_POOL[rng.gen_range(0..NAME_POOL.len())])
                .collect();
            add_memory_wad(&mut dir, &format!("round{round}_{file}.wad"), &names);
        }

        let mut queries: Vec<String> = NAME_POOL.iter().map(|n| n.to_lowercase()).collect();
        queries.push("MISSING".to_string());
        queries.push("e1m1extra".to_string());

        let linear: Vec<Option<usize>> =
            queries.iter().map(|q| dir.check_num_for_name(q)).collect();

        // Override law: the newest entry with the name.
        for (query, found) in queries.iter().zip(&linear) {
            let newest = dir
                .lumps()
                .enumerate()
                .filter(|(_, l)| l.name == LumpName::new(query))
                .map(|(i, _)| i)
                .last();
            assert_eq!(*found, newest, "round {round}: {query}");
        }

        dir.generate_hash_table();
        assert!(dir.has_hash_table());
        let hashed: Vec<Option<usize>> =
            queries.iter().map(|q| dir.check_num_for_name(q)).collect();
        assert_eq!(linear, hashed, "round {round}");

        // Rebuilding changes nothing.
        dir.generate_hash_table();
        let rehashed: Vec<Option<usize>> =
            queries.iter().map(|q| dir.check_num_for_name(q)).collect();
        assert_eq!(hashed, rehashed);
    }
}

#[test]
fn test_names_compare_on_eight_bytes() {
    let mut dir = WadDirectory::default();
    add_memory_wad(&mut dir, "a.wad", &["TEXTURE1", "TEXTURE2"]);

    assert_eq!(dir.check_num_for_name("texture1"), Some(0));
    assert_eq!(dir.check_num_for_name("TEXTURE1_EXTRA"), Some(0));
    assert_eq!(dir.check_num_for_name("TEXTURE"), None);
}

#[test]
fn test_length_out_of_range_is_fatal() {
    let mut dir = WadDirectory::default();
    let names: Vec<&str> = NAME_POOL[..10].to_vec();
    add_memory_wad(&mut dir, "ten.wad", &names);
    assert_eq!(dir.num_lumps(), 10);

    let err = dir.lump_length(99_999).unwrap_err();
    assert!(matches!(err, WadError::LumpOutOfRange { lump: 99_999, numlumps: 10 }));
    assert!(err.is_fatal());
}

#[test]
fn test_get_num_for_missing_name_is_fatal() {
    let mut dir = WadDirectory::default();
    add_memory_wad(&mut dir, "a.wad", &["E1M1"]);

    let err = dir.get_num_for_name("E2M1").unwrap_err();
    assert!(matches!(err, WadError::LumpNotFound { ref name } if name == "E2M1"));
    assert!(err.is_fatal());
}

#[test]
fn test_add_files_from_disk() {
    let wad_path = temp_path("base.wad");
    let image = build_wad(
        *IWAD_MAGIC,
        &[(LumpName::new("PLAYPAL"), &[1u8; 768]), (LumpName::new("E1M1"), b"")],
    );
    std::fs::write(&wad_path, image).unwrap();

    let lump_path = temp_path("dsdoor.lmp");
    std::fs::write(&lump_path, b"raw sound").unwrap();

    for config in [WadConfig::default(), WadConfig::mapped()] {
        let mut dir = WadDirectory::new(config);
        dir.add_file(&wad_path).unwrap();
        dir.add_file(&lump_path).unwrap();

        let missing = dir.add_file(temp_path("missing.wad")).unwrap_err();
        assert!(matches!(missing, WadError::Open { .. }));
        assert!(!missing.is_fatal());

        assert_eq!(dir.num_files(), 2);
        assert_eq!(dir.num_lumps(), 3);
        assert_eq!(dir.lump_length(0).unwrap(), 768);

        // The single-lump name comes from the temp file's base name.
        let lump = dir.lump_info(2).unwrap();
        assert_eq!((lump.position, lump.size), (0, 9));
        assert_eq!(dir.file_path(lump.file), Some(lump_path.as_path()));

        dir.close();
    }

    std::fs::remove_file(&wad_path).ok();
    std::fs::remove_file(&lump_path).ok();
}

#[test]
fn test_checksum_is_stable_across_backends() {
    let path = temp_path("sum.wad");
    let image = build_wad(*PWAD_MAGIC, &[(LumpName::new("A"), b"1234"), (LumpName::new("B"), b"5")]);
    std::fs::write(&path, &image).unwrap();

    let mut buffered = WadDirectory::default();
    buffered.add_file(&path).unwrap();
    let mut mapped = WadDirectory::new(WadConfig::mapped());
    mapped.add_file(&path).unwrap();
    let mut memory = WadDirectory::default();
    memory.add_backend(&path, Box::new(MemoryFile::new(image))).unwrap();

    assert_eq!(buffered.checksum(), mapped.checksum());
    assert_eq!(buffered.checksum(), memory.checksum());

    std::fs::remove_file(&path).ok();
}
