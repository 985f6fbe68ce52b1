use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use romdex_index::fixtures::IndexFixture;
use romdex_index::{CRC_FILTER_KEY, GameIndex, SIZE_FILTER_KEY};
use romdex_scan::{
    EngineConfig, ExtensionSet, GamePipeline, JsonlSink, MatchRecord, ScanError, ScanService,
    games_output_path, read_results,
};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

const GAME1: &[u8] = b"0123456789";

/// A data root with a databank written from `fixture` and an empty `roms/` folder.
fn setup(fixture: &IndexFixture) -> (TempDir, EngineConfig) {
    let temp = TempDir::new().unwrap();
    let config = EngineConfig::new(temp.path());
    let databank = config.databank_path();
    fs::create_dir_all(databank.parent().unwrap()).unwrap();
    fixture.write(&databank).unwrap();
    fs::create_dir_all(temp.path().join("library/roms")).unwrap();
    (temp, config)
}

fn library(temp: &TempDir) -> std::path::PathBuf {
    temp.path().join("library")
}

fn write_zip(path: &Path, members: &[(&str, &[u8])]) {
    let file = File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    for (name, data) in members {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap();
}

/// A zip holding one uncompressed member whose payload bytes are damaged
/// after writing. The central directory keeps the original size and CRC-32.
fn write_damaged_zip(path: &Path, name: &str, payload: &[u8]) {
    let file = File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    writer.start_file(name, options).unwrap();
    writer.write_all(payload).unwrap();
    writer.finish().unwrap();

    let mut bytes = fs::read(path).unwrap();
    let offset = bytes
        .windows(payload.len())
        .position(|w| w == payload)
        .expect("stored payload not found in archive");
    bytes[offset + payload.len() / 2] ^= 0xFF;
    fs::write(path, bytes).unwrap();
}

fn scan(config: &EngineConfig, base: &Path) -> (Vec<MatchRecord>, Result<romdex_scan::ScanSummary, ScanError>) {
    let service = ScanService::new(config.clone()).unwrap();
    let mut records = Vec::new();
    let result = service.scan_games_into(base, &mut records);
    (records, result)
}

#[test]
fn test_known_and_unknown_games() {
    let mut fixture = IndexFixture::new();
    let digest = fixture.add_game(GAME1, "Nintendo;Super Game");
    let (temp, config) = setup(&fixture);
    fs::write(library(&temp).join("roms/game1.nes"), GAME1).unwrap();
    fs::write(library(&temp).join("roms/unknown.nes"), b"abc").unwrap();

    let (records, result) = scan(&config, &library(&temp));
    let summary = result.unwrap();

    assert_eq!(
        records,
        vec![
            MatchRecord::matched("/roms", "game1.nes", "Nintendo", "Super Game", digest),
            MatchRecord::unmatched("/roms", "unknown.nes"),
        ]
    );
    assert_eq!(summary.candidates, 2);
    assert_eq!(summary.matches, 1);
    assert_eq!(summary.size_rejected, 1);
}

#[test]
fn test_stored_fields_are_swapped_in_output() {
    let mut fixture = IndexFixture::new();
    fixture.add_game(GAME1, "A;B");
    let (temp, config) = setup(&fixture);
    fs::write(library(&temp).join("roms/game.nes"), GAME1).unwrap();

    let (records, result) = scan(&config, &library(&temp));
    result.unwrap();

    let line = serde_json::to_value(&records[0]).unwrap();
    assert_eq!(line[2], "B");
    assert_eq!(line[3], "A");
}

#[test]
fn test_size_miss_is_never_digested() {
    let mut fixture = IndexFixture::new();
    fixture.add_game(GAME1, "NES;Known");
    let (temp, config) = setup(&fixture);
    let roms = library(&temp).join("roms");
    for (i, len) in [1usize, 3, 7, 11, 4096].into_iter().enumerate() {
        fs::write(roms.join(format!("miss{i}.nes")), vec![b'x'; len]).unwrap();
    }

    let (records, result) = scan(&config, &library(&temp));
    let summary = result.unwrap();

    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|r| !r.is_match() && r.name.is_empty()));
    assert_eq!(summary.size_rejected, 5);
    assert_eq!(summary.digests_computed, 0);
    assert_eq!(summary.bytes_hashed, 0);
}

#[test]
fn test_digest_without_entry_is_a_miss() {
    let mut fixture = IndexFixture::new();
    fixture.add_size(GAME1.len() as u64);
    let (temp, config) = setup(&fixture);
    fs::write(library(&temp).join("roms/lookalike.nes"), GAME1).unwrap();

    let (records, result) = scan(&config, &library(&temp));
    let summary = result.unwrap();

    assert_eq!(records, vec![MatchRecord::unmatched("/roms", "lookalike.nes")]);
    assert_eq!(summary.digests_computed, 1);
    assert_eq!(summary.lookup_misses(), 1);
}

#[test]
fn test_unrecognized_files_are_ignored() {
    let fixture = IndexFixture::new();
    let (temp, config) = setup(&fixture);
    fs::write(library(&temp).join("roms/notes.txt"), GAME1).unwrap();
    fs::write(library(&temp).join("roms/README"), GAME1).unwrap();

    let (records, result) = scan(&config, &library(&temp));
    assert!(records.is_empty());
    assert_eq!(result.unwrap().candidates, 0);
}

#[test]
fn test_archive_member_path_and_match() {
    let mut fixture = IndexFixture::new();
    let digest = fixture.add_game(GAME1, "NES;Zipped Game");
    let (temp, config) = setup(&fixture);
    write_zip(
        &library(&temp).join("roms/pack.zip"),
        &[
            ("inner.nes", GAME1),
            ("readme.txt", b"ignored"),
            ("other.gb", b"not in the filters"),
        ],
    );

    let (records, result) = scan(&config, &library(&temp));
    let summary = result.unwrap();

    assert_eq!(
        records,
        vec![
            MatchRecord::matched("/roms", "pack.zip/inner.nes", "NES", "Zipped Game", digest),
            MatchRecord::unmatched("/roms", "pack.zip/other.gb"),
        ]
    );
    assert_eq!(summary.archives_opened, 1);
    assert_eq!(summary.digests_computed, 1);
}

#[test]
fn test_archive_member_names_are_cleaned() {
    let mut fixture = IndexFixture::new();
    let digest = fixture.add_game(GAME1, "NES;Dotted");
    let (temp, config) = setup(&fixture);
    write_zip(&library(&temp).join("p.zip"), &[("./sub/../x.nes", GAME1)]);

    let (records, result) = scan(&config, &library(&temp));
    result.unwrap();

    assert_eq!(
        records,
        vec![MatchRecord::matched("/", "p.zip/x.nes", "NES", "Dotted", digest)]
    );
}

#[test]
fn test_archive_crc_miss_skips_decompression() {
    let mut fixture = IndexFixture::new();
    fixture.add_size(GAME1.len() as u64);
    let (temp, config) = setup(&fixture);
    write_zip(&library(&temp).join("pack.zip"), &[("same_size.sfc", b"9876543210")]);

    let (records, result) = scan(&config, &library(&temp));
    let summary = result.unwrap();

    assert_eq!(records, vec![MatchRecord::unmatched("/", "pack.zip/same_size.sfc")]);
    assert_eq!(summary.crc_rejected, 1);
    assert_eq!(summary.digests_computed, 0);
}

#[test]
fn test_missing_crc_filter_emits_nothing() {
    let mut fixture = IndexFixture::new();
    fixture.add_game(GAME1, "NES;Known");
    let fixture = fixture.without_filter(CRC_FILTER_KEY);
    let (temp, config) = setup(&fixture);
    fs::write(library(&temp).join("roms/game.nes"), GAME1).unwrap();

    let (records, result) = scan(&config, &library(&temp));

    assert!(records.is_empty());
    match result {
        Err(ScanError::MissingIndex { key }) => assert_eq!(key, CRC_FILTER_KEY),
        other => panic!("expected MissingIndex, got {other:?}"),
    }
}

#[test]
fn test_missing_size_filter_is_index_failure() {
    let fixture = IndexFixture::new().without_filter(SIZE_FILTER_KEY);
    let (temp, config) = setup(&fixture);

    let (records, result) = scan(&config, &library(&temp));
    assert!(records.is_empty());
    assert!(result.unwrap_err().is_index_failure());
}

#[test]
fn test_missing_databank_is_store_unavailable() {
    let temp = TempDir::new().unwrap();
    let config = EngineConfig::new(temp.path());

    let (_, result) = scan(&config, temp.path());
    assert!(matches!(result, Err(ScanError::StoreUnavailable { .. })));
}

#[test]
fn test_corrupt_archive_aborts_after_earlier_records() {
    let mut fixture = IndexFixture::new();
    fixture.add_game(GAME1, "NES;Known");
    let (temp, config) = setup(&fixture);
    fs::write(library(&temp).join("a.nes"), GAME1).unwrap();
    fs::write(library(&temp).join("b.zip"), b"this is not a zip archive").unwrap();
    fs::write(library(&temp).join("c.nes"), GAME1).unwrap();

    let (records, result) = scan(&config, &library(&temp));

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].file, "a.nes");
    assert!(result.unwrap_err().is_io_failure());
}

#[test]
fn test_damaged_member_aborts_after_earlier_records() {
    const MEMBER: &[u8] = b"stored member payload with a unique body";
    let mut fixture = IndexFixture::new();
    fixture.add_game(GAME1, "NES;Known");
    fixture.add_game(MEMBER, "NES;Inside");
    let (temp, config) = setup(&fixture);
    let lib = library(&temp);
    fs::write(lib.join("a.nes"), GAME1).unwrap();
    write_damaged_zip(&lib.join("b.zip"), "x.nes", MEMBER);
    fs::write(lib.join("c.nes"), GAME1).unwrap();

    let (records, result) = scan(&config, &lib);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].file, "a.nes");
    let err = result.unwrap_err();
    assert!(err.is_io_failure(), "unexpected error: {err:?}");
    assert!(matches!(err, ScanError::Io { .. }));
}

#[test]
fn test_zero_length_file_is_a_candidate() {
    let mut fixture = IndexFixture::new();
    fixture.add_game(b"", "X;Empty");
    let (temp, config) = setup(&fixture);
    fs::write(library(&temp).join("e.nes"), b"").unwrap();

    let (records, result) = scan(&config, &library(&temp));
    let summary = result.unwrap();

    assert_eq!(
        records,
        vec![MatchRecord::matched(
            "/",
            "e.nes",
            "X",
            "Empty",
            "d41d8cd98f00b204e9800998ecf8427e"
        )]
    );
    assert_eq!(serde_json::to_value(&records[0]).unwrap()[2], "Empty");
    assert_eq!(summary.digests_computed, 1);
    assert_eq!(summary.bytes_hashed, 0);
}

#[test]
fn test_zero_length_file_without_entry_is_not_digested() {
    let (temp, config) = setup(&IndexFixture::new());
    fs::write(library(&temp).join("e.nes"), b"").unwrap();

    let (records, result) = scan(&config, &library(&temp));
    let summary = result.unwrap();

    assert_eq!(records, vec![MatchRecord::unmatched("/", "e.nes")]);
    assert_eq!(summary.size_rejected, 1);
    assert_eq!(summary.digests_computed, 0);
}

#[test]
fn test_base_must_be_a_directory() {
    let fixture = IndexFixture::new();
    let (temp, config) = setup(&fixture);
    let file = library(&temp).join("roms/game.nes");
    fs::write(&file, GAME1).unwrap();

    let (_, result) = scan(&config, &file);
    assert!(matches!(result, Err(ScanError::NotADirectory { .. })));
}

#[test]
fn test_repeated_scans_are_identical() {
    let mut fixture = IndexFixture::new();
    fixture.add_game(GAME1, "NES;One");
    fixture.add_game(b"second game payload", "GB;Two");
    let (temp, config) = setup(&fixture);
    let lib = library(&temp);
    fs::create_dir_all(lib.join("roms/sub")).unwrap();
    fs::write(lib.join("roms/one.nes"), GAME1).unwrap();
    fs::write(lib.join("roms/sub/two.gb"), b"second game payload").unwrap();
    fs::write(lib.join("roms/sub/three.gb"), b"unknown").unwrap();
    write_zip(&lib.join("roms/set.zip"), &[("two.gb", b"second game payload")]);

    let (first, result) = scan(&config, &lib);
    result.unwrap();
    let (second, result) = scan(&config, &lib);
    result.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.iter().filter(|r| r.is_match()).count(), 3);
}

#[test]
fn test_extra_extensions_become_candidates() {
    let mut fixture = IndexFixture::new();
    fixture.add_game(GAME1, "WS;Swan Game");
    let (temp, config) = setup(&fixture);
    fs::write(library(&temp).join("game.ws"), GAME1).unwrap();

    let index = GameIndex::open(config.databank_path()).unwrap();
    let mut records = Vec::new();

    GamePipeline::new(&index)
        .run(&library(&temp), &mut records)
        .unwrap();
    assert!(records.is_empty());

    GamePipeline::new(&index)
        .with_extensions(ExtensionSet::with_extra(["ws"]))
        .run(&library(&temp), &mut records)
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Swan Game");

    index.close().unwrap();
}

#[test]
fn test_results_written_as_jsonl() {
    let mut fixture = IndexFixture::new();
    fixture.add_game(GAME1, "Nintendo;Super Game");
    let (temp, config) = setup(&fixture);
    let lib = library(&temp);
    fs::write(lib.join("roms/game1.nes"), GAME1).unwrap();
    fs::write(lib.join("roms/unknown.nes"), b"abc").unwrap();

    let output = games_output_path(&config.games_db_dir(), &lib);
    let service = ScanService::new(config.clone()).unwrap();
    let mut sink = JsonlSink::create(&output).unwrap();
    service.scan_games_into(&lib, &mut sink).unwrap();
    let written = sink.finish().unwrap();

    let records = read_results(&written).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].code, "Nintendo");
    let content = fs::read_to_string(&written).unwrap();
    assert!(content.ends_with("[\"/roms\",\"unknown.nes\",\"\",\"\",\"\"]\n"));
}
