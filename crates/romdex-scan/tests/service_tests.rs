use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use romdex_index::fixtures::IndexFixture;
use romdex_index::CRC_FILTER_KEY;
use romdex_scan::{EngineConfig, MatchRecord, ScanError, ScanService};
use tempfile::TempDir;

const GAME1: &[u8] = b"0123456789";
const WAIT: Duration = Duration::from_millis(300);

/// A data root with a databank and `count` candidate files in `library/roms`.
fn setup(fixture: &IndexFixture, count: usize, capacity: usize) -> (TempDir, PathBuf, ScanService) {
    let temp = TempDir::new().unwrap();
    let mut config = EngineConfig::new(temp.path());
    config.channel_capacity = capacity;
    let databank = config.databank_path();
    fs::create_dir_all(databank.parent().unwrap()).unwrap();
    fixture.write(&databank).unwrap();

    let library = temp.path().join("library");
    fs::create_dir_all(library.join("roms")).unwrap();
    for i in 0..count {
        fs::write(library.join(format!("roms/game{i:02}.nes")), GAME1).unwrap();
    }

    let service = ScanService::new(config).unwrap();
    (temp, library, service)
}

fn known_fixture() -> IndexFixture {
    let mut fixture = IndexFixture::new();
    fixture.add_game(GAME1, "Nintendo;Super Game");
    fixture
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stream_delivers_records_in_walk_order() {
    let (_temp, library, service) = setup(&known_fixture(), 3, 2);

    let (records, result) = service.scan_games(&library).collect().await;
    let summary = result.unwrap();

    let files: Vec<_> = records.iter().map(|r| r.file.as_str()).collect();
    assert_eq!(files, vec!["game00.nes", "game01.nes", "game02.nes"]);
    assert!(records.iter().all(MatchRecord::is_match));
    assert_eq!(summary.matches, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stream_missing_index_yields_no_records() {
    let fixture = known_fixture().without_filter(CRC_FILTER_KEY);
    let (_temp, library, service) = setup(&fixture, 2, 4);

    let (records, result) = service.scan_games(&library).collect().await;

    assert!(records.is_empty());
    assert!(matches!(result, Err(ScanError::MissingIndex { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dropped_consumer_stops_producer() {
    let (_temp, library, service) = setup(&known_fixture(), 6, 1);

    let mut stream = service.scan_games(&library);
    assert!(stream.recv().await.is_some());

    let result = stream.finish().await;
    assert!(matches!(result, Err(ScanError::Disconnected)));
    assert!(!service.coordinator().is_busy());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_folder_scan_waits_for_games_scan() {
    let (_temp, library, service) = setup(&known_fixture(), 6, 1);

    // Backpressure keeps the games scan holding the gate while undrained.
    let mut stream = service.scan_games(&library);
    assert!(stream.recv().await.is_some());
    assert!(service.coordinator().is_busy());

    let blocked = tokio::time::timeout(WAIT, service.scan_folders(&library, true)).await;
    assert!(blocked.is_err(), "folder scan ran while the games scan held the gate");

    let mut remaining = 0;
    while stream.recv().await.is_some() {
        remaining += 1;
    }
    assert_eq!(remaining, 5);
    stream.finish().await.unwrap();

    let tree = tokio::time::timeout(WAIT, service.scan_folders(&library, true))
        .await
        .expect("gate was not released")
        .unwrap();
    assert!(tree.descendant_count() > 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_games_scans_are_serialized() {
    let (_temp, library, service) = setup(&known_fixture(), 4, 1);

    let mut first = service.scan_games(&library);
    assert!(first.recv().await.is_some());

    let mut second = service.clone().scan_games(&library);
    let early = tokio::time::timeout(WAIT, second.recv()).await;
    assert!(early.is_err(), "second scan produced a record while the first held the gate");

    let (rest, result) = first.collect().await;
    assert_eq!(rest.len(), 3);
    result.unwrap();

    let (records, result) = second.collect().await;
    assert_eq!(records.len(), 4);
    result.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_progress_reports_final_counts() {
    let (_temp, library, service) = setup(&known_fixture(), 3, 4);
    let mut progress_rx = service.subscribe();

    let (_, result) = service.scan_games(&library).collect().await;
    result.unwrap();

    let mut last = None;
    while let Ok(progress) = progress_rx.try_recv() {
        last = Some(progress);
    }
    let last = last.expect("no progress published");
    assert_eq!(last.candidates, 3);
    assert_eq!(last.matches, 3);
    assert_eq!(last.bytes_hashed, 30);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_flat_folder_scan_through_service() {
    let (_temp, library, service) = setup(&known_fixture(), 1, 4);
    fs::create_dir_all(library.join("roms/USA/Disk 1")).unwrap();

    let tree = service.scan_folders(&library, false).await.unwrap();
    let recursive = service.scan_folders(&library, true).await.unwrap();

    assert_eq!(recursive.descendant_count(), tree.descendant_count() + 2);
}

#[test]
fn test_zero_capacity_is_rejected() {
    let temp = TempDir::new().unwrap();
    let mut config = EngineConfig::new(temp.path());
    config.channel_capacity = 0;
    assert!(matches!(
        ScanService::new(config),
        Err(ScanError::InvalidConfig { .. })
    ));
}
