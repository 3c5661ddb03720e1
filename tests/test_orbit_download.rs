use gmtsar_stack::io::orbit::{select_orbit_file, OrbitType};
use gmtsar_stack::{AnnotationParser, OrbitConfig, OrbitDownloader, OrbitSource};
use std::path::Path;

const ANNOTATION: &str = "tests/data/s1a-iw1-slc-vv-20160501t012345-20160501t012412-011051-010bfb-004.xml";

/// Network tests only run when GMTSAR_STACK_ONLINE is set
fn online() -> bool {
    if std::env::var_os("GMTSAR_STACK_ONLINE").is_none() {
        println!("GMTSAR_STACK_ONLINE not set, skipping orbit download test");
        return false;
    }
    true
}

#[test]
fn test_orbit_download_functionality() {
    let _ = env_logger::builder().is_test(true).try_init();
    if !online() {
        return;
    }

    let metadata = AnnotationParser::read_metadata(Path::new(ANNOTATION)).expect("Failed to read annotation");
    println!("=== Orbit Download Test ===");
    println!("Start time: {}", metadata.start_time);
    println!("Stop time: {}", metadata.stop_time);

    let downloader = OrbitDownloader::new(OrbitConfig::default()).expect("Failed to create downloader");
    let names = downloader
        .list_orbit_files(OrbitType::POEORB)
        .expect("Failed to list precise orbits");
    println!("{} precise orbit files listed", names.len());
    assert!(!names.is_empty());

    match select_orbit_file(&names, metadata.start_time, metadata.stop_time) {
        Some(entry) => println!("Covering orbit: {}", entry.name),
        None => {
            println!("No covering orbit listed, skipping download");
            return;
        }
    }

    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let path = downloader
        .fetch_orbit(&metadata, temp_dir.path())
        .expect("Failed to download orbit");
    println!("Orbit file saved to: {}", path.display());

    let content = std::fs::read_to_string(&path).expect("Failed to read orbit file");
    assert!(content.contains("Earth_Explorer_File"));

    // Second fetch reuses the local copy
    let again = downloader.fetch_orbit(&metadata, temp_dir.path()).unwrap();
    assert_eq!(again, path);
}

#[test]
fn test_unreachable_archive() {
    let config = OrbitConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        timeout_secs: 2,
        ..OrbitConfig::default()
    };
    let downloader = OrbitDownloader::new(config).unwrap();
    let result = downloader.list_orbit_files(OrbitType::RESORB);
    assert!(result.is_err());
}
