//! Configuration loading and validation

use reverie::config::Config;

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&dir.path().join("nope.toml")).unwrap();

    assert_eq!(config.audio.sample_rate, 16_000);
    assert_eq!(config.audio.chunk_size, 1024);
    assert_eq!(config.audio.max_silent_frames, 10);
    assert_eq!(config.image.model, "dalle3");
    assert_eq!(config.storage.max_recents, 25);
}

#[test]
fn partial_file_overrides_only_named_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reverie.toml");
    std::fs::write(
        &path,
        r#"
[audio]
silence_threshold = 500

[image]
model = "sdxl"
width = 768
"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.audio.silence_threshold, 500);
    assert_eq!(config.audio.chunk_size, 1024);
    assert_eq!(config.image.model, "sdxl");
    assert_eq!(config.image.width, 768);
    assert_eq!(config.image.height, 1024);
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reverie.toml");
    std::fs::write(&path, "audio = \"not a table\"").unwrap();

    assert!(Config::load(&path).is_err());
}

#[test]
fn unknown_top_level_key_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reverie.toml");
    std::fs::write(&path, "[typo_section]\nx = 1\n").unwrap();

    assert!(Config::load(&path).is_err());
}

#[test]
fn unknown_image_model_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reverie.toml");
    std::fs::write(&path, "[image]\nmodel = \"imagine9000\"\n").unwrap();

    assert!(Config::load(&path).is_err());
}

#[test]
fn inverted_daydream_interval_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reverie.toml");
    std::fs::write(&path, "[daydream]\nmin_minutes = 60\nmax_minutes = 5\n").unwrap();

    assert!(Config::load(&path).is_err());
}

#[test]
fn zero_chunk_size_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reverie.toml");
    std::fs::write(&path, "[audio]\nchunk_size = 0\n").unwrap();

    assert!(Config::load(&path).is_err());
}
