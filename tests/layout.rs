//! Layout decisions, tested through measuring closures instead of fonts

use reverie::canvas::{shrink_to_fit, wrap_words};

/// Ten pixels per character, spaces included
fn ten_px(s: &str) -> u32 {
    s.chars().count() as u32 * 10
}

#[test]
fn wrap_splits_on_word_boundaries() {
    let lines = wrap_words("the quick brown fox jumps", 100, ten_px);
    assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
}

#[test]
fn wrap_keeps_short_text_on_one_line() {
    let lines = wrap_words("short", 1000, ten_px);
    assert_eq!(lines, vec!["short"]);
}

#[test]
fn wrap_gives_overwide_word_its_own_line() {
    let lines = wrap_words("a incomprehensibilities b", 100, ten_px);
    assert_eq!(lines, vec!["a", "incomprehensibilities", "b"]);
}

#[test]
fn wrap_collapses_whitespace() {
    let lines = wrap_words("  a   b  ", 1000, ten_px);
    assert_eq!(lines, vec!["a b"]);
}

#[test]
fn wrap_of_empty_text_is_empty() {
    assert!(wrap_words("", 100, ten_px).is_empty());
    assert!(wrap_words("   ", 100, ten_px).is_empty());
}

#[test]
fn shrink_stops_at_first_fitting_size() {
    // Width scales linearly with size; must get strictly under 300
    let size = shrink_to_fit(72, 300, |s| s * 10);
    assert_eq!(size, 28);
}

#[test]
fn shrink_keeps_max_size_when_it_fits() {
    assert_eq!(shrink_to_fit(72, 100_000, |s| s * 10), 72);
}

#[test]
fn shrink_bottoms_out_at_minimum() {
    assert_eq!(shrink_to_fit(72, 10, |_| u32::MAX), 8);
}

#[test]
fn qr_render_has_quiet_zone_and_finder_pattern() {
    let img = reverie::qr::encode("https://example.com/abc.html").unwrap();

    assert_eq!(img.width(), img.height());
    // Quiet zone stays white
    assert_eq!(img.get_pixel(0, 0), &image::Rgba([255, 255, 255, 255]));
    // Top-left finder pattern starts right after the quiet zone
    assert_eq!(img.get_pixel(32, 32), &image::Rgba([0, 0, 0, 255]));
}
