//! Artifact naming, share pages, and the recents carousel

use reverie::chat::parse_critic_choice;
use reverie::config::VoiceConfig;
use reverie::engine::random_base_name;
use reverie::recents::{self, RecentCreation};
use reverie::storage::{blob_url, render_share_page};
use reverie::voice::build_ssml;

fn entry(name: &str) -> RecentCreation {
    RecentCreation {
        base_name: name.to_string(),
        prompt: format!("prompt for {name}"),
        daydream: false,
    }
}

#[test]
fn blob_urls_are_public_and_credential_free() {
    let url = blob_url("galleryacct", "creations", "abc123.png");
    assert_eq!(
        url,
        "https://galleryacct.blob.core.windows.net/creations/abc123.png"
    );
    assert!(!url.contains('?'));
}

#[test]
fn share_page_fills_every_placeholder() {
    let template = "<img src=\"***IMG-URL***\"> ***PROMPT*** by ***GEN-BY*** at ***TIME***";
    let html = render_share_page(template, "https://x/y.png", "a red fox", "Visitor", "noon");

    assert_eq!(html, "<img src=\"https://x/y.png\"> a red fox by Visitor at noon");
    assert!(!html.contains("***"));
}

#[test]
fn recents_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recents.json");

    let list = vec![entry("aaa"), entry("bbb")];
    recents::save(&path, &list).unwrap();
    assert_eq!(recents::load(&path).unwrap(), list);
}

#[test]
fn missing_recents_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    assert!(recents::load(&dir.path().join("recents.json"))
        .unwrap()
        .is_empty());
}

#[test]
fn recents_cap_drops_oldest() {
    let mut list = vec![entry("a"), entry("b"), entry("c")];
    recents::push_capped(&mut list, entry("d"), 3);

    let names: Vec<&str> = list.iter().map(|e| e.base_name.as_str()).collect();
    assert_eq!(names, vec!["b", "c", "d"]);
}

#[test]
fn recents_below_cap_just_appends() {
    let mut list = vec![entry("a")];
    recents::push_capped(&mut list, entry("b"), 25);
    assert_eq!(list.len(), 2);
}

#[test]
fn base_names_are_lowercase_alphanumeric() {
    for _ in 0..20 {
        let name = random_base_name(12);
        assert_eq!(name.len(), 12);
        assert!(name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }
}

#[test]
fn critic_choice_takes_first_digit() {
    assert_eq!(parse_critic_choice("Poem 2 is the best", 3), Some(1));
    assert_eq!(parse_critic_choice("3", 3), Some(2));
    assert_eq!(parse_critic_choice("I pick number 1.", 3), Some(0));
}

#[test]
fn critic_choice_rejects_out_of_range_and_digit_free() {
    assert_eq!(parse_critic_choice("Poem 7", 3), None);
    assert_eq!(parse_critic_choice("0", 3), None);
    assert_eq!(parse_critic_choice("the second one", 3), None);
}

#[test]
fn minimal_ssml_has_no_optional_layers() {
    let voice = VoiceConfig::default();
    let ssml = build_ssml(&voice, "Hello there");

    assert!(ssml.contains("<voice name=\"en-US-JennyNeural\">Hello there</voice>"));
    assert!(!ssml.contains("<prosody"));
    assert!(!ssml.contains("express-as"));
}

#[test]
fn configured_ssml_nests_style_around_prosody() {
    let voice = VoiceConfig {
        style: Some("cheerful".to_string()),
        pitch: Some("+5%".to_string()),
        rate: Some("-10%".to_string()),
        ..VoiceConfig::default()
    };
    let ssml = build_ssml(&voice, "Hi");

    assert!(ssml.contains(
        "<mstts:express-as style=\"cheerful\"><prosody pitch=\"+5%\" rate=\"-10%\">Hi</prosody></mstts:express-as>"
    ));
}

#[test]
fn ssml_escapes_markup_in_text() {
    let ssml = build_ssml(&VoiceConfig::default(), "fish & <chips>");
    assert!(ssml.contains("fish &amp; &lt;chips&gt;"));
}
