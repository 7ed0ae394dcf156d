//! Reverie: a voice-driven painting kiosk
//!
//! Visitors describe a scene out loud; the kiosk transcribes the request,
//! moderates it, paints it with a cloud image model, writes a short verse
//! for it, and puts the composition on a gallery screen with a QR share
//! link. Left alone long enough, it daydreams a creation of its own.
//!
//! The crate is split into the capture/speech pipeline ([`voice`]), the
//! chat characters ([`chat`]), image generation providers ([`imagegen`]),
//! frame composition ([`canvas`]), artifact publishing ([`storage`]), and
//! the sequential orchestration loop ([`engine`]) that the window shell
//! ([`app`]) drives with key events.

pub mod app;
pub mod canvas;
pub mod chat;
pub mod config;
pub mod engine;
pub mod error;
pub mod imagegen;
pub mod moderation;
pub mod qr;
pub mod recents;
pub mod storage;
pub mod voice;

pub use error::{Error, Result};
