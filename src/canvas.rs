//! Raster composition for the kiosk display
//!
//! All frames are composed off-screen into plain RGBA buffers: the creation
//! layout, the status screen, the prompt-reveal card, and overlay blits. The
//! window layer only ever displays finished frames, and the same buffers are
//! saved as PNG artifacts, so what is uploaded is exactly what was shown.
//!
//! Word-wrap and font-fit decisions are pure functions over a measuring
//! closure, so layout behavior is testable without font assets.

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{imageops, Rgba, RgbaImage};

use crate::config::DisplayConfig;
use crate::{Error, Result};

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const CARD_BORDER: Rgba<u8> = Rgba([230, 210, 60, 255]);

/// Smallest font size the fitting loop will shrink to
const MIN_FONT_SIZE: u32 = 8;

/// Which side of the frame the image lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Image left, verse right
    Left,
    /// Image right, verse left
    Right,
}

/// A full creation: the image and its verse
#[derive(Debug, Clone)]
pub struct Creation {
    /// Decoded generated image
    pub image: RgbaImage,

    /// Verse lines, already split and trimmed
    pub verse_lines: Vec<String>,

    /// The prompt that produced it
    pub prompt: String,

    /// Whether this was an autonomous daydream
    pub is_daydream: bool,
}

/// Composes kiosk frames
pub struct Canvas {
    config: DisplayConfig,
    verse_font: FontVec,
    status_font: FontVec,
}

impl Canvas {
    /// Load the configured fonts and build a canvas
    ///
    /// # Errors
    ///
    /// Returns error if a font file is missing or not a parsable TTF/OTF
    pub fn new(config: DisplayConfig) -> Result<Self> {
        let verse_font = load_font(&config.verse_font)?;
        let status_font = load_font(&config.status_font)?;

        Ok(Self {
            config,
            verse_font,
            status_font,
        })
    }

    /// Frame width in pixels
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.config.width
    }

    /// Frame height in pixels
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.config.height
    }

    /// Compose a creation: image on one side, verse centered in the rest
    #[must_use]
    pub fn render_creation(&self, creation: &Creation, side: Side) -> RgbaImage {
        let mut frame = RgbaImage::from_pixel(self.config.width, self.config.height, BLACK);

        let img_w = creation.image.width();
        let margin = self.config.horiz_margin;

        let (img_x, verse_x) = match side {
            Side::Left => (margin, margin + img_w + margin),
            Side::Right => (self.config.width.saturating_sub(margin + img_w), margin),
        };

        imageops::overlay(
            &mut frame,
            &creation.image,
            i64::from(img_x),
            i64::from(self.config.vert_margin),
        );

        let max_verse_width = self
            .config
            .width
            .saturating_sub(img_w)
            .saturating_sub(margin * 3);

        let size = shrink_to_fit(self.config.verse_font_max_size, max_verse_width, |s| {
            creation
                .verse_lines
                .iter()
                .map(|line| measure_width(&self.verse_font, s, line))
                .max()
                .unwrap_or(0)
        });

        let line_count = creation.verse_lines.len().max(1) as u32;
        let line_h = line_height(&self.verse_font, size);
        let total = line_count * line_h + line_count.saturating_sub(1) * self.config.verse_line_spacing;

        // Center the block on the vertical midline, stepping by total/lines
        // so the spacing survives rounding the way the layout always has
        let mut offset = -(i64::from(total) / 2);
        for line in &creation.verse_lines {
            let y = i64::from(self.config.height) / 2 + offset;
            draw_text(&mut frame, &self.verse_font, size, i64::from(verse_x), y, WHITE, line);
            offset += i64::from(total / line_count);
        }

        frame
    }

    /// Compose the idle/status screen: title, subtitle, centered status text
    #[must_use]
    pub fn render_status(&self, status: &str) -> RgbaImage {
        let mut frame = RgbaImage::from_pixel(self.config.width, self.config.height, BLACK);
        let width = i64::from(self.config.width);
        let height = i64::from(self.config.height);

        let h1 = self.config.status_heading1_size;
        let h1_w = measure_width(&self.status_font, h1, &self.config.title);
        let mut y = i64::from(self.config.vert_margin);
        draw_text(
            &mut frame,
            &self.status_font,
            h1,
            (width - i64::from(h1_w)) / 2,
            y,
            WHITE,
            &self.config.title,
        );
        y += i64::from(line_height(&self.status_font, h1));

        let h2 = self.config.status_heading2_size;
        let h2_w = measure_width(&self.status_font, h2, &self.config.subtitle);
        draw_text(
            &mut frame,
            &self.status_font,
            h2,
            (width - i64::from(h2_w)) / 2,
            y,
            WHITE,
            &self.config.subtitle,
        );

        let s = self.config.status_size;
        let s_w = measure_width(&self.status_font, s, status);
        let s_h = line_height(&self.status_font, s);
        draw_text(
            &mut frame,
            &self.status_font,
            s,
            (width - i64::from(s_w)) / 2,
            (height - i64::from(s_h)) / 2,
            WHITE,
            status,
        );

        frame
    }

    /// Overlay a prompt-reveal card on a copy of the current frame
    #[must_use]
    pub fn render_prompt_card(&self, base: &RgbaImage, prompt: &str, source: &str) -> RgbaImage {
        let card_w = self.config.width * 3 / 4;
        let card_h = self.config.height * 2 / 5;
        let margin: u32 = 10;

        let mut card = RgbaImage::from_pixel(card_w, card_h, CARD_BORDER);
        let inner = RgbaImage::from_pixel(
            card_w.saturating_sub(margin * 2),
            card_h.saturating_sub(margin * 2),
            BLACK,
        );
        imageops::overlay(&mut card, &inner, i64::from(margin), i64::from(margin));

        let size = self.config.prompt_font_size;
        let text_width = card_w.saturating_sub(margin * 8);
        let prompt_text = format!("Prompt: {prompt}");
        let source_text = format!("Source: {source}");

        let mut lines = wrap_words(&prompt_text, text_width, |s| {
            measure_width(&self.status_font, size, s)
        });
        lines.push(String::new());
        lines.push(source_text);

        let line_h = line_height(&self.status_font, size);
        let total = lines.len() as u32 * line_h;
        let mut y = i64::from(card_h.saturating_sub(total)) / 2;
        for line in &lines {
            draw_text(
                &mut card,
                &self.status_font,
                size,
                i64::from(margin * 3),
                y,
                WHITE,
                line,
            );
            y += i64::from(line_h);
        }

        overlay_centered(base, &card)
    }

    /// Overlay an already-rendered image (e.g. the QR code) centered on a
    /// copy of the current frame
    #[must_use]
    pub fn render_overlay(&self, base: &RgbaImage, overlay: &RgbaImage) -> RgbaImage {
        overlay_centered(base, overlay)
    }
}

fn load_font(path: &std::path::Path) -> Result<FontVec> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::Canvas(format!("cannot read font {}: {e}", path.display())))?;
    FontVec::try_from_vec(bytes)
        .map_err(|e| Error::Canvas(format!("cannot parse font {}: {e}", path.display())))
}

fn overlay_centered(base: &RgbaImage, top: &RgbaImage) -> RgbaImage {
    let mut frame = base.clone();
    let x = (i64::from(base.width()) - i64::from(top.width())) / 2;
    let y = (i64::from(base.height()) - i64::from(top.height())) / 2;
    imageops::overlay(&mut frame, top, x.max(0), y.max(0));
    frame
}

/// Pixel width of a string at a font size
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn measure_width(font: &FontVec, size: u32, text: &str) -> u32 {
    let scaled = font.as_scaled(PxScale::from(size as f32));

    let mut width = 0.0f32;
    let mut prev = None;
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(p) = prev {
            width += scaled.kern(p, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }

    width.ceil().max(0.0) as u32
}

/// Line height (ascent to descent plus line gap) at a font size
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn line_height(font: &FontVec, size: u32) -> u32 {
    let scaled = font.as_scaled(PxScale::from(size as f32));
    (scaled.ascent() - scaled.descent() + scaled.line_gap()).ceil() as u32
}

/// Rasterize one line of text with its top-left corner at (x, y)
#[allow(clippy::cast_possible_truncation)]
fn draw_text(
    img: &mut RgbaImage,
    font: &FontVec,
    size: u32,
    x: i64,
    y: i64,
    color: Rgba<u8>,
    text: &str,
) {
    #[allow(clippy::cast_precision_loss)]
    let scale = PxScale::from(size as f32);
    let scaled = font.as_scaled(scale);

    let mut pen_x = x as f32;
    let baseline = y as f32 + scaled.ascent();
    let mut prev = None;

    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(p) = prev {
            pen_x += scaled.kern(p, id);
        }

        let glyph = id.with_scale_and_position(scale, ab_glyph::point(pen_x, baseline));
        if let Some(outlined) = scaled.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let px = bounds.min.x as i64 + i64::from(gx);
                let py = bounds.min.y as i64 + i64::from(gy);
                blend_pixel(img, px, py, color, coverage);
            });
        }

        pen_x += scaled.h_advance(id);
        prev = Some(id);
    }
}

/// Alpha-blend a coverage value onto one pixel, ignoring out-of-bounds hits
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn blend_pixel(img: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= i64::from(img.width()) || y >= i64::from(img.height()) {
        return;
    }
    let coverage = coverage.clamp(0.0, 1.0);
    let pixel = img.get_pixel_mut(x as u32, y as u32);
    for i in 0..3 {
        let src = f32::from(color.0[i]) * coverage;
        let dst = f32::from(pixel.0[i]) * (1.0 - coverage);
        pixel.0[i] = (src + dst).round().min(255.0) as u8;
    }
    pixel.0[3] = 255;
}

/// Shrink a font size in steps of 2 until the widest line fits
///
/// `widest` reports the widest line's pixel width at a candidate size.
/// Bottoms out at a minimum size rather than looping forever on a column
/// too narrow for any text.
#[must_use]
pub fn shrink_to_fit(max_size: u32, max_width: u32, widest: impl Fn(u32) -> u32) -> u32 {
    let mut size = max_size;
    while size > MIN_FONT_SIZE && widest(size) >= max_width {
        size = size.saturating_sub(2);
    }
    size.max(MIN_FONT_SIZE)
}

/// Greedy word-wrap against a pixel-measuring closure
///
/// A single word wider than the limit gets its own line rather than being
/// split mid-word.
#[must_use]
pub fn wrap_words(text: &str, max_width: u32, measure: impl Fn(&str) -> u32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let candidate = if line.is_empty() {
            word.to_string()
        } else {
            format!("{line} {word}")
        };

        if !line.is_empty() && measure(&candidate) > max_width {
            lines.push(std::mem::take(&mut line));
            line = word.to_string();
        } else {
            line = candidate;
        }
    }

    if !line.is_empty() {
        lines.push(line);
    }

    lines
}
