//! A single-page drawing surface over `pdf-writer`.
//!
//! Coordinates are given from the top-left corner in points and flipped to
//! PDF's bottom-left origin as each operator is written.

use bytes::Bytes;
use pdf_writer::{Content, Finish, Pdf, Rect, Ref, Str};

use super::metrics::{self, Font};

/// US Letter portrait, in points.
pub const LETTER: (f32, f32) = (612.0, 792.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
  pub r: f32,
  pub g: f32,
  pub b: f32,
}

impl Color {
  pub const WHITE: Color = Color::hex(0xffffff);

  /// `0x1f4ab8` style.
  pub const fn hex(rgb: u32) -> Self {
    Self {
      r: ((rgb >> 16) & 0xff) as f32 / 255.0,
      g: ((rgb >> 8) & 0xff) as f32 / 255.0,
      b: (rgb & 0xff) as f32 / 255.0,
    }
  }
}

/// Font, size and fill colour for a run of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
  pub font:  Font,
  pub size:  f32,
  pub color: Color,
}

impl Style {
  pub const fn new(font: Font, size: f32, color: Color) -> Self { Self { font, size, color } }

  pub fn width(&self, text: &str) -> f32 { self.font.width(text, self.size) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
  Left,
  Center,
}

pub struct Canvas {
  width:   f32,
  height:  f32,
  content: Content,
}

impl Canvas {
  pub fn new((width, height): (f32, f32)) -> Self { Self { width, height, content: Content::new() } }

  pub fn width(&self) -> f32 { self.width }

  /// Draw `text` with its baseline at `y`. `x` is the left edge or the
  /// centre depending on `align`.
  pub fn text(&mut self, x: f32, y: f32, text: &str, style: Style, align: Align) {
    let x = match align {
      Align::Left => x,
      Align::Center => x - style.width(text) / 2.0,
    };
    let Color { r, g, b } = style.color;
    let encoded = metrics::encode(text);
    self.content.set_fill_rgb(r, g, b);
    self
      .content
      .begin_text()
      .set_font(style.font.resource(), style.size)
      .next_line(x, self.height - y)
      .show(Str(&encoded))
      .end_text();
  }

  pub fn line(&mut self, (x1, y1): (f32, f32), (x2, y2): (f32, f32), width: f32, color: Color) {
    self
      .content
      .set_stroke_rgb(color.r, color.g, color.b)
      .set_line_width(width)
      .move_to(x1, self.height - y1)
      .line_to(x2, self.height - y2)
      .stroke();
  }

  /// Rectangle with its top-left corner at (`x`, `y`).
  pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
    self
      .content
      .set_fill_rgb(color.r, color.g, color.b)
      .rect(x, self.height - y - h, w, h)
      .fill_nonzero();
  }

  pub fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, width: f32, color: Color) {
    self
      .content
      .set_stroke_rgb(color.r, color.g, color.b)
      .set_line_width(width)
      .rect(x, self.height - y - h, w, h)
      .stroke();
  }

  /// Serialise the page as a complete document.
  pub fn finish(self) -> Bytes {
    let catalog = Ref::new(1);
    let tree = Ref::new(2);
    let page = Ref::new(3);
    let contents = Ref::new(4);
    let regular = Ref::new(5);
    let bold = Ref::new(6);

    let mut pdf = Pdf::new();
    pdf.catalog(catalog).pages(tree);
    pdf.pages(tree).kids([page]).count(1);

    let mut writer = pdf.page(page);
    writer.media_box(Rect::new(0.0, 0.0, self.width, self.height));
    writer.parent(tree);
    writer.contents(contents);
    writer
      .resources()
      .fonts()
      .pair(Font::Regular.resource(), regular)
      .pair(Font::Bold.resource(), bold);
    writer.finish();

    for (font, id) in [(Font::Regular, regular), (Font::Bold, bold)] {
      pdf
        .type1_font(id)
        .base_font(font.base_font())
        .encoding_predefined(pdf_writer::Name(b"WinAnsiEncoding"));
    }

    pdf.stream(contents, &self.content.finish());
    Bytes::from(pdf.finish())
  }
}
