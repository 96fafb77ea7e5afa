//! WinAnsi encoding and advance widths for the two standard fonts the
//! certificate uses.
//!
//! Widths come from Adobe's core-14 AFM files for Helvetica and
//! Helvetica-Bold, in thousandths of an em.

use pdf_writer::Name;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
  Regular,
  Bold,
}

impl Font {
  /// Resource name on the page.
  pub fn resource(self) -> Name<'static> {
    match self {
      Font::Regular => Name(b"F1"),
      Font::Bold => Name(b"F2"),
    }
  }

  pub fn base_font(self) -> Name<'static> {
    match self {
      Font::Regular => Name(b"Helvetica"),
      Font::Bold => Name(b"Helvetica-Bold"),
    }
  }

  fn advance(self, code: u8) -> u16 {
    let (ascii, latin1) = match self {
      Font::Regular => (&HELVETICA_ASCII, &HELVETICA_LATIN1),
      Font::Bold => (&HELVETICA_BOLD_ASCII, &HELVETICA_BOLD_LATIN1),
    };
    match code {
      0x20..=0x7e => ascii[usize::from(code - 0x20)],
      0xa0..=0xff => latin1[usize::from(code - 0xa0)],
      0x80 | 0x96 => 556,
      0x85 | 0x97 => 1000,
      0x95 => 350,
      0x91 | 0x92 => if self == Font::Bold { 278 } else { 222 },
      0x93 | 0x94 => if self == Font::Bold { 500 } else { 333 },
      _ => ascii[usize::from(b'?' - 0x20)],
    }
  }

  /// Rendered width of `text` at `size` points.
  pub fn width(self, text: &str, size: f32) -> f32 {
    let units: u32 = encode(text).into_iter().map(|b| u32::from(self.advance(b))).sum();
    units as f32 * size / 1000.0
  }
}

/// Map `text` to WinAnsi bytes. Characters outside the encoding become `?`.
pub fn encode(text: &str) -> Vec<u8> {
  text
    .chars()
    .map(|c| match c {
      ' '..='~' => c as u8,
      '\u{a0}'..='\u{ff}' => c as u32 as u8,
      '€' => 0x80,
      '…' => 0x85,
      '‘' => 0x91,
      '’' => 0x92,
      '“' => 0x93,
      '”' => 0x94,
      '•' => 0x95,
      '–' => 0x96,
      '—' => 0x97,
      _ => b'?',
    })
    .collect()
}

#[rustfmt::skip]
const HELVETICA_ASCII: [u16; 95] = [
  278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
  556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
  1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
  667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
  333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
  556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_LATIN1: [u16; 96] = [
  278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
  400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
  667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
  722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
  556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
  556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];

#[rustfmt::skip]
const HELVETICA_BOLD_ASCII: [u16; 95] = [
  278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
  556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
  975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
  667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
  333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
  611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_LATIN1: [u16; 96] = [
  278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333,
  400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611,
  722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
  722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
  556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278,
  611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556,
];
