use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use pdf_writer::types::{CidFontType, FontFlags, SystemInfo, UnicodeCmap};
use pdf_writer::{Name, Pdf, Rect, Ref, Str};
use serde::{Deserialize, Serialize};
use ttf_parser::Face;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FontWeight {
    Regular,
    Bold,
}

impl FontWeight {
    pub(crate) fn pdf_name(self) -> &'static str {
        match self {
            FontWeight::Regular => "F1",
            FontWeight::Bold => "F2",
        }
    }

    fn builtin(self) -> &'static str {
        match self {
            FontWeight::Regular => "Helvetica",
            FontWeight::Bold => "Helvetica-Bold",
        }
    }
}

/// Optional TrueType files to use instead of the built-in Helvetica pair.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontSet {
    pub regular: Option<PathBuf>,
    pub bold: Option<PathBuf>,
}

pub(crate) struct FontFace {
    pub(crate) family: String,
    widths_1000: Vec<f32>,
    /// Raw TrueType data, `None` for the built-in fallback.
    pub(crate) truetype: Option<Vec<u8>>,
}

impl FontFace {
    fn builtin(weight: FontWeight) -> Self {
        let widths_1000 = match weight {
            FontWeight::Regular => helvetica_widths(),
            FontWeight::Bold => helvetica_bold_widths(),
        };
        FontFace {
            family: weight.builtin().to_string(),
            widths_1000,
            truetype: None,
        }
    }

    fn from_truetype(path: &Path) -> Result<Self, String> {
        let data = std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
        let face = Face::parse(&data, 0).map_err(|e| format!("{}: {e}", path.display()))?;
        let units = face.units_per_em() as f32;
        let widths_1000: Vec<f32> = (32u8..=255u8)
            .map(|byte| {
                face.glyph_index(winansi_to_char(byte))
                    .and_then(|gid| face.glyph_hor_advance(gid))
                    .map(|adv| adv as f32 / units * 1000.0)
                    .unwrap_or(0.0)
            })
            .collect();
        let family = font_family_name(&face).unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Embedded".to_string())
        });
        Ok(FontFace {
            family,
            widths_1000,
            truetype: Some(data),
        })
    }

    /// Width of a single character in 1000-units. WinAnsi characters use the
    /// precomputed table; anything else is looked up in the TrueType face.
    pub(crate) fn char_width_1000(&self, ch: char) -> f32 {
        let byte = char_to_winansi(ch);
        if byte >= 32 {
            return self.widths_1000[(byte - 32) as usize];
        }
        self.truetype
            .as_deref()
            .and_then(|data| Face::parse(data, 0).ok())
            .and_then(|face| {
                let units = face.units_per_em() as f32;
                face.glyph_index(ch)
                    .and_then(|gid| face.glyph_hor_advance(gid))
                    .map(|adv| adv as f32 / units * 1000.0)
            })
            .unwrap_or(0.0)
    }

    pub(crate) fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars()
            .map(|ch| self.char_width_1000(ch) * font_size / 1000.0)
            .sum()
    }
}

/// The two faces every document uses, resolved once per render configuration.
pub struct FontBook {
    regular: FontFace,
    bold: FontFace,
}

impl FontBook {
    /// Helvetica and Helvetica-Bold, always available.
    pub fn builtin() -> Self {
        FontBook {
            regular: FontFace::builtin(FontWeight::Regular),
            bold: FontFace::builtin(FontWeight::Bold),
        }
    }

    /// Load the optional TrueType files. A missing or unreadable file falls back
    /// to the built-in face for that weight; this never fails.
    pub fn load(set: &FontSet) -> Self {
        FontBook {
            regular: load_face(set.regular.as_deref(), FontWeight::Regular),
            bold: load_face(set.bold.as_deref(), FontWeight::Bold),
        }
    }

    pub(crate) fn face(&self, weight: FontWeight) -> &FontFace {
        match weight {
            FontWeight::Regular => &self.regular,
            FontWeight::Bold => &self.bold,
        }
    }

    pub fn text_width(&self, weight: FontWeight, text: &str, font_size: f32) -> f32 {
        self.face(weight).text_width(text, font_size)
    }

    pub fn is_embedded(&self, weight: FontWeight) -> bool {
        self.face(weight).truetype.is_some()
    }
}

impl Default for FontBook {
    fn default() -> Self {
        FontBook::builtin()
    }
}

fn load_face(path: Option<&Path>, weight: FontWeight) -> FontFace {
    let Some(path) = path else {
        return FontFace::builtin(weight);
    };
    match FontFace::from_truetype(path) {
        Ok(face) => {
            log::debug!("Loaded {weight:?} font {} from {}", face.family, path.display());
            face
        }
        Err(e) => {
            log::warn!("font not usable: {e}, using {}", weight.builtin());
            FontFace::builtin(weight)
        }
    }
}

/// PostScript name when the face has one, so weights of a family stay distinct.
fn font_family_name(face: &Face) -> Option<String> {
    [ttf_parser::name_id::POST_SCRIPT_NAME, ttf_parser::name_id::FAMILY]
        .into_iter()
        .find_map(|id| {
            face.names()
                .into_iter()
                .find(|name| name.name_id == id && name.is_unicode())
                .and_then(|name| name.to_string())
        })
}

/// The 0x80..=0x9F block of Windows-1252, where it departs from Latin-1.
const WINANSI_C1: [(u8, char); 27] = [
    (0x80, '€'),
    (0x82, '‚'),
    (0x83, 'ƒ'),
    (0x84, '„'),
    (0x85, '…'),
    (0x86, '†'),
    (0x87, '‡'),
    (0x88, 'ˆ'),
    (0x89, '‰'),
    (0x8A, 'Š'),
    (0x8B, '‹'),
    (0x8C, 'Œ'),
    (0x8E, 'Ž'),
    (0x91, '‘'),
    (0x92, '’'),
    (0x93, '“'),
    (0x94, '”'),
    (0x95, '•'),
    (0x96, '–'),
    (0x97, '—'),
    (0x98, '˜'),
    (0x99, '™'),
    (0x9A, 'š'),
    (0x9B, '›'),
    (0x9C, 'œ'),
    (0x9E, 'ž'),
    (0x9F, 'Ÿ'),
];

fn winansi_to_char(byte: u8) -> char {
    WINANSI_C1
        .iter()
        .find(|(b, _)| *b == byte)
        .map(|&(_, ch)| ch)
        .unwrap_or(byte as char)
}

/// WinAnsi byte for `c`, or 0 when the encoding has no slot for it.
fn char_to_winansi(c: char) -> u8 {
    match c as u32 {
        0x20..=0x7F | 0xA0..=0xFF => c as u8,
        _ => WINANSI_C1
            .iter()
            .find(|(_, ch)| *ch == c)
            .map(|&(b, _)| b)
            .unwrap_or(0),
    }
}

/// Convert a UTF-8 string to WinAnsi (Windows-1252) bytes; unmappable chars are dropped.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .filter_map(|c| match char_to_winansi(c) {
            0 => None,
            b => Some(b),
        })
        .collect()
}

/// Encode UTF-8 text as big-endian 2-byte glyph IDs for CIDFont content streams.
pub(crate) fn encode_as_gids(text: &str, char_to_gid: &BTreeMap<char, u16>) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for ch in text.chars() {
        let gid = char_to_gid.get(&ch).copied().unwrap_or(0);
        out.push((gid >> 8) as u8);
        out.push((gid & 0xFF) as u8);
    }
    out
}

/// Approximate Helvetica widths at 1000 units/em for WinAnsi chars 32..=255.
fn helvetica_widths() -> Vec<f32> {
    (32u8..=255u8)
        .map(|b| match b {
            32 | 0xA0 => 278.0,                   // space, no-break space
            44 | 46 => 278.0,                     // , .
            33..=47 => 333.0,                     // punctuation
            48..=57 => 556.0,                     // digits
            58..=64 => 333.0,                     // more punctuation
            73 => 278.0,                          // I
            74 => 500.0,                          // J
            77 => 833.0,                          // M
            87 => 944.0,                          // W
            65..=90 => 667.0,                     // uppercase A-Z (average)
            91..=96 => 333.0,                     // brackets etc.
            105 | 106 | 108 => 222.0,             // i j l
            102 | 116 => 278.0,                   // f t
            109 => 833.0,                         // m
            119 => 722.0,                         // w
            97..=122 => 556.0,                    // lowercase a-z (average)
            0x80 => 556.0,                        // euro
            0xC0..=0xDF => 667.0,                 // accented uppercase
            _ => 556.0,
        })
        .collect()
}

/// Approximate Helvetica-Bold widths at 1000 units/em for WinAnsi chars 32..=255.
fn helvetica_bold_widths() -> Vec<f32> {
    (32u8..=255u8)
        .map(|b| match b {
            32 | 0xA0 => 278.0,
            44 | 46 => 278.0,
            33..=47 => 333.0,
            48..=57 => 556.0,
            58..=64 => 333.0,
            73 => 278.0,
            74 => 556.0,
            77 => 833.0,
            87 => 944.0,
            65..=90 => 722.0,
            91..=96 => 333.0,
            105 | 106 | 108 => 278.0,
            102 | 116 => 333.0,
            109 => 889.0,
            119 => 778.0,
            97..=122 => 611.0,
            0x80 => 556.0,
            0xC0..=0xDF => 722.0,
            _ => 611.0,
        })
        .collect()
}

fn identity_system_info() -> SystemInfo<'static> {
    SystemInfo {
        registry: Str(b"Adobe"),
        ordering: Str(b"Identity"),
        supplement: 0,
    }
}

/// Object ids of one embedded face.
struct EmbedRefs {
    font: Ref,
    descriptor: Ref,
    data: Ref,
}

/// Embed `face_data` as a Type0 font over a CIDFontType2 with Identity-H
/// encoding, subset to `used_chars`.
///
/// Returns the char to subset-glyph map used to encode text, or `None` when
/// the face cannot be parsed or subset; the caller then falls back to the
/// built-in face. Glyphs are visited in char order so the output is stable.
fn embed_truetype(
    pdf: &mut Pdf,
    refs: EmbedRefs,
    family: &str,
    face_data: &[u8],
    used_chars: &BTreeSet<char>,
    alloc: &mut impl FnMut() -> Ref,
) -> Option<BTreeMap<char, u16>> {
    let face = Face::parse(face_data, 0).ok()?;
    let scale = 1000.0 / face.units_per_em() as f32;

    let mut remapper = subsetter::GlyphRemapper::new();
    let mut char_to_gid = BTreeMap::new();
    let mut widths: BTreeMap<u16, f32> = BTreeMap::new();
    for &ch in used_chars {
        let Some(gid) = face.glyph_index(ch) else {
            continue;
        };
        let new_gid = remapper.remap(gid.0);
        char_to_gid.insert(ch, new_gid);
        let advance = face.glyph_hor_advance(gid).unwrap_or(0);
        widths.insert(new_gid, advance as f32 * scale);
    }

    let subset = match subsetter::subset(face_data, 0, &remapper) {
        Ok(data) => data,
        Err(e) => {
            log::warn!("subsetting {family} failed: {e}");
            return None;
        }
    };
    let subset_len = i32::try_from(subset.len()).ok()?;
    pdf.stream(refs.data, &subset)
        .pair(Name(b"Length1"), subset_len);

    let ps_name: String = family.chars().filter(|c| !c.is_whitespace()).collect();
    let bb = face.global_bounding_box();
    pdf.font_descriptor(refs.descriptor)
        .name(Name(ps_name.as_bytes()))
        .flags(FontFlags::NON_SYMBOLIC)
        .bbox(Rect::new(
            bb.x_min as f32 * scale,
            bb.y_min as f32 * scale,
            bb.x_max as f32 * scale,
            bb.y_max as f32 * scale,
        ))
        .italic_angle(0.0)
        .ascent(face.ascender() as f32 * scale)
        .descent(face.descender() as f32 * scale)
        .cap_height(face.capital_height().map_or(700.0, |h| h as f32 * scale))
        .stem_v(80.0)
        .font_file2(refs.data);

    let cid_ref = alloc();
    {
        let mut cid = pdf.cid_font(cid_ref);
        cid.subtype(CidFontType::Type2)
            .base_font(Name(ps_name.as_bytes()))
            .system_info(identity_system_info())
            .font_descriptor(refs.descriptor)
            .default_width(0.0)
            .cid_to_gid_map_predefined(Name(b"Identity"));
        if !widths.is_empty() {
            let mut w = cid.widths();
            for (&gid, &width) in &widths {
                w.consecutive(gid, [width]);
            }
        }
    }

    let to_unicode_ref = alloc();
    let cmap_name = format!("{ps_name}-UTF16");
    let mut cmap = UnicodeCmap::new(Name(cmap_name.as_bytes()), identity_system_info());
    for (&ch, &gid) in &char_to_gid {
        cmap.pair(gid, ch);
    }
    pdf.stream(to_unicode_ref, cmap.finish().as_slice());

    pdf.type0_font(refs.font)
        .base_font(Name(ps_name.as_bytes()))
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_ref)
        .to_unicode(to_unicode_ref);

    Some(char_to_gid)
}

/// A font object written into the PDF, with what is needed to encode text for it.
pub(crate) struct FontEntry {
    pub(crate) pdf_name: &'static str,
    pub(crate) font_ref: Ref,
    pub(crate) char_to_gid: Option<BTreeMap<char, u16>>,
}

impl FontEntry {
    pub(crate) fn encode(&self, text: &str) -> Vec<u8> {
        match &self.char_to_gid {
            Some(map) => encode_as_gids(text, map),
            None => to_winansi_bytes(text),
        }
    }
}

pub(crate) fn register_font(
    pdf: &mut Pdf,
    book: &FontBook,
    weight: FontWeight,
    alloc: &mut impl FnMut() -> Ref,
    used_chars: &BTreeSet<char>,
) -> FontEntry {
    let t0 = std::time::Instant::now();
    let font_ref = alloc();
    let face = book.face(weight);

    let char_to_gid = face.truetype.as_deref().and_then(|data| {
        let refs = EmbedRefs {
            font: font_ref,
            descriptor: alloc(),
            data: alloc(),
        };
        embed_truetype(pdf, refs, &face.family, data, used_chars, alloc)
    });

    if char_to_gid.is_none() {
        if face.truetype.is_some() {
            log::warn!("embedding {} failed, using {}", face.family, weight.builtin());
        }
        pdf.type1_font(font_ref)
            .base_font(Name(weight.builtin().as_bytes()))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
    }

    log::debug!(
        "register_font: {weight:?} ({}) → {:.1}ms",
        face.family,
        t0.elapsed().as_secs_f64() * 1000.0,
    );

    FontEntry {
        pdf_name: weight.pdf_name(),
        font_ref,
        char_to_gid,
    }
}
