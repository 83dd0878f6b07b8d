#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::io::Read;

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use gateclear_engines::fieldmap::{
    FillValue, MappedForm, SignatureFormat, SignatureImage, SkippedField, FIELD_MAP, FillKind,
};

/// Source of the fixed, versioned government form template.
pub trait TemplateSource {
    fn template_bytes(&self) -> Result<Vec<u8>, TemplateError>;
}

#[derive(Debug)]
pub enum TemplateError {
    Unavailable(String),
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(reason) => write!(f, "template unavailable: {reason}"),
        }
    }
}

impl std::error::Error for TemplateError {}

#[derive(Debug, Clone)]
pub struct StaticTemplate {
    bytes: Vec<u8>,
}

impl StaticTemplate {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl TemplateSource for StaticTemplate {
    fn template_bytes(&self) -> Result<Vec<u8>, TemplateError> {
        Ok(self.bytes.clone())
    }
}

#[derive(Debug)]
pub enum PdfFillError {
    Pdf(lopdf::Error),
}

impl std::fmt::Display for PdfFillError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pdf(err) => write!(f, "pdf error: {err}"),
        }
    }
}

impl std::error::Error for PdfFillError {}

impl From<lopdf::Error> for PdfFillError {
    fn from(value: lopdf::Error) -> Self {
        Self::Pdf(value)
    }
}

/// The filled document plus every mapping that degraded along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilledPdf {
    pub bytes: Vec<u8>,
    pub skipped: Vec<SkippedField>,
}

// Fixed signature placement on the first page, PDF units.
const SIG_RECT: (i64, i64, i64, i64) = (72, 90, 180, 54);
const SIG_XOBJECT_NAME: &str = "GcSig0";

/// Fills the template's named fields from the mapped form and embeds the
/// signature image at its fixed position. Field names are an external
/// contract that may drift, so a missing name is recorded and skipped; the
/// fill never aborts for one. Same record + same template produces
/// byte-identical output.
pub fn fill_form(
    template: &[u8],
    mapped: &MappedForm,
    signature: Option<&SignatureImage>,
) -> Result<FilledPdf, PdfFillError> {
    let mut doc = Document::load_mem(template)?;
    let fields = collect_form_fields(&doc);

    let mut skipped = Vec::new();
    for fill in &mapped.fills {
        match fields.get(fill.template_field) {
            Some(&id) => {
                if !set_field_value(&mut doc, id, &fill.value) {
                    skipped.push(SkippedField {
                        field: fill.template_field,
                        reason: "template field is not a dictionary",
                    });
                }
            }
            None => skipped.push(SkippedField {
                field: fill.template_field,
                reason: "not present in template",
            }),
        }
    }
    set_need_appearances(&mut doc);

    if let Some(image) = signature {
        if let Err(reason) = embed_signature(&mut doc, image) {
            skipped.push(SkippedField {
                field: "SIGNATURE",
                reason,
            });
        }
    }

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(lopdf::Error::from)?;
    Ok(FilledPdf { bytes, skipped })
}

fn object_text(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

/// Walks the AcroForm field tree (one Kids level per widget chain) into a
/// name -> object id map. A document without an AcroForm yields an empty
/// map, which downstream code treats as "every field misses".
fn collect_form_fields(doc: &Document) -> BTreeMap<String, ObjectId> {
    let mut out = BTreeMap::new();
    let Ok(root_id) = doc.trailer.get(b"Root").and_then(|o| o.as_reference()) else {
        return out;
    };
    let Ok(catalog) = doc.get_dictionary(root_id) else {
        return out;
    };
    let acro = match catalog.get(b"AcroForm") {
        Ok(Object::Reference(id)) => match doc.get_dictionary(*id) {
            Ok(d) => d.clone(),
            Err(_) => return out,
        },
        Ok(Object::Dictionary(d)) => d.clone(),
        _ => return out,
    };
    if let Ok(Object::Array(field_refs)) = acro.get(b"Fields") {
        for entry in field_refs {
            if let Object::Reference(id) = entry {
                walk_field(doc, *id, &mut out);
            }
        }
    }
    out
}

fn walk_field(doc: &Document, id: ObjectId, out: &mut BTreeMap<String, ObjectId>) {
    let Ok(dict) = doc.get_dictionary(id) else {
        return;
    };
    if let Ok(t) = dict.get(b"T") {
        if let Some(name) = object_text(t) {
            out.insert(name, id);
        }
    }
    if let Ok(Object::Array(kids)) = dict.get(b"Kids") {
        for kid in kids {
            if let Object::Reference(kid_id) = kid {
                walk_field(doc, *kid_id, out);
            }
        }
    }
}

fn set_field_value(doc: &mut Document, id: ObjectId, value: &FillValue) -> bool {
    let Ok(obj) = doc.get_object_mut(id) else {
        return false;
    };
    let Ok(dict) = obj.as_dict_mut() else {
        return false;
    };
    match value {
        FillValue::Text(text) => {
            dict.set("V", Object::string_literal(text.as_str()));
            // Stale appearance streams would mask the new value.
            dict.remove(b"AP");
        }
        FillValue::Checkbox(on) => {
            let state: &[u8] = if *on { b"Yes" } else { b"Off" };
            dict.set("V", Object::Name(state.to_vec()));
            dict.set("AS", Object::Name(state.to_vec()));
        }
    }
    true
}

fn set_need_appearances(doc: &mut Document) {
    let Ok(root_id) = doc.trailer.get(b"Root").and_then(|o| o.as_reference()) else {
        return;
    };
    let acro = doc
        .get_dictionary(root_id)
        .ok()
        .and_then(|c| c.get(b"AcroForm").ok().cloned());
    match acro {
        Some(Object::Reference(id)) => {
            if let Ok(dict) = doc.get_object_mut(id).and_then(|o| o.as_dict_mut()) {
                dict.set("NeedAppearances", Object::Boolean(true));
            }
        }
        Some(Object::Dictionary(mut dict)) => {
            dict.set("NeedAppearances", Object::Boolean(true));
            if let Ok(catalog) = doc.get_object_mut(root_id).and_then(|o| o.as_dict_mut()) {
                catalog.set("AcroForm", Object::Dictionary(dict));
            }
        }
        _ => {}
    }
}

fn set_page_key(doc: &mut Document, page_id: ObjectId, key: &str, value: Object) {
    if let Ok(dict) = doc.get_object_mut(page_id).and_then(|o| o.as_dict_mut()) {
        dict.set(key, value);
    }
}

/// Embeds the decoded signature image as an XObject painted at the fixed
/// rect on the first page. Unsupported image variants degrade to a skip
/// reason; they never abort the fill.
fn embed_signature(doc: &mut Document, image: &SignatureImage) -> Result<(), &'static str> {
    let Some(&page_id) = doc.get_pages().values().next() else {
        return Err("template has no pages");
    };

    let (width, height, filter, samples) = match image.format {
        SignatureFormat::Jpeg => {
            let (w, h) = parse_jpeg_dimensions(&image.bytes)
                .ok_or("jpeg signature has no readable dimensions")?;
            (w, h, "DCTDecode", image.bytes.clone())
        }
        SignatureFormat::Png => {
            let png = decode_png_rgb(&image.bytes)?;
            let compressed = zlib_compress(&png.rgb).ok_or("png recompression failed")?;
            (png.width, png.height, "FlateDecode", compressed)
        }
    };

    let xobject = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(i64::from(width)),
            "Height" => Object::Integer(i64::from(height)),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => Object::Integer(8),
            "Filter" => filter,
        },
        samples,
    );
    let xobject_id = doc.add_object(xobject);
    add_xobject_to_page(doc, page_id, xobject_id)?;

    let (x, y, w, h) = SIG_RECT;
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(w),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(h),
                    Object::Integer(x),
                    Object::Integer(y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(SIG_XOBJECT_NAME.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content.encode().map_err(|_| "content encoding failed")?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
    append_page_content(doc, page_id, content_id)
}

fn add_xobject_to_page(
    doc: &mut Document,
    page_id: ObjectId,
    xobject_id: ObjectId,
) -> Result<(), &'static str> {
    let resources = doc
        .get_dictionary(page_id)
        .map_err(|_| "page is not a dictionary")?
        .get(b"Resources")
        .ok()
        .cloned();
    match resources {
        Some(Object::Reference(res_id)) => {
            let mut res = doc
                .get_dictionary(res_id)
                .map_err(|_| "page resources are malformed")?
                .clone();
            insert_xobject_entry(&mut res, xobject_id);
            if let Ok(obj) = doc.get_object_mut(res_id) {
                *obj = Object::Dictionary(res);
            }
        }
        Some(Object::Dictionary(mut res)) => {
            insert_xobject_entry(&mut res, xobject_id);
            set_page_key(doc, page_id, "Resources", Object::Dictionary(res));
        }
        _ => {
            let mut res = Dictionary::new();
            insert_xobject_entry(&mut res, xobject_id);
            set_page_key(doc, page_id, "Resources", Object::Dictionary(res));
        }
    }
    Ok(())
}

fn insert_xobject_entry(resources: &mut Dictionary, xobject_id: ObjectId) {
    let mut xobjects = match resources.get(b"XObject") {
        Ok(Object::Dictionary(d)) => d.clone(),
        _ => Dictionary::new(),
    };
    xobjects.set(SIG_XOBJECT_NAME, Object::Reference(xobject_id));
    resources.set("XObject", Object::Dictionary(xobjects));
}

fn append_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    content_id: ObjectId,
) -> Result<(), &'static str> {
    let contents = doc
        .get_dictionary(page_id)
        .map_err(|_| "page is not a dictionary")?
        .get(b"Contents")
        .ok()
        .cloned();
    let new_contents = match contents {
        Some(Object::Reference(existing)) => Object::Array(vec![
            Object::Reference(existing),
            Object::Reference(content_id),
        ]),
        Some(Object::Array(mut entries)) => {
            entries.push(Object::Reference(content_id));
            Object::Array(entries)
        }
        _ => Object::Reference(content_id),
    };
    set_page_key(doc, page_id, "Contents", new_contents);
    Ok(())
}

fn zlib_compress(bytes: &[u8]) -> Option<Vec<u8>> {
    use std::io::Write;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(6));
    encoder.write_all(bytes).ok()?;
    encoder.finish().ok()
}

/// Scans JPEG markers for the first SOF frame header.
fn parse_jpeg_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
        return None;
    }
    let mut i = 2;
    while i + 4 <= bytes.len() {
        if bytes[i] != 0xFF {
            return None;
        }
        let marker = bytes[i + 1];
        // Standalone markers carry no length segment.
        if marker == 0x01 || (0xD0..=0xD8).contains(&marker) {
            i += 2;
            continue;
        }
        let len = (usize::from(bytes[i + 2]) << 8) | usize::from(bytes[i + 3]);
        if len < 2 || i + 2 + len > bytes.len() {
            return None;
        }
        match marker {
            0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF => {
                if len < 7 {
                    return None;
                }
                let height = (u32::from(bytes[i + 5]) << 8) | u32::from(bytes[i + 6]);
                let width = (u32::from(bytes[i + 7]) << 8) | u32::from(bytes[i + 8]);
                return Some((width, height));
            }
            _ => i += 2 + len,
        }
    }
    None
}

struct PngRgb {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
}

/// Minimal PNG reader for signature pads: 8-bit depth, non-interlaced,
/// grayscale/RGB with or without alpha. Alpha is composited onto white
/// since the form background is white. CRCs are not verified; a corrupt
/// stream fails at inflate or length checks instead.
fn decode_png_rgb(bytes: &[u8]) -> Result<PngRgb, &'static str> {
    const SIG_LEN: usize = 8;
    if bytes.len() < SIG_LEN + 25 {
        return Err("png signature is truncated");
    }

    let mut width = 0u32;
    let mut height = 0u32;
    let mut channels = 0usize;
    let mut alpha = false;
    let mut gray = false;
    let mut idat: Vec<u8> = Vec::new();
    let mut saw_ihdr = false;

    let mut i = SIG_LEN;
    while i + 8 <= bytes.len() {
        let len = u32::from_be_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]) as usize;
        let kind = &bytes[i + 4..i + 8];
        let data_start = i + 8;
        let data_end = data_start + len;
        if data_end + 4 > bytes.len() {
            return Err("png chunk is truncated");
        }
        let data = &bytes[data_start..data_end];
        match kind {
            b"IHDR" => {
                if len != 13 {
                    return Err("png header has unexpected length");
                }
                width = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
                height = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
                let bit_depth = data[8];
                let color_type = data[9];
                let interlace = data[12];
                if bit_depth != 8 {
                    return Err("png bit depth is not 8");
                }
                if interlace != 0 {
                    return Err("interlaced png is not supported");
                }
                (channels, alpha, gray) = match color_type {
                    0 => (1, false, true),
                    2 => (3, false, false),
                    4 => (2, true, true),
                    6 => (4, true, false),
                    _ => return Err("png palette images are not supported"),
                };
                saw_ihdr = true;
            }
            b"IDAT" => idat.extend_from_slice(data),
            b"IEND" => break,
            _ => {}
        }
        i = data_end + 4;
    }
    if !saw_ihdr || idat.is_empty() {
        return Err("png has no image data");
    }
    if width == 0 || height == 0 || width > 4096 || height > 4096 {
        return Err("png dimensions are out of range");
    }

    let mut raw = Vec::new();
    ZlibDecoder::new(&idat[..])
        .read_to_end(&mut raw)
        .map_err(|_| "png inflate failed")?;

    let stride = width as usize * channels;
    let expected = (stride + 1) * height as usize;
    if raw.len() != expected {
        return Err("png scanline data has unexpected length");
    }

    let mut unfiltered = vec![0u8; stride * height as usize];
    for row in 0..height as usize {
        let filter = raw[row * (stride + 1)];
        let line = &raw[row * (stride + 1) + 1..(row + 1) * (stride + 1)];
        for col in 0..stride {
            let left = if col >= channels {
                unfiltered[row * stride + col - channels]
            } else {
                0
            };
            let up = if row > 0 {
                unfiltered[(row - 1) * stride + col]
            } else {
                0
            };
            let up_left = if row > 0 && col >= channels {
                unfiltered[(row - 1) * stride + col - channels]
            } else {
                0
            };
            let recon = match filter {
                0 => line[col],
                1 => line[col].wrapping_add(left),
                2 => line[col].wrapping_add(up),
                3 => line[col]
                    .wrapping_add(((u16::from(left) + u16::from(up)) / 2) as u8),
                4 => line[col].wrapping_add(paeth(left, up, up_left)),
                _ => return Err("png uses an unknown scanline filter"),
            };
            unfiltered[row * stride + col] = recon;
        }
    }

    let pixel_count = width as usize * height as usize;
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    for p in 0..pixel_count {
        let base = p * channels;
        let (r, g, b, a) = if gray {
            let v = unfiltered[base];
            let a = if alpha { unfiltered[base + 1] } else { 255 };
            (v, v, v, a)
        } else {
            let a = if alpha { unfiltered[base + 3] } else { 255 };
            (unfiltered[base], unfiltered[base + 1], unfiltered[base + 2], a)
        };
        // Composite onto the white page background.
        let blend = |c: u8| -> u8 {
            ((u16::from(c) * u16::from(a) + 255 * (255 - u16::from(a))) / 255) as u8
        };
        rgb.push(blend(r));
        rgb.push(blend(g));
        rgb.push(blend(b));
    }

    Ok(PngRgb { width, height, rgb })
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = i32::from(a) + i32::from(b) - i32::from(c);
    let pa = (p - i32::from(a)).abs();
    let pb = (p - i32::from(b)).abs();
    let pc = (p - i32::from(c)).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Builds the bundled clearance-form template: every mapped field name as
/// an AcroForm widget on a single letter-size page. Used when no external
/// template file is configured, and by the test suites.
pub fn builtin_template() -> Result<Vec<u8>, PdfFillError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(b"F1".to_vec()), Object::Integer(12)],
            ),
            Operation::new("Td", vec![Object::Integer(72), Object::Integer(756)]),
            Operation::new(
                "Tj",
                vec![Object::string_literal("VISITOR GATE CLEARANCE APPLICATION")],
            ),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let mut field_refs: Vec<Object> = Vec::new();
    for (index, mapping) in FIELD_MAP.iter().enumerate() {
        let column = (index % 2) as i64;
        let row = (index / 2) as i64;
        let x = 72 + column * 240;
        let y = 720 - row * 34;
        let field = match mapping.source.fill_kind() {
            FillKind::Text => dictionary! {
                "Type" => "Annot",
                "Subtype" => "Widget",
                "FT" => "Tx",
                "T" => Object::string_literal(mapping.template_field),
                "Rect" => vec![
                    Object::Integer(x),
                    Object::Integer(y),
                    Object::Integer(x + 200),
                    Object::Integer(y + 16),
                ],
                "P" => Object::Reference(page_id),
                "V" => Object::string_literal(""),
            },
            FillKind::Checkbox => dictionary! {
                "Type" => "Annot",
                "Subtype" => "Widget",
                "FT" => "Btn",
                "T" => Object::string_literal(mapping.template_field),
                "Rect" => vec![
                    Object::Integer(x),
                    Object::Integer(y),
                    Object::Integer(x + 12),
                    Object::Integer(y + 12),
                ],
                "P" => Object::Reference(page_id),
                "V" => Object::Name(b"Off".to_vec()),
                "AS" => Object::Name(b"Off".to_vec()),
            },
        };
        field_refs.push(Object::Reference(doc.add_object(field)));
    }

    doc.objects.insert(
        page_id,
        Object::Dictionary(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            },
            "Annots" => Object::Array(field_refs.clone()),
        }),
    );
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
        }),
    );

    let acroform_id = doc.add_object(dictionary! {
        "Fields" => Object::Array(field_refs),
        "NeedAppearances" => Object::Boolean(true),
        "DA" => Object::string_literal("/F1 10 Tf 0 g"),
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
        "AcroForm" => Object::Reference(acroform_id),
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(lopdf::Error::from)?;
    Ok(bytes)
}
