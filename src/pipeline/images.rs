//! Embedded-image enumeration over the PDF structure (lopdf).
//!
//! Images are found through each page's `/Resources /XObject` dictionary, in
//! dictionary order, recursing into Form XObjects. Resources inherited from
//! an ancestor `/Pages` node are honoured.
//!
//! Encoded images are passed through untouched: `DCTDecode` streams are
//! JPEG files and `JPXDecode` streams are JPEG 2000 files. Any other image
//! stream is raw pixel data with no file format of its own; 8-bit Gray, RGB
//! and CMYK samples are wrapped as PNG so they can be sent and embedded.

use crate::error::ItemError;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::io::Cursor;
use tracing::debug;

const MAX_FORM_DEPTH: usize = 8;
const MAX_PARENT_DEPTH: usize = 32;

/// One image read from a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// Resource name, e.g. `Im1`.
    pub name: String,
    pub data: Vec<u8>,
    /// `jpeg`, `jpx` or `png`.
    pub extension: &'static str,
}

/// Remembers which images one extraction run has already emitted.
///
/// Keyed by the SHA-256 of the image bytes. Scoped to a single run.
#[derive(Debug, Default)]
pub struct ImageDeduper {
    seen: HashSet<[u8; 32]>,
}

impl ImageDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` the first time `data` is offered, `false` afterwards.
    pub fn first_sighting(&mut self, data: &[u8]) -> bool {
        let digest: [u8; 32] = Sha256::digest(data).into();
        self.seen.insert(digest)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Enumerate the images of one page in structural order.
///
/// `page` is the 1-indexed page number used in error reports. Each image
/// yields its own `Result`; one unreadable image never hides the others.
pub fn page_images(
    doc: &Document,
    page_id: ObjectId,
    page: usize,
) -> Vec<Result<PageImage, ItemError>> {
    let mut out = Vec::new();
    let mut visited = HashSet::new();
    if let Some(resources) = page_resources(doc, page_id) {
        collect_from_resources(doc, resources, page, 0, &mut visited, &mut out);
    }
    debug!("Page {}: {} image XObjects", page, out.len());
    out
}

fn collect_from_resources(
    doc: &Document,
    resources: &Dictionary,
    page: usize,
    depth: usize,
    visited: &mut HashSet<ObjectId>,
    out: &mut Vec<Result<PageImage, ItemError>>,
) {
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|o| resolve_dict(doc, o))
    else {
        return;
    };

    for (key, value) in xobjects.iter() {
        if let Ok(id) = value.as_reference() {
            if !visited.insert(id) {
                continue;
            }
        }

        let name = String::from_utf8_lossy(key).into_owned();
        let Object::Stream(stream) = resolve(doc, value) else {
            out.push(Err(ItemError::ImageExtract {
                page,
                name,
                detail: "XObject is not a stream".to_string(),
            }));
            continue;
        };

        let subtype = stream.dict.get(b"Subtype").and_then(Object::as_name).ok();
        match subtype {
            Some(b"Image") => out.push(
                read_image(doc, stream)
                    .map(|(data, extension)| PageImage {
                        name: name.clone(),
                        data,
                        extension,
                    })
                    .map_err(|detail| ItemError::ImageExtract { page, name, detail }),
            ),
            Some(b"Form") if depth < MAX_FORM_DEPTH => {
                if let Some(form_resources) = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|o| resolve_dict(doc, o))
                {
                    collect_from_resources(doc, form_resources, page, depth + 1, visited, out);
                }
            }
            _ => {}
        }
    }
}

/// The page's `/Resources`, walking up `/Parent` links when inherited.
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_PARENT_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve_dict(doc, resources);
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj) {
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn filter_names(doc: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter").ok().map(|o| resolve(doc, o)) {
        Some(Object::Name(name)) => vec![name.clone()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|o| resolve(doc, o).as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

/// Read one image XObject into `(bytes, extension)`.
fn read_image(doc: &Document, stream: &Stream) -> Result<(Vec<u8>, &'static str), String> {
    let filters = filter_names(doc, &stream.dict);
    match filters.as_slice() {
        [only] if only.as_slice() == b"DCTDecode" => return Ok((stream.content.clone(), "jpeg")),
        [only] if only.as_slice() == b"JPXDecode" => return Ok((stream.content.clone(), "jpx")),
        _ => {}
    }

    let is_mask = stream
        .dict
        .get(b"ImageMask")
        .and_then(Object::as_bool)
        .unwrap_or(false);
    if is_mask {
        return Err("stencil image masks carry no picture".to_string());
    }

    let pixels = if filters.is_empty() {
        stream.content.clone()
    } else {
        decode_pixels(stream).map_err(|e| {
            let names: Vec<String> = filters
                .iter()
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .collect();
            format!("cannot decode {}: {e}", names.join("+"))
        })?
    };

    let width = dimension(&stream.dict, b"Width")?;
    let height = dimension(&stream.dict, b"Height")?;
    let bpc = stream
        .dict
        .get(b"BitsPerComponent")
        .and_then(Object::as_i64)
        .unwrap_or(8);
    if bpc != 8 {
        return Err(format!("unsupported bits per component: {bpc}"));
    }

    let components = colour_components(doc, stream.dict.get(b"ColorSpace").ok())?;
    let image = raw_to_image(pixels, width, height, components)?;
    encode_png(&image).map(|png| (png, "png"))
}

/// Undo the stream filters (predictors included).
///
/// lopdf refuses to decode a stream typed `/Subtype /Image`, so the work
/// happens on an untyped copy.
fn decode_pixels(stream: &Stream) -> lopdf::Result<Vec<u8>> {
    let mut plain = stream.clone();
    plain.dict.remove(b"Subtype");
    plain.decompressed_content()
}

fn dimension(dict: &Dictionary, key: &[u8]) -> Result<u32, String> {
    let value = dict
        .get(key)
        .and_then(Object::as_i64)
        .map_err(|_| format!("missing /{}", String::from_utf8_lossy(key)))?;
    u32::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| format!("invalid /{} {value}", String::from_utf8_lossy(key)))
}

fn colour_components(doc: &Document, colour_space: Option<&Object>) -> Result<u8, String> {
    let Some(colour_space) = colour_space else {
        return Err("missing /ColorSpace".to_string());
    };
    match resolve(doc, colour_space) {
        Object::Name(name) => components_by_name(name),
        Object::Array(items) => {
            let family = items
                .first()
                .and_then(|o| o.as_name().ok())
                .ok_or_else(|| "empty colour space array".to_string())?;
            match family {
                b"ICCBased" => {
                    let n = items
                        .get(1)
                        .map(|o| resolve(doc, o))
                        .and_then(|o| o.as_stream().ok())
                        .and_then(|s| s.dict.get(b"N").and_then(Object::as_i64).ok())
                        .ok_or_else(|| "ICCBased colour space without /N".to_string())?;
                    match n {
                        1 | 3 | 4 => Ok(n as u8),
                        other => Err(format!("unsupported ICC component count {other}")),
                    }
                }
                b"CalRGB" => Ok(3),
                b"CalGray" => Ok(1),
                other => Err(format!(
                    "unsupported colour space {}",
                    String::from_utf8_lossy(other)
                )),
            }
        }
        _ => Err("malformed /ColorSpace".to_string()),
    }
}

fn components_by_name(name: &[u8]) -> Result<u8, String> {
    match name {
        b"DeviceGray" | b"G" | b"CalGray" => Ok(1),
        b"DeviceRGB" | b"RGB" | b"CalRGB" => Ok(3),
        b"DeviceCMYK" | b"CMYK" => Ok(4),
        other => Err(format!(
            "unsupported colour space {}",
            String::from_utf8_lossy(other)
        )),
    }
}

fn raw_to_image(
    mut pixels: Vec<u8>,
    width: u32,
    height: u32,
    components: u8,
) -> Result<DynamicImage, String> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(components as usize))
        .ok_or_else(|| format!("image too large: {width}x{height}x{components}"))?;
    if pixels.len() < expected {
        return Err(format!(
            "pixel data too short: {} bytes for {width}x{height}x{components}",
            pixels.len()
        ));
    }
    pixels.truncate(expected);

    let image = match components {
        1 => GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
        4 => RgbImage::from_raw(width, height, cmyk_to_rgb(&pixels)).map(DynamicImage::ImageRgb8),
        other => return Err(format!("unsupported component count {other}")),
    };
    image.ok_or_else(|| format!("pixel buffer does not fit {width}x{height}"))
}

fn cmyk_to_rgb(cmyk: &[u8]) -> Vec<u8> {
    cmyk.chunks_exact(4)
        .flat_map(|px| {
            let k = 255 - px[3] as u32;
            let channel = |c: u8| ((255 - c as u32) * k / 255) as u8;
            [channel(px[0]), channel(px[1]), channel(px[2])]
        })
        .collect()
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, String> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| format!("PNG encoding failed: {e}"))?;
    Ok(buf)
}
