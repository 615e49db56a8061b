//! Shared fixtures: in-memory PDFs built with lopdf, and a recording
//! `ChatTransport`.

#![allow(dead_code)]

use async_trait::async_trait;
use edgequake_pdfbot::{Action, ChatTransport, PdfBotError, PipelineConfig, PromptId, TextEngine};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;

// ── PDF fixtures ─────────────────────────────────────────────────────────────

/// An image to place on a test page.
#[derive(Debug, Clone)]
pub enum TestImage {
    /// Stored with `/Filter /DCTDecode`, bytes passed through.
    Jpeg(Vec<u8>),
    /// Uncompressed 8-bit DeviceRGB samples.
    RawRgb {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
    /// The same samples behind `/Filter /FlateDecode`.
    FlateRgb {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
}

/// One page of a generated PDF.
#[derive(Debug, Clone, Default)]
pub struct TestPage {
    pub text: Option<String>,
    pub images: Vec<TestImage>,
}

impl TestPage {
    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            images: Vec::new(),
        }
    }

    pub fn with_image(mut self, image: TestImage) -> Self {
        self.images.push(image);
        self
    }
}

pub fn jpeg(width: u32, height: u32, colour: [u8; 3]) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(colour)));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .expect("encode jpeg");
    buf
}

fn solid_rgb(width: u32, height: u32, colour: [u8; 3]) -> Vec<u8> {
    colour
        .iter()
        .copied()
        .cycle()
        .take((width * height * 3) as usize)
        .collect()
}

pub fn raw_rgb(width: u32, height: u32, colour: [u8; 3]) -> TestImage {
    TestImage::RawRgb {
        width,
        height,
        pixels: solid_rgb(width, height, colour),
    }
}

/// A solid-colour image stored Flate-compressed. Keep it at least 8x8 so
/// compression actually shrinks the samples.
pub fn flate_rgb(width: u32, height: u32, colour: [u8; 3]) -> TestImage {
    TestImage::FlateRgb {
        width,
        height,
        pixels: solid_rgb(width, height, colour),
    }
}

fn rgb_stream(width: u32, height: u32, pixels: &[u8]) -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        pixels.to_vec(),
    )
}

fn image_stream(image: &TestImage) -> Stream {
    match image {
        TestImage::Jpeg(bytes) => {
            let decoded = image::load_from_memory(bytes).expect("fixture jpeg decodes");
            Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => decoded.width() as i64,
                    "Height" => decoded.height() as i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                bytes.clone(),
            )
        }
        TestImage::RawRgb {
            width,
            height,
            pixels,
        } => rgb_stream(*width, *height, pixels),
        TestImage::FlateRgb {
            width,
            height,
            pixels,
        } => {
            let mut stream = rgb_stream(*width, *height, pixels);
            stream.compress().expect("compress image");
            assert!(stream.dict.has(b"Filter"), "fixture image did not compress");
            stream
        }
    }
}

/// Build a PDF with one page per entry. Every image gets its own object,
/// so identical images on different pages are only equal by content.
pub fn build_pdf(pages: &[TestPage]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids = Vec::new();
    for page in pages {
        let mut operations = Vec::new();
        if let Some(ref text) = page.text {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
                Operation::new("Td", vec![Object::Integer(50), Object::Integer(750)]),
                Operation::new("Tj", vec![Object::string_literal(text.as_str())]),
                Operation::new("ET", vec![]),
            ]);
        }

        let mut xobjects = Dictionary::new();
        for (i, image) in page.images.iter().enumerate() {
            let name = format!("Im{}", i + 1);
            let image_id = doc.add_object(image_stream(image));
            xobjects.set(name.as_bytes().to_vec(), Object::Reference(image_id));
            operations.extend([
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Integer(100),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(100),
                        Object::Integer(50),
                        Object::Integer(100 + 120 * i as i64),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(name.into_bytes())]),
                Operation::new("Q", vec![]),
            ]);
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
                "XObject" => xobjects,
            },
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("save pdf");
    buf
}

/// Pipeline settings that need no native library.
pub fn lopdf_config() -> PipelineConfig {
    PipelineConfig::builder()
        .text_engine(TextEngine::Lopdf)
        .build()
        .expect("valid config")
}

// ── Recording transport ──────────────────────────────────────────────────────

/// One outbound call, as seen by the chat.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text { chat_id: i64, text: String },
    Photo { chat_id: i64, bytes: usize },
    Document { chat_id: i64, file_name: String, data: Vec<u8> },
    Prompt { prompt: PromptId, text: String, actions: Vec<String> },
    PromptActions { prompt: PromptId, actions: Vec<String> },
    PromptText { prompt: PromptId, text: String },
    Ack { callback_id: String },
}

/// In-memory `ChatTransport` that records every call.
#[derive(Default)]
pub struct RecordingTransport {
    files: Mutex<HashMap<String, Vec<u8>>>,
    sent: Mutex<Vec<Sent>>,
    next_message_id: AtomicI32,
    fail_photos: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose photo sends all fail.
    pub fn failing_photos() -> Self {
        Self {
            fail_photos: true,
            ..Self::default()
        }
    }

    /// Make `bytes` downloadable under `file_ref`.
    pub fn put_file(&self, file_ref: &str, bytes: Vec<u8>) {
        self.files
            .lock()
            .unwrap()
            .insert(file_ref.to_string(), bytes);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn take_sent(&self) -> Vec<Sent> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn documents(&self) -> Vec<(String, Vec<u8>)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Document {
                    file_name, data, ..
                } => Some((file_name, data)),
                _ => None,
            })
            .collect()
    }

    pub fn last_prompt(&self) -> Option<PromptId> {
        self.sent().into_iter().rev().find_map(|s| match s {
            Sent::Prompt { prompt, .. } => Some(prompt),
            _ => None,
        })
    }

    fn record(&self, sent: Sent) {
        self.sent.lock().unwrap().push(sent);
    }
}

fn ids(actions: &[Action]) -> Vec<String> {
    actions.iter().map(|a| a.id.clone()).collect()
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn fetch_file(&self, file_ref: &str) -> Result<Vec<u8>, PdfBotError> {
        self.files
            .lock()
            .unwrap()
            .get(file_ref)
            .cloned()
            .ok_or_else(|| PdfBotError::Transport(format!("no such file: {file_ref}")))
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), PdfBotError> {
        self.record(Sent::Text {
            chat_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, data: Vec<u8>) -> Result<(), PdfBotError> {
        if self.fail_photos {
            return Err(PdfBotError::Transport("photo rejected".into()));
        }
        self.record(Sent::Photo {
            chat_id,
            bytes: data.len(),
        });
        Ok(())
    }

    async fn send_document(
        &self,
        chat_id: i64,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<(), PdfBotError> {
        self.record(Sent::Document {
            chat_id,
            file_name: file_name.to_string(),
            data,
        });
        Ok(())
    }

    async fn send_prompt(
        &self,
        chat_id: i64,
        text: &str,
        actions: &[Action],
    ) -> Result<PromptId, PdfBotError> {
        let prompt = PromptId {
            chat_id,
            message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1,
        };
        self.record(Sent::Prompt {
            prompt,
            text: text.to_string(),
            actions: ids(actions),
        });
        Ok(prompt)
    }

    async fn set_prompt_actions(
        &self,
        prompt: PromptId,
        actions: &[Action],
    ) -> Result<(), PdfBotError> {
        self.record(Sent::PromptActions {
            prompt,
            actions: ids(actions),
        });
        Ok(())
    }

    async fn edit_prompt_text(&self, prompt: PromptId, text: &str) -> Result<(), PdfBotError> {
        self.record(Sent::PromptText {
            prompt,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn acknowledge(&self, callback_id: &str) -> Result<(), PdfBotError> {
        self.record(Sent::Ack {
            callback_id: callback_id.to_string(),
        });
        Ok(())
    }
}
