#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use pdf_esign::clock::FixedClock;
use pdf_esign::repository::MemoryRepository;
use pdf_esign::service::SigningService;
use pdf_esign::storage::MemoryStorage;
use std::sync::Arc;

/// A letter sized PDF with `page_count` pages of one line of text each.
/// Resources live on the `Pages` node so pages only inherit them.
pub fn sample_pdf(page_count: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids = Vec::new();
    for page in 1..=page_count {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        format!("Page {}", page).into_bytes(),
                        StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// A small opaque RGB PNG.
pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let mut buffer = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buffer, width, height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        let data: Vec<u8> = (0..width * height)
            .flat_map(|i| [(i % 256) as u8, 0x20, 0x80])
            .collect();
        writer.write_image_data(&data).unwrap();
    }
    buffer
}

pub fn png_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", base64::encode(png))
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

pub struct Harness {
    pub service: Arc<SigningService>,
    pub repository: Arc<MemoryRepository>,
    pub storage: Arc<MemoryStorage>,
    pub clock: Arc<FixedClock>,
}

pub fn harness() -> Harness {
    let repository = Arc::new(MemoryRepository::new());
    let storage = Arc::new(MemoryStorage::new());
    let clock = Arc::new(FixedClock::new(epoch()));
    let service = Arc::new(SigningService::new(
        repository.clone(),
        storage.clone(),
        clock.clone(),
        chrono::Duration::hours(24),
    ));
    Harness {
        service,
        repository,
        storage,
        clock,
    }
}

/// Page content of a finished PDF, all content streams decoded in order.
pub fn page_operations(pdf: &[u8], page: u32) -> Vec<Operation> {
    let doc = Document::load_mem(pdf).unwrap();
    let page_id = *doc.get_pages().get(&page).unwrap();
    let bytes = doc.get_page_content(page_id).unwrap();
    Content::decode(&bytes).unwrap().operations
}

pub fn number(object: &Object) -> f64 {
    match object {
        Object::Integer(value) => *value as f64,
        Object::Real(value) => *value as f64,
        other => panic!("not a number: {:?}", other),
    }
}
