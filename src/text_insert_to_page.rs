use crate::{page_content::PageContent, Error};
use lopdf::{
    content::{Content, Operation},
    dictionary, ObjectId, StringFormat,
};

/// Resource name of the font used for typed signatures.
pub(crate) const SIGNATURE_FONT_NAME: &str = "SigHelv";

pub(crate) trait InsertTextToPage: PageContent {
    /// Id of the shared signature font object, if it was already added.
    fn signature_font_id(&self) -> Option<ObjectId>;

    fn set_signature_font_id(&mut self, font_id: ObjectId);

    /// Draw a single line of black text with its baseline starting at `(x, y)`.
    /// No wrapping is done, text running off the page is simply clipped by the viewer.
    fn add_text(
        &mut self,
        text: &str,
        page_id: ObjectId,
        position: (f64, f64),
        font_size: f64,
    ) -> Result<(), Error> {
        let font_id = match self.signature_font_id() {
            Some(font_id) => font_id,
            None => {
                // Standard 14 font, every viewer has it so nothing needs embedding.
                let font_id = self.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => "Helvetica",
                    "Encoding" => "WinAnsiEncoding",
                });
                self.set_signature_font_id(font_id);
                font_id
            }
        };
        self.add_resource(page_id, "Font", SIGNATURE_FONT_NAME, font_id)?;

        use lopdf::Object::*;
        let mut content = Content {
            operations: Vec::<Operation>::new(),
        };
        content.operations.push(Operation::new("q", vec![]));
        // `BT` = Begin text object
        content.operations.push(Operation::new("BT", vec![]));
        // `Tf` = Set font and size
        content.operations.push(Operation::new(
            "Tf",
            vec![
                Name(SIGNATURE_FONT_NAME.as_bytes().to_vec()),
                font_size.into(),
            ],
        ));
        // `rg` = Set fill color (RGB), black
        content.operations.push(Operation::new(
            "rg",
            vec![0i32.into(), 0i32.into(), 0i32.into()],
        ));
        // `Td` = Move to start of line
        content.operations.push(Operation::new(
            "Td",
            vec![position.0.into(), position.1.into()],
        ));
        // `Tj` = Show text
        content.operations.push(Operation::new(
            "Tj",
            vec![String(encode_win_ansi(text), StringFormat::Literal)],
        ));
        // `ET` = End text object
        content.operations.push(Operation::new("ET", vec![]));
        content.operations.push(Operation::new("Q", vec![]));

        self.add_to_page_content(page_id, content)
    }
}

/// Encode text for a `WinAnsiEncoding` simple font.
/// Latin-1 maps one to one, the few extra WinAnsi glyphs in 0x80..0x9F are mapped
/// for the punctuation people commonly type. Everything else becomes `?`.
pub(crate) fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7E}' | '\u{A0}'..='\u{FF}' => c as u8,
            '\u{20AC}' => 0x80,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            _ => b'?',
        })
        .collect()
}
