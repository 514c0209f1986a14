use crate::{image_xobject::ImageXObject, page_content::PageContent, rectangle::Rectangle, Error};
use lopdf::{
    content::{Content, Operation},
    Object, ObjectId,
};

pub(crate) trait InsertImageToPage: PageContent {
    /// Decode a PNG and add it (and its soft mask, if it has transparency) to the document.
    /// The image is not shown anywhere yet, see [`draw_image`](Self::draw_image).
    fn embed_png(&mut self, png_data: &[u8]) -> Result<ObjectId, Error> {
        let (mut image, soft_mask) = ImageXObject::try_from(png::Decoder::new(png_data))?;
        image.s_mask = soft_mask.map(|mask| self.add_object(mask));
        Ok(self.add_object(image))
    }

    /// Show an embedded image on a page, stretched to fill `rect`.
    fn draw_image(
        &mut self,
        page_id: ObjectId,
        image_name: &str,
        image_id: ObjectId,
        rect: Rectangle,
    ) -> Result<(), Error> {
        self.add_resource(page_id, "XObject", image_name, image_id)?;

        let (x, y) = (rect.x1, rect.y1);
        let (width, height) = (rect.width(), rect.height());
        // Image space is the unit square, `cm` maps it onto the rectangle.
        // The clip keeps a misbehaving image inside its box.
        let operations = vec![
            Operation::new("q", vec![]),
            Operation::new("re", vec![x.into(), y.into(), width.into(), height.into()]),
            Operation::new("W", vec![]),
            Operation::new("n", vec![]),
            Operation::new(
                "cm",
                vec![
                    width.into(),
                    0i32.into(),
                    0i32.into(),
                    height.into(),
                    x.into(),
                    y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(image_name.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ];
        self.add_to_page_content(page_id, Content { operations })
    }
}
