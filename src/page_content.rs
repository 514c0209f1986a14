use crate::Error;
use lopdf::{
    content::{Content, Operation},
    Object, ObjectId,
};

/// Low level access to a page that signature insertion builds on.
pub(crate) trait PageContent {
    fn add_object<T: Into<Object>>(&mut self, object: T) -> ObjectId;

    /// Register `object_id` under `name` in the page's resource category
    /// (`XObject`, `Font`, ...). An existing entry with the same name is replaced.
    fn add_resource(
        &mut self,
        page_id: ObjectId,
        category: &str,
        name: &str,
        object_id: ObjectId,
    ) -> Result<(), Error>;

    /// Append operations to the page, drawn on top of the existing content.
    fn add_to_page_content(
        &mut self,
        page_id: ObjectId,
        content: Content<Vec<Operation>>,
    ) -> Result<(), Error>;
}
