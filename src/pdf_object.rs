use crate::Error;
use lopdf::{Document, Object, ObjectId};

pub(crate) trait PdfObjectDeref {
    fn deref<'a>(&'a self, doc: &'a Document) -> Result<&'a Object, Error>;

    fn get_object_id(&self) -> Option<ObjectId>;
}

impl PdfObjectDeref for Object {
    fn deref<'a>(&'a self, doc: &'a Document) -> Result<&'a Object, Error> {
        match *self {
            Object::Reference(oid) => doc
                .objects
                .get(&oid)
                .ok_or_else(|| Error::Other(format!("PDF Error: NoSuchReference({:#?})", oid))),
            _ => Ok(self),
        }
    }

    fn get_object_id(&self) -> Option<ObjectId> {
        match *self {
            Object::Reference(ref id) => Some(*id),
            _ => None,
        }
    }
}

/// Find `key` on a page dictionary or, failing that, on its ancestors in the page tree.
/// Inheritable page attributes (`Resources`, `MediaBox`, ...) may live on any `Pages` node.
pub(crate) fn find_inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>, Error> {
    let mut node_id = Some(page_id);
    // Guard against cyclic `Parent` chains in broken files.
    let mut depth = 0;
    while let Some(id) = node_id {
        if depth > 64 {
            log::warn!("Page tree deeper than 64 levels, giving up looking for inherited key.");
            return Ok(None);
        }
        let node = doc.get_object(id)?.as_dict()?;
        if let Ok(value) = node.get(key) {
            return Ok(Some(value.deref(doc)?));
        }
        node_id = node.get(b"Parent").ok().and_then(|parent| parent.get_object_id());
        depth += 1;
    }
    Ok(None)
}
