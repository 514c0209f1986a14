/// Axis aligned rectangle in PDF user space (origin bottom left).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rectangle {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Rectangle {
    /// Rectangle spanning two opposite corners, in any order.
    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Self {
        Rectangle {
            x1: a.0.min(b.0),
            y1: a.1.min(b.1),
            x2: a.0.max(b.0),
            y2: a.1.max(b.1),
        }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Convert a point given from the top left corner of `self`, y growing downwards,
    /// into user space.
    pub fn point_from_top_left(&self, x: f64, y: f64) -> (f64, f64) {
        (self.x1 + x, self.y2 - y)
    }

    /// Box of `width` x `height` whose top left corner is `(x, y)` measured from the
    /// top left corner of `self`, y growing downwards.
    pub fn box_from_top_left(&self, x: f64, y: f64, width: f64, height: f64) -> Rectangle {
        let (left, top) = self.point_from_top_left(x, y);
        Rectangle {
            x1: left,
            y1: top - height,
            x2: left + width,
            y2: top,
        }
    }
}
