use imageproc::rect::Rect;

/// Corner pair in canvas pixels; `(x2, y2)` is exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl BoundingBox {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        debug_assert!(x1 <= x2 && y1 <= y2);
        Self { x1, y1, x2, y2 }
    }

    pub fn at(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self::new(x, y, x + w, y + h)
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x2 <= width && self.y2 <= height
    }

    pub fn corners(&self) -> [[u32; 2]; 2] {
        [[self.x1, self.y1], [self.x2, self.y2]]
    }

    /// Outline rectangle for drawing; degenerate boxes still get one pixel.
    pub fn to_rect(&self) -> Rect {
        Rect::at(self.x1 as i32, self.y1 as i32).of_size(self.width().max(1), self.height().max(1))
    }
}

/// A placed box grown (positive margin) or shrunk (negative margin) on every
/// side. Only used for overlap tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OccupiedRegion {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

impl OccupiedRegion {
    pub fn new(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self { x, y, w, h }
    }

    pub fn with_margin(x: u32, y: u32, w: u32, h: u32, margin: i32) -> Self {
        let m = margin as i64;
        Self {
            x: x as i64 - m,
            y: y as i64 - m,
            w: (w as i64 + 2 * m).max(0),
            h: (h as i64 + 2 * m).max(0),
        }
    }

    pub fn around(bbox: &BoundingBox, margin: i32) -> Self {
        Self::with_margin(bbox.x1, bbox.y1, bbox.width(), bbox.height(), margin)
    }

    /// Corner-containment test: on each axis one region's leading edge must
    /// lie inside the other's closed span. Touching edges count.
    pub fn intersects(&self, other: &Self) -> bool {
        let x_hit = (other.x <= self.x && self.x <= other.x + other.w)
            || (self.x <= other.x && other.x <= self.x + self.w);
        let y_hit = (other.y <= self.y && self.y <= other.y + other.h)
            || (self.y <= other.y && other.y <= self.y + self.h);
        x_hit && y_hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_takes_extreme_corners() {
        let a = BoundingBox::new(4, 10, 8, 12);
        let b = BoundingBox::new(2, 11, 6, 20);
        assert_eq!(a.union(&b), BoundingBox::new(2, 10, 8, 20));
    }

    #[test]
    fn margin_grows_and_shrinks() {
        let bbox = BoundingBox::at(10, 20, 30, 40);
        assert_eq!(OccupiedRegion::around(&bbox, 5), OccupiedRegion::new(5, 15, 40, 50));
        assert_eq!(OccupiedRegion::around(&bbox, -5), OccupiedRegion::new(15, 25, 20, 30));
        assert_eq!(OccupiedRegion::around(&bbox, -50), OccupiedRegion::new(60, 70, 0, 0));
    }

    #[test]
    fn edge_contact_counts_as_intersection() {
        let a = OccupiedRegion::new(0, 0, 10, 10);
        assert!(a.intersects(&OccupiedRegion::new(10, 0, 5, 5)));
        assert!(!a.intersects(&OccupiedRegion::new(11, 0, 5, 5)));
    }

    #[test]
    fn containment_is_detected_both_ways() {
        let outer = OccupiedRegion::new(0, 0, 100, 100);
        let inner = OccupiedRegion::new(40, 40, 5, 5);
        assert!(outer.intersects(&inner));
        assert!(inner.intersects(&outer));
    }

    #[test]
    fn cross_shaped_overlap_is_detected() {
        let wide = OccupiedRegion::new(0, 40, 100, 10);
        let tall = OccupiedRegion::new(40, 0, 10, 100);
        assert!(wide.intersects(&tall));
        assert!(tall.intersects(&wide));
    }
}
