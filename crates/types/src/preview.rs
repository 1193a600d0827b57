//! Placement of hover previews inside the viewport.

use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Size {
    pub w: f64,
    pub h: f64,
}

impl Size {
    pub fn new(w: f64, h: f64) -> Self {
        Size { w, h }
    }

    fn is_positive(&self) -> bool {
        self.w > 0.0 && self.h > 0.0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }
}

/// Placement rules. The media hover uses [`Positioner::MEDIA`]; the reply
/// popup keeps a tighter edge margin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Positioner {
    /// Share of the viewport the content may cover on each axis.
    pub max_fraction: f64,
    /// Gap between the anchor and the preview's top-left corner.
    pub offset: f64,
    /// Gap kept to the right/bottom edge when the preview would overflow.
    pub edge_margin: f64,
    /// Position used when shifting back would go off the left/top edge.
    pub fallback: f64,
}

impl Positioner {
    pub const MEDIA: Positioner = Positioner {
        max_fraction: 0.9,
        offset: 10.0,
        edge_margin: 20.0,
        fallback: 10.0,
    };

    pub const POPUP: Positioner = Positioner {
        edge_margin: 10.0,
        ..Positioner::MEDIA
    };

    pub fn max_size(&self, viewport: Size) -> Size {
        Size::new(viewport.w * self.max_fraction, viewport.h * self.max_fraction)
    }

    /// Shrinks `natural` uniformly to the allowed box; never enlarges.
    /// Unknown sizes take the whole allowed box.
    pub fn fit(&self, natural: Option<Size>, viewport: Size) -> Size {
        let max = self.max_size(viewport);
        let natural = match natural {
            Some(size) if size.is_positive() => size,
            _ => return max,
        };
        let scale = 1f64.min(max.w / natural.w).min(max.h / natural.h);
        Size::new(natural.w * scale, natural.h * scale)
    }

    /// Clamps an already sized preview next to `anchor`.
    pub fn position(&self, anchor: Point, size: Size, viewport: Size) -> Rect {
        Rect {
            x: self.clamp_axis(anchor.x, size.w, viewport.w),
            y: self.clamp_axis(anchor.y, size.h, viewport.h),
            w: size.w,
            h: size.h,
        }
    }

    pub fn place(&self, anchor: Point, natural: Option<Size>, viewport: Size) -> Rect {
        self.position(anchor, self.fit(natural, viewport), viewport)
    }

    fn clamp_axis(&self, anchor: f64, extent: f64, limit: f64) -> f64 {
        let mut start = anchor + self.offset;
        if start + extent + self.edge_margin > limit {
            start = limit - extent - self.edge_margin;
        }
        if start < 0.0 {
            start = self.fallback;
        }
        start
    }
}

impl Default for Positioner {
    fn default() -> Self {
        Positioner::MEDIA
    }
}

pub fn place(anchor: Point, natural: Size, viewport: Size) -> Rect {
    Positioner::MEDIA.place(anchor, Some(natural), viewport)
}
