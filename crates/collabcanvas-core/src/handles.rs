//! Resize handles and the pure resize geometry.

use crate::shapes::{Geometry, Shape};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Default minimum width, height or diameter a resize may produce.
pub const DEFAULT_MIN_EXTENT: f64 = 10.0;
/// Default handle hit tolerance in screen pixels.
pub const DEFAULT_HANDLE_TOLERANCE: f64 = 8.0;

/// The eight resize handles around a shape's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl HandleKind {
    /// All handles, corners first (corners win when handles overlap).
    pub const ALL: [HandleKind; 8] = [
        HandleKind::NorthWest,
        HandleKind::NorthEast,
        HandleKind::SouthWest,
        HandleKind::SouthEast,
        HandleKind::North,
        HandleKind::South,
        HandleKind::East,
        HandleKind::West,
    ];

    /// Whether this handle moves the top edge.
    pub fn moves_top(self) -> bool {
        matches!(
            self,
            HandleKind::North | HandleKind::NorthEast | HandleKind::NorthWest
        )
    }

    /// Whether this handle moves the bottom edge.
    pub fn moves_bottom(self) -> bool {
        matches!(
            self,
            HandleKind::South | HandleKind::SouthEast | HandleKind::SouthWest
        )
    }

    /// Whether this handle moves the left edge.
    pub fn moves_left(self) -> bool {
        matches!(
            self,
            HandleKind::West | HandleKind::NorthWest | HandleKind::SouthWest
        )
    }

    /// Whether this handle moves the right edge.
    pub fn moves_right(self) -> bool {
        matches!(
            self,
            HandleKind::East | HandleKind::NorthEast | HandleKind::SouthEast
        )
    }

    /// Position of this handle on a bounding box.
    pub fn position(self, bounds: Rect) -> Point {
        let center = bounds.center();
        let x = if self.moves_left() {
            bounds.x0
        } else if self.moves_right() {
            bounds.x1
        } else {
            center.x
        };
        let y = if self.moves_top() {
            bounds.y0
        } else if self.moves_bottom() {
            bounds.y1
        } else {
            center.y
        };
        Point::new(x, y)
    }
}

/// Find the handle of `shape` under `point` (canvas coordinates).
///
/// `tolerance` is in screen pixels and is scaled by `zoom`, so handles keep
/// the same on-screen size at every zoom level.
pub fn hit_test_handles(shape: &Shape, point: Point, tolerance: f64, zoom: f64) -> Option<HandleKind> {
    let bounds = shape.bounds();
    let tolerance = tolerance / zoom.max(f64::EPSILON);
    HandleKind::ALL
        .into_iter()
        .find(|handle| handle.position(bounds).distance(point) <= tolerance)
}

/// Resize a box from its starting bounds by a pointer delta.
///
/// Edges on the handle's side move; the opposite edges stay put. Extents are
/// clamped to `min_extent`, keeping the fixed edge in place.
pub fn resize_rect(start: Rect, handle: HandleKind, delta: Vec2, min_extent: f64) -> Rect {
    let (mut x0, mut y0, mut x1, mut y1) = (start.x0, start.y0, start.x1, start.y1);

    if handle.moves_left() {
        let width = (start.width() - delta.x).max(min_extent);
        x0 = x1 - width;
    } else if handle.moves_right() {
        let width = (start.width() + delta.x).max(min_extent);
        x1 = x0 + width;
    }

    if handle.moves_top() {
        let height = (start.height() - delta.y).max(min_extent);
        y0 = y1 - height;
    } else if handle.moves_bottom() {
        let height = (start.height() + delta.y).max(min_extent);
        y1 = y0 + height;
    }

    Rect::new(x0, y0, x1, y1)
}

/// Resize a shape's geometry from its starting snapshot.
///
/// Circles resize through their bounding box: the new radius is half the
/// larger side and the circle is recentered on the resulting box.
pub fn resize(start: Geometry, handle: HandleKind, delta: Vec2, min_extent: f64) -> Geometry {
    let resized = resize_rect(start.bounds(), handle, delta, min_extent);
    match start {
        Geometry::Boxed { .. } => Geometry::Boxed {
            position: resized.origin(),
            width: resized.width(),
            height: resized.height(),
        },
        Geometry::Round { .. } => Geometry::Round {
            center: resized.center(),
            radius: resized.width().max(resized.height()) / 2.0,
        },
    }
}

/// Clamp a geometry's extents to `min_extent` without moving its anchor.
pub fn clamp_extent(geometry: Geometry, min_extent: f64) -> Geometry {
    match geometry {
        Geometry::Boxed {
            position,
            width,
            height,
        } => Geometry::Boxed {
            position,
            width: width.max(min_extent),
            height: height.max(min_extent),
        },
        Geometry::Round { center, radius } => Geometry::Round {
            center,
            radius: radius.max(min_extent / 2.0),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Circle, Rectangle};

    fn boxed(x: f64, y: f64, w: f64, h: f64) -> Geometry {
        Geometry::Boxed {
            position: Point::new(x, y),
            width: w,
            height: h,
        }
    }

    #[test]
    fn test_handle_positions() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert_eq!(HandleKind::NorthWest.position(bounds), Point::new(0.0, 0.0));
        assert_eq!(HandleKind::SouthEast.position(bounds), Point::new(100.0, 50.0));
        assert_eq!(HandleKind::North.position(bounds), Point::new(50.0, 0.0));
        assert_eq!(HandleKind::West.position(bounds), Point::new(0.0, 25.0));
    }

    #[test]
    fn test_hit_test_scales_with_zoom() {
        let shape = Shape::Rectangle(Rectangle::new(Point::ZERO, 100.0, 100.0));
        let near = Point::new(104.0, 104.0);
        assert_eq!(
            hit_test_handles(&shape, near, 8.0, 1.0),
            Some(HandleKind::SouthEast)
        );
        // At 2x zoom the tolerance covers fewer canvas units.
        assert_eq!(hit_test_handles(&shape, near, 8.0, 2.0), None);
        assert_eq!(hit_test_handles(&shape, Point::new(50.0, 50.0), 8.0, 1.0), None);
    }

    #[test]
    fn test_east_moves_only_size() {
        let geom = resize(boxed(10.0, 10.0, 100.0, 50.0), HandleKind::East, Vec2::new(20.0, 99.0), 10.0);
        assert_eq!(geom, boxed(10.0, 10.0, 120.0, 50.0));
    }

    #[test]
    fn test_north_west_moves_origin_and_size() {
        let geom = resize(
            boxed(10.0, 10.0, 100.0, 50.0),
            HandleKind::NorthWest,
            Vec2::new(5.0, -10.0),
            10.0,
        );
        assert_eq!(geom, boxed(15.0, 0.0, 95.0, 60.0));
    }

    #[test]
    fn test_minimum_extent() {
        let start = boxed(0.0, 0.0, 100.0, 100.0);
        for handle in HandleKind::ALL {
            for delta in [Vec2::new(-500.0, -500.0), Vec2::new(500.0, 500.0)] {
                let bounds = resize(start, handle, delta, 10.0).bounds();
                assert!(bounds.width() >= 10.0, "{handle:?} {delta:?}");
                assert!(bounds.height() >= 10.0, "{handle:?} {delta:?}");
            }
        }
    }

    #[test]
    fn test_west_clamp_keeps_right_edge() {
        let geom = resize(boxed(0.0, 0.0, 100.0, 100.0), HandleKind::West, Vec2::new(200.0, 0.0), 10.0);
        assert_eq!(geom, boxed(90.0, 0.0, 10.0, 100.0));
    }

    #[test]
    fn test_circle_resize_recenters() {
        let circle = Circle::new(Point::new(50.0, 50.0), 50.0);
        let start = Shape::Circle(circle).geometry();
        let geom = resize(start, HandleKind::East, Vec2::new(20.0, 0.0), 10.0);
        // Box becomes (0,0)-(120,100): radius 60, centered on the box.
        assert_eq!(
            geom,
            Geometry::Round {
                center: Point::new(60.0, 50.0),
                radius: 60.0
            }
        );
    }

    #[test]
    fn test_circle_minimum_diameter() {
        let start = Geometry::Round {
            center: Point::new(50.0, 50.0),
            radius: 20.0,
        };
        for handle in HandleKind::ALL {
            let geom = resize(start, handle, Vec2::new(-300.0, 300.0), 10.0);
            let Geometry::Round { radius, .. } = geom else {
                panic!("circle lost its kind");
            };
            assert!(radius * 2.0 >= 10.0);
        }
    }

    #[test]
    fn test_clamp_extent() {
        assert_eq!(clamp_extent(boxed(0.0, 0.0, 2.0, 50.0), 10.0), boxed(0.0, 0.0, 10.0, 50.0));
    }
}
