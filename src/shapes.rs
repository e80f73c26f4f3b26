// src/shapes.rs - Resizable, rotatable measurement shapes

use nalgebra::{Point2, Rotation2, Vector2};
use std::f64::consts::PI;

pub type Point = Point2<f64>;

/// Side length of the square grab area around each resize handle
pub const HANDLE_SIZE: f64 = 5.0;
/// Distance of the rotate handle above the top edge
pub const ROTATE_HANDLE_DISTANCE: f64 = 20.0;

/// Axis-aligned box in scene coordinates, before rotation is applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    pub fn centered_at(center: Point, width: f64, height: f64) -> Self {
        Self::new(center.x - width / 2.0, center.y - height / 2.0, width, height)
    }

    fn from_edges(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Rectangle,
    Ellipse,
}

impl ShapeKind {
    /// True area of a shape of this kind inscribed in a `width` x `height` box
    pub fn area(&self, width: f64, height: f64) -> f64 {
        match self {
            ShapeKind::Rectangle => width * height,
            ShapeKind::Ellipse => PI * (width / 2.0) * (height / 2.0),
        }
    }
}

/// The eight resize handles: corners, then edge midpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Left,
    Right,
    Top,
    Bottom,
}

impl Handle {
    pub const ALL: [Handle; 8] = [
        Handle::TopLeft,
        Handle::TopRight,
        Handle::BottomLeft,
        Handle::BottomRight,
        Handle::Left,
        Handle::Right,
        Handle::Top,
        Handle::Bottom,
    ];

    fn moves_left(&self) -> bool {
        matches!(self, Handle::TopLeft | Handle::BottomLeft | Handle::Left)
    }

    fn moves_right(&self) -> bool {
        matches!(self, Handle::TopRight | Handle::BottomRight | Handle::Right)
    }

    fn moves_top(&self) -> bool {
        matches!(self, Handle::TopLeft | Handle::TopRight | Handle::Top)
    }

    fn moves_bottom(&self) -> bool {
        matches!(self, Handle::BottomLeft | Handle::BottomRight | Handle::Bottom)
    }
}

/// What a pointer press grabbed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragTarget {
    Resize(Handle),
    Rotate,
    Move,
}

/// Snapshot taken when a drag starts; every pointer update is applied to it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drag {
    pub target: DragTarget,
    pub start: Point,
    pub original: Bounds,
    pub original_angle: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub kind: ShapeKind,
    pub bounds: Bounds,
    /// Degrees in [0, 360), clockwise on screen, about the bounds center
    pub rotation: f64,
    pub selected: bool,
}

impl Shape {
    pub fn new(kind: ShapeKind, bounds: Bounds) -> Self {
        Self {
            kind,
            bounds,
            rotation: 0.0,
            selected: false,
        }
    }

    /// Area from the width/height formula; rotation never changes it
    pub fn area(&self) -> f64 {
        self.kind.area(self.bounds.width, self.bounds.height)
    }

    fn rotation_matrix(&self) -> Rotation2<f64> {
        Rotation2::new(self.rotation.to_radians())
    }

    /// Scene point into the unrotated frame of the shape
    pub fn to_local(&self, point: Point) -> Point {
        let center = self.bounds.center();
        center + self.rotation_matrix().inverse() * (point - center)
    }

    /// Unrotated frame point into scene coordinates
    pub fn to_scene(&self, local: Point) -> Point {
        let center = self.bounds.center();
        center + self.rotation_matrix() * (local - center)
    }

    /// Handle position in the unrotated frame
    pub fn handle_position(&self, handle: Handle) -> Point {
        let b = &self.bounds;
        let c = b.center();
        match handle {
            Handle::TopLeft => Point::new(b.left, b.top),
            Handle::TopRight => Point::new(b.right(), b.top),
            Handle::BottomLeft => Point::new(b.left, b.bottom()),
            Handle::BottomRight => Point::new(b.right(), b.bottom()),
            Handle::Left => Point::new(b.left, c.y),
            Handle::Right => Point::new(b.right(), c.y),
            Handle::Top => Point::new(c.x, b.top),
            Handle::Bottom => Point::new(c.x, b.bottom()),
        }
    }

    pub fn rotate_handle_position(&self) -> Point {
        Point::new(self.bounds.center().x, self.bounds.top - ROTATE_HANDLE_DISTANCE)
    }

    pub fn contains(&self, point: Point) -> bool {
        let p = self.to_local(point);
        let b = &self.bounds;
        match self.kind {
            ShapeKind::Rectangle => {
                p.x >= b.left && p.x <= b.right() && p.y >= b.top && p.y <= b.bottom()
            }
            ShapeKind::Ellipse => {
                let c = b.center();
                let a = b.width / 2.0;
                let r = b.height / 2.0;
                let dx = (p.x - c.x) / a;
                let dy = (p.y - c.y) / r;
                dx * dx + dy * dy <= 1.0
            }
        }
    }

    /// Which handle or body part sits under `point`; the rotate handle wins ties
    pub fn hit_test(&self, point: Point) -> Option<DragTarget> {
        let p = self.to_local(point);
        let near = |h: Point| {
            (p.x - h.x).abs() <= HANDLE_SIZE / 2.0 && (p.y - h.y).abs() <= HANDLE_SIZE / 2.0
        };

        if near(self.rotate_handle_position()) {
            return Some(DragTarget::Rotate);
        }
        if let Some(handle) = Handle::ALL.iter().find(|h| near(self.handle_position(**h))) {
            return Some(DragTarget::Resize(*handle));
        }
        if self.contains(point) {
            return Some(DragTarget::Move);
        }
        None
    }

    pub fn begin_drag(&self, target: DragTarget, start: Point) -> Drag {
        Drag {
            target,
            start,
            original: self.bounds,
            original_angle: self.rotation,
        }
    }

    /// Apply a pointer position to an in-progress drag
    pub fn drag_to(&mut self, drag: &Drag, pointer: Point, min_size: f64) {
        match drag.target {
            DragTarget::Resize(handle) => {
                let delta = Rotation2::new(drag.original_angle.to_radians()).inverse()
                    * (pointer - drag.start);
                self.resize_from(&drag.original, handle, delta, min_size);
            }
            DragTarget::Rotate => {
                let center = drag.original.center();
                self.rotation = rotated_angle(drag.original_angle, center, drag.start, pointer);
            }
            DragTarget::Move => {
                let delta = pointer - drag.start;
                self.bounds = Bounds::new(
                    drag.original.left + delta.x,
                    drag.original.top + delta.y,
                    drag.original.width,
                    drag.original.height,
                );
            }
        }
    }

    /// Drag `handle` from `start` to `pointer`. Opposite edges stay put and
    /// neither dimension drops below `min_size`.
    pub fn resize(&mut self, handle: Handle, start: Point, pointer: Point, min_size: f64) {
        let drag = self.begin_drag(DragTarget::Resize(handle), start);
        self.drag_to(&drag, pointer, min_size);
    }

    /// Rotate by the angle swept from `start` to `pointer` around the center
    pub fn rotate(&mut self, start: Point, pointer: Point) {
        let drag = self.begin_drag(DragTarget::Rotate, start);
        self.drag_to(&drag, pointer, 0.0);
    }

    fn resize_from(&mut self, original: &Bounds, handle: Handle, delta: Vector2<f64>, min_size: f64) {
        let mut left = original.left;
        let mut right = original.right();
        let mut top = original.top;
        let mut bottom = original.bottom();

        if handle.moves_left() {
            left = (left + delta.x).min(right - min_size);
        }
        if handle.moves_right() {
            right = (right + delta.x).max(left + min_size);
        }
        if handle.moves_top() {
            top = (top + delta.y).min(bottom - min_size);
        }
        if handle.moves_bottom() {
            bottom = (bottom + delta.y).max(top + min_size);
        }

        self.bounds = Bounds::from_edges(left, top, right, bottom);
    }

    /// Scene coordinates of the four corners, clockwise from top-left
    pub fn corners(&self) -> [Point; 4] {
        let b = &self.bounds;
        [
            self.to_scene(Point::new(b.left, b.top)),
            self.to_scene(Point::new(b.right(), b.top)),
            self.to_scene(Point::new(b.right(), b.bottom())),
            self.to_scene(Point::new(b.left, b.bottom())),
        ]
    }

    /// Closed outline in scene coordinates; ellipses are sampled at `segments` points
    pub fn outline(&self, segments: usize) -> Vec<Point> {
        match self.kind {
            ShapeKind::Rectangle => self.corners().to_vec(),
            ShapeKind::Ellipse => {
                let c = self.bounds.center();
                let a = self.bounds.width / 2.0;
                let b = self.bounds.height / 2.0;
                let segments = segments.max(8);
                (0..segments)
                    .map(|i| {
                        let t = 2.0 * PI * i as f64 / segments as f64;
                        self.to_scene(Point::new(c.x + a * t.cos(), c.y + b * t.sin()))
                    })
                    .collect()
            }
        }
    }
}

/// `base` plus the signed angle between center->start and center->pointer, in [0, 360)
pub fn rotated_angle(base: f64, center: Point, start: Point, pointer: Point) -> f64 {
    let from = start - center;
    let to = pointer - center;
    if from.norm() == 0.0 || to.norm() == 0.0 {
        return normalize_degrees(base);
    }
    let delta = (to.y.atan2(to.x) - from.y.atan2(from.x)).to_degrees();
    normalize_degrees(base + delta)
}

pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
