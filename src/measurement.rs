// src/measurement.rs - Shape collection and area ratio measurement

use crate::config::Config;
use crate::errors::{ClassifyError, Result};
use crate::shapes::{Bounds, Drag, DragTarget, Point, Shape, ShapeKind};

/// Shapes drawn over the current photo
pub struct MeasurementBoard {
    shapes: Vec<Shape>,
    viewport_width: f64,
    viewport_height: f64,
    default_size: f64,
    min_size: f64,
    active_drag: Option<(usize, Drag)>,
}

impl MeasurementBoard {
    pub fn new(config: &Config, viewport_width: f64, viewport_height: f64) -> Self {
        Self {
            shapes: Vec::new(),
            viewport_width,
            viewport_height,
            default_size: config.default_shape_size,
            min_size: config.min_shape_size,
            active_drag: None,
        }
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport_width = width;
        self.viewport_height = height;
    }

    /// Add a default-sized shape centered in the viewport and return its index
    pub fn add_shape(&mut self, kind: ShapeKind) -> usize {
        let center = Point::new(self.viewport_width / 2.0, self.viewport_height / 2.0);
        let bounds = Bounds::centered_at(center, self.default_size, self.default_size);
        self.shapes.push(Shape::new(kind, bounds));
        self.shapes.len() - 1
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn shape_mut(&mut self, index: usize) -> Option<&mut Shape> {
        self.shapes.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Select the topmost shape under `point`. Without `additive`, everything
    /// else is deselected first. Returns the hit index.
    pub fn select_at(&mut self, point: Point, additive: bool) -> Option<usize> {
        let hit = self.shapes.iter().rposition(|shape| shape.contains(point));
        if !additive {
            for shape in &mut self.shapes {
                shape.selected = false;
            }
        }
        if let Some(index) = hit {
            self.shapes[index].selected = true;
        }
        hit
    }

    pub fn select_all(&mut self) {
        for shape in &mut self.shapes {
            shape.selected = true;
        }
    }

    /// Start a drag. Handles only respond on selected shapes; otherwise the
    /// topmost body under the pointer is selected and moved.
    pub fn press(&mut self, point: Point) -> bool {
        let handle_hit = self
            .shapes
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, shape)| shape.selected)
            .find_map(|(i, shape)| shape.hit_test(point).map(|target| (i, target)));

        let (index, target) = match handle_hit {
            Some(hit) => hit,
            None => match self.select_at(point, false) {
                Some(index) => (index, DragTarget::Move),
                None => {
                    self.active_drag = None;
                    return false;
                }
            },
        };

        let drag = self.shapes[index].begin_drag(target, point);
        self.active_drag = Some((index, drag));
        true
    }

    pub fn drag(&mut self, pointer: Point) {
        if let Some((index, drag)) = self.active_drag {
            if let Some(shape) = self.shapes.get_mut(index) {
                shape.drag_to(&drag, pointer, self.min_size);
            }
        }
    }

    pub fn release(&mut self) {
        self.active_drag = None;
    }

    /// Remove every selected shape, returning how many went
    pub fn delete_selected(&mut self) -> usize {
        let before = self.shapes.len();
        self.shapes.retain(|shape| !shape.selected);
        self.active_drag = None;
        before - self.shapes.len()
    }

    /// Remove all shapes; called whenever the displayed photo changes
    pub fn clear_shapes(&mut self) {
        self.shapes.clear();
        self.active_drag = None;
    }

    /// Drop accumulated rotation on every shape
    pub fn reset_transforms(&mut self) {
        for shape in &mut self.shapes {
            shape.rotation = 0.0;
        }
    }

    pub fn areas(&self) -> Vec<f64> {
        self.shapes.iter().map(Shape::area).collect()
    }

    /// Smallest area over largest area, as a percentage
    pub fn calculate_area_ratio(&self) -> Result<f64> {
        if self.shapes.len() < 2 {
            return Err(ClassifyError::NotEnoughShapes { found: self.shapes.len() });
        }
        Ok(area_ratio(&self.areas()))
    }
}

/// `min / max * 100` over the given areas; equal areas give exactly 100
pub fn area_ratio(areas: &[f64]) -> f64 {
    let min = areas.iter().copied().fold(f64::INFINITY, f64::min);
    let max = areas.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return 100.0;
    }
    min / max * 100.0
}
