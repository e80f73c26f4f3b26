// src/calibration.rs - Micrometre to on-screen radius calibration

use serde::Serialize;

use crate::config::CalibrationConfig;
pub use crate::config::ResolutionTier;
use crate::errors::{ClassifyError, Result};
use crate::shapes::Point;

/// Overlay radius for a physical size: `(um / pix_spec) * scale / 2`
pub fn circle_radius(um_size: f64, pix_spec: f64, scale: f64) -> f64 {
    (um_size / pix_spec) * scale / 2.0
}

/// Inverse of `circle_radius`, rounded to two decimals
pub fn um_for_radius(radius: f64, pix_spec: f64, scale: f64) -> f64 {
    let um = radius * 2.0 * pix_spec / scale;
    (um * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaleTick {
    pub x: f64,
    pub label_um: u32,
}

/// Graduated bar drawn under the photo
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaleBar {
    pub start_x: f64,
    pub end_x: f64,
    /// y of the bar line; ticks rise above it
    pub baseline_y: f64,
    pub ticks: Vec<ScaleTick>,
}

/// Calibration circle state for one session. Not persisted.
#[derive(Debug, Clone)]
pub struct CalibrationState {
    config: CalibrationConfig,
    tier: ResolutionTier,
    pix_spec: Option<f64>,
    um_size: Option<f64>,
    circle_radius: f64,
    circle_center: Point,
    visible: bool,
    radius_drag: Option<(f64, f64)>,
}

impl CalibrationState {
    pub fn new(config: &CalibrationConfig, tier: ResolutionTier) -> Self {
        Self {
            config: config.clone(),
            tier,
            pix_spec: None,
            um_size: None,
            circle_radius: config.default_radius,
            circle_center: Point::new(config.default_center[0], config.default_center[1]),
            visible: false,
            radius_drag: None,
        }
    }

    pub fn scale_factor(&self) -> f64 {
        self.config.scale_for(self.tier)
    }

    /// Store both inputs and recompute the radius.
    ///
    /// A zero `um_size` hides the circle, matching an emptied input field.
    pub fn set_calibration(&mut self, pix_spec: f64, um_size: f64) -> Result<f64> {
        if !pix_spec.is_finite() || pix_spec <= 0.0 {
            return Err(ClassifyError::InvalidCalibration(format!(
                "pix spec must be a positive number, got {}",
                pix_spec
            )));
        }
        if !um_size.is_finite() || um_size < 0.0 {
            return Err(ClassifyError::InvalidCalibration(format!(
                "um size must be zero or positive, got {}",
                um_size
            )));
        }

        self.pix_spec = Some(pix_spec);
        self.um_size = Some(um_size);
        self.visible = um_size > 0.0;
        self.recompute();

        log::debug!(
            "calibration: pix_spec={}, um_size={}, tier={:?}, radius={}",
            pix_spec,
            um_size,
            self.tier,
            self.circle_radius
        );
        Ok(self.circle_radius)
    }

    pub fn set_tier(&mut self, tier: ResolutionTier) {
        self.tier = tier;
        self.recompute();
    }

    fn recompute(&mut self) {
        if let (Some(pix_spec), Some(um_size)) = (self.pix_spec, self.um_size) {
            if um_size > 0.0 {
                self.circle_radius = circle_radius(um_size, pix_spec, self.scale_factor());
            }
        }
    }

    pub fn set_center(&mut self, center: Point) {
        self.circle_center = center;
    }

    pub fn contains(&self, point: Point) -> bool {
        (point - self.circle_center).norm_squared() <= self.circle_radius * self.circle_radius
    }

    pub fn begin_radius_drag(&mut self, pointer_x: f64) {
        self.radius_drag = Some((pointer_x, self.circle_radius));
    }

    /// Grow or shrink by half the horizontal drag distance; the µm value follows
    pub fn drag_radius(&mut self, pointer_x: f64) {
        let (start_x, start_radius) = match self.radius_drag {
            Some(drag) => drag,
            None => return,
        };
        let radius = start_radius + (pointer_x - start_x) / 2.0;
        if radius <= 0.0 {
            return;
        }
        self.circle_radius = radius;
        if let Some(pix_spec) = self.pix_spec {
            self.um_size = Some(um_for_radius(radius, pix_spec, self.scale_factor()));
        }
    }

    pub fn end_radius_drag(&mut self) {
        self.radius_drag = None;
    }

    /// Bar geometry for an image of the given size, once a pix spec is known
    pub fn scale_bar(&self, image_width: f64, image_height: f64) -> Option<ScaleBar> {
        let pix_spec = self.pix_spec?;
        let span_um = self.config.scale_bar_um;
        let width = (span_um as f64 / pix_spec) * self.scale_factor();
        let start_x = (image_width - width) / 2.0;
        let baseline_y = image_height * 0.95 - 5.0;

        let ticks = (0..=span_um)
            .step_by(self.config.scale_bar_step_um.max(1) as usize)
            .map(|label_um| ScaleTick {
                x: start_x + (label_um as f64 / span_um as f64) * width,
                label_um,
            })
            .collect();

        Some(ScaleBar {
            start_x,
            end_x: start_x + width,
            baseline_y,
            ticks,
        })
    }

    pub fn tier(&self) -> ResolutionTier {
        self.tier
    }

    pub fn pix_spec(&self) -> Option<f64> {
        self.pix_spec
    }

    pub fn um_size(&self) -> Option<f64> {
        self.um_size
    }

    pub fn circle_radius(&self) -> f64 {
        self.circle_radius
    }

    pub fn circle_center(&self) -> Point {
        self.circle_center
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}
