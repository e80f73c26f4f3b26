// src/overlay.rs - Burn the calibration circle, scale bar and shapes into a photo

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_circle_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::calibration::CalibrationState;
use crate::shapes::{Point, Shape};

const CIRCLE_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BAR_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);
const BAR_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const SHAPE_COLOR: Rgba<u8> = Rgba([0, 120, 255, 255]);
const SELECTED_COLOR: Rgba<u8> = Rgba([255, 160, 0, 255]);

const TICK_HEIGHT: f32 = 8.0;
const ELLIPSE_SEGMENTS: usize = 72;

/// Copy of `image` with the measurement layers drawn on top
pub fn render_overlay(
    image: &RgbaImage,
    calibration: &CalibrationState,
    shapes: &[Shape],
) -> RgbaImage {
    let mut canvas = image.clone();

    if calibration.is_visible() {
        draw_calibration_circle(&mut canvas, calibration);
    }

    let (width, height) = canvas.dimensions();
    if let Some(bar) = calibration.scale_bar(width as f64, height as f64) {
        // A tiny pix spec gives a bar far wider than the image; keep it on canvas
        let min_x = -1.0;
        let max_x = width as f64 + 1.0;
        let start_x = bar.start_x.clamp(min_x, max_x);
        let end_x = bar.end_x.clamp(min_x, max_x);
        let y = bar.baseline_y as f32;

        let left = (start_x.floor() as i32).saturating_sub(4);
        let top = ((y - TICK_HEIGHT) as i32).saturating_sub(4);
        let bar_width = ((end_x - start_x).ceil().max(1.0) as u32).saturating_add(8);
        let bar_height = TICK_HEIGHT as u32 + 9;
        draw_filled_rect_mut(
            &mut canvas,
            Rect::at(left, top).of_size(bar_width, bar_height),
            BAR_BACKGROUND,
        );

        draw_line_segment_mut(&mut canvas, (start_x as f32, y), (end_x as f32, y), BAR_COLOR);
        for tick in bar.ticks.iter().filter(|t| t.x >= min_x && t.x <= max_x) {
            let x = tick.x as f32;
            draw_line_segment_mut(&mut canvas, (x, y), (x, y - TICK_HEIGHT), BAR_COLOR);
        }
    }

    for shape in shapes {
        let color = if shape.selected { SELECTED_COLOR } else { SHAPE_COLOR };
        draw_closed_path(&mut canvas, &shape.outline(ELLIPSE_SEGMENTS), color);
    }

    canvas
}

fn draw_calibration_circle(canvas: &mut RgbaImage, calibration: &CalibrationState) {
    let (width, height) = canvas.dimensions();
    let reach = (width as f64).hypot(height as f64) * 2.0;
    let center = calibration.circle_center();
    let radius = calibration.circle_radius();

    // Nothing of it would land on the image
    if radius > reach || center.x.abs() > reach || center.y.abs() > reach {
        log::debug!("calibration circle (r = {}) is off canvas, not drawn", radius);
        return;
    }

    let center = (center.x.round() as i32, center.y.round() as i32);
    let radius = radius.round().max(1.0) as i32;

    // 2px stroke
    draw_hollow_circle_mut(canvas, center, radius, CIRCLE_COLOR);
    draw_hollow_circle_mut(canvas, center, radius + 1, CIRCLE_COLOR);
}

fn draw_closed_path(canvas: &mut RgbaImage, points: &[Point], color: Rgba<u8>) {
    if points.len() < 2 {
        return;
    }
    for (i, start) in points.iter().enumerate() {
        let end = &points[(i + 1) % points.len()];
        draw_line_segment_mut(
            canvas,
            (start.x as f32, start.y as f32),
            (end.x as f32, end.y as f32),
            color,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::ResolutionTier;
    use crate::config::CalibrationConfig;
    use crate::shapes::{Bounds, ShapeKind};

    fn blank(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([40, 40, 40, 255]))
    }

    #[test]
    fn uncalibrated_overlay_only_draws_shapes() {
        let image = blank(100, 100);
        let calibration =
            CalibrationState::new(&CalibrationConfig::default(), ResolutionTier::Standard);
        let rendered = render_overlay(&image, &calibration, &[]);
        assert_eq!(rendered, image);

        let shape = Shape::new(ShapeKind::Rectangle, Bounds::new(10.0, 10.0, 50.0, 30.0));
        let rendered = render_overlay(&image, &calibration, &[shape]);
        assert_eq!(*rendered.get_pixel(30, 10), SHAPE_COLOR);
        assert_eq!(*rendered.get_pixel(30, 25), Rgba([40, 40, 40, 255]));
    }

    #[test]
    fn calibrated_overlay_draws_circle_and_bar() {
        let image = blank(500, 500);
        let mut calibration =
            CalibrationState::new(&CalibrationConfig::default(), ResolutionTier::Standard);
        calibration.set_calibration(1.0, 40.0).unwrap();
        calibration.set_center(Point::new(250.0, 250.0));

        let rendered = render_overlay(&image, &calibration, &[]);
        // radius = 40 * 1.3 / 2 = 26
        assert_eq!(*rendered.get_pixel(276, 250), CIRCLE_COLOR);

        let bar = calibration.scale_bar(500.0, 500.0).unwrap();
        let y = bar.baseline_y.round() as u32;
        assert_eq!(*rendered.get_pixel(250, y), BAR_COLOR);
        assert_eq!(rendered.dimensions(), (500, 500));
    }

    #[test]
    fn extreme_calibration_stays_on_canvas() {
        let image = blank(500, 500);
        let mut calibration =
            CalibrationState::new(&CalibrationConfig::default(), ResolutionTier::Standard);

        // Scale bar 2.6e10 px wide
        calibration.set_calibration(1e-8, 0.0).unwrap();
        let rendered = render_overlay(&image, &calibration, &[]);
        let y = calibration.scale_bar(500.0, 500.0).unwrap().baseline_y.round() as u32;
        assert_eq!(*rendered.get_pixel(0, y), BAR_COLOR);
        assert_eq!(*rendered.get_pixel(499, y), BAR_COLOR);

        // Circle radius 6.5e11 px
        calibration.set_calibration(1.0, 1e12).unwrap();
        calibration.set_center(Point::new(250.0, 250.0));
        let rendered = render_overlay(&image, &calibration, &[]);
        assert_eq!(rendered.dimensions(), (500, 500));
        assert_eq!(*rendered.get_pixel(250, 250), Rgba([40, 40, 40, 255]));
    }
}
