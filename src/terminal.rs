// src/terminal.rs - Line-driven classification loop
//
// A single character is a label shortcut. Lines starting with ':' are commands.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;
use anyhow::Result;

use defect_classify_lib::calibration::CalibrationState;
use defect_classify_lib::measurement::MeasurementBoard;
use defect_classify_lib::shapes::{Point, ShapeKind};
use defect_classify_lib::{
    load_image, render_overlay, save_image, ClassificationSession, ClassifyOutcome, SessionState,
};

const HELP: &str = "\
  <key>             classify with the label bound to <key>
  <label name>      classify by full label name
  :undo             move the last photo back
  :labels           list labels and keys
  :calib PIX UM     set the calibration circle
  :center X Y       move the calibration circle
  :radius DX        drag the circle edge DX pixels sideways
  :rect | :ellipse  add a measurement shape
  :shapes           list shapes
  :select X Y [+]   select the shape under X Y (+ keeps the selection)
  :all              select every shape
  :drag X0 Y0 X1 Y1 press at X0 Y0 and release at X1 Y1 (move, resize or rotate)
  :delete           remove selected shapes
  :reset            drop shape rotations
  :ratio            smallest / largest shape area
  :clear            remove all shapes
  :overlay FILE     save the current photo with overlays
  :q                quit";

const DEFAULT_VIEWPORT: (f64, f64) = (500.0, 500.0);

pub fn run(session: &mut ClassificationSession, calibration: CalibrationState) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_with(session, calibration, stdin.lock(), stdout.lock())
}

pub fn run_with<R: BufRead, W: Write>(
    session: &mut ClassificationSession,
    mut calibration: CalibrationState,
    mut input: R,
    mut out: W,
) -> Result<()> {
    let mut board = MeasurementBoard::new(session.config(), DEFAULT_VIEWPORT.0, DEFAULT_VIEWPORT.1);
    let mut shown: Option<PathBuf> = None;
    let mut line = String::new();

    writeln!(out, "Type :help for commands")?;

    loop {
        match session.state() {
            SessionState::AllComplete => {
                writeln!(out, "All folders complete")?;
                break;
            }
            SessionState::FolderExhausted => {
                if !prompt_next_folder(session, &mut input, &mut out)? {
                    break;
                }
                continue;
            }
            _ => {}
        }

        let current = session.current_photo().cloned();
        if current != shown {
            // Shapes belong to the photo they were drawn on
            board.clear_shapes();
            if let Some(photo) = &current {
                let (w, h) = image::image_dimensions(photo)
                    .map(|(w, h)| (w as f64, h as f64))
                    .unwrap_or(DEFAULT_VIEWPORT);
                board.set_viewport(w, h);
            }
            shown = current.clone();
        }

        if let Some(photo) = &current {
            writeln!(out, "[{} left] {}", session.queue().len(), photo.display())?;
        }
        write!(out, "> ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let command = line.trim();
        if command.is_empty() {
            continue;
        }

        if let Some(rest) = command.strip_prefix(':') {
            let mut parts = rest.split_whitespace();
            match parts.next().unwrap_or_default() {
                "q" | "quit" => break,
                "help" => writeln!(out, "{}", HELP)?,
                "undo" | "u" => match session.undo() {
                    Ok(Some(entry)) => writeln!(out, "Restored {}", entry.original.display())?,
                    Ok(None) => writeln!(out, "Nothing to undo")?,
                    Err(e) => writeln!(out, "error: {}", e)?,
                },
                "labels" => {
                    if let Some(labels) = session.labels() {
                        for route in labels.routes() {
                            writeln!(out, "  {}  {:<30} {}", route.key, route.name, route.leaf())?;
                        }
                    }
                }
                "calib" => {
                    let values: Vec<f64> = parts.filter_map(|p| p.parse().ok()).collect();
                    match values.as_slice() {
                        [pix_spec, um] => match calibration.set_calibration(*pix_spec, *um) {
                            Ok(radius) => writeln!(out, "Circle radius {:.3} px", radius)?,
                            Err(e) => writeln!(out, "error: {}", e)?,
                        },
                        _ => writeln!(out, "usage: :calib PIX UM")?,
                    }
                }
                "center" => {
                    let values: Vec<f64> = parts.filter_map(|p| p.parse().ok()).collect();
                    match values.as_slice() {
                        [x, y] => calibration.set_center(Point::new(*x, *y)),
                        _ => writeln!(out, "usage: :center X Y")?,
                    }
                }
                "radius" => match parts.next().and_then(|p| p.parse::<f64>().ok()) {
                    Some(dx) => {
                        calibration.begin_radius_drag(0.0);
                        calibration.drag_radius(dx);
                        calibration.end_radius_drag();
                        match calibration.um_size() {
                            Some(um) => writeln!(
                                out,
                                "Circle radius {:.3} px ({:.2} um)",
                                calibration.circle_radius(),
                                um
                            )?,
                            None => writeln!(out, "Circle radius {:.3} px", calibration.circle_radius())?,
                        }
                    }
                    None => writeln!(out, "usage: :radius DX")?,
                },
                "rect" => {
                    board.add_shape(ShapeKind::Rectangle);
                    writeln!(out, "{} shapes", board.len())?;
                }
                "ellipse" => {
                    board.add_shape(ShapeKind::Ellipse);
                    writeln!(out, "{} shapes", board.len())?;
                }
                "shapes" => {
                    for (i, shape) in board.shapes().iter().enumerate() {
                        let b = &shape.bounds;
                        writeln!(
                            out,
                            "  {}{} {:?} at ({:.1}, {:.1}) {:.1}x{:.1} rot {:.1} area {:.1}",
                            i,
                            if shape.selected { "*" } else { " " },
                            shape.kind,
                            b.left,
                            b.top,
                            b.width,
                            b.height,
                            shape.rotation,
                            shape.area()
                        )?;
                    }
                }
                "select" => {
                    let args: Vec<&str> = parts.collect();
                    let additive = args.last() == Some(&"+");
                    let values: Vec<f64> = args.iter().filter_map(|p| p.parse().ok()).collect();
                    match values.as_slice() {
                        [x, y] => match board.select_at(Point::new(*x, *y), additive) {
                            Some(index) => writeln!(out, "Selected shape {}", index)?,
                            None => writeln!(out, "No shape at {} {}", x, y)?,
                        },
                        _ => writeln!(out, "usage: :select X Y [+]")?,
                    }
                }
                "all" => board.select_all(),
                "drag" => {
                    let values: Vec<f64> = parts.filter_map(|p| p.parse().ok()).collect();
                    match values.as_slice() {
                        [x0, y0, x1, y1] => {
                            if board.press(Point::new(*x0, *y0)) {
                                board.drag(Point::new(*x1, *y1));
                                board.release();
                            } else {
                                writeln!(out, "No shape at {} {}", x0, y0)?;
                            }
                        }
                        _ => writeln!(out, "usage: :drag X0 Y0 X1 Y1")?,
                    }
                }
                "delete" => {
                    let removed = board.delete_selected();
                    writeln!(out, "Deleted {} shapes, {} left", removed, board.len())?;
                }
                "reset" => board.reset_transforms(),
                "ratio" => match board.calculate_area_ratio() {
                    Ok(ratio) => writeln!(out, "Area ratio: {:.2}%", ratio)?,
                    Err(e) => writeln!(out, "error: {}", e)?,
                },
                "clear" => board.clear_shapes(),
                "overlay" => match (parts.next(), &current) {
                    (Some(target), Some(photo)) => {
                        let result = load_image(photo).and_then(|input| {
                            let rendered = render_overlay(&input.image, &calibration, board.shapes());
                            save_image(&rendered, target)
                        });
                        match result {
                            Ok(()) => writeln!(out, "Saved {}", target)?,
                            Err(e) => writeln!(out, "error: {}", e)?,
                        }
                    }
                    (None, _) => writeln!(out, "usage: :overlay FILE")?,
                    (_, None) => writeln!(out, "No photo to draw on")?,
                },
                other => writeln!(out, "Unknown command :{}", other)?,
            }
            continue;
        }

        let mut chars = command.chars();
        let outcome = match (chars.next(), chars.next()) {
            (Some(key), None) => match session.labels().and_then(|l| l.label_for_key(key)) {
                Some(route) => {
                    let name = route.name.clone();
                    session.classify_at(&name, Instant::now())
                }
                None => {
                    writeln!(out, "No label bound to '{}'", key)?;
                    continue;
                }
            },
            _ => session.classify_at(command, Instant::now()),
        };

        match outcome {
            Ok(ClassifyOutcome::Moved(entry)) => {
                log::debug!("{} -> {}", entry.original.display(), entry.destination.display());
            }
            Ok(ClassifyOutcome::Skipped { photo, existing }) => writeln!(
                out,
                "Skipped {}: {} already exists",
                photo.display(),
                existing.display()
            )?,
            Ok(ClassifyOutcome::QueueEmpty) => writeln!(out, "No photos left")?,
            Ok(ClassifyOutcome::Debounced) => {}
            Err(e) => writeln!(out, "error: {}", e)?,
        }
    }

    Ok(())
}

/// Offer the unvisited sibling folders. Returns false once the session is over.
fn prompt_next_folder<R: BufRead, W: Write>(
    session: &mut ClassificationSession,
    input: &mut R,
    out: &mut W,
) -> Result<bool> {
    let remaining = session.remaining_folders();
    writeln!(out, "Folder done. Continue with one of:")?;
    for (i, folder) in remaining.iter().enumerate() {
        writeln!(out, "  {}. {}", i + 1, folder.display())?;
    }
    write!(out, "number (blank to finish)> ")?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 || line.trim().is_empty() {
        session.finish()?;
        return Ok(false);
    }

    match line.trim().parse::<usize>() {
        Ok(n) if n >= 1 && n <= remaining.len() => {
            if let Err(e) = session.advance_to_next_folder(&remaining[n - 1]) {
                writeln!(out, "error: {}", e)?;
            }
        }
        _ => writeln!(out, "Pick a number between 1 and {}", remaining.len())?,
    }
    Ok(true)
}
