mod terminal;

use std::path::PathBuf;
use std::time::Instant;
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};

use defect_classify_lib::calibration::CalibrationState;
use defect_classify_lib::crawl::{self, CrawlOptions};
use defect_classify_lib::folder_chain::discover_sibling_folders;
use defect_classify_lib::shapes::{Bounds, Point, Shape, ShapeKind};
use defect_classify_lib::{
    area_ratio, load_image, render_overlay, save_image, ClassificationSession, Config,
    ResolutionTier,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "Defect photo classifier - sort inspection photos into label folders")]
struct Args {
    /// Path to configuration file
    #[clap(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Print debug logging (RUST_LOG overrides)
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify the photos of a folder interactively
    Classify {
        /// Folder holding the photos to sort
        #[clap(short, long)]
        folder: PathBuf,

        /// Send label folders under this root instead of the photo folder
        #[clap(long)]
        save_to: Option<PathBuf>,

        /// Write a CSV of every move, skip and undo on exit
        #[clap(long)]
        report: Option<PathBuf>,

        /// Screen size as WxH, used to pick the calibration tier
        #[clap(long)]
        screen: Option<String>,
    },

    /// List the sibling folders that would follow this one
    Siblings {
        #[clap(short, long)]
        folder: PathBuf,
    },

    /// Compute the calibration circle radius
    Calibrate {
        #[clap(long)]
        pix_spec: f64,

        #[clap(long)]
        um: f64,

        #[clap(long)]
        screen: Option<String>,

        /// Print the result as JSON
        #[clap(long)]
        json: bool,
    },

    /// Burn the calibration circle and scale bar into a copy of a photo
    Overlay {
        #[clap(long)]
        photo: PathBuf,

        #[clap(long)]
        pix_spec: f64,

        #[clap(long)]
        um: f64,

        /// Circle center as X,Y (defaults to the image center)
        #[clap(long)]
        center: Option<String>,

        #[clap(long)]
        screen: Option<String>,

        #[clap(short, long)]
        out: PathBuf,
    },

    /// Ratio of the smallest to the largest of the given shapes, in percent
    AreaRatio {
        /// Rectangle as WxH, repeatable
        #[clap(long = "rect")]
        rects: Vec<String>,

        /// Ellipse as WxH, repeatable
        #[clap(long = "ellipse")]
        ellipses: Vec<String>,

        #[clap(long)]
        json: bool,
    },

    /// Copy a sample of photos out of a directory tree
    Crawl {
        #[clap(long)]
        source: PathBuf,

        #[clap(long)]
        output: PathBuf,

        /// Maximum number of photos to copy
        #[clap(long)]
        max: usize,

        /// Leave out photos whose name already appears under this folder
        #[clap(long)]
        filter: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Main function
fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = Config::load_or_default(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config))?;
    config.validate()?;

    match args.command {
        Command::Classify { folder, save_to, report, screen } => {
            let tier = resolve_tier(&config, screen.as_deref())?;
            let calibration = CalibrationState::new(&config.calibration, tier);

            let mut session = ClassificationSession::new(config);
            session.set_save_root(save_to);
            session
                .open_folder(&folder)
                .with_context(|| format!("opening {}", folder.display()))?;

            let start_time = Instant::now();
            terminal::run(&mut session, calibration)?;

            if let Some(report) = report {
                defect_classify_lib::write_session_csv(session.records(), &report)
                    .with_context(|| format!("writing report {}", report.display()))?;
            }

            let moved = session
                .records()
                .iter()
                .filter(|r| r.kind == defect_classify_lib::RecordKind::Moved)
                .count();
            println!(
                "Session finished in {:.1} s: {} records, {} moved, {} skipped",
                start_time.elapsed().as_secs_f64(),
                session.records().len(),
                moved,
                session.skipped().len()
            );
        }

        Command::Siblings { folder } => {
            let siblings = discover_sibling_folders(
                &folder,
                config.sibling_code_range,
                config.use_parallel,
            )?;
            if siblings.is_empty() {
                println!("No sibling folders with photos");
            }
            for sibling in siblings {
                println!("{}", sibling.display());
            }
        }

        Command::Calibrate { pix_spec, um, screen, json } => {
            let tier = resolve_tier(&config, screen.as_deref())?;
            let mut calibration = CalibrationState::new(&config.calibration, tier);
            let radius = calibration.set_calibration(pix_spec, um)?;

            if json {
                let value = serde_json::json!({
                    "pix_spec": pix_spec,
                    "um_size": um,
                    "tier": tier,
                    "scale": calibration.scale_factor(),
                    "radius": radius,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("Tier: {:?} (scale {})", tier, calibration.scale_factor());
                println!("Circle radius: {:.4} px", radius);
            }
        }

        Command::Overlay { photo, pix_spec, um, center, screen, out } => {
            let tier = resolve_tier(&config, screen.as_deref())?;
            let input = load_image(&photo)?;
            let (width, height) = input.image.dimensions();

            let mut calibration = CalibrationState::new(&config.calibration, tier);
            calibration.set_calibration(pix_spec, um)?;
            let center = match center {
                Some(text) => {
                    let (x, y) = parse_pair(&text, ',')?;
                    Point::new(x, y)
                }
                None => Point::new(width as f64 / 2.0, height as f64 / 2.0),
            };
            calibration.set_center(center);

            let rendered = render_overlay(&input.image, &calibration, &[]);
            save_image(&rendered, &out)?;
            println!("Saved overlay of {} to {}", input.filename, out.display());
        }

        Command::AreaRatio { rects, ellipses, json } => {
            let shapes = shapes_from_args(&rects, &ellipses, config.min_shape_size)?;
            let areas: Vec<f64> = shapes.iter().map(Shape::area).collect();
            let ratio = area_ratio(&areas);
            if json {
                let value = serde_json::json!({ "areas": areas, "ratio_percent": ratio });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("Area ratio: {:.2}%", ratio);
            }
        }

        Command::Crawl { source, output, max, filter } => {
            let handle = crawl::spawn(CrawlOptions {
                source,
                output,
                max_images: max,
                filter_dir: filter,
            });
            for progress in handle.progress.iter() {
                log::debug!("crawl: {} copied ({}%)", progress.copied, progress.percent);
            }
            let summary = handle.wait()?;
            if summary.is_short() {
                println!(
                    "Copied {} photos; not enough samples for the requested {}",
                    summary.copied, summary.requested
                );
            } else {
                println!("Copied {} photos", summary.copied);
            }
        }
    }

    Ok(())
}

/// Configured tier, else the tier of `--screen`, else standard
fn resolve_tier(config: &Config, screen: Option<&str>) -> Result<ResolutionTier> {
    if let Some(tier) = config.resolution_tier {
        return Ok(tier);
    }
    match screen {
        Some(text) => {
            let (w, h) = parse_pair(text, 'x')?;
            Ok(ResolutionTier::from_dimensions(w as u32, h as u32))
        }
        None => Ok(ResolutionTier::Standard),
    }
}

/// Shapes for `area-ratio`; every side must be finite and at least `min_size`
fn shapes_from_args(rects: &[String], ellipses: &[String], min_size: f64) -> Result<Vec<Shape>> {
    let mut shapes = Vec::new();
    for (kind, specs) in [(ShapeKind::Rectangle, rects), (ShapeKind::Ellipse, ellipses)] {
        for spec in specs {
            let (w, h) = parse_pair(spec, 'x')?;
            if !w.is_finite() || !h.is_finite() || w < min_size || h < min_size {
                bail!("shape '{}' must be finite and at least {} on each side", spec, min_size);
            }
            shapes.push(Shape::new(kind, Bounds::new(0.0, 0.0, w, h)));
        }
    }
    if shapes.len() < 2 {
        bail!("at least two shapes are needed, got {}", shapes.len());
    }
    Ok(shapes)
}

/// Parse `"<a><sep><b>"` into two positive-or-zero numbers
fn parse_pair(text: &str, sep: char) -> Result<(f64, f64)> {
    let (a, b) = text
        .split_once(sep)
        .ok_or_else(|| anyhow!("expected two numbers separated by '{}', got '{}'", sep, text))?;
    let a: f64 = a.trim().parse().with_context(|| format!("bad number in '{}'", text))?;
    let b: f64 = b.trim().parse().with_context(|| format!("bad number in '{}'", text))?;
    if a < 0.0 || b < 0.0 {
        bail!("negative value in '{}'", text);
    }
    Ok((a, b))
}
