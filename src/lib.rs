// src/lib.rs - Library interface for the defect photo classifier

pub mod calibration;
pub mod config;
pub mod crawl;
pub mod defect_name;
pub mod errors;
pub mod folder_chain;
pub mod image_io;
pub mod labels;
pub mod measurement;
pub mod output;
pub mod overlay;
pub mod queue;
pub mod router;
pub mod session;
pub mod shapes;
pub mod undo;

// Re-export commonly used types and functions
pub use errors::{ClassifyError, Result};
pub use config::{Config, LabelSpec, CalibrationConfig, ResolutionTier};
pub use image_io::{InputImage, load_image, save_image, list_photos_in_dir};

// Workflow
pub use session::{
    ClassificationSession,
    ClassifyOutcome,
    RecordKind,
    SessionRecord,
    SessionState,
};
pub use labels::{LabelMap, LabelRoute};
pub use undo::{UndoEntry, UndoStack};
pub use router::{move_photo, move_back, MoveOutcome};
pub use folder_chain::{discover_sibling_folders, has_category_code, FolderChain};

// Measurement
pub use shapes::{Bounds, Handle, Shape, ShapeKind};
pub use measurement::{area_ratio, MeasurementBoard};
pub use calibration::{circle_radius, CalibrationState, ScaleBar};
pub use overlay::render_overlay;

// Reports and tools
pub use output::write_session_csv;
pub use defect_name::{parse_defect_name, DefectName};
pub use crawl::{run_crawl, CrawlOptions, CrawlSummary};
