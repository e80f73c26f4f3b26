// src/config.rs - Label table, limits and calibration constants

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::errors::{ClassifyError, Result};

/// Configuration for the defect classifier
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_undo_capacity")]
    pub undo_capacity: usize,

    #[serde(default = "default_classification_cooldown_ms")]
    pub classification_cooldown_ms: u64,

    /// Inclusive range of two-digit codes a sibling folder name must contain
    #[serde(default = "default_sibling_code_range")]
    pub sibling_code_range: [u32; 2],

    #[serde(default = "default_parallel")]
    pub use_parallel: bool,

    // Measurement shapes
    #[serde(default = "default_min_shape_size")]
    pub min_shape_size: f64,

    #[serde(default = "default_shape_size")]
    pub default_shape_size: f64,

    /// Forces a resolution tier instead of detecting it from the screen size
    #[serde(default)]
    pub resolution_tier: Option<ResolutionTier>,

    // Tables must follow plain values for the TOML writer
    #[serde(default)]
    pub calibration: CalibrationConfig,

    #[serde(default = "default_labels")]
    pub labels: Vec<LabelSpec>,
}

/// One classification label: its name, destination leaf folder and shortcut key
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LabelSpec {
    pub name: String,
    pub folder: String,
    pub key: char,
}

/// Calibration overlay constants
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CalibrationConfig {
    #[serde(default = "default_standard_scale")]
    pub standard_scale: f64,

    #[serde(default = "default_uhd_scale")]
    pub uhd_scale: f64,

    #[serde(default = "default_circle_radius")]
    pub default_radius: f64,

    #[serde(default = "default_circle_center")]
    pub default_center: [f64; 2],

    #[serde(default = "default_scale_bar_um")]
    pub scale_bar_um: u32,

    #[serde(default = "default_scale_bar_step_um")]
    pub scale_bar_step_um: u32,
}

/// Screen resolution class; each tier has its own calibration scale factor
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionTier {
    /// 3840x2160 and above
    Uhd,
    Standard,
}

impl ResolutionTier {
    /// Classify a screen size into a tier
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if width >= 3840 && height >= 2160 {
            ResolutionTier::Uhd
        } else {
            ResolutionTier::Standard
        }
    }
}

const DEFAULT_LABELS: &[(&str, &str, char)] = &[
    ("ugly die", "151_Ugly_Die(2D)", 'I'),
    ("foreign material", "102_Foreign_material(09)", 'E'),
    ("Particle", "000_Particle(16)", 'U'),
    ("Probe mark shift", "200_Probe_Mark_Shift(10)", 'R'),
    ("Bump foreign Material", "502_Bump foreign Material(25)", 'X'),
    ("Over kill", "000_Over_kill(15)", 'Y'),
    ("Process defect", "100_Process_Defect(07)", 'Q'),
    ("Al particle out of pad", "205_Al_particle_out_of_pad(0F)", 'P'),
    ("Al particle", "999_Al_particle(18)", 'J'),
    ("Wafer Scratch", "101_Wafer Scratch(08)", 'W'),
    ("PM area out spec", "202_PM area out spec.(12)", 'F'),
    ("Bump PM shift", "500_Bump PM shift(23)", 'L'),
    ("Bump scratch", "501_Bump scratch(24)", 'Z'),
    ("Bump PM diameter out of spec", "507_Bump PM diameter out of spec(0E)", 'D'),
    ("Other", "186_Other(BA)", 'A'),
    ("PM No. Out Spec", "201_PM No. Out Spec(11)", 'T'),
    ("Pad discoloration", "117_Pad discoloration(1B)", 'O'),
    ("Irregular bump", "505_Irregular bump(0A)", 'S'),
    ("Probing Void", "203_Probing Void(13)", 'G'),
    ("Missing Probe Mark", "204_Missing Probe Mark(14)", 'H'),
    ("Surface(Incoming defect)", "100_Surface(Incoming defect)(1C)", 'K'),
    ("Missing bump", "503_Missing bump(26)", 'C'),
    ("Bump residue", "504_Bump residue(27)", 'V'),
    ("Bump house defect", "506_Bump house defect(28)", 'B'),
    ("Large defect", "115_Large defect(31)", 'N'),
    ("Large bump", "510_Large bump(32)", '1'),
    ("small bump", "521_small bump(3D)", '2'),
    ("380 special PM shift", "522_380 special PM shift(3E)", '3'),
];

fn default_labels() -> Vec<LabelSpec> {
    DEFAULT_LABELS
        .iter()
        .map(|&(name, folder, key)| LabelSpec {
            name: name.to_string(),
            folder: folder.to_string(),
            key,
        })
        .collect()
}

fn default_undo_capacity() -> usize {
    20
}

fn default_classification_cooldown_ms() -> u64 {
    100
}

fn default_sibling_code_range() -> [u32; 2] {
    [1, 25]
}

fn default_parallel() -> bool {
    true
}

fn default_min_shape_size() -> f64 {
    10.0
}

fn default_shape_size() -> f64 {
    100.0
}

fn default_standard_scale() -> f64 {
    1.3
}

fn default_uhd_scale() -> f64 {
    2.1
}

fn default_circle_radius() -> f64 {
    50.0
}

fn default_circle_center() -> [f64; 2] {
    [250.0, 250.0]
}

fn default_scale_bar_um() -> u32 {
    200
}

fn default_scale_bar_step_um() -> u32 {
    25
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            standard_scale: default_standard_scale(),
            uhd_scale: default_uhd_scale(),
            default_radius: default_circle_radius(),
            default_center: default_circle_center(),
            scale_bar_um: default_scale_bar_um(),
            scale_bar_step_um: default_scale_bar_step_um(),
        }
    }
}

impl CalibrationConfig {
    /// Scale factor for the given resolution tier
    pub fn scale_for(&self, tier: ResolutionTier) -> f64 {
        match tier {
            ResolutionTier::Uhd => self.uhd_scale,
            ResolutionTier::Standard => self.standard_scale,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            labels: default_labels(),
            undo_capacity: default_undo_capacity(),
            classification_cooldown_ms: default_classification_cooldown_ms(),
            sibling_code_range: default_sibling_code_range(),
            use_parallel: default_parallel(),
            min_shape_size: default_min_shape_size(),
            default_shape_size: default_shape_size(),
            calibration: CalibrationConfig::default(),
            resolution_tier: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ClassifyError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ClassifyError::ConfigLoad {
            source: e,
            path: path.to_path_buf(),
        })?;

        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to the built-in defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.is_file() {
            Self::from_file(path)
        } else {
            log::info!("No config at {}, using built-in label table", path.display());
            Ok(Self::default())
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.labels.is_empty() {
            return Err(ClassifyError::Config("labels must not be empty".to_string()));
        }

        let mut names = HashSet::new();
        let mut folders = HashSet::new();
        let mut keys = HashSet::new();
        for label in &self.labels {
            if label.name.trim().is_empty() || label.folder.trim().is_empty() {
                return Err(ClassifyError::Config(
                    "label name and folder must not be blank".to_string(),
                ));
            }
            if !names.insert(label.name.as_str()) {
                return Err(ClassifyError::Config(format!("duplicate label '{}'", label.name)));
            }
            if !folders.insert(label.folder.as_str()) {
                return Err(ClassifyError::Config(format!(
                    "duplicate label folder '{}'",
                    label.folder
                )));
            }
            if !keys.insert(label.key.to_ascii_uppercase()) {
                return Err(ClassifyError::Config(format!(
                    "key '{}' is bound to more than one label",
                    label.key
                )));
            }
        }

        if self.undo_capacity == 0 {
            return Err(ClassifyError::Config("undo_capacity must be > 0".to_string()));
        }

        let [low, high] = self.sibling_code_range;
        if low > high || high > 99 {
            return Err(ClassifyError::Config(
                "sibling_code_range must be an ascending pair within 0..=99".to_string(),
            ));
        }

        if self.min_shape_size <= 0.0 {
            return Err(ClassifyError::Config("min_shape_size must be > 0.0".to_string()));
        }

        if self.default_shape_size < self.min_shape_size {
            return Err(ClassifyError::Config(
                "default_shape_size must be >= min_shape_size".to_string(),
            ));
        }

        if self.calibration.standard_scale <= 0.0 || self.calibration.uhd_scale <= 0.0 {
            return Err(ClassifyError::Config(
                "calibration scale factors must be > 0.0".to_string(),
            ));
        }

        if self.calibration.scale_bar_step_um == 0
            || self.calibration.scale_bar_step_um > self.calibration.scale_bar_um
        {
            return Err(ClassifyError::Config(
                "scale_bar_step_um must be > 0 and <= scale_bar_um".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            ClassifyError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.labels.len(), 28);
        assert_eq!(config.undo_capacity, 20);
        config.validate().unwrap();
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            undo_capacity = 5

            [[labels]]
            name = "Particle"
            folder = "000_Particle(16)"
            key = "U"
            "#,
        )
        .unwrap();

        assert_eq!(config.undo_capacity, 5);
        assert_eq!(config.labels.len(), 1);
        assert_eq!(config.min_shape_size, 10.0);
        assert_eq!(config.calibration.standard_scale, 1.3);
        assert!(config.resolution_tier.is_none());
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let mut config = Config::default();
        config.labels[1].key = config.labels[0].key.to_ascii_lowercase();
        assert!(matches!(config.validate(), Err(ClassifyError::Config(_))));
    }

    #[test]
    fn tier_detection_uses_both_dimensions() {
        assert_eq!(ResolutionTier::from_dimensions(3840, 2160), ResolutionTier::Uhd);
        assert_eq!(ResolutionTier::from_dimensions(5120, 2880), ResolutionTier::Uhd);
        assert_eq!(ResolutionTier::from_dimensions(3840, 1600), ResolutionTier::Standard);
        assert_eq!(ResolutionTier::from_dimensions(1920, 1080), ResolutionTier::Standard);
    }

    #[test]
    fn config_survives_a_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.resolution_tier = Some(ResolutionTier::Uhd);
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.labels, config.labels);
        assert_eq!(loaded.resolution_tier, Some(ResolutionTier::Uhd));
    }
}
