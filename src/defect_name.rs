// src/defect_name.rs - Die coordinates and defect code embedded in photo names

use regex::Regex;
use serde::Serialize;
use std::path::Path;
use std::sync::LazyLock;

/// Fields parsed from a `..._<x>_<y>_<code>_...` or `..._<x>_<y>_<code>.jpg` name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DefectName {
    pub die_x: u32,
    pub die_y: u32,
    pub defect_code: u32,
}

static DEFECT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*_(\d+)_(\d+)_(\d+)(?:_|\.).*$").expect("valid regex"));

/// Parse the last `_x_y_code` group of a file name, if present
pub fn parse_defect_name(file_name: &str) -> Option<DefectName> {
    let caps = DEFECT_NAME_RE.captures(file_name)?;
    Some(DefectName {
        die_x: caps[1].parse().ok()?,
        die_y: caps[2].parse().ok()?,
        defect_code: caps[3].parse().ok()?,
    })
}

/// Same as `parse_defect_name`, taking the file name from a path
pub fn parse_defect_path(path: &Path) -> Option<DefectName> {
    path.file_name()
        .and_then(|s| s.to_str())
        .and_then(parse_defect_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_coordinates_and_code() {
        assert_eq!(
            parse_defect_name("LOT1234_W05_12_34_16.jpg"),
            Some(DefectName { die_x: 12, die_y: 34, defect_code: 16 })
        );
        assert_eq!(
            parse_defect_name("scan_7_8_9_rev2.png"),
            Some(DefectName { die_x: 7, die_y: 8, defect_code: 9 })
        );
    }

    #[test]
    fn rejects_names_without_a_triple() {
        assert_eq!(parse_defect_name("defect_01.jpg"), None);
        assert_eq!(parse_defect_name("a_1_2_3"), None);
    }
}
