// src/labels.rs - Label to destination folder routing table

use std::path::{Path, PathBuf};

use crate::config::LabelSpec;
use crate::errors::{ClassifyError, Result};

/// A label bound to its destination directory for the current source folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRoute {
    pub name: String,
    pub key: char,
    pub destination: PathBuf,
}

impl LabelRoute {
    /// Leaf folder name, e.g. `200_Probe_Mark_Shift(10)`
    pub fn leaf(&self) -> &str {
        self.destination
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
    }
}

/// Static label table resolved against a source folder
#[derive(Debug, Clone)]
pub struct LabelMap {
    routes: Vec<LabelRoute>,
}

impl LabelMap {
    /// Root every label folder under `source`
    pub fn new(specs: &[LabelSpec], source: &Path) -> Self {
        let routes = specs
            .iter()
            .map(|spec| LabelRoute {
                name: spec.name.clone(),
                key: spec.key,
                destination: source.join(&spec.folder),
            })
            .collect();

        Self { routes }
    }

    /// Move every destination under `new_source`, keeping each leaf folder name
    pub fn remap(&mut self, new_source: &Path) {
        for route in &mut self.routes {
            let leaf = route.destination.file_name().map(|s| s.to_os_string());
            if let Some(leaf) = leaf {
                route.destination = new_source.join(leaf);
            }
        }
    }

    pub fn routes(&self) -> &[LabelRoute] {
        &self.routes
    }

    pub fn get(&self, label: &str) -> Option<&LabelRoute> {
        self.routes.iter().find(|route| route.name == label)
    }

    /// Shortcut keys match case-insensitively
    pub fn label_for_key(&self, key: char) -> Option<&LabelRoute> {
        self.routes
            .iter()
            .find(|route| route.key.eq_ignore_ascii_case(&key))
    }

    /// Destination for `label`; `save_root` replaces the parent while keeping the leaf
    pub fn resolve(&self, label: &str, save_root: Option<&Path>) -> Result<PathBuf> {
        let route = self
            .get(label)
            .ok_or_else(|| ClassifyError::UnknownLabel(label.to_string()))?;

        Ok(match save_root {
            Some(root) => root.join(route.leaf()),
            None => route.destination.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn map_at(source: &str) -> LabelMap {
        LabelMap::new(&Config::default().labels, Path::new(source))
    }

    #[test]
    fn resolves_under_source_folder() {
        let map = map_at("/lot/wafer01");
        assert_eq!(
            map.resolve("Probe mark shift", None).unwrap(),
            PathBuf::from("/lot/wafer01/200_Probe_Mark_Shift(10)")
        );
    }

    #[test]
    fn save_root_keeps_leaf_name() {
        let map = map_at("/lot/wafer01");
        assert_eq!(
            map.resolve("Particle", Some(Path::new("/elsewhere"))).unwrap(),
            PathBuf::from("/elsewhere/000_Particle(16)")
        );
    }

    #[test]
    fn remap_preserves_leaves() {
        let mut map = map_at("/lot/wafer01");
        map.remap(Path::new("/lot/wafer02"));
        for route in map.routes() {
            assert_eq!(route.destination.parent(), Some(Path::new("/lot/wafer02")));
        }
        assert_eq!(map.get("Other").unwrap().leaf(), "186_Other(BA)");
    }

    #[test]
    fn keys_are_case_insensitive() {
        let map = map_at("/lot/wafer01");
        assert_eq!(map.label_for_key('r').unwrap().name, "Probe mark shift");
        assert_eq!(map.label_for_key('1').unwrap().name, "Large bump");
        assert!(map.label_for_key('M').is_none());
    }

    #[test]
    fn unknown_label_is_an_error() {
        let map = map_at("/lot/wafer01");
        assert!(matches!(
            map.resolve("Not a label", None),
            Err(ClassifyError::UnknownLabel(_))
        ));
    }
}
