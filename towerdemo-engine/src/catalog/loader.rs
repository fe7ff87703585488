//! File-based scenario loading from directories.
//!
//! Scans directories for `.json5` scenario files, parses them, and feeds
//! them into the catalog. Multiple source directories are supported with
//! priority ordering (user scenarios can override system ones).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use towerdemo_shared::scenario::Scenario;
use towerdemo_shared::scenario_json::parse_scenario_file;

/// Default system scenario directory (installed via package)
pub const SYSTEM_SCENARIO_DIR: &str = "/usr/share/towerdemo/scenarios";

/// Default user scenario directory
pub const USER_SCENARIO_DIR: &str = ".config/towerdemo/scenarios";

/// Scenario loader that scans directories for .json5 scenario files.
///
/// Directories are scanned in priority order - later directories can
/// override scenarios with the same ID from earlier directories.
#[derive(Debug, Clone)]
pub struct ScenarioLoader {
    /// Directories to scan, in priority order (later overrides earlier)
    directories: Vec<PathBuf>,
}

impl Default for ScenarioLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioLoader {
    /// Create a new scenario loader with default directories.
    ///
    /// Default directories (in priority order):
    /// 1. System: `/usr/share/towerdemo/scenarios`
    /// 2. User: `~/.config/towerdemo/scenarios`
    /// 3. Local: `./scenarios`
    pub fn new() -> Self {
        let mut directories = Vec::new();

        directories.push(PathBuf::from(SYSTEM_SCENARIO_DIR));

        if let Some(home) = dirs::home_dir() {
            directories.push(home.join(USER_SCENARIO_DIR));
        }

        directories.push(PathBuf::from("./scenarios"));

        Self { directories }
    }

    /// Create a scenario loader with custom directories only.
    pub fn with_directories(directories: Vec<PathBuf>) -> Self {
        Self { directories }
    }

    /// Create a loader that scans nothing (e.g. `--no-default-scenarios`
    /// with no explicit directories).
    pub fn empty() -> Self {
        Self {
            directories: Vec::new(),
        }
    }

    /// Add a single directory to scan (appended with highest priority).
    pub fn add_directory(&mut self, dir: PathBuf) {
        self.directories.push(dir);
    }

    /// Get the list of directories being scanned.
    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    /// Load all scenarios from configured directories.
    ///
    /// Scenarios are loaded in directory order, with later directories
    /// overriding scenarios with the same ID from earlier directories.
    /// The result is sorted by id so catalog assembly is deterministic.
    pub fn load_all(&self) -> Vec<Scenario> {
        let mut scenarios: HashMap<String, Scenario> = HashMap::new();

        for dir in &self.directories {
            if !dir.exists() {
                debug!("Scenario directory does not exist, skipping: {:?}", dir);
                continue;
            }

            match self.load_from_directory(dir) {
                Ok(loaded) => {
                    let count = loaded.len();
                    for scenario in loaded {
                        let id = scenario.id.clone();
                        if scenarios.contains_key(&id) {
                            debug!(
                                "Scenario '{}' from {:?} overrides previous definition",
                                id, dir
                            );
                        }
                        scenarios.insert(id, scenario);
                    }
                    if count > 0 {
                        info!("Loaded {} scenarios from {:?}", count, dir);
                    }
                }
                Err(e) => {
                    warn!("Failed to load scenarios from {:?}: {}", dir, e);
                }
            }
        }

        let mut result: Vec<Scenario> = scenarios.into_values().collect();
        result.sort_by(|a, b| a.id.cmp(&b.id));
        result
    }

    /// Load scenarios from a single directory.
    fn load_from_directory(&self, dir: &Path) -> Result<Vec<Scenario>> {
        let mut scenarios = Vec::new();

        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory: {:?}", dir))?;

        for entry in entries {
            let entry =
                entry.with_context(|| format!("Failed to read directory entry in {:?}", dir))?;
            let path = entry.path();

            if path.extension().and_then(|e| e.to_str()) != Some("json5") {
                continue;
            }

            match self.load_scenario_file(&path) {
                Ok(scenario) => {
                    scenarios.push(scenario);
                }
                Err(e) => {
                    warn!("Failed to load scenario from {:?}: {}", path, e);
                    // Continue loading other files
                }
            }
        }

        Ok(scenarios)
    }

    /// Load a single scenario file.
    fn load_scenario_file(&self, path: &Path) -> Result<Scenario> {
        debug!("Loading scenario from {:?}", path);

        parse_scenario_file(path)
            .with_context(|| format!("Failed to parse scenario file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn scenario_json5(id: &str, title: &str) -> String {
        format!(
            r#"{{
    id: "{}",
    title: "{}",
    description: "Test scenario",
    steps: [
        {{
            narrative: "Test beat.",
            min_duration: "1s",
            max_duration: "10s",
        }}
    ]
}}"#,
            id, title
        )
    }

    #[test]
    fn test_loader_creation() {
        let loader = ScenarioLoader::new();
        assert!(!loader.directories().is_empty());
    }

    #[test]
    fn test_empty_loader_scans_nothing() {
        let loader = ScenarioLoader::empty();
        assert!(loader.load_all().is_empty());
    }

    #[test]
    fn test_load_from_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("demo.json5"),
            scenario_json5("demo-1", "Demo One"),
        )
        .unwrap();

        let loader = ScenarioLoader::with_directories(vec![temp_dir.path().to_path_buf()]);
        let scenarios = loader.load_all();

        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].id, "demo-1");
        assert_eq!(scenarios[0].title, "Demo One");
    }

    #[test]
    fn test_directory_priority_override() {
        let dir1 = TempDir::new().unwrap();
        let dir2 = TempDir::new().unwrap();

        fs::write(
            dir1.path().join("scenario.json5"),
            scenario_json5("same-id", "From Dir 1"),
        )
        .unwrap();
        fs::write(
            dir2.path().join("scenario.json5"),
            scenario_json5("same-id", "From Dir 2"),
        )
        .unwrap();

        // dir2 has higher priority (comes later)
        let loader = ScenarioLoader::with_directories(vec![
            dir1.path().to_path_buf(),
            dir2.path().to_path_buf(),
        ]);
        let scenarios = loader.load_all();

        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].title, "From Dir 2");
    }

    #[test]
    fn test_skip_non_json5_and_invalid_files() {
        let temp_dir = TempDir::new().unwrap();

        fs::write(
            temp_dir.path().join("valid.json5"),
            scenario_json5("valid", "Valid"),
        )
        .unwrap();
        fs::write(temp_dir.path().join("readme.txt"), "not a scenario").unwrap();
        fs::write(
            temp_dir.path().join("broken.json5"),
            "{ this is not valid json5 }}}",
        )
        .unwrap();
        // Parses but violates the duration invariant
        fs::write(
            temp_dir.path().join("inverted.json5"),
            r#"{ id: "bad", title: "Bad",
                 steps: [ { narrative: "x", min_duration: "10s", max_duration: "5s" } ] }"#,
        )
        .unwrap();

        let loader = ScenarioLoader::with_directories(vec![temp_dir.path().to_path_buf()]);
        let scenarios = loader.load_all();

        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].id, "valid");
    }

    #[test]
    fn test_nonexistent_directory() {
        let loader = ScenarioLoader::with_directories(vec![PathBuf::from(
            "/nonexistent/directory/that/should/not/exist",
        )]);
        assert!(loader.load_all().is_empty());
    }

    #[test]
    fn test_load_all_sorts_by_id() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("b.json5"),
            scenario_json5("zulu", "Z"),
        )
        .unwrap();
        fs::write(
            temp_dir.path().join("a.json5"),
            scenario_json5("alpha", "A"),
        )
        .unwrap();

        let loader = ScenarioLoader::with_directories(vec![temp_dir.path().to_path_buf()]);
        let ids: Vec<_> = loader.load_all().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["alpha", "zulu"]);
    }
}
