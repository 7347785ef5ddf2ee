use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Filter inputs restored across sessions: the search term and the
/// failed-only toggle. The cluster selector is session-local.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedFilters {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub failed_only: bool,
}

/// Reads saved filters once at startup and rewrites them on every change.
#[derive(Debug, Clone)]
pub struct FilterStore {
    path: Option<PathBuf>,
}

impl FilterStore {
    pub fn discover() -> Self {
        Self {
            path: discover_filters_path(),
        }
    }

    #[cfg(test)]
    fn at(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    pub fn load(&self) -> Result<Option<SavedFilters>> {
        let Some(path) = &self.path else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read saved filters {}", path.display()))?;
        let saved = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse saved filters {}", path.display()))?;
        Ok(Some(saved))
    }

    pub fn save(&self, filters: &SavedFilters) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let raw = serde_yaml::to_string(filters).context("failed to serialize filters")?;
        fs::write(path, raw)
            .with_context(|| format!("failed to write saved filters {}", path.display()))?;
        Ok(())
    }
}

fn discover_filters_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("ARMADA_FILTERS")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config/armada/filters.yaml"))
}

#[cfg(test)]
mod tests {
    use super::{FilterStore, SavedFilters};

    #[test]
    fn save_then_load_round_trips() {
        let dir = std::env::temp_dir().join("armada-filter-store-test");
        let path = dir.join("filters.yaml");
        let _ = std::fs::remove_file(&path);

        let store = FilterStore::at(path);
        assert_eq!(store.load().unwrap(), None);

        let filters = SavedFilters {
            search: "api".to_string(),
            failed_only: true,
        };
        store.save(&filters).unwrap();
        assert_eq!(store.load().unwrap(), Some(filters));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_fields_default_when_loading() {
        let saved: SavedFilters = serde_yaml::from_str("search: web\n").unwrap();
        assert_eq!(saved.search, "web");
        assert!(!saved.failed_only);
    }
}
