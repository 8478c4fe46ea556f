// src/snapshot/mod.rs
//
// Persistence of the last scan and the added/removed/changed computation the
// offline delta packages are built from.

pub mod package;

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::models::{ChangedApplication, InstalledApplication, InventoryDelta, ScanSnapshot};

/// Owner of the snapshot file. Last write wins; there is a single local
/// writer and packaging is infrequent, so no locking is attempted.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Missing or unparsable snapshots load as empty; a first run simply
    /// reports everything as added.
    pub fn load(&self) -> ScanSnapshot {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, snapshot: &ScanSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating snapshot dir {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("writing snapshot {}", self.path.display()))?;
        Ok(())
    }
}

fn normalize(apps: &[InstalledApplication]) -> BTreeMap<String, &InstalledApplication> {
    apps.iter()
        .filter(|app| !app.name.trim().is_empty())
        .map(|app| (app.name.trim().to_lowercase(), app))
        .collect()
}

/// Added/removed/changed sets keyed by normalized name. "Changed" is a plain
/// version-string inequality, not a semantic comparison.
pub fn compute_delta(
    previous: &[InstalledApplication],
    current: &[InstalledApplication],
) -> InventoryDelta {
    let prev_map = normalize(previous);
    let curr_map = normalize(current);

    let added: Vec<InstalledApplication> = curr_map
        .iter()
        .filter(|(key, _)| !prev_map.contains_key(*key))
        .map(|(_, app)| InstalledApplication::new(app.name.trim(), app.version.trim()))
        .collect();

    let removed: Vec<InstalledApplication> = prev_map
        .iter()
        .filter(|(key, _)| !curr_map.contains_key(*key))
        .map(|(_, app)| InstalledApplication::new(app.name.trim(), app.version.trim()))
        .collect();

    let changed: Vec<ChangedApplication> = curr_map
        .iter()
        .filter_map(|(key, curr)| {
            let prev = prev_map.get(key)?;
            if curr.version.trim() != prev.version.trim() {
                Some(ChangedApplication {
                    name: curr.name.trim().to_string(),
                    previous_version: prev.version.trim().to_string(),
                    current_version: curr.version.trim().to_string(),
                })
            } else {
                None
            }
        })
        .collect();

    let total_changes = added.len() + removed.len() + changed.len();
    InventoryDelta {
        added,
        removed,
        changed,
        total_changes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn app(name: &str, version: &str) -> InstalledApplication {
        InstalledApplication::new(name, version)
    }

    #[test]
    fn added_removed_and_changed_are_detected() {
        let previous = vec![app("Git", "2.49.0"), app("Dropbox", "200.1")];
        let current = vec![app("Git", "2.50.1"), app("DBeaver", "25.1.2")];

        let delta = compute_delta(&previous, &current);
        assert_eq!(delta.added.len(), 1);
        assert_eq!(delta.added[0].name, "DBeaver");
        assert_eq!(delta.removed.len(), 1);
        assert_eq!(delta.removed[0].name, "Dropbox");
        assert_eq!(delta.changed.len(), 1);
        assert_eq!(delta.changed[0].previous_version, "2.49.0");
        assert_eq!(delta.changed[0].current_version, "2.50.1");
        assert_eq!(delta.total_changes, 3);
    }

    #[test]
    fn identical_snapshots_produce_an_empty_delta() {
        let apps = vec![app("Git", "2.50.1"), app("Node.js", "24.4.1")];
        let delta = compute_delta(&apps, &apps);
        assert!(delta.added.is_empty());
        assert!(delta.removed.is_empty());
        assert!(delta.changed.is_empty());
        assert_eq!(delta.total_changes, 0);
    }

    #[test]
    fn name_matching_ignores_case() {
        let previous = vec![app("GIT", "2.50.1")];
        let current = vec![app("git", "2.50.1")];
        let delta = compute_delta(&previous, &current);
        assert_eq!(delta.total_changes, 0);
    }

    #[test]
    fn delta_partitions_the_name_universe() {
        let previous = vec![app("a", "1"), app("b", "1"), app("c", "1")];
        let current = vec![app("b", "2"), app("c", "1"), app("d", "1")];
        let delta = compute_delta(&previous, &current);

        let added: BTreeSet<String> = delta.added.iter().map(|a| a.name.clone()).collect();
        let removed: BTreeSet<String> = delta.removed.iter().map(|a| a.name.clone()).collect();
        let changed: BTreeSet<String> = delta.changed.iter().map(|c| c.name.clone()).collect();
        let unchanged: BTreeSet<String> = current
            .iter()
            .map(|a| a.name.clone())
            .filter(|n| !added.contains(n) && !changed.contains(n))
            .collect();

        // added, removed, changed and unchanged cover the whole universe of
        // names with no overlap between added and removed.
        let mut covered = BTreeSet::new();
        covered.extend(added.iter().cloned());
        covered.extend(removed.iter().cloned());
        covered.extend(changed.iter().cloned());
        covered.extend(unchanged.iter().cloned());
        let universe: BTreeSet<String> = previous
            .iter()
            .chain(current.iter())
            .map(|a| a.name.clone())
            .collect();
        assert_eq!(covered, universe);
        assert!(added.is_disjoint(&removed));
    }

    #[test]
    fn snapshot_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nested").join("snapshot.json"));

        assert!(store.load().apps.is_empty());

        let snapshot = ScanSnapshot {
            generated_at: "2026-08-06 12:00:00".to_string(),
            apps: vec![app("Git", "2.50.1")],
        };
        store.save(&snapshot).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.generated_at, "2026-08-06 12:00:00");
        assert_eq!(loaded.apps, snapshot.apps);
    }
}
