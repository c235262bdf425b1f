//! Script discovery and the incremental build filter.

use crate::error::BuildError;
use crate::log::BuildLog;
use crate::outcome::{CompileOutcome, CompileStatus};
use crate::unit::SourceUnit;
use pyro_config::ResolvedProject;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Discovers every script the project names.
///
/// Explicit scripts come first in listed order, then each folder in listed
/// order with its files sorted by path. Duplicates keep their first
/// position. A missing script or folder aborts discovery.
pub fn discover(project: &ResolvedProject, log: &BuildLog) -> Result<Vec<SourceUnit>, BuildError> {
    let mut paths = Vec::new();

    for script in &project.scripts {
        if !script.is_file() {
            return Err(BuildError::MissingPath {
                kind: "script",
                path: script.clone(),
            });
        }
        paths.push(script.clone());
    }

    for folder in &project.folders {
        if !folder.path.is_dir() {
            return Err(BuildError::MissingPath {
                kind: "folder",
                path: folder.path.clone(),
            });
        }
        let mut found = Vec::new();
        walk_dir(&folder.path, folder.recursive, &mut found)?;
        found.sort();
        paths.extend(found);
    }

    let mut seen = HashSet::new();
    let mut units = Vec::new();
    for path in paths {
        if !seen.insert(path.clone()) {
            continue;
        }
        units.push(SourceUnit::from_disk(
            &path,
            &project.imports,
            &project.output,
            project.game,
        )?);
    }

    log.note(&format!("Found {} scripts", units.len()));
    Ok(units)
}

/// Collects `.psc` files under `dir`, descending into subfolders when `recursive`.
fn walk_dir(dir: &Path, recursive: bool, files: &mut Vec<PathBuf>) -> Result<(), BuildError> {
    let io_err = |source| BuildError::Io {
        path: dir.to_path_buf(),
        source,
    };
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_dir() {
            if recursive {
                walk_dir(&path, recursive, files)?;
            }
        } else if is_script(&path) {
            files.push(path);
        }
    }
    Ok(())
}

/// Returns `true` for files with a `.psc` extension, in any case.
pub fn is_script(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("psc"))
}

/// The ordered set of units for one run and the subset that needs compiling.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    units: Vec<Arc<SourceUnit>>,
    executable: Vec<usize>,
}

impl BuildPlan {
    /// Returns every discovered unit, in discovery order.
    pub fn discovered(&self) -> &[Arc<SourceUnit>] {
        &self.units
    }

    /// Iterates over the units to compile with their discovery index.
    pub fn executable(&self) -> impl Iterator<Item = (usize, &Arc<SourceUnit>)> + '_ {
        self.executable.iter().map(|&i| (i, &self.units[i]))
    }

    /// Returns the number of units to compile.
    pub fn executable_len(&self) -> usize {
        self.executable.len()
    }

    /// Returns `Skipped` outcomes for every unit left out of the executable set.
    pub fn skipped_outcomes(&self) -> Vec<CompileOutcome> {
        let selected: HashSet<usize> = self.executable.iter().copied().collect();
        self.units
            .iter()
            .enumerate()
            .filter(|(i, _)| !selected.contains(i))
            .map(|(index, unit)| CompileOutcome {
                index,
                unit: Arc::clone(unit),
                status: CompileStatus::Skipped,
                elapsed: Duration::ZERO,
                diagnostics: String::new(),
            })
            .collect()
    }
}

/// Selects the units that need compiling.
///
/// With `incremental` off every unit is selected. With it on, a unit is
/// selected only if its module is missing or older than its source.
/// Imports are not followed: a changed dependency does not make its
/// dependents stale. Discovery order is kept.
pub fn plan(units: Vec<SourceUnit>, incremental: bool) -> BuildPlan {
    let units: Vec<Arc<SourceUnit>> = units.into_iter().map(Arc::new).collect();
    let executable = units
        .iter()
        .enumerate()
        .filter(|(_, u)| !incremental || u.is_stale())
        .map(|(i, _)| i)
        .collect();
    BuildPlan { units, executable }
}
