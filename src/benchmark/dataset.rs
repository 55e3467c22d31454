use crate::error::{DetectorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// The single class every chromosome dataset declares.
pub const CHROMOSOME_CLASS: &str = "cromossomo";

/// Folder under the working directory the host serves static assets from in
/// development builds.
pub const PUBLIC_DIR: &str = "public";

/// Finds the dataset images folder the host pointed at.
///
/// Candidates, first existing wins: the path itself when absolute, the path
/// relative to `cwd`, the path relative to `cwd/public`.
pub fn resolve_dataset_dir(given: &str, cwd: &Path) -> Option<PathBuf> {
    let given_path = Path::new(given);
    let candidates: Vec<PathBuf> = if given_path.is_absolute() {
        vec![given_path.to_path_buf()]
    } else {
        vec![cwd.join(given_path), cwd.join(PUBLIC_DIR).join(given_path)]
    };
    candidates.into_iter().find(|candidate| {
        let exists = candidate.exists();
        debug!(candidate = %candidate.display(), exists, "dataset path candidate");
        exists
    })
}

/// The configuration file that tells the validator where the images live and
/// what the class ids mean.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    /// Absolute dataset root.
    pub path: PathBuf,
    /// Training split, relative to `path`.
    pub train: String,
    /// Validation split, relative to `path`.
    pub val: String,
    pub names: BTreeMap<usize, String>,
}

impl DatasetDescriptor {
    /// Describes a folder of images whose labels sit in a sibling `labels` folder.
    ///
    /// Both splits point at the same folder, so a benchmark is a self-validation pass
    /// over everything the host has. The folder must exist; `.` and `..` are resolved.
    pub fn for_images_dir(images_dir: &Path) -> Result<Self> {
        let images_dir = fs::canonicalize(images_dir)?;
        let split = images_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| ".".to_string());
        let root = images_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| images_dir.clone());
        Ok(DatasetDescriptor {
            path: root,
            train: split.clone(),
            val: split,
            names: BTreeMap::from([(0, CHROMOSOME_CLASS.to_string())]),
        })
    }

    pub fn load(descriptor_path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(descriptor_path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Writes the descriptor to a uniquely named file in the dataset root.
    ///
    /// The file is removed when the returned handle is dropped or closed, so two
    /// benchmarks over the same dataset never share it.
    pub fn write_temp(&self) -> Result<NamedTempFile> {
        let file = tempfile::Builder::new()
            .prefix("temp_benchmark_")
            .suffix(".yaml")
            .tempfile_in(&self.path)?;
        serde_yaml::to_writer(file.as_file(), self)?;
        debug!(descriptor = %file.path().display(), "dataset descriptor written");
        Ok(file)
    }

    pub fn val_dir(&self) -> PathBuf {
        self.path.join(&self.val)
    }

    /// Class names indexed by id; gaps are filled with the id itself.
    pub fn class_names(&self) -> Vec<String> {
        let len = self.names.keys().next_back().map_or(0, |last| last + 1);
        (0..len)
            .map(|id| self.names.get(&id).cloned().unwrap_or_else(|| id.to_string()))
            .collect()
    }

    pub fn ensure_val_dir(&self) -> Result<PathBuf> {
        let dir = self.val_dir();
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(DetectorError::DatasetNotFound(dir.display().to_string()))
        }
    }
}
