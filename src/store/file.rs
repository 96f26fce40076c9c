use super::{is_valid_id, timestamp_id, unique_id, RouteDocument, RouteStore};
use crate::error::StoreError;
use crate::types::{RouteId, RoutePoint};
use chrono::Utc;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

const EXTENSION: &str = ".json.gz";

/// Directory-backed route store
///
/// # File Format
/// Route files: `{dir}/{id}.json.gz`
/// - JSON object `{"dataArray": [{"lat", "lng", "speed"}, ...]}`
/// - Gzip compression
///
/// Files are created with `create_new`, so two uploads racing for the same
/// timestamp id can never overwrite each other.
pub struct FileRouteStore {
    dir: PathBuf,
}

impl FileRouteStore {
    /// Open (and create if missing) a store rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        log::info!("Route store at {}", dir.display());
        Ok(FileRouteStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn route_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}{}", id, EXTENSION))
    }

    fn write_document(&self, file: File, points: &[RoutePoint]) -> Result<(), StoreError> {
        let document = RouteDocument {
            data_array: points.to_vec(),
        };
        let json = serde_json::to_vec(&document)?;

        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(&json)?;
        encoder.finish()?;
        Ok(())
    }
}

/// Remove a half-written route file. Returns whether the file is gone.
fn discard_partial(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Failed to remove partial route file {}: {}", path.display(), e);
            false
        }
    }
}

impl RouteStore for FileRouteStore {
    fn create_route(&self, points: &[RoutePoint]) -> Result<RouteId, StoreError> {
        let base = timestamp_id(Utc::now());

        loop {
            let id = unique_id(&base, |candidate| self.route_path(candidate).exists());
            let path = self.route_path(id.as_str());

            let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                // Lost a race for this id, pick the next suffix
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };

            if let Err(e) = self.write_document(file, points) {
                log::error!("Failed to write route {}: {}", id, e);
                discard_partial(&path);
                return Err(e);
            }

            log::debug!("Wrote {} point(s) to {}", points.len(), path.display());
            return Ok(id);
        }
    }

    fn get_route(&self, id: &RouteId) -> Result<Vec<RoutePoint>, StoreError> {
        if !is_valid_id(id.as_str()) {
            return Err(StoreError::InvalidId(id.to_string()));
        }

        let file = match File::open(self.route_path(id.as_str())) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        let reader = BufReader::new(GzDecoder::new(file));
        let document: RouteDocument = serde_json::from_reader(reader)?;
        Ok(document.data_array)
    }

    fn list_route_ids(&self) -> Result<Vec<RouteId>, StoreError> {
        let mut ids = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };

            if let Some(id) = name.strip_suffix(EXTENSION) {
                if is_valid_id(id) {
                    ids.push(RouteId::new(id));
                }
            }
        }

        ids.sort();
        Ok(ids)
    }
}
