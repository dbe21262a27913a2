//! Filesystem session storage. Each session lives under `<data_root>/<id>/`
//! with `uploads/` for the originals and `processed/` for the standardized
//! PNGs; results are addressed externally as `/data/<id>/processed/<file>`.
use std::path::{Path, PathBuf};

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::processing::role::{HasRole, guess_role};
use crate::error::{Error, Result};
use crate::io::writers::png::{StagedPng, stage_png};
use crate::types::{ProcessedResult, Role};

const UPLOADS_DIR: &str = "uploads";
const PROCESSED_DIR: &str = "processed";
const MANIFEST_FILE: &str = "manifest.json";

/// A persisted result with its externally visible URL.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct StoredResult {
    #[serde(flatten)]
    pub result: ProcessedResult,
    pub url: String,
}

impl HasRole for StoredResult {
    fn role(&self) -> Role {
        self.result.role
    }
}

#[derive(Serialize)]
struct Manifest<'a> {
    session_id: &'a str,
    created_at: String,
    results: &'a [StoredResult],
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            root: data_root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh session with empty `uploads/` and `processed/` directories.
    pub fn create_session(&self) -> Result<Session> {
        let id = Uuid::new_v4().simple().to_string();
        let session = Session {
            dir: self.root.join(&id),
            id,
        };
        std::fs::create_dir_all(session.uploads_dir())?;
        std::fs::create_dir_all(session.processed_dir())?;
        info!("Created session {} at {:?}", session.id, session.dir);
        Ok(session)
    }

    pub fn open_session(&self, id: &str) -> Result<Session> {
        let dir = self.root.join(id);
        if id.is_empty() || id.contains(['/', '\\', '.']) || !dir.is_dir() {
            return Err(Error::SessionNotFound { id: id.to_string() });
        }
        Ok(Session {
            id: id.to_string(),
            dir,
        })
    }

    /// Processed PNGs of a session, sorted by filename.
    pub fn list_processed(&self, id: &str) -> Result<Vec<StoredResult>> {
        let session = self.open_session(id)?;
        let processed = session.processed_dir();
        if !processed.is_dir() {
            return Ok(Vec::new());
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(&processed)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
            })
            .collect();
        files.sort();

        let mut results = Vec::with_capacity(files.len());
        for path in files {
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let (width, height) = image::image_dimensions(&path).map_err(|source| Error::Decode {
                name: path.display().to_string(),
                source,
            })?;
            results.push(StoredResult {
                url: session.url_for(&filename),
                result: ProcessedResult {
                    role: guess_role(&filename),
                    filename,
                    width,
                    height,
                },
            });
        }
        Ok(results)
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    dir: PathBuf,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.dir.join(UPLOADS_DIR)
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.dir.join(PROCESSED_DIR)
    }

    pub fn url_for(&self, filename: &str) -> String {
        format!("/data/{}/{}/{}", self.id, PROCESSED_DIR, filename)
    }

    /// Save an upload as `<role><original suffix>`, `.png` when the name has none.
    pub fn save_upload(&self, original_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let role = guess_role(original_name);
        let suffix = Path::new(original_name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_else(|| ".png".to_string());
        let path = self.uploads_dir().join(format!("{}{}", role, suffix));
        std::fs::write(&path, bytes)?;
        debug!("Saved upload {} -> {:?}", original_name, path);
        Ok(path)
    }

    /// Write `processed/<role>.png`, replacing any earlier result for the role.
    pub fn persist(&self, role: Role, image: &RgbaImage) -> Result<StoredResult> {
        let staged = self.stage(role, image)?;
        self.commit(
            staged,
            ProcessedResult {
                role,
                filename: role.output_filename(),
                width: image.width(),
                height: image.height(),
            },
        )
    }

    /// Encode the result for `role` into `processed/` under a hidden name; the
    /// visible file only changes on [`Session::commit`].
    pub fn stage(&self, role: Role, image: &RgbaImage) -> Result<StagedPng> {
        stage_png(&self.processed_dir().join(role.output_filename()), image)
    }

    pub fn commit(&self, staged: StagedPng, result: ProcessedResult) -> Result<StoredResult> {
        let path = staged.commit()?;
        debug!("Persisted {} -> {:?}", result.role, path);
        Ok(StoredResult {
            url: self.url_for(&result.filename),
            result,
        })
    }

    pub fn write_manifest(&self, results: &[StoredResult]) -> Result<PathBuf> {
        let manifest = Manifest {
            session_id: &self.id,
            created_at: chrono::Utc::now().to_rfc3339(),
            results,
        };
        let path = self.dir.join(MANIFEST_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(&manifest)?)?;
        Ok(path)
    }
}
