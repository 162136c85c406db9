//! Per-dialog session: the loaded image and its scratch copy.

use std::path::{Path, PathBuf};

use relief_ops::ReliefError;
use relief_types::IntensityImage;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Owns the image picked in the dialog for as long as the dialog is open.
///
/// [`ReliefSession::release`] drops the image and removes the scratch file.
/// It runs again on drop, so every exit path cleans up.
#[derive(Debug)]
pub struct ReliefSession {
    id: Uuid,
    image: Option<IntensityImage>,
    source_name: Option<String>,
    scratch: Option<PathBuf>,
}

impl ReliefSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            image: None,
            source_name: None,
            scratch: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn image(&self) -> Option<&IntensityImage> {
        self.image.as_ref()
    }

    /// Name of the file or buffer the current image came from.
    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    pub fn scratch_path(&self) -> Option<&Path> {
        self.scratch.as_deref()
    }

    /// Decode an image file. On failure the previous image is dropped, like a
    /// dialog that clears its file field after an invalid pick.
    pub fn load_path(&mut self, path: &Path) -> Result<&IntensityImage, ReliefError> {
        let name = path.display().to_string();
        let bytes = std::fs::read(path).map_err(|e| {
            self.image = None;
            self.source_name = None;
            ReliefError::ImageDecode {
                source_name: name.clone(),
                reason: e.to_string(),
            }
        })?;
        self.install(name, &bytes)
    }

    /// Decode an in-memory image (clipboard, drag and drop). The bytes are
    /// kept in a scratch file so the shell has a path to show.
    pub fn load_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<&IntensityImage, ReliefError> {
        self.remove_scratch();
        let path = std::env::temp_dir().join(format!("image-relief-{}.img", self.id));
        match std::fs::write(&path, bytes) {
            Ok(()) => {
                debug!(path = %path.display(), "scratch file written");
                self.scratch = Some(path);
            }
            Err(e) => warn!(error = %e, "could not write scratch file"),
        }
        self.install(name.to_string(), bytes)
    }

    fn install(&mut self, name: String, bytes: &[u8]) -> Result<&IntensityImage, ReliefError> {
        self.image = None;
        self.source_name = None;
        let image = decode_grayscale(&name, bytes)?;
        info!(
            session = %self.id,
            width = image.width(),
            height = image.height(),
            "image loaded from {}",
            name
        );
        self.source_name = Some(name);
        Ok(self.image.insert(image))
    }

    /// Drop the image and delete the scratch file. Safe to call repeatedly.
    pub fn release(&mut self) {
        if self.image.take().is_some() {
            debug!(session = %self.id, "image released");
        }
        self.source_name = None;
        self.remove_scratch();
    }

    fn remove_scratch(&mut self) {
        if let Some(path) = self.scratch.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "could not remove scratch file");
            }
        }
    }
}

impl Default for ReliefSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ReliefSession {
    fn drop(&mut self) {
        self.release();
    }
}

/// Decode any format the `image` crate reads into 8-bit luma.
pub fn decode_grayscale(name: &str, bytes: &[u8]) -> Result<IntensityImage, ReliefError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| ReliefError::ImageDecode {
        source_name: name.to_string(),
        reason: e.to_string(),
    })?;
    let luma = decoded.to_luma8();
    let (width, height) = luma.dimensions();
    IntensityImage::from_raw(width, height, luma.into_raw()).map_err(ReliefError::from)
}
