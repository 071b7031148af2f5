use crate::constants::IMAGE_EXTENSIONS;
use crate::types::ImageGroup;
use crate::{Error, Result};
use log::debug;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A uniquely named temporary working directory for one run.
///
/// The directory and everything below it is removed when the workspace is dropped, whether the
/// run finished or bailed out with an error.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Creates the directory under `root`, or under the system temp dir.
    pub fn create(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("slide_sync_");
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        debug!("workspace at {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Image groups found in an archive, plus the directories that were dropped on the way.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub groups: Vec<ImageGroup>,
    /// Names of directories without any qualifying image.
    pub empty_dirs: Vec<String>,
}

/// Unpacks an image archive and enumerates its top-level directories as image groups.
pub struct ArchiveExtractor<'w> {
    workspace: &'w Workspace,
}

impl<'w> ArchiveExtractor<'w> {
    pub fn new(workspace: &'w Workspace) -> Self {
        Self { workspace }
    }

    /// Extracts `archive` into the workspace and collects one [`ImageGroup`] per top-level directory.
    ///
    /// Groups are sorted by directory name and images by file name, independent of the member
    /// order inside the archive.
    ///
    /// # Errors
    ///
    /// - [`Error::Archive`] if the bytes are not a readable ZIP archive.
    /// - [`Error::NoValidGroups`] if no directory holds a qualifying image.
    pub fn extract(&self, archive: &[u8]) -> Result<Extraction> {
        let target = self.workspace.path().join("extracted");
        std::fs::create_dir_all(&target)?;

        let mut zip = zip::ZipArchive::new(Cursor::new(archive)).map_err(Error::Archive)?;
        zip.extract(&target).map_err(Error::Archive)?;

        let mut dirs: Vec<(String, PathBuf)> = std::fs::read_dir(&target)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|entry| (entry.file_name().to_string_lossy().into_owned(), entry.path()))
            .filter(|(name, _)| !is_ignored(name))
            .collect();
        dirs.sort();

        let mut extraction = Extraction::default();
        for (name, path) in dirs {
            let image_paths = list_images(&path)?;
            if image_paths.is_empty() {
                debug!("{} holds no images", name);
                extraction.empty_dirs.push(name);
                continue;
            }
            debug!("folder {} holds {} images", name, image_paths.len());
            extraction.groups.push(ImageGroup { name, image_paths });
        }

        if extraction.groups.is_empty() {
            return Err(Error::NoValidGroups);
        }
        Ok(extraction)
    }
}

/// Files of `dir` whose name ends with an allowed image extension, sorted by file name.
fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images: Vec<(String, PathBuf)> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| (entry.file_name().to_string_lossy().into_owned(), entry.path()))
        .filter(|(name, _)| !is_ignored(name) && is_image_name(name))
        .collect();
    images.sort();
    Ok(images.into_iter().map(|(_, path)| path).collect())
}

pub fn is_image_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Archiver metadata: macOS resource forks and hidden files.
fn is_ignored(name: &str) -> bool {
    name == "__MACOSX" || name.starts_with('.')
}
