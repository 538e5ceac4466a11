//! Opening watched files and invoking the caller's callbacks

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use walkdir::WalkDir;
use watchfiles_core::{Result, WatchError};

/// Invoked with a file's path and a reader positioned at the start of its
/// contents, when the file is first loaded or later changes
pub type UpdateCallback = Arc<dyn Fn(&Path, &mut dyn BufRead) -> anyhow::Result<()> + Send + Sync>;

/// Invoked with the path of a watched file that was removed
pub type RemoveCallback = Arc<dyn Fn(&Path) -> anyhow::Result<()> + Send + Sync>;

/// Wrap a closure as an [`UpdateCallback`]
pub fn update_callback<F>(f: F) -> UpdateCallback
where
    F: Fn(&Path, &mut dyn BufRead) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as a [`RemoveCallback`]
pub fn remove_callback<F>(f: F) -> RemoveCallback
where
    F: Fn(&Path) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Opens files and hands them to the registered callbacks
///
/// Callback failures are logged and never propagated. With `catch_panics`
/// set, a panicking callback is logged the same way instead of unwinding
/// into the watch loop.
#[derive(Clone, Default)]
pub struct Loader {
    on_update: Option<UpdateCallback>,
    on_remove: Option<RemoveCallback>,
    catch_panics: bool,
}

impl Loader {
    pub fn new(
        on_update: Option<UpdateCallback>,
        on_remove: Option<RemoveCallback>,
        catch_panics: bool,
    ) -> Self {
        Self {
            on_update,
            on_remove,
            catch_panics,
        }
    }

    /// Initial bulk load of the watch root
    ///
    /// A directory has every immediate file loaded, in file name order, with no
    /// name filtering; subdirectories are skipped. A single file is loaded
    /// directly. Failing to open, stat or list the root is an error; failures
    /// on individual entries are logged and skipped.
    ///
    /// Returns the number of files opened and handed to the update callback.
    pub fn load_root(&self, root: &Path) -> Result<usize> {
        let file = File::open(root).map_err(|source| {
            error!("Unable to open: {}", root.display());
            WatchError::Open {
                path: root.to_path_buf(),
                source,
            }
        })?;

        let metadata = file.metadata().map_err(|source| {
            error!("Unable to stat: {}", root.display());
            WatchError::Stat {
                path: root.to_path_buf(),
                source,
            }
        })?;

        if !metadata.is_dir() {
            self.load_file(root, file);
            return Ok(1);
        }
        drop(file);

        let mut loaded = 0;
        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    error!("Unable to read directory: {}", root.display());
                    let source = e.into_io_error().unwrap_or_else(|| {
                        io::Error::new(io::ErrorKind::Other, "directory walk failed")
                    });
                    return Err(WatchError::ReadDir {
                        path: root.to_path_buf(),
                        source,
                    });
                }
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", root.display(), e);
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                info!("Skipping sub-directory {}", entry.path().display());
                continue;
            }
            if !file_type.is_file() && !file_type.is_symlink() {
                info!("Skipping non-regular file {}", entry.path().display());
                continue;
            }

            match self.open_and_load(entry.path()) {
                Ok(true) => loaded += 1,
                Ok(false) => {}
                Err(e) => error!("{}", e),
            }
        }

        Ok(loaded)
    }

    /// Open a file and hand it to the update callback
    ///
    /// Returns `Ok(false)` when the path turned out to be a directory or another
    /// non-regular file and was skipped. Open and stat failures are returned
    /// for the caller to log.
    pub fn open_and_load(&self, path: &Path) -> Result<bool> {
        info!("Processing file: {}", path.display());

        // Opening a FIFO blocks until a writer shows up.
        if let Ok(metadata) = fs::metadata(path) {
            if !metadata.is_file() && !metadata.is_dir() {
                info!("Skipping non-regular file {}", path.display());
                return Ok(false);
            }
        }

        let file = File::open(path).map_err(|source| WatchError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let metadata = file.metadata().map_err(|source| WatchError::Stat {
            path: path.to_path_buf(),
            source,
        })?;
        if metadata.is_dir() {
            info!("Skipping sub-directory {}", path.display());
            return Ok(false);
        }

        self.load_file(path, file);
        Ok(true)
    }

    /// Invoke the remove callback, if one is registered
    pub fn remove(&self, path: &Path) {
        if let Some(on_remove) = &self.on_remove {
            self.guard(path, "remove", || on_remove(path));
        }
    }

    pub fn has_update_callback(&self) -> bool {
        self.on_update.is_some()
    }

    pub fn has_remove_callback(&self) -> bool {
        self.on_remove.is_some()
    }

    fn load_file(&self, path: &Path, file: File) {
        let mut reader = BufReader::new(file);
        info!("Loaded data from: {}", path.display());

        if let Some(on_update) = &self.on_update {
            self.guard(path, "update", || on_update(path, &mut reader));
        }
    }

    fn guard(&self, path: &Path, which: &str, callback: impl FnOnce() -> anyhow::Result<()>) {
        let outcome = if self.catch_panics {
            match panic::catch_unwind(AssertUnwindSafe(callback)) {
                Ok(outcome) => outcome,
                Err(_) => {
                    error!("{} callback panicked for {}", which, path.display());
                    return;
                }
            }
        } else {
            callback()
        };

        if let Err(e) = outcome {
            warn!("{} callback failed for {}: {:#}", which, path.display(), e);
        }
    }
}
