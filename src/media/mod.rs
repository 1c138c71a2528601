use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use thiserror::Error;

use crate::notes::ImageRef;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "svg"];

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{} is not an image file", .0.display())]
    NotAnImage(PathBuf),
    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A finished load, tagged with the draft it was requested for.
#[derive(Debug)]
pub struct ImageLoaded {
    pub token: u64,
    pub requested: PathBuf,
    pub result: Result<ImageRef, MediaError>,
}

pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Resolves a user-supplied path to the reference stored on a note.
pub fn resolve(path: &Path) -> Result<ImageRef, MediaError> {
    if !is_image_path(path) {
        return Err(MediaError::NotAnImage(path.to_path_buf()));
    }
    let io_err = |source| MediaError::Io {
        path: path.to_path_buf(),
        source,
    };
    let canonical = fs::canonicalize(path).map_err(io_err)?;
    let metadata = fs::metadata(&canonical).map_err(io_err)?;
    if !metadata.is_file() {
        return Err(MediaError::NotAnImage(canonical));
    }
    Ok(ImageRef::new(canonical.to_string_lossy()))
}

/// Resolves images off the UI thread. Each request gets its own worker;
/// completions arrive on one channel in whatever order they finish.
#[derive(Debug, Clone)]
pub struct ImageLoader {
    tx: Sender<ImageLoaded>,
    rx: Receiver<ImageLoaded>,
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageLoader {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    pub fn request(&self, token: u64, path: impl Into<PathBuf>) {
        let requested = path.into();
        let tx = self.tx.clone();
        tracing::debug!(token, path = %requested.display(), "loading image");
        thread::spawn(move || {
            let result = resolve(&requested);
            // The receiver lives as long as the loader; a send error only
            // means the UI is gone.
            let _ = tx.send(ImageLoaded {
                token,
                requested,
                result,
            });
        });
    }

    /// Every completion that has arrived so far for `current`. Completions
    /// for other tokens belong to closed drafts and are dropped.
    pub fn drain(&self, current: Option<u64>) -> Vec<ImageLoaded> {
        let mut ready = Vec::new();
        while let Ok(loaded) = self.rx.try_recv() {
            if Some(loaded.token) == current {
                ready.push(loaded);
            } else {
                tracing::debug!(token = loaded.token, "dropping stale image load");
            }
        }
        ready
    }

    /// Blocks until the next completion or the timeout.
    pub fn wait(&self, timeout: Duration) -> Option<ImageLoaded> {
        match self.rx.recv_timeout(timeout) {
            Ok(loaded) => Some(loaded),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn recognises_image_extensions() {
        assert!(is_image_path(Path::new("a/b.PNG")));
        assert!(is_image_path(Path::new("photo.jpeg")));
        assert!(!is_image_path(Path::new("notes.txt")));
        assert!(!is_image_path(Path::new("png")));
    }

    #[test]
    fn resolves_to_canonical_path() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("cat.png");
        fs::write(&file, b"\x89PNG")?;
        let image = resolve(&dir.path().join(".").join("cat.png"))?;
        assert_eq!(image.as_str(), fs::canonicalize(&file)?.to_string_lossy());
        Ok(())
    }

    #[test]
    fn rejects_non_images_and_missing_files() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let text = dir.path().join("notes.txt");
        fs::write(&text, "hi")?;
        assert_matches!(resolve(&text), Err(MediaError::NotAnImage(_)));
        assert_matches!(
            resolve(&dir.path().join("missing.jpg")),
            Err(MediaError::Io { .. })
        );
        Ok(())
    }

    #[test]
    fn loader_delivers_completion_for_request() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("dog.gif");
        fs::write(&file, b"GIF89a")?;
        let loader = ImageLoader::new();
        loader.request(4, &file);
        let loaded = loader.wait(Duration::from_secs(5)).expect("completion");
        assert_eq!(loaded.token, 4);
        assert!(loaded.result.is_ok());
        Ok(())
    }

    #[test]
    fn drain_drops_stale_tokens() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("a.webp");
        fs::write(&file, b"RIFF")?;
        let loader = ImageLoader::new();
        loader.request(1, &file);
        loader.request(2, &file);

        let mut ready = Vec::new();
        for _ in 0..2 {
            if let Some(loaded) = loader.wait(Duration::from_secs(5)) {
                ready.push(loaded);
            }
        }
        assert_eq!(ready.len(), 2);

        loader.request(1, &file);
        loader.request(2, &file);
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        let mut kept = Vec::new();
        while kept.is_empty() && std::time::Instant::now() < deadline {
            kept.extend(loader.drain(Some(2)));
            thread::sleep(Duration::from_millis(10));
        }
        assert!(kept.iter().all(|loaded| loaded.token == 2));
        assert!(!kept.is_empty());
        Ok(())
    }
}
