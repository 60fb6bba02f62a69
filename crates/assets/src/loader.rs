use pitchwalk_scene::SubScene;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};

use crate::AssetError;

type LoadResult = Result<SubScene, AssetError>;

/// Starts scene loads off the render thread.
pub struct AssetLoader;

impl AssetLoader {
    /// Begin decoding `path` on a worker thread.
    pub fn spawn(path: impl Into<PathBuf>) -> PendingLoad {
        let path = path.into();
        let (tx, rx) = mpsc::channel();
        let worker_tx = tx.clone();
        let worker_path = path.clone();

        let spawned = std::thread::Builder::new()
            .name("asset-loader".into())
            .spawn(move || {
                let result = crate::load_scene(&worker_path);
                // The receiver may already be gone if the app shut down.
                let _ = worker_tx.send(result);
            });
        if let Err(e) = spawned {
            tracing::error!(path = %path.display(), "failed to start loader thread: {e}");
            let _ = tx.send(Err(AssetError::Io(e)));
        }

        tracing::info!(path = %path.display(), "scene load started");
        PendingLoad { path, rx: Some(rx) }
    }
}

/// Handle to an in-flight scene load. Yields its result exactly once.
pub struct PendingLoad {
    path: PathBuf,
    rx: Option<Receiver<LoadResult>>,
}

impl PendingLoad {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True once the result has been handed out.
    pub fn is_done(&self) -> bool {
        self.rx.is_none()
    }

    /// Non-blocking check. Returns `Some` the first time the load has
    /// finished and `None` before that and on every later call.
    pub fn poll(&mut self) -> Option<LoadResult> {
        let rx = self.rx.as_ref()?;
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(AssetError::LoaderVanished(self.path.clone())),
        };
        self.rx = None;
        Some(result)
    }

    /// Block until the load finishes.
    pub fn wait(mut self) -> LoadResult {
        match self.rx.take() {
            Some(rx) => rx
                .recv()
                .unwrap_or_else(|_| Err(AssetError::LoaderVanished(self.path.clone()))),
            None => Err(AssetError::LoaderVanished(self.path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gltf_import::tests::quad_glb;

    fn poll_until_done(load: &mut PendingLoad) -> LoadResult {
        loop {
            if let Some(result) = load.poll() {
                return result;
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
    }

    #[test]
    fn background_load_delivers_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pitch.glb");
        std::fs::write(&path, quad_glb()).unwrap();

        let mut load = AssetLoader::spawn(&path);
        assert_eq!(load.path(), path.as_path());
        let sub = poll_until_done(&mut load).unwrap();
        assert_eq!(sub.triangle_count(), 2);
        assert!(load.is_done());
        assert!(load.poll().is_none());
    }

    #[test]
    fn missing_file_reports_failure() {
        let mut load = AssetLoader::spawn("/no/such/model.glb");
        let result = poll_until_done(&mut load);
        assert!(matches!(result, Err(AssetError::Io(_))));
    }

    #[test]
    fn wait_blocks_for_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pitch.glb");
        std::fs::write(&path, quad_glb()).unwrap();
        let sub = AssetLoader::spawn(&path).wait().unwrap();
        assert_eq!(sub.name, "pitch");
        assert_eq!(sub.nodes.len(), 1);
    }
}
