use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::models::predict_types::{PredictionRequest, SelectMode};
use crate::services::cancel::CancelToken;
use crate::services::fs_service;
use crate::services::watcher::DirWatcher;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const MAX_LOOK_BACKOFF: Duration = Duration::from_secs(1);

pub struct ImageSelector {
    mode: SelectMode,
    explicit_path: Option<PathBuf>,
    scan_dir: PathBuf,
    look_dir: PathBuf,
    look_retry: Duration,
    look_timeout: Option<Duration>,
    settle: Duration,
    cancel: CancelToken,
    rng: StdRng,
}

impl ImageSelector {
    pub fn new(settings: &Settings, cancel: CancelToken) -> Self {
        Self {
            mode: settings.mode,
            explicit_path: settings.img_path.clone(),
            scan_dir: settings.scan_dir.clone(),
            look_dir: settings.look_dir.clone(),
            look_retry: settings.look_retry,
            look_timeout: settings.look_timeout,
            settle: settings.settle,
            cancel,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn mode(&self) -> SelectMode {
        self.mode
    }

    /// Resolves the image for this cycle. `Ok(None)` means no image is
    /// available (random mode over an empty or missing folder).
    pub fn select_image(&mut self) -> Result<Option<PredictionRequest>> {
        let image_path = match self.mode {
            SelectMode::Random => self.pick_random(),
            SelectMode::Look => Some(self.wait_for_look_image()?),
            SelectMode::Explicit => match &self.explicit_path {
                Some(p) if !p.as_os_str().is_empty() => Some(p.clone()),
                _ => {
                    return Err(AppError::InvalidArguments(
                        "explicit mode requires a non-empty --img_path".to_string(),
                    ))
                }
            },
        };

        Ok(image_path.map(|image_path| PredictionRequest {
            image_path,
            mode: self.mode,
        }))
    }

    fn pick_random(&mut self) -> Option<PathBuf> {
        let path = fs_service::pick_random_file(&self.scan_dir, &mut self.rng)?;
        match fs_service::wait_until_stable(&path, self.settle) {
            Ok(()) => Some(path),
            Err(e) => {
                warn!("Selected image became unavailable: {}", e);
                None
            }
        }
    }

    fn wait_for_look_image(&mut self) -> Result<PathBuf> {
        let started = Instant::now();

        // Watch before the first listing so a file dropped in between is not missed.
        let watcher = match DirWatcher::new(&self.look_dir) {
            Ok(w) => Some(w),
            Err(e) => {
                debug!("No watcher on {}, polling only: {}", self.look_dir.display(), e);
                None
            }
        };

        let mut backoff = self.look_retry;
        let mut list_failed = false;
        loop {
            let picked = match fs_service::try_pick_random_file(&self.look_dir, &mut self.rng) {
                Ok(picked) => {
                    list_failed = false;
                    picked
                }
                Err(e) => {
                    if !list_failed {
                        if fs_service::is_not_found(&e) {
                            warn!("Folder not found: {}", self.look_dir.display());
                        } else {
                            warn!("Failed to list {}: {}", self.look_dir.display(), e);
                        }
                        list_failed = true;
                    } else {
                        debug!("Still cannot list {}: {}", self.look_dir.display(), e);
                    }
                    None
                }
            };

            if let Some(path) = picked {
                match fs_service::wait_until_stable(&path, self.settle) {
                    Ok(()) => return Ok(path),
                    Err(e) => debug!("Look image vanished before use: {}", e),
                }
            }

            if self.cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }
            if let Some(limit) = self.look_timeout {
                if started.elapsed() >= limit {
                    return Err(AppError::LookTimeout(self.look_dir.clone()));
                }
            }

            match &watcher {
                Some(w) => {
                    w.wait(backoff);
                }
                None => std::thread::sleep(backoff),
            }
            backoff = (backoff * 2).min(MAX_LOOK_BACKOFF);
        }
    }
}

pub fn image_path_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
