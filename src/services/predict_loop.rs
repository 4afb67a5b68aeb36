use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::models::predict_types::RankedOutput;
use crate::services::cancel::CancelToken;
use crate::services::classifier::Classifier;
use crate::services::flag_gate;
use crate::services::image_selector::{image_path_string, ImageSelector};
use crate::services::output_writer;
use crate::services::ranker;
use tracing::{debug, error, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    /// Flag is anything but "GO".
    Idle,
    /// Flag is "GO"; one cycle runs per poll while it stays that way.
    Predicting,
}

pub struct PredictLoop<C: Classifier> {
    settings: Settings,
    classifier: C,
    selector: ImageSelector,
    cancel: CancelToken,
    state: LoopState,
    cycles: u64,
    flag_unreadable: bool,
}

impl<C: Classifier> PredictLoop<C> {
    pub fn new(settings: Settings, classifier: C, cancel: CancelToken) -> Self {
        let selector = ImageSelector::new(&settings, cancel.clone());
        Self {
            settings,
            classifier,
            selector,
            cancel,
            state: LoopState::Idle,
            cycles: 0,
            flag_unreadable: false,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Cycles attempted so far, successful or not.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Reads the flag once and moves to the matching state. An unreadable
    /// flag file counts as idle.
    pub fn poll(&mut self) -> LoopState {
        let next = match flag_gate::read_flag(&self.settings.flag_file) {
            Ok(value) => {
                self.flag_unreadable = false;
                if flag_gate::is_go(&value) {
                    LoopState::Predicting
                } else {
                    LoopState::Idle
                }
            }
            Err(e) => {
                if !self.flag_unreadable {
                    warn!("Flag unreadable, staying idle: {}", e);
                    self.flag_unreadable = true;
                } else {
                    debug!("Flag still unreadable: {}", e);
                }
                LoopState::Idle
            }
        };

        if next != self.state {
            debug!("{:?} -> {:?}", self.state, next);
            self.state = next;
        }
        next
    }

    /// One select-classify-rank-write pass.
    pub fn run_cycle(&mut self) -> Result<RankedOutput> {
        let request = self
            .selector
            .select_image()?
            .ok_or_else(|| AppError::ConfusedState(self.selector.mode().as_str().to_string()))?;

        let img_path = image_path_string(&request.image_path);
        debug!("Predicting {}", img_path);

        let result = self.classifier.classify(&request.image_path)?;
        let output = ranker::rank(
            &img_path,
            &result,
            self.settings.top_all,
            self.settings.top_two_digit,
        )?;
        output_writer::write_output(&output, &self.settings.output)?;

        info!(img_path = %output.img_path, class = %output.class, "Prediction written");
        Ok(output)
    }

    /// Polls until cancelled, `max_cycles` is reached, or a fatal error.
    /// Per-cycle failures are logged and polling resumes.
    pub fn run(&mut self) -> Result<()> {
        info!(
            "Watching {} in {} mode",
            self.settings.flag_file.display(),
            self.selector.mode().as_str()
        );

        loop {
            if self.cancel.is_cancelled() {
                info!("Stopping after {} cycles", self.cycles);
                return Ok(());
            }
            if let Some(max) = self.settings.max_cycles {
                if self.cycles >= max {
                    return Ok(());
                }
            }

            if self.poll() == LoopState::Idle {
                self.pause();
                continue;
            }

            self.cycles += 1;
            match self.run_cycle() {
                Ok(_) => {}
                Err(AppError::Cancelled) => {
                    info!("Cancelled while waiting for an image");
                    return Ok(());
                }
                Err(e) if e.is_fatal() => {
                    error!("{}", e);
                    return Err(e);
                }
                Err(e) => {
                    if self.settings.max_cycles == Some(self.cycles) {
                        return Err(e);
                    }
                    warn!("Cycle {} failed: {}", self.cycles, e);
                    self.pause();
                }
            }
        }
    }

    fn pause(&self) {
        if !self.settings.poll_interval.is_zero() {
            std::thread::sleep(self.settings.poll_interval);
        }
    }
}
