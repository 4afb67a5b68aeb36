pub mod inference;
pub mod labeller;
pub mod model_manager;

use crate::error::Result;
use crate::models::predict_types::ClassificationResult;
use labeller::LabellerRegistry;
use model_manager::ModelConfig;
use ort::session::Session;
use std::path::Path;
use tracing::info;

/// Single-image synchronous classification over a fixed label vocabulary.
pub trait Classifier {
    fn classify(&mut self, image_path: &Path) -> Result<ClassificationResult>;
}

pub struct OnnxClassifier {
    session: Session,
    labels: Vec<String>,
    config: ModelConfig,
}

impl OnnxClassifier {
    pub fn load(
        model_path: &Path,
        config_path: &Path,
        use_gpu: bool,
        registry: &LabellerRegistry,
    ) -> Result<Self> {
        let config = ModelConfig::load(config_path)?;
        let labels = config.labels(registry)?;
        let session = model_manager::load_session(model_path, use_gpu)?;
        info!(
            "Classifier ready: {} labels, {}px input, {:?}",
            labels.len(),
            config.image_size,
            config.activation
        );

        Ok(Self {
            session,
            labels,
            config,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&mut self, image_path: &Path) -> Result<ClassificationResult> {
        let tensor = inference::preprocess_image(image_path, &self.config)?;
        inference::run_inference(&mut self.session, tensor, &self.labels, self.config.activation)
    }
}
