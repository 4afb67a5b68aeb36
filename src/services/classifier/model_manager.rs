use crate::error::{AppError, Result};
use crate::services::classifier::labeller::LabellerRegistry;
use ort::logging::LogLevel;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

// ImageNet normalization constants
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Clone, Copy, Debug, PartialEq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// Single-label head; probabilities sum to 1.
    #[default]
    Softmax,
    /// Multi-label head; each label scored independently.
    Sigmoid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub id2label: Option<HashMap<String, String>>,
    #[serde(default)]
    pub labeller: Option<String>,
    #[serde(default = "default_image_size")]
    pub image_size: u32,
    #[serde(default = "default_mean")]
    pub mean: [f32; 3],
    #[serde(default = "default_std")]
    pub std: [f32; 3],
    #[serde(default)]
    pub activation: Activation,
}

fn default_image_size() -> u32 {
    224
}

fn default_mean() -> [f32; 3] {
    MEAN
}

fn default_std() -> [f32; 3] {
    STD
}

impl ModelConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| {
            AppError::ModelConfig(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Label vocabulary in model output order. Verifies that any labeller the
    /// model names is registered, and falls back to that labeller's
    /// vocabulary when `id2label` is absent.
    pub fn labels(&self, registry: &LabellerRegistry) -> Result<Vec<String>> {
        let labeller = match &self.labeller {
            Some(name) => Some(registry.get(name)?),
            None => None,
        };

        if let Some(id2label) = &self.id2label {
            let mut labels: Vec<(usize, String)> = id2label
                .iter()
                .map(|(k, v)| {
                    k.parse::<usize>()
                        .map(|idx| (idx, v.clone()))
                        .map_err(|_| AppError::ModelConfig(format!("id2label key '{}' is not an index", k)))
                })
                .collect::<Result<_>>()?;
            labels.sort_by_key(|(idx, _)| *idx);

            if labels.iter().enumerate().any(|(i, (idx, _))| i != *idx) {
                return Err(AppError::ModelConfig(
                    "id2label indices must be contiguous from 0".to_string(),
                ));
            }
            return Ok(labels.into_iter().map(|(_, label)| label).collect());
        }

        match labeller {
            Some(l) => Ok(l.vocabulary()),
            None => Err(AppError::ModelConfig(
                "config has neither id2label nor labeller".to_string(),
            )),
        }
    }
}

pub fn load_session(model_path: &Path, use_gpu: bool) -> Result<Session> {
    if !model_path.exists() {
        return Err(AppError::ModelConfig(format!(
            "Model file not found: {}",
            model_path.display()
        )));
    }

    let _ = ort::init().with_name("ring-predict").commit();

    let mut builder = Session::builder()
        .map_err(|e| AppError::ModelConfig(format!("Failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| AppError::ModelConfig(format!("Failed to set optimization level: {}", e)))?
        .with_intra_threads(4)
        .map_err(|e| AppError::ModelConfig(format!("Failed to set intra threads: {}", e)))?
        .with_log_level(LogLevel::Error)
        .map_err(|e| AppError::ModelConfig(format!("Failed to set log level: {}", e)))?;

    if use_gpu {
        builder = builder
            .with_execution_providers([
                ort::execution_providers::DirectMLExecutionProvider::default().build(),
                ort::execution_providers::CoreMLExecutionProvider::default().build(),
                ort::execution_providers::CUDAExecutionProvider::default().build(),
                ort::execution_providers::CPUExecutionProvider::default().build(),
            ])
            .map_err(|e| AppError::ModelConfig(format!("Failed to register GPU execution providers: {}", e)))?;
    } else {
        builder = builder
            .with_execution_providers([ort::execution_providers::CPUExecutionProvider::default().build()])
            .map_err(|e| AppError::ModelConfig(format!("Failed to register CPU execution provider: {}", e)))?;
    }

    let session = builder
        .commit_from_file(model_path)
        .map_err(|e| AppError::ModelConfig(format!("Failed to load ONNX model: {}", e)))?;

    info!("Loaded model {}", model_path.display());
    Ok(session)
}
