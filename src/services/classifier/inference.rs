use crate::error::{AppError, Result};
use crate::models::predict_types::{ClassificationResult, Prediction};
use crate::services::classifier::model_manager::{Activation, ModelConfig};
use image::ImageReader;
use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;

const CROP_PCT: f32 = 0.875;

pub fn preprocess_image(path: &Path, config: &ModelConfig) -> Result<Array4<f32>> {
    if !path.is_file() {
        return Err(AppError::ImageNotFound(path.to_path_buf()));
    }

    let img = ImageReader::open(path)
        .map_err(|e| AppError::io(path, e))?
        .with_guessed_format()
        .map_err(|e| AppError::io(path, e))?
        .decode()
        .map_err(|source| AppError::Image {
            path: path.to_path_buf(),
            source,
        })?;

    let crop_size = config.image_size;

    // Resize shortest edge to ceil(crop_size / crop_pct), then center crop
    let resize_size = (crop_size as f32 / CROP_PCT).ceil() as u32;
    let (w, h) = (img.width(), img.height());
    let (new_w, new_h) = if w < h {
        (resize_size, ((h as f32 / w as f32) * resize_size as f32).round() as u32)
    } else {
        (((w as f32 / h as f32) * resize_size as f32).round() as u32, resize_size)
    };
    let resized = img.resize_exact(new_w, new_h, image::imageops::FilterType::Triangle);

    let crop_x = (new_w.saturating_sub(crop_size)) / 2;
    let crop_y = (new_h.saturating_sub(crop_size)) / 2;
    let rgb = resized.crop_imm(crop_x, crop_y, crop_size, crop_size).to_rgb8();

    // HWC u8 -> normalized CHW f32
    let hw = (crop_size * crop_size) as usize;
    let mut data = vec![0f32; 3 * hw];
    for (i, pixel) in rgb.as_raw().chunks_exact(3).enumerate() {
        for c in 0..3 {
            data[c * hw + i] = (pixel[c] as f32 / 255.0 - config.mean[c]) / config.std[c];
        }
    }

    Array4::from_shape_vec((1, 3, crop_size as usize, crop_size as usize), data)
        .map_err(|e| AppError::Inference(format!("Failed to create tensor: {}", e)))
}

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max_logit = logits.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let exp_sum: f32 = logits.iter().map(|&x| (x - max_logit).exp()).sum();
    logits
        .iter()
        .map(|&x| (x - max_logit).exp() / exp_sum)
        .collect()
}

pub fn sigmoid(logits: &[f32]) -> Vec<f32> {
    logits.iter().map(|&x| 1.0 / (1.0 + (-x).exp())).collect()
}

/// Pairs each vocabulary label with its activated score, keeping model order.
pub fn to_classification(
    logits: &[f32],
    labels: &[String],
    activation: Activation,
) -> Result<ClassificationResult> {
    if logits.len() != labels.len() {
        return Err(AppError::InvalidModelOutput(format!(
            "model produced {} scores for {} labels",
            logits.len(),
            labels.len()
        )));
    }

    let scores = match activation {
        Activation::Softmax => softmax(logits),
        Activation::Sigmoid => sigmoid(logits),
    };

    Ok(labels
        .iter()
        .zip(scores)
        .map(|(label, confidence)| Prediction::new(label.clone(), confidence))
        .collect())
}

pub fn run_inference(
    session: &mut Session,
    input: Array4<f32>,
    labels: &[String],
    activation: Activation,
) -> Result<ClassificationResult> {
    let input_name = session.inputs()[0].name().to_string();
    let input_tensor = Value::from_array(input)
        .map_err(|e| AppError::Inference(format!("Failed to create tensor value: {}", e)))?;

    let outputs = session
        .run(ort::inputs![input_name.as_str() => input_tensor])
        .map_err(|e| AppError::Inference(e.to_string()))?;

    let output_value = outputs
        .values()
        .next()
        .ok_or_else(|| AppError::Inference("Model produced no outputs".to_string()))?;

    let (_, data) = output_value
        .try_extract_tensor::<f32>()
        .map_err(|e| AppError::Inference(format!("Failed to extract output tensor: {}", e)))?;
    to_classification(data, labels, activation)
}
