use crate::error::{AppError, Result};
use crate::models::predict_types::{Prediction, RankedClasses, RankedOutput};

pub fn is_two_char_numeric(label: &str) -> bool {
    label.len() == 2 && label.bytes().all(|b| b.is_ascii_digit())
}

pub fn restrict_to_two_char_numeric(pairs: &[Prediction]) -> Vec<Prediction> {
    pairs
        .iter()
        .filter(|p| is_two_char_numeric(&p.class_name))
        .cloned()
        .collect()
}

fn validate(pairs: &[Prediction]) -> Result<()> {
    match pairs.iter().find(|p| !p.confidence.is_finite()) {
        Some(p) => Err(AppError::InvalidModelOutput(format!(
            "confidence for '{}' is {}",
            p.class_name, p.confidence
        ))),
        None => Ok(()),
    }
}

/// The `n` most confident entries, highest first. Equal confidences keep
/// their input order.
pub fn top_n(pairs: &[Prediction], n: usize) -> Result<RankedClasses> {
    validate(pairs)?;

    let mut sorted = pairs.to_vec();
    sorted.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    sorted.truncate(n);
    Ok(RankedClasses(sorted))
}

/// Highest-confidence two-digit label. First one wins on a tie.
pub fn best_two_digit(pairs: &[Prediction]) -> Result<Prediction> {
    validate(pairs)?;

    pairs
        .iter()
        .filter(|p| is_two_char_numeric(&p.class_name))
        .fold(None::<&Prediction>, |best, p| match best {
            Some(b) if b.confidence >= p.confidence => Some(b),
            _ => Some(p),
        })
        .cloned()
        .ok_or(AppError::NoMatchingClass)
}

pub fn rank(
    img_path: &str,
    result: &[Prediction],
    top_all: usize,
    top_two_digit: usize,
) -> Result<RankedOutput> {
    let best = best_two_digit(result)?;
    let two_digit = restrict_to_two_char_numeric(result);

    Ok(RankedOutput {
        img_path: img_path.to_string(),
        class: best.class_name,
        top_all_classes: top_n(result, top_all)?,
        top_2_digit_classes: top_n(&two_digit, top_two_digit)?,
    })
}
