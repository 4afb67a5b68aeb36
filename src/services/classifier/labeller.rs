//! Named label strategies a model config can refer to.
//!
//! A model exported from training may record the name of the function that
//! produced its labels. Loading such a model requires a strategy registered
//! under the same name; the strategy rebuilds the label vocabulary when the
//! config omits `id2label`.

use crate::error::{AppError, Result};
use std::collections::HashMap;

pub trait Labeller: Send + Sync {
    fn name(&self) -> &str;

    /// Every label this strategy can produce, in model vocabulary order.
    fn vocabulary(&self) -> Vec<String>;
}

/// Year fragments from file names like `ring_1987_3.jpg`: the last two
/// digits of a four-digit year followed by `_`. Yields each digit on its own
/// plus the two-digit pair, so `1987` labels as `["8", "7", "87"]`.
pub struct YearDigitsLabeller;

pub const YEAR_DIGITS_LABELLER: &str = "custom_labeller";

impl Labeller for YearDigitsLabeller {
    fn name(&self) -> &str {
        YEAR_DIGITS_LABELLER
    }

    fn vocabulary(&self) -> Vec<String> {
        let mut vocab: Vec<String> = (0..10)
            .map(|d| d.to_string())
            .chain((0..100).map(|d| format!("{:02}", d)))
            .collect();
        vocab.sort();
        vocab
    }
}

pub struct LabellerRegistry {
    labellers: HashMap<String, Box<dyn Labeller>>,
}

impl LabellerRegistry {
    pub fn empty() -> Self {
        Self {
            labellers: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(YearDigitsLabeller));
        registry
    }

    pub fn register(&mut self, labeller: Box<dyn Labeller>) {
        self.labellers.insert(labeller.name().to_string(), labeller);
    }

    pub fn get(&self, name: &str) -> Result<&dyn Labeller> {
        self.labellers
            .get(name)
            .map(|l| l.as_ref())
            .ok_or_else(|| AppError::UnknownLabeller(name.to_string()))
    }
}

impl Default for LabellerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
