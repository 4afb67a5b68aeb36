use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum SelectMode {
    Random,
    Look,
    #[value(skip)]
    Explicit,
}

impl SelectMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectMode::Random => "random",
            SelectMode::Look => "look",
            SelectMode::Explicit => "explicit",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    pub image_path: PathBuf,
    pub mode: SelectMode,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Prediction {
    pub class_name: String,
    pub confidence: f32,
}

impl Prediction {
    pub fn new(class_name: impl Into<String>, confidence: f32) -> Self {
        Self {
            class_name: class_name.into(),
            confidence,
        }
    }
}

/// One confidence per vocabulary label, in vocabulary order.
pub type ClassificationResult = Vec<Prediction>;

/// Ordered label -> confidence mapping. Serialized as a JSON object whose
/// key order is the ranking order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedClasses(pub Vec<Prediction>);

impl RankedClasses {
    pub fn labels(&self) -> Vec<&str> {
        self.0.iter().map(|p| p.class_name.as_str()).collect()
    }
}

impl Serialize for RankedClasses {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for p in &self.0 {
            map.serialize_entry(&p.class_name, &p.confidence)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RankedClasses {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RankedVisitor;

        impl<'de> Visitor<'de> for RankedVisitor {
            type Value = RankedClasses;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of class label to confidence")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((class_name, confidence)) = access.next_entry::<String, f32>()? {
                    entries.push(Prediction {
                        class_name,
                        confidence,
                    });
                }
                Ok(RankedClasses(entries))
            }
        }

        deserializer.deserialize_map(RankedVisitor)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RankedOutput {
    pub img_path: String,
    pub class: String,
    pub top_all_classes: RankedClasses,
    pub top_2_digit_classes: RankedClasses,
}
