use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;

mod client;
mod config;
mod view;

pub use client::{Classifier, HttpClassifier};
pub use config::{
    CONFIG_PATH_ENV, ClientConfig, DEFAULT_ENDPOINT, DEFAULT_FIELD_NAME, ENDPOINT_ENV,
    default_config_path,
};
pub use view::{Submission, UploadView};

/// Failures surfaced to the user by a submission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PredictError {
    /// Submit was pressed without a file; detected before any network activity.
    #[error("Please select an image file.")]
    NoFileSelected,
    /// Non-2xx status, transport failure or an unreadable body. The reason is
    /// kept for logging only; the user always sees the same message.
    #[error("Error connecting to backend.")]
    RequestFailed(String),
}

/// Image chosen by the user, held in memory for one submission cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
    bytes: Arc<[u8]>,
    mime: String,
}

impl SelectedFile {
    /// Wraps already-loaded bytes, guessing the MIME type from the content
    /// and then from the file name.
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let name = name.into();
        let bytes = bytes.into();
        let mime = guess_mime(&name, &bytes);
        Self { name, bytes, mime }
    }

    /// Reads a file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("cannot read image file: {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn guess_mime(name: &str, bytes: &[u8]) -> String {
    image::guess_format(bytes)
        .or_else(|_| image::ImageFormat::from_path(name))
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| "application/octet-stream".to_string())
}

/// Outcome of a submission: the classifier's verdict or an error placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    Success { label: String, probability: f64 },
    Error(String),
}

impl Prediction {
    pub fn from_error(err: &PredictError) -> Self {
        Self::Error(err.to_string())
    }

    /// Parses a 2xx response body. Only a body that is not JSON at all counts
    /// as a failed request; missing or odd fields are passed through as-is.
    pub fn from_body(body: &str) -> Result<Self, PredictError> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| PredictError::RequestFailed(format!("response is not JSON: {e}")))?;
        Ok(Self::from_json(&value))
    }

    fn from_json(value: &Value) -> Self {
        if let Some(Value::String(message)) = value.get("error")
            && !message.is_empty()
        {
            return Self::Error(message.clone());
        }
        let label = match value.get("result") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        let probability = value
            .get("probability")
            .map(numeric_value)
            .unwrap_or(f64::NAN);
        Self::Success { label, probability }
    }
}

/// Loose number coercion: `null`, `false` and blank strings count as zero,
/// `true` as one, anything unreadable as NaN.
fn numeric_value(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) if s.trim().is_empty() => 0.0,
        Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// Colour family of the result banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Warning,
    Error,
}

/// Display model for the result banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Banner {
    Failure(String),
    Verdict {
        label: String,
        probability: String,
        malignant: bool,
    },
}

impl Banner {
    pub fn from_prediction(prediction: &Prediction, malignant_label: &str) -> Self {
        match prediction {
            Prediction::Error(message) => Self::Failure(message.clone()),
            Prediction::Success { label, probability } => Self::Verdict {
                label: label.to_uppercase(),
                probability: format_probability(*probability),
                malignant: label.trim().eq_ignore_ascii_case(malignant_label.trim()),
            },
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            Self::Failure(_) => Tone::Error,
            Self::Verdict {
                malignant: true, ..
            } => Tone::Warning,
            Self::Verdict { .. } => Tone::Success,
        }
    }
}

/// Fixed four-decimal rendering. Exact halfway values round away from zero
/// and negative zero prints unsigned; NaN stays visible as "NaN".
pub fn format_probability(probability: f64) -> String {
    if probability.is_nan() {
        return "NaN".to_string();
    }
    if probability.is_infinite() {
        let sign = if probability < 0.0 { "-" } else { "" };
        return format!("{sign}Infinity");
    }
    let sign = if probability < 0.0 { "-" } else { "" };
    let magnitude = probability.abs();
    let digits = match fifth_decimal_tie(magnitude) {
        Some(hundred_thousandths) => {
            let units = (hundred_thousandths + 5) / 10;
            format!("{}.{:04}", units / 10_000, units % 10_000)
        }
        None => format!("{magnitude:.4}"),
    };
    format!("{sign}{digits}")
}

/// When `magnitude` is exactly `n / 100_000` with `n` ending in 5, returns `n`.
fn fifth_decimal_tie(magnitude: f64) -> Option<u128> {
    let bits = magnitude.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1u64 << 52) - 1);
    let (mantissa, exponent) = if biased == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), biased - 1075)
    };
    // Integers and values needing more than 127 binary places are never ties.
    if exponent >= 0 || exponent < -127 {
        return None;
    }
    let shift = exponent.unsigned_abs();
    let scaled = u128::from(mantissa) * 100_000;
    if scaled % (1u128 << shift) != 0 {
        return None;
    }
    let hundred_thousandths = scaled >> shift;
    (hundred_thousandths % 10 == 5).then_some(hundred_thousandths)
}
