use crate::{ClientConfig, PredictError, Prediction, SelectedFile};
use anyhow::{Context, Result};
use reqwest::blocking::{Client, multipart};

/// Something that turns an image into a prediction. Implemented by the HTTP
/// client; tests substitute their own.
pub trait Classifier: Send + Sync {
    fn classify(&self, file: &SelectedFile) -> Result<Prediction, PredictError>;
}

/// Posts the image as a single-field multipart form to the configured endpoint.
pub struct HttpClassifier {
    client: Client,
    endpoint: String,
    field_name: String,
}

impl HttpClassifier {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("cannot build HTTP client")?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            field_name: config.field_name.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Classifier for HttpClassifier {
    fn classify(&self, file: &SelectedFile) -> Result<Prediction, PredictError> {
        let part = multipart::Part::bytes(file.bytes().to_vec())
            .file_name(file.name().to_string())
            .mime_str(file.mime())
            .map_err(|e| PredictError::RequestFailed(format!("bad MIME type {}: {e}", file.mime())))?;
        let form = multipart::Form::new().part(self.field_name.clone(), part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .map_err(|e| PredictError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PredictError::RequestFailed(format!("HTTP {status}")));
        }
        let body = response
            .text()
            .map_err(|e| PredictError::RequestFailed(format!("cannot read body: {e}")))?;
        Prediction::from_body(&body)
    }
}
