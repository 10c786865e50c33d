use crate::domain::errors::ModelError;
use crate::domain::ports::AnomalyModel;
use crate::domain::types::FeatureVector;
use ort::session::Session;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Anomaly model exported to ONNX (e.g. via skl2onnx), taking a `[1, 6]` f32
/// input and producing the label as its first output.
pub struct OnnxAnomalyModel {
    name: String,
    session: Mutex<Session>,
}

impl OnnxAnomalyModel {
    pub fn load(name: &str, path: &Path) -> Result<Self, ModelError> {
        let load_err = |reason: String| ModelError::Load {
            path: path.display().to_string(),
            reason,
        };
        let session = Session::builder()
            .map_err(|e| load_err(format!("Failed to create ONNX session builder: {}", e)))?
            .commit_from_file(path)
            .map_err(|e| load_err(e.to_string()))?;

        info!("Successfully loaded ONNX model from {:?}", path);
        Ok(Self {
            name: name.to_string(),
            session: Mutex::new(session),
        })
    }
}

impl AnomalyModel for OnnxAnomalyModel {
    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        let prediction_err = |reason: String| ModelError::Prediction { reason };

        let mut session = self
            .session
            .lock()
            .map_err(|e| prediction_err(format!("Mutex lock failed: {}", e)))?;

        let input: Vec<f32> = features.to_array().iter().map(|v| *v as f32).collect();
        let shape = vec![1, input.len()];
        let input_value = ort::value::Value::from_array((shape.as_slice(), input))
            .map_err(|e| prediction_err(format!("Input value creation failed: {}", e)))?;

        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| prediction_err(e.to_string()))?;
        let output_value = outputs
            .iter()
            .next()
            .map(|(_, v)| v)
            .ok_or_else(|| prediction_err("No output found".to_string()))?;

        // Label outputs are int64; fall back to float scores
        if let Ok(data) = output_value.try_extract_tensor::<i64>() {
            return data
                .1
                .iter()
                .next()
                .map(|v| *v as f64)
                .ok_or_else(|| prediction_err("Empty output".to_string()));
        }
        let data = output_value
            .try_extract_tensor::<f32>()
            .map_err(|e| prediction_err(e.to_string()))?;
        data.1
            .iter()
            .next()
            .map(|v| *v as f64)
            .ok_or_else(|| prediction_err("Empty output".to_string()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
