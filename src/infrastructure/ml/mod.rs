pub mod file_model_store;
pub mod isolation_forest;
#[cfg(feature = "onnx")]
pub mod onnx_model;

pub use file_model_store::FileModelStore;
pub use isolation_forest::IsolationForestModel;
