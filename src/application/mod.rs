pub mod bootstrap;
pub mod features;
pub mod ingestion;
pub mod scoring;
pub mod system;
