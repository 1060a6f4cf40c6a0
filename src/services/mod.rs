pub mod content_service;
pub mod mock;
pub mod results_exporter;

pub use content_service::ContentService;
pub use mock::MockContentService;
pub use results_exporter::{export_rows, ExportRow, ResultsExporter};
