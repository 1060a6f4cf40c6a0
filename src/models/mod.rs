pub mod batch;
pub mod blog;
pub mod draft;
pub mod keyword;
pub mod session;

pub use batch::{BatchItemResult, BatchJob, BatchUpload, ItemStatus, JobStatus};
pub use blog::{
    BlogArtifact, BlogMetadata, BlogPreview, FinalizedBlog, ImageCandidate, ImageCatalog,
    ImageDescriptor, IntegrationPreview, OutputFormat, ScrapeSummary,
};
pub use draft::{DraftFragments, DraftProgress, DraftStep, StepOutcome};
pub use keyword::{KeywordInput, KeywordSet, ValidatedKeywords};
pub use session::{SessionMode, SessionPayload, SessionRecord};
