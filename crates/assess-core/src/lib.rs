//! Assess Core - assessment session engine
//!
//! Walks a validated framework, records answers and annotations, links
//! evidence, computes progress and drives the autosave controller.
//!
//! # Example
//!
//! ```rust,ignore
//! use assess_core::{AssessmentSession, EngineConfig};
//!
//! # async fn example(framework: Arc<ValidatedFramework>, collaborators: Collaborators) -> EngineResult<()> {
//! let mut session = AssessmentSession::new(framework, EngineConfig::new(), collaborators);
//!
//! session.answer(2)?;
//! session.advance();
//! session.answer(4)?;
//!
//! // host loop
//! session.autosave_when_due().await?;
//! println!("{}% complete", session.progress().percentage);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod adapters;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod navigation;
pub mod progress;
pub mod session;

pub use adapters::{read_snapshot, ContentAddressedStorage, JsonFileStore, TracingNotifier};
pub use collaborators::{
    Collaborators, EvidenceUpload, FileStorage, NotificationLevel, NotificationSink, StoredFile,
    TaskCreator, TaskRef,
};
pub use config::{AutosaveConfig, EngineConfig, EvidenceConfig};
pub use error::{EngineError, EngineResult};
pub use navigation::Cursor;
pub use progress::{ProgressReport, SectionProgress};
pub use session::AssessmentSession;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a session
    pub use crate::{
        AssessmentSession, Collaborators, EngineConfig, EngineError, EngineResult, EvidenceUpload,
        NotificationLevel, ProgressReport,
    };
    pub use assess_commit::{AutosaveState, CommitReceipt};
    pub use assess_framework::{Framework, QuestionId, ValidatedFramework};
    pub use assess_state::{AssessmentSnapshot, AssessmentStatus, LinkConfidence, Relevance};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
