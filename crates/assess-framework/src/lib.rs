//! Assessment Framework Tree
//!
//! Static, versioned question hierarchies: framework → section → category →
//! question. Frameworks are plain serde data until [`Framework::validate`]
//! seals them into a [`ValidatedFramework`], which the rest of the engine
//! consumes.
//!
//! # Example
//!
//! ```rust,ignore
//! use assess_framework::{load_framework, QuestionId};
//!
//! let framework = load_framework("frameworks/iso27001.yaml")?.validate()?;
//! assert!(framework.question(&QuestionId::new("A.5.1")).is_some());
//! ```

#![warn(unreachable_pub)]

mod error;
mod ids;
mod load;
mod tree;
mod validate;

pub use error::{FrameworkError, IdScope};
pub use ids::{CategoryId, FrameworkId, QuestionId, SectionId};
pub use load::{load_framework, parse_framework, FrameworkFormat};
pub use tree::{AnswerOption, Category, Framework, Priority, Question, Section};
pub use validate::{Position, QuestionEntry, ValidatedFramework};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
