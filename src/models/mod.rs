pub mod bank;
pub mod dialect;
pub mod line;
pub mod loaders;
pub mod manifest;
pub mod question;
pub mod taxonomy;

pub use bank::{BankArtifact, BankMetadata, ClassifiedSource, ComparisonReport, QuizBank};
pub use dialect::{Dialect, DialectRegistry};
pub use line::{LineToken, RawLine, TokenKind};
pub use loaders::{load_dialect_file, load_manifest, load_taxonomy};
pub use manifest::{SourceEntry, SourceManifest};
pub use question::{AnswerOption, Provenance, QuestionRecord};
pub use taxonomy::Taxonomy;
