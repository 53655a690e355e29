pub mod answer_key;
pub mod deduplicator;
pub mod line_classifier;
pub mod segmenter;
pub mod subject_classifier;
pub mod warn_writer;

pub use answer_key::{overlay, overlay_all, AnswerResolution, CorrectAnswerMap, OverlayStats};
pub use deduplicator::{fingerprint, Deduplicator};
pub use line_classifier::LineClassifier;
pub use segmenter::{SegmentStats, Segmentation, Segmenter};
pub use subject_classifier::{category_distribution, Classification, SubjectClassifier};
pub use warn_writer::WarnWriter;
