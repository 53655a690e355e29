pub mod source_loader;
pub mod toml_loader;

pub use source_loader::{load_answer_key, load_artifact, load_source_text, write_json};
pub use toml_loader::{load_dialect_file, load_manifest, load_taxonomy};
