//! Notes domain: key generation, the markdown format, relatedness scoring and
//! the two storage backends.

pub mod backup;
pub mod codec;
pub mod file_ops;
pub mod import;
pub mod markdown_store;
pub mod mirror;
pub mod related;
pub mod sqlite_store;
pub mod store;
pub mod timestamp;

pub use markdown_store::MarkdownNoteStore;
pub use sqlite_store::SqliteNoteStore;
pub use store::{ImportReport, NoteStore};
pub use timestamp::TimestampGenerator;
