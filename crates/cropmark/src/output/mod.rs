//! Output emission: naming, records, atomic writes, and pruning.

pub mod naming;
pub mod prune;
pub mod records;
pub mod writer;

pub use naming::{base_name, slug, NameAllocator};
pub use prune::prune;
pub use records::{AttachmentRecord, RecordLayout, RecordMeta};
pub use writer::{write_index, write_layout_model, write_manifest, write_png, INDEX_FILE};
