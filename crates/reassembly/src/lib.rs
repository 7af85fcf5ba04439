#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! The receiver's per-file reassembly engine: scratch-file backed chunk
//! bitmap tracking, completion detection, CRC-verified atomic publish, and
//! the supersede / skip-on-match rules that make redundant chunk
//! re-emission over an un-acknowledged link cheap to absorb.
//!
//! [`ReassemblyEngine`] is the single entry point; it owns one
//! [`record::ReceivingFile`] per destination-relative path currently
//! in-flight and applies, in order, bounds-checking, skip-on-match,
//! supersede, duplicate suppression, and publish-on-completion.

mod engine;
mod error;
mod publish;
mod record;

pub use engine::{ChunkOutcome, ReassemblyEngine};
pub use error::{PublishError, ReassemblyError};
pub use record::FileIdentity;
