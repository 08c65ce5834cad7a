//! # Bio live preview
//!
//! While a creator edits their bio page, the dashboard shows it in an embedded
//! frame. The frame is driven by a single address that encodes the whole
//! draft, and that address is only recomputed once edits have paused, so the
//! frame does not reload on every keystroke.
mod address;
pub mod bio;
mod debounce;
mod session;

pub use address::{preview_address, PreviewFrame};
pub use bio::{BioDraft, BioEdit, DeviceMode, StoredBio};
pub use debounce::Debouncer;
pub use session::PreviewSession;
