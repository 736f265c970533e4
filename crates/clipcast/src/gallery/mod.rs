//! Finished artifacts and the gallery snapshot derived from them.
//!
//! Each artifact is stored as its own object. The gallery snapshot is a
//! single object listing every artifact newest first, so readers need one
//! fetch instead of a scan.

pub mod artifact;
pub mod categories;
pub mod snapshot;

pub use artifact::{Artifact, ArtifactEdit, ArtifactStore, StoredMedia};
pub use categories::CategoryList;
pub use snapshot::{Gallery, GallerySnapshot};
