pub mod blob;
pub mod policy;

pub use blob::{BlobStore, BlobWriter, UploadedFile};
