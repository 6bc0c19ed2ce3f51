pub mod exif_reader;
pub mod loader;
pub mod metadata;
pub mod provider;

pub use exif_reader::{read_metadata, ExifMetadataProvider};
pub use loader::{load_metadata, metadata_concurrency, MAX_METADATA_CONCURRENCY};
pub use metadata::{GpsCoordinate, PhotoMetadata};
pub use provider::{MetadataError, MetadataProvider, MetadataTarget};
