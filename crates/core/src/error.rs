use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for manufacturing image operations.
///
/// Every variant here is a user or configuration error: the input has to
/// change before a retry can succeed. Internal invariant violations (a part
/// outside its blob, a digest that does not fit the reserved field) panic
/// instead of being returned.
#[derive(Debug, Error)]
pub enum MfgError {
    /// A build artifact targets a flash area the flash map does not define.
    #[error("Image at \"{}\" requires undefined flash area \"{area}\"", .image.display())]
    UnknownFlashArea { image: PathBuf, area: String },

    /// A flash area needed for sizing or meta placement is missing.
    #[error("Flash map does not define flash area \"{area}\"")]
    MissingFlashArea { area: String },

    /// An artifact is larger than the flash area it is destined for.
    #[error(
        "Image \"{}\" is too large to fit in flash area \"{area}\"; image-size={image_size} flash-area-size={area_size} overflow={overflow}",
        .image.display()
    )]
    ImageTooLarge {
        image: PathBuf,
        area: String,
        image_size: usize,
        area_size: usize,
        overflow: usize,
    },

    /// Filesystem failure while reading inputs or writing outputs.
    #[error("Failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid flash map: {0}")]
    InvalidFlashMap(String),

    /// Two parts claim the same bytes and the overlap policy rejects that.
    #[error(
        "Parts \"{first}\" ({first_start:#x}..{first_end:#x}) and \"{second}\" ({second_start:#x}..{second_end:#x}) overlap"
    )]
    PartsOverlap {
        first: String,
        first_start: usize,
        first_end: usize,
        second: String,
        second_start: usize,
        second_end: usize,
    },

    #[error("Too many image targets: {0} configured, at most 2 are supported")]
    TooManyImages(usize),

    #[error("Invalid image slot assignment: {0}")]
    SlotAssignment(String),

    /// A raw entry ends past the 32-bit flash address space.
    #[error(
        "Raw entry \"{}\" at offset {offset:#x} ({len} bytes) ends beyond the flash address limit {limit:#x}",
        .filename.display()
    )]
    RawEntryOutOfRange { filename: PathBuf, offset: usize, len: usize, limit: u64 },

    /// Something already occupies the bytes reserved for the meta record.
    #[error(
        "Image data extends into manufacturing meta region of flash area \"{area}\"; meta region requires {required} bytes"
    )]
    MetaRegionOccupied { area: String, required: usize },

    #[error(
        "Manufacturing meta region ({required} bytes) does not fit in flash area \"{area}\" ({available} bytes)"
    )]
    MetaRegionTooLarge { area: String, required: usize, available: usize },

    #[error("Flash area \"{area}\" {field} {value:#x} does not fit in a 32-bit meta field")]
    MetaFieldOverflow { area: String, field: &'static str, value: usize },

    #[error("No manufacturing meta region at the end of flash area \"{area}\": {reason}")]
    MetaNotFound { area: String, reason: String },

    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl MfgError {
    /// Adapter for `map_err` that tags an I/O failure with the path and action.
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| MfgError::Io { action, path, source }
    }
}

/// Convenience result type for manufacturing image operations.
pub type MfgResult<T> = Result<T, MfgError>;
