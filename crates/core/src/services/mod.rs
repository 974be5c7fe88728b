pub mod assemble;
pub mod meta;
pub mod mfg;
pub mod parts;
pub mod verify;
pub mod writer;

pub use mfg::{BuiltImage, MfgImage, MAX_IMAGE_TARGETS};
pub use meta::MetaPolicy;
pub use parts::OverlapPolicy;
pub use verify::{verify_mfg_image, VerifyReport};
pub use writer::MfgArtifacts;
