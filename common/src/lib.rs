//! Shared infrastructure for the sieve workspace: grid shapes, dense and
//! bit-packed cell buffers, rayon chunking helpers, serde file formats and
//! tracing setup.

pub mod bit_buffer3;
pub mod buffer3;
pub mod file_format;
pub mod log_setup;
pub mod parallel;
pub mod shape;

pub use bit_buffer3::BitBuffer3;
pub use buffer3::Buffer3;
pub use file_format::{
    deserialize, serialize, FileExtensionError, FileFormat, SerdeFormatError,
};
pub use shape::Shape;

pub fn is_debug() -> bool {
    cfg!(debug_assertions)
}
