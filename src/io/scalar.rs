//! Mode-agnostic decoding of single primitive values.
//!
//! Record decoders call [`decode`] for every field; whether the value comes
//! from formatted text or from a raw `size_of::<T>()` byte dump is decided by
//! the [`Mode`] alone. Binary values are copied verbatim, in native byte
//! order.

use crate::io::section::SectionFramer;
use crate::io::stream::MeshStream;
use crate::mesh_error::MeshSieveError;
use bytemuck::Pod;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use static_assertions::assert_eq_size;
use std::io::{BufRead, Seek};
use std::str::FromStr;

// Binary coordinates are 8-byte doubles.
assert_eq_size!(f64, [u8; 8]);

/// Encoding of a section payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Whitespace-separated formatted text.
    Ascii,
    /// Fixed-width native-endian raw values.
    Binary,
}

/// A primitive that can be decoded in either [`Mode`].
pub trait Scalar: Pod + FromStr + Zero {}

impl Scalar for i32 {}
impl Scalar for i64 {}
impl Scalar for u64 {}
impl Scalar for usize {}
impl Scalar for f64 {}

/// Decode one value of type `T` from the section.
pub fn decode<T, R>(
    framer: &SectionFramer,
    stream: &mut MeshStream<R>,
    mode: Mode,
) -> Result<T, MeshSieveError>
where
    T: Scalar,
    R: BufRead + Seek,
{
    match mode {
        Mode::Ascii => framer.pop::<T, R>(stream),
        Mode::Binary => {
            let mut value = T::zeroed();
            framer.read_raw(stream, bytemuck::bytes_of_mut(&mut value))?;
            Ok(value)
        }
    }
}

/// Decode an integer flag; any nonzero value is `true`.
pub fn decode_flag<R: BufRead + Seek>(
    framer: &SectionFramer,
    stream: &mut MeshStream<R>,
    mode: Mode,
) -> Result<bool, MeshSieveError> {
    decode::<i32, R>(framer, stream, mode).map(|v| !v.is_zero())
}
