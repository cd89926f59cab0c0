//! Host-side support for the `keg_wire` codec. The codec itself never
//! allocates or owns a byte region; everything it reads from and writes to is
//! a [`Buffer`](buffer::Buffer) owned by the host. This crate also carries the
//! [`Uuid`](util::Uuid) type that appears on the wire, and loading of the
//! host configuration file.

#[macro_use]
extern crate log;

pub mod buffer;
pub mod config;
pub mod util;

pub use buffer::{Buffer, BufferError, BufferErrorKind, Mode};
pub use config::{Compatibility, Config};
pub use util::Uuid;
