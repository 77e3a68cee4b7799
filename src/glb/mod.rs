//! Binary container framing.
//!
//! A glTF-style envelope around the JSON description and the blob. Two
//! versions exist on the wire; both are read, only version 2 is written.
//!
//! ## Layout (version 2)
//!
//! ```text
//! +------------------------+
//! | magic "glTF"           |  u32 LE
//! | version = 2            |  u32 LE
//! | total length           |  u32 LE
//! +------------------------+
//! | JSON length | "JSON"   |  u32 LE, u32 LE
//! | JSON + space padding   |
//! +------------------------+
//! | BIN length  | "BIN\0"  |  u32 LE, u32 LE
//! | blob + zero padding    |
//! +------------------------+
//! ```
//!
//! Version 1 has no BIN sub-header: every byte after the JSON chunk up to the
//! declared total length is the blob.

mod format;
mod reader;
mod writer;

pub use format::*;
pub use reader::*;
pub use writer::*;
