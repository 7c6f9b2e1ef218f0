//! Small helpers shared by the `ReleaseWorks` crates: content digests,
//! checksum formatting and java-style properties reading.

pub mod digest;
pub mod hexlify;
pub mod properties;
