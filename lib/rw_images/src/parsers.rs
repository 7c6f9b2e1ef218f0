//! Parsing primitives shared by the image decoders.
//!
//! All top-level parsers are streaming: running out of input yields
//! `nom::Err::Incomplete` so that the caller can read more bytes instead of
//! failing. Sub-tables whose size is already known are parsed with complete
//! parsers.

use crate::errors::{ImageError, ImageResult};
use nom::bytes::{complete, streaming};
use nom::{Err, IResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 4-byte version token, such as `"074\0"`.
///
/// Tokens are ordered as raw byte strings, the way image tools compare them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version(pub [u8; 4]);

impl Version {
    #[must_use]
    pub fn as_str(&self) -> String {
        String::from_utf8_lossy(&self.0)
            .trim_end_matches('\0')
            .to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub(crate) fn magic<'a>(
    format: &'static str,
    expected: &'static [u8; 4],
) -> impl Fn(&'a [u8]) -> IResult<&'a [u8], (), ImageError> {
    move |input| {
        let (rest, found) = streaming::take(4usize)(input)?;
        if found == expected {
            Ok((rest, ()))
        } else {
            Err(Err::Error(ImageError::BadMagic {
                format,
                found: String::from_utf8_lossy(found).escape_debug().to_string(),
            }))
        }
    }
}

pub(crate) fn version(input: &[u8]) -> IResult<&[u8], Version, ImageError> {
    let (rest, token) = streaming::take(4usize)(input)?;
    let mut raw = [0u8; 4];
    raw.copy_from_slice(token);
    Ok((rest, Version(raw)))
}

/// NUL-terminated string within a complete buffer.
pub(crate) fn c_string(input: &[u8]) -> IResult<&[u8], String, ImageError> {
    let (input, s) = complete::take_until("\0")(input)?;
    let (input, _) = complete::tag("\0")(input)?;
    Ok((input, String::from_utf8_lossy(s).into_owned()))
}

/// Runs a streaming parser over a buffer that is known to be complete.
pub(crate) fn run_complete<'a, T, F>(input: &'a [u8], what: &'static str, parser: F) -> ImageResult<T>
where
    F: Fn(&'a [u8]) -> IResult<&'a [u8], T, ImageError>,
{
    match parser(input) {
        Ok((_, value)) => Ok(value),
        Err(Err::Incomplete(_)) => Err(ImageError::Truncated(what)),
        Err(Err::Error(e) | Err::Failure(e)) => Err(e),
    }
}
