//! Bounded reading of image headers.
//!
//! Headers are small but some carry variable-sized tables after their fixed
//! part. Instead of reading whole files, the reader hands a growing window to
//! a streaming parser until it stops asking for more input.

use crate::errors::{ImageError, ImageResult};
use nom::{Err, IResult, Needed};
use std::io::{self, Read};

/// Largest window the reader is allowed to buffer.
pub const MAX_WINDOW: usize = 16 * 1024 * 1024;

/// Runs `parser` over the bytes of `reader`, starting with a window of
/// `initial` bytes.
pub fn parse_from_reader<R, T, F>(
    mut reader: R,
    initial: usize,
    what: &'static str,
    parser: F,
) -> ImageResult<T>
where
    R: Read,
    F: Fn(&[u8]) -> IResult<&[u8], T, ImageError>,
{
    let mut buf = Vec::with_capacity(initial);
    let mut eof = fill(&mut reader, &mut buf, initial)?;
    loop {
        let needed = match parser(&buf) {
            Ok((_, value)) => return Ok(value),
            Err(Err::Incomplete(needed)) => needed,
            Err(Err::Error(e) | Err::Failure(e)) => return Err(e),
        };
        if eof {
            return Err(ImageError::Truncated(what));
        }
        if buf.len() >= MAX_WINDOW {
            return Err(ImageError::TooLarge(what));
        }
        let extra = match needed {
            Needed::Size(n) => n.get(),
            Needed::Unknown => 0,
        };
        let target = (buf.len() + extra).max(buf.len() * 2).min(MAX_WINDOW);
        log::trace!("{what}: growing read window to {target} bytes");
        eof = fill(&mut reader, &mut buf, target)?;
    }
}

/// Reads until `buf` holds `target` bytes. Returns whether the end of input
/// was reached first.
fn fill<R: Read>(reader: &mut R, buf: &mut Vec<u8>, target: usize) -> io::Result<bool> {
    let want = target.saturating_sub(buf.len()) as u64;
    let got = reader.by_ref().take(want).read_to_end(buf)? as u64;
    Ok(got < want)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nom::number::streaming::le_u32;
    use std::io::Cursor;

    fn length_prefixed(input: &[u8]) -> IResult<&[u8], Vec<u8>, ImageError> {
        let (input, len) = le_u32(input)?;
        let (input, data) = nom::bytes::streaming::take(len as usize)(input)?;
        Ok((input, data.to_vec()))
    }

    #[test]
    fn window_grows_until_parsed() {
        let mut data = 1000u32.to_le_bytes().to_vec();
        data.extend(std::iter::repeat(7u8).take(1000));
        let parsed = parse_from_reader(Cursor::new(data), 8, "test", length_prefixed).unwrap();
        assert_eq!(parsed.len(), 1000);
    }

    #[test]
    fn short_input_is_truncated() {
        let mut data = 1000u32.to_le_bytes().to_vec();
        data.extend([1, 2, 3]);
        let res = parse_from_reader(Cursor::new(data), 8, "test", length_prefixed);
        assert!(matches!(res, Err(ImageError::Truncated("test"))));
    }
}
