//! Hexadecimal formatting of embedded checksums.
//!
//! Checksums are rendered lowercase without zero padding, so that `0x0badf00d`
//! prints as `badf00d`. Code ids are concatenations of such strings.

#[must_use]
pub fn hex_u32(v: u32) -> String {
    format!("{v:x}")
}

/// Concatenates the hex form of every checksum, in the given order.
#[must_use]
pub fn concat_checksums<I: IntoIterator<Item = u32>>(checksums: I) -> String {
    checksums.into_iter().map(hex_u32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_u32_is_unpadded() {
        assert_eq!(hex_u32(0x0bad_f00d), "badf00d");
        assert_eq!(hex_u32(0), "0");
    }

    #[test]
    fn checksums_are_concatenated_in_order() {
        assert_eq!(concat_checksums([0x12, 0xab, 0x1]), "12ab1");
        assert_eq!(concat_checksums(Vec::new()), "");
    }
}
