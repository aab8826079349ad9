const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Two uppercase hex digits, high nibble first.
#[inline]
pub const fn hex_byte(value: u8) -> [u8; 2] {
    [
        HEX_DIGITS[(value >> 4) as usize],
        HEX_DIGITS[(value & 0x0F) as usize],
    ]
}

/// Copy `template` and patch the two hex digits of `value` in at `at`.
///
/// Used for fixed diagnostics such as `"UNHANDLED INTERRUPT 0x00"`. The
/// result is unchanged if the digits would not fit.
pub const fn patch_hex_byte<const N: usize>(template: &[u8; N], at: usize, value: u8) -> [u8; N] {
    let mut out = *template;
    if at + 2 <= N {
        let digits = hex_byte(value);
        out[at] = digits[0];
        out[at + 1] = digits[1];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_uppercase() {
        assert_eq!(&hex_byte(0x00), b"00");
        assert_eq!(&hex_byte(0x2A), b"2A");
        assert_eq!(&hex_byte(0xFF), b"FF");
    }

    #[test]
    fn patches_template() {
        assert_eq!(&patch_hex_byte(b"KEYBOARD 0x00 ", 11, 0x9c), b"KEYBOARD 0x9C ");
        assert_eq!(&patch_hex_byte(b"0x0", 2, 0x12), b"0x0");
    }
}
