/// Parses a C-style integer literal.
///
/// An optional `+` or `-` is followed by a hexadecimal number (`0x` or
/// `0X` prefix), an octal number (a leading `0` followed by more digits) or
/// a decimal number. The whole input must be consumed and the value must fit
/// in an `i64`; otherwise `None` is returned.
///
/// ```rust
/// use flatrpc::parse_int;
///
/// assert_eq!(parse_int(b"42"), Some(42));
/// assert_eq!(parse_int(b"-0x17"), Some(-23));
/// assert_eq!(parse_int(b"-055"), Some(-45));
/// assert_eq!(parse_int(b"1.5"), None);
/// ```
#[must_use]
pub fn parse_int(text: &[u8]) -> Option<i64> {
    let (negative, digits) = match text.split_first()? {
        (b'-', rest) => (true, rest),
        (b'+', rest) => (false, rest),
        _ => (false, text),
    };

    let (radix, digits) = match digits {
        [b'0', b'x' | b'X', rest @ ..] => (16, rest),
        [b'0', rest @ ..] if !rest.is_empty() => (8, rest),
        _ => (10, digits),
    };
    if digits.is_empty() {
        return None;
    }

    // accumulate towards the negative side so i64::MIN is representable
    let mut value: i64 = 0;
    for &byte in digits {
        let digit = char::from(byte).to_digit(radix)?;
        value = value
            .checked_mul(i64::from(radix))?
            .checked_sub(i64::from(digit))?;
    }

    if negative { Some(value) } else { value.checked_neg() }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::parse_int;

    #[rstest]
    #[case::decimal(b"233", Some(233))]
    #[case::zero(b"0", Some(0))]
    #[case::negative_zero(b"-0", Some(0))]
    #[case::plus(b"+12", Some(12))]
    #[case::negative(b"-40", Some(-40))]
    #[case::hex(b"0x1F", Some(31))]
    #[case::upper_hex(b"0XfF", Some(255))]
    #[case::negative_hex(b"-0x17", Some(-23))]
    #[case::octal(b"017", Some(15))]
    #[case::negative_octal(b"-055", Some(-45))]
    #[case::min(b"-9223372036854775808", Some(i64::MIN))]
    #[case::max(b"9223372036854775807", Some(i64::MAX))]
    #[case::overflow(b"9223372036854775808", None)]
    #[case::octal_digit_out_of_range(b"08", None)]
    #[case::bare_prefix(b"0x", None)]
    #[case::bare_sign(b"-", None)]
    #[case::empty(b"", None)]
    #[case::fraction(b"1.5", None)]
    #[case::exponent(b"1e3", None)]
    #[case::word(b"true", None)]
    #[case::trailing_space(b"12 ", None)]
    fn parses(#[case] text: &[u8], #[case] expected: Option<i64>) {
        assert_eq!(parse_int(text), expected);
    }
}
