use super::error::LexError;
use crate::token::{IntegerSuffix, Number};

#[derive(Copy, Clone, Debug)]
enum Longness {
    Regular,
    Long,
    ExtraLong,
}

#[derive(Copy, Clone, Debug)]
enum Sign {
    Regular,
    Unsigned,
}

/// Resolves a pp-number's text into a typed value.
pub fn resolve_number(text: &str) -> Result<Number, LexError> {
    if is_floating(text) {
        resolve_float(text)
    } else {
        resolve_integer(text)
    }
}

fn is_floating(text: &str) -> bool {
    if text.starts_with("0x") || text.starts_with("0X") {
        // Hexadecimal floats are not supported; "0x1.8p3" fails over in
        // the integer path instead.
        return false;
    }

    text.contains('.') || text.contains(['e', 'E'])
}

fn resolve_integer(text: &str) -> Result<Number, LexError> {
    let (digits, radix) = lex_radix(text);
    let (digits, sign, longness) = lex_suffix(digits);

    if digits.is_empty() || !digits.bytes().all(|b| char::from(b).is_digit(radix)) {
        return Err(LexError::InvalidNumber(text.into()));
    }

    use IntegerSuffix::*;

    let requested = match (sign, longness) {
        (Sign::Regular, Longness::Regular) => Int,
        (Sign::Regular, Longness::Long) => Long,
        (Sign::Regular, Longness::ExtraLong) => LongLong,
        (Sign::Unsigned, Longness::Regular) => UnsignedInt,
        (Sign::Unsigned, Longness::Long) => UnsignedLong,
        (Sign::Unsigned, Longness::ExtraLong) => UnsignedLongLong,
    };

    // The correct type for an integer literal is whichever of these fits it
    // first (6.4.4.1).
    let order: &[IntegerSuffix] = match radix {
        10 => match requested {
            Int => &[Int, Long, LongLong],
            UnsignedInt => &[UnsignedInt, UnsignedLong, UnsignedLongLong],
            Long => &[Long, LongLong],
            UnsignedLong => &[UnsignedLong, UnsignedLongLong],
            LongLong => &[LongLong],
            UnsignedLongLong => &[UnsignedLongLong],
        },
        _ => match requested {
            Int => &[
                Int,
                UnsignedInt,
                Long,
                UnsignedLong,
                LongLong,
                UnsignedLongLong,
            ],
            UnsignedInt => &[UnsignedInt, UnsignedLong, UnsignedLongLong],
            Long => &[Long, UnsignedLong, LongLong, UnsignedLongLong],
            UnsignedLong => &[UnsignedLong, UnsignedLongLong],
            LongLong => &[LongLong, UnsignedLongLong],
            UnsignedLongLong => &[UnsignedLongLong],
        },
    };

    for possible_type in order {
        if let Some(number) = Number::try_new(digits, *possible_type, radix) {
            return Ok(number);
        }
    }

    Err(LexError::UnrepresentableInteger)
}

fn resolve_float(text: &str) -> Result<Number, LexError> {
    let parse = |digits: &str| {
        digits
            .parse::<f64>()
            .map_err(|_| LexError::InvalidNumber(text.into()))
    };

    if let Some(digits) = strip_suffix(text, &["f", "F"]) {
        Ok(Number::Float(parse(digits)? as f32))
    } else if let Some(digits) = strip_suffix(text, &["l", "L"]) {
        Ok(Number::LongDouble(parse(digits)?))
    } else {
        Ok(Number::Double(parse(text)?))
    }
}

fn lex_radix(text: &str) -> (&str, u32) {
    if text.starts_with('0') {
        if let Some(b'x' | b'X') = text.as_bytes().get(1) {
            return (&text[2..], 16);
        }

        if let Some(b'b' | b'B') = text.as_bytes().get(1) {
            return (&text[2..], 2);
        }

        return (text, 8);
    }

    (text, 10)
}

fn lex_suffix(text: &str) -> (&str, Sign, Longness) {
    let (text, sign) =
        unsuffix(text, &["U", "u"], Some(Sign::Unsigned)).unwrap_or((text, None));

    let (text, longness) = unsuffix(text, &["LL", "ll"], Longness::ExtraLong)
        .or_else(|| unsuffix(text, &["L", "l"], Longness::Long))
        .unwrap_or((text, Longness::Regular));

    let (text, sign) = sign
        .map(|sign| (text, sign))
        .or_else(|| unsuffix(text, &["U", "u"], Sign::Unsigned))
        .unwrap_or((text, Sign::Regular));

    (text, sign, longness)
}

fn strip_suffix<'a>(text: &'a str, suffixes: &[&str]) -> Option<&'a str> {
    suffixes
        .iter()
        .find_map(|suffix| text.strip_suffix(suffix))
}

fn unsuffix<'a, T>(text: &'a str, suffixes: &[&str], meaning: T) -> Option<(&'a str, T)> {
    strip_suffix(text, suffixes).map(|stripped| (stripped, meaning))
}
