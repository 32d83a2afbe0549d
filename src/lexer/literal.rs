use super::error::LexError;
use crate::look_ahead::LookAhead;

pub fn is_nondigit(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

/// Reads a run of nondigit/digit bytes. The caller has already checked that
/// the first byte is a nondigit.
pub fn read_identifier<I: Iterator<Item = u8>>(bytes: &mut LookAhead<I>) -> String {
    let mut name = Vec::new();

    while let Some(&b) = bytes.peek() {
        if !is_nondigit(b) && !b.is_ascii_digit() {
            break;
        }
        bytes.next();
        name.push(b);
    }

    String::from_utf8(name).expect("identifier bytes are ASCII")
}

/// Reads a pp-number (6.4.8): a digit or `.` digit start, continuing over
/// digits, `.`, and nondigits, with a sign absorbed after `e E p P`. The
/// resulting text is resolved into a typed value separately.
pub fn read_pp_number<I: Iterator<Item = u8>>(bytes: &mut LookAhead<I>) -> String {
    let mut text = Vec::new();
    text.push(bytes.next().expect("pp-number start byte"));

    while let Some(&b) = bytes.peek() {
        if !b.is_ascii_digit() && b != b'.' && !is_nondigit(b) {
            break;
        }
        bytes.next();
        text.push(b);

        if matches!(b, b'e' | b'E' | b'p' | b'P') {
            if let Some(&sign @ (b'+' | b'-')) = bytes.peek() {
                bytes.next();
                text.push(sign);
            }
        }
    }

    String::from_utf8(text).expect("pp-number bytes are ASCII")
}

/// Reads a character constant between single quotes; the value is an `int`.
pub fn read_char_constant<I: Iterator<Item = u8>>(
    bytes: &mut LookAhead<I>,
) -> Result<i32, LexError> {
    bytes.next().expect("opening single quote");

    let value = match bytes.next() {
        None | Some(b'\n') => return Err(LexError::UnterminatedCharacterConstant),
        Some(b'\'') => return Err(LexError::EmptyCharacterConstant),
        Some(b'\\') => escape_sequence(bytes)?,
        Some(b) => b,
    };

    match bytes.next() {
        Some(b'\'') => Ok(i32::from(value)),
        _ => Err(LexError::UnterminatedCharacterConstant),
    }
}

/// Reads a string literal between double quotes, decoding escape sequences.
pub fn read_string_literal<I: Iterator<Item = u8>>(
    bytes: &mut LookAhead<I>,
) -> Result<String, LexError> {
    bytes.next().expect("opening double quote");

    let mut content = Vec::new();

    loop {
        match bytes.next() {
            None | Some(b'\n') => return Err(LexError::UnterminatedStringLiteral),
            Some(b'"') => break,
            Some(b'\\') => content.push(escape_sequence(bytes)?),
            Some(b) => content.push(b),
        }
    }

    String::from_utf8(content).map_err(|_| LexError::InvalidUtf8)
}

/// Reads a header name between `<…>` or `"…"`. Escape sequences do not
/// apply inside header names; the text is taken verbatim.
pub fn read_header_name<I: Iterator<Item = u8>>(
    bytes: &mut LookAhead<I>,
) -> Result<String, LexError> {
    let terminator = match bytes.next().expect("opening header-name delimiter") {
        b'<' => b'>',
        b'"' => b'"',
        _ => unreachable!("header name starts with '<' or '\"'"),
    };

    let mut name = Vec::new();

    loop {
        match bytes.next() {
            None | Some(b'\n') => return Err(LexError::UnterminatedHeaderName),
            Some(b) if b == terminator => break,
            Some(b) => name.push(b),
        }
    }

    String::from_utf8(name).map_err(|_| LexError::InvalidUtf8)
}

/// Decodes one escape sequence after the backslash. Escapes are
/// byte-valued, so octal and hex escapes above 255 are rejected.
fn escape_sequence<I: Iterator<Item = u8>>(bytes: &mut LookAhead<I>) -> Result<u8, LexError> {
    match bytes.next() {
        Some(b'\'') => Ok(b'\''),
        Some(b'"') => Ok(b'"'),
        Some(b'?') => Ok(b'?'),
        Some(b'\\') => Ok(b'\\'),
        Some(b'a') => Ok(0x07),
        Some(b'b') => Ok(0x08),
        Some(b'f') => Ok(0x0C),
        Some(b'n') => Ok(b'\n'),
        Some(b'r') => Ok(b'\r'),
        Some(b't') => Ok(b'\t'),
        Some(b'v') => Ok(0x0B),
        Some(start_digit @ b'0'..=b'7') => {
            // Octal - \0, \00, or \000
            let mut value = u32::from(start_digit - b'0');

            for _ in 0..2 {
                match bytes.peek() {
                    Some(&digit @ b'0'..=b'7') => {
                        bytes.next();
                        value = value * 8 + u32::from(digit - b'0');
                    }
                    _ => break,
                }
            }

            Ok(value as u8)
        }
        Some(b'x') => {
            let mut digits = String::new();

            while let Some(&digit) = bytes.peek() {
                if !digit.is_ascii_hexdigit() {
                    break;
                }
                bytes.next();
                digits.push(char::from(digit));
            }

            u32::from_str_radix(&digits, 16)
                .ok()
                .filter(|value| *value <= 0xFF)
                .map(|value| value as u8)
                .ok_or(LexError::BadEscapeSequence)
        }
        _ => Err(LexError::BadEscapeSequence),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(source: &str) -> LookAhead<impl Iterator<Item = u8> + '_> {
        LookAhead::new(source.bytes())
    }

    #[test]
    fn identifier_stops_at_non_identifier_byte() {
        let mut input = bytes("foo_1+bar");
        assert_eq!(read_identifier(&mut input), "foo_1");
        assert_eq!(input.next(), Some(b'+'));
    }

    #[test]
    fn pp_number_absorbs_exponent_signs() {
        let mut input = bytes("1.5e+10f;");
        assert_eq!(read_pp_number(&mut input), "1.5e+10f");
        assert_eq!(input.next(), Some(b';'));
    }

    #[test]
    fn pp_number_does_not_absorb_plain_plus() {
        let mut input = bytes("1+2");
        assert_eq!(read_pp_number(&mut input), "1");
    }

    #[test]
    fn char_constant_values() {
        assert_eq!(read_char_constant(&mut bytes("'A'")), Ok(65));
        assert_eq!(read_char_constant(&mut bytes("'\\n'")), Ok(10));
        assert_eq!(read_char_constant(&mut bytes("'\\0'")), Ok(0));
        assert_eq!(read_char_constant(&mut bytes("'\\x41'")), Ok(0x41));
    }

    #[test]
    fn char_constant_errors() {
        assert_eq!(
            read_char_constant(&mut bytes("''")),
            Err(LexError::EmptyCharacterConstant)
        );
        assert_eq!(
            read_char_constant(&mut bytes("'a")),
            Err(LexError::UnterminatedCharacterConstant)
        );
    }

    #[test]
    fn string_literal_decodes_escapes() {
        assert_eq!(
            read_string_literal(&mut bytes("\"a\\tb\\\\c\\\"d\"")),
            Ok("a\tb\\c\"d".into())
        );
    }

    #[test]
    fn string_literal_unterminated() {
        assert_eq!(
            read_string_literal(&mut bytes("\"abc")),
            Err(LexError::UnterminatedStringLiteral)
        );
        assert_eq!(
            read_string_literal(&mut bytes("\"abc\ndef\"")),
            Err(LexError::UnterminatedStringLiteral)
        );
    }

    #[test]
    fn header_name_is_verbatim() {
        assert_eq!(
            read_header_name(&mut bytes("<sys\\thing.h>")),
            Ok("sys\\thing.h".into())
        );
        assert_eq!(read_header_name(&mut bytes("\"own.h\"")), Ok("own.h".into()));
    }

    #[test]
    fn header_name_unterminated() {
        assert_eq!(
            read_header_name(&mut bytes("<stdio.h")),
            Err(LexError::UnterminatedHeaderName)
        );
    }

    #[test]
    fn bad_escape_is_rejected() {
        assert_eq!(
            read_string_literal(&mut bytes("\"\\q\"")),
            Err(LexError::BadEscapeSequence)
        );
        assert_eq!(
            read_string_literal(&mut bytes("\"\\x100\"")),
            Err(LexError::BadEscapeSequence)
        );
    }
}
