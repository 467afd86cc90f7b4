/// Convert a byte offset within `line` to a UTF-16 column, the unit LSP
/// `Position.character` is expressed in. Offsets that fall inside a multi-byte
/// character are floored to the start of that character.
pub fn byte_offset_to_utf16_column(line: &str, byte_offset: usize) -> u32 {
    let mut utf16_count = 0u32;
    for (byte_idx, ch) in line.char_indices() {
        if byte_idx >= byte_offset {
            break;
        }
        if byte_idx + ch.len_utf8() > byte_offset {
            break;
        }
        utf16_count += ch.len_utf16() as u32;
    }
    utf16_count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_column() {
        assert_eq!(byte_offset_to_utf16_column("hint str _x;", 5), 5);
        assert_eq!(byte_offset_to_utf16_column("abc", 10), 3);
    }

    #[test]
    fn test_multibyte_column() {
        // 'é' is two bytes in UTF-8 but one UTF-16 unit
        assert_eq!(byte_offset_to_utf16_column("é = 1", 2), 1);
        // Offset inside 'é' floors to its start
        assert_eq!(byte_offset_to_utf16_column("é = 1", 1), 0);
        // '𝄞' is four bytes and two UTF-16 units
        assert_eq!(byte_offset_to_utf16_column("𝄞x", 4), 2);
    }
}
