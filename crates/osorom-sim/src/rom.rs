//! ROM text loading and integer literal parsing.
//!
//! A ROM file is a list of hexadecimal instruction words separated by
//! whitespace. `#` starts a comment that runs to the end of the line. A
//! trailing partial packet is padded with NOPs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use osorom_core::PACKET_SLOTS;
use thiserror::Error;
use tracing::debug;

use crate::programs::NOP;

/// Failure to load a ROM or parse a literal.
#[derive(Debug, Error)]
pub enum RomError {
    /// The ROM file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A token is not a 32-bit hexadecimal word.
    #[error("line {line}: invalid instruction word `{token}`")]
    InvalidWord {
        /// 1-indexed source line.
        line: usize,
        /// Offending token.
        token: String,
    },
    /// The file holds no instruction words.
    #[error("ROM contains no instruction words")]
    Empty,
    /// A command-line value is not a 32-bit integer literal.
    #[error("invalid integer literal `{0}`")]
    InvalidLiteral(String),
}

/// Parses ROM text into whole packets.
///
/// # Errors
///
/// Returns [`RomError::InvalidWord`] for malformed tokens and
/// [`RomError::Empty`] when no words are present.
pub fn parse_rom(text: &str) -> Result<Vec<u32>, RomError> {
    let mut words = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let code = line.split_once('#').map_or(line, |(code, _)| code);
        for token in code.split_whitespace() {
            let digits = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token)
                .replace('_', "");
            let word = u32::from_str_radix(&digits, 16).map_err(|_| RomError::InvalidWord {
                line: index + 1,
                token: token.to_owned(),
            })?;
            words.push(word);
        }
    }
    if words.is_empty() {
        return Err(RomError::Empty);
    }
    let slots = PACKET_SLOTS as usize;
    let padding = (slots - words.len() % slots) % slots;
    if padding > 0 {
        debug!(padding, "padding partial packet with NOPs");
        words.resize(words.len() + padding, NOP);
    }
    Ok(words)
}

/// Reads and parses the ROM file at `path`.
///
/// # Errors
///
/// Returns [`RomError::Io`] when the file cannot be read, otherwise the
/// errors of [`parse_rom`].
pub fn load_rom(path: &Path) -> Result<Vec<u32>, RomError> {
    let text = fs::read_to_string(path).map_err(|source| RomError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_rom(&text)
}

/// Parses an unsigned 32-bit literal: `0x` hex, leading-`0` octal or decimal.
///
/// # Errors
///
/// Returns [`RomError::InvalidLiteral`] when `text` is not such a literal or
/// does not fit in 32 bits.
pub fn parse_literal(text: &str) -> Result<u32, RomError> {
    let invalid = || RomError::InvalidLiteral(text.to_owned());
    let (digits, radix) = if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        (hex, 16)
    } else if let Some(octal) = text.strip_prefix('0').filter(|rest| !rest.is_empty()) {
        (octal, 8)
    } else {
        (text, 10)
    };
    if digits.is_empty() || digits.starts_with('+') {
        return Err(invalid());
    }
    u32::from_str_radix(digits, radix).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::{parse_literal, parse_rom, RomError};
    use crate::programs::NOP;

    #[test]
    fn comments_and_prefixes_are_accepted() {
        let text = "# rotated constants\nC0040000 0xC0044021  # R0, R1\n\nc006_c042 C8000063\n";
        assert_eq!(
            parse_rom(text).expect("rom"),
            vec![0xC004_0000, 0xC004_4021, 0xC006_C042, 0xC800_0063]
        );
    }

    #[test]
    fn partial_packet_is_padded() {
        let rom = parse_rom("D1183C00").expect("rom");
        assert_eq!(rom, vec![0xD118_3C00, NOP, NOP, NOP]);
    }

    #[test]
    fn bad_tokens_report_their_line() {
        let error = parse_rom("E0000000\nnot-hex\n").expect_err("invalid");
        assert!(matches!(error, RomError::InvalidWord { line: 2, .. }));
        assert!(matches!(parse_rom("# nothing\n"), Err(RomError::Empty)));
        assert!(parse_rom("1_0000_0000").is_err());
    }

    #[test]
    fn literals_follow_c_prefix_rules() {
        assert_eq!(parse_literal("0xD1183C00").expect("hex"), 0xD118_3C00);
        assert_eq!(parse_literal("0X1f").expect("hex"), 0x1F);
        assert_eq!(parse_literal("017").expect("octal"), 0o17);
        assert_eq!(parse_literal("0").expect("zero"), 0);
        assert_eq!(parse_literal("3758096384").expect("decimal"), 0xE000_0000);
        for bad in ["", "0x", "09", "-1", "+5", "4294967296", "random"] {
            assert!(parse_literal(bad).is_err(), "{bad}");
        }
    }
}
