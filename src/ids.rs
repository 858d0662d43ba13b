//! Message and correlation identifiers.
//!
//! Both identifiers are fixed 24-byte binary tokens assigned or matched by the
//! queue manager. Outside the transport they travel as lowercase hex strings;
//! the string returned by a send is the correlation key a later receive
//! supplies.

use std::{fmt, str::FromStr};

/// Length in bytes of message and correlation identifiers.
pub const ID_LEN: usize = 24;

/// Errors raised when parsing a hex identifier.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    /// The input was empty.
    #[error("identifier is empty")]
    Empty,
    /// The input had an odd number of hex digits.
    #[error("identifier has an odd number of hex digits ({0})")]
    OddLength(usize),
    /// The input decodes to more than [`ID_LEN`] bytes.
    #[error("identifier is {0} bytes long, the maximum is {ID_LEN}")]
    TooLong(usize),
    /// A character outside `[0-9a-fA-F]` was found.
    #[error("invalid hex digit {digit:?} at offset {offset}")]
    InvalidDigit {
        /// Offending character.
        digit: char,
        /// Byte offset of the character in the input.
        offset: usize,
    },
}

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

fn nibble(byte: u8, offset: usize) -> Result<u8, IdParseError> {
    match byte {
        b'0'..=b'9' => Ok(byte - b'0'),
        b'a'..=b'f' => Ok(byte - b'a' + 10),
        b'A'..=b'F' => Ok(byte - b'A' + 10),
        _ => Err(IdParseError::InvalidDigit {
            digit: char::from(byte),
            offset,
        }),
    }
}

/// Decode a hex string into a zero-padded identifier buffer.
///
/// Input shorter than [`ID_LEN`] bytes is padded on the right with zeroes,
/// which is how the queue manager treats short identifiers.
fn decode_hex(input: &str) -> Result<[u8; ID_LEN], IdParseError> {
    let digits = input.as_bytes();
    if digits.is_empty() {
        return Err(IdParseError::Empty);
    }
    if digits.len() % 2 != 0 {
        return Err(IdParseError::OddLength(digits.len()));
    }
    let len = digits.len() / 2;
    if len > ID_LEN {
        return Err(IdParseError::TooLong(len));
    }
    let mut out = [0_u8; ID_LEN];
    for (index, (slot, pair)) in out.iter_mut().zip(digits.chunks_exact(2)).enumerate() {
        let offset = index * 2;
        *slot = (nibble(pair[0], offset)? << 4) | nibble(pair[1], offset + 1)?;
    }
    Ok(out)
}

fn write_hex(bytes: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    use fmt::Write;
    for byte in bytes {
        f.write_char(char::from(HEX_DIGITS[usize::from(byte >> 4)]))?;
        f.write_char(char::from(HEX_DIGITS[usize::from(byte & 0x0f)]))?;
    }
    Ok(())
}

/// Defines a 24-byte identifier newtype with hex parsing and formatting.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $name([u8; ID_LEN]);

        impl $name {
            /// The all-zero identifier, meaning "no identifier".
            pub const NONE: Self = Self([0; ID_LEN]);

            /// Wrap raw identifier bytes.
            #[must_use]
            pub const fn from_bytes(bytes: [u8; ID_LEN]) -> Self { Self(bytes) }

            /// Borrow the raw identifier bytes.
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; ID_LEN] { &self.0 }

            /// Returns `true` for the all-zero identifier.
            #[must_use]
            pub fn is_none(&self) -> bool { self.0 == [0; ID_LEN] }

            /// Render the identifier as 48 lowercase hex characters.
            #[must_use]
            pub fn to_hex(&self) -> String { self.to_string() }

            /// Parse a hex representation of the identifier.
            ///
            /// # Errors
            ///
            /// Returns [`IdParseError`] if the input is empty, has an odd
            /// length, is longer than [`ID_LEN`] bytes or contains a non-hex
            /// character.
            pub fn parse_hex(input: &str) -> Result<Self, IdParseError> {
                decode_hex(input).map(Self)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse_hex(s) }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write_hex(&self.0, f) }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(", stringify!($name))?;
                write_hex(&self.0, f)?;
                f.write_str(")")
            }
        }

        impl From<[u8; ID_LEN]> for $name {
            fn from(bytes: [u8; ID_LEN]) -> Self { Self(bytes) }
        }
    };
}

define_id!(
    /// Identifier assigned by the queue manager to a message when it is put.
    MessageId
);

define_id!(
    /// Identifier used to match a reply to the request that solicited it.
    CorrelationId
);

impl From<MessageId> for CorrelationId {
    fn from(id: MessageId) -> Self { Self(id.0) }
}
