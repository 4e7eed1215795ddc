use thiserror::Error;

/// A syntax violation, positioned in the input.
///
/// `offset` is the byte offset at which parsing stopped; `line` and `column`
/// are derived from it (both 1-based, column counted in characters).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{source} at {line}:{column}")]
pub struct ParseError {
    pub(crate) source: SyntaxError,
    /// Byte offset of the failure.
    pub offset: usize,
    /// 1-based line of the failure.
    pub line: usize,
    /// 1-based column of the failure.
    pub column: usize,
}

impl ParseError {
    pub(crate) fn at(source: SyntaxError, input: &[u8], offset: usize) -> Self {
        let offset = offset.min(input.len());
        let (line, column) = line_column(input, offset);
        Self {
            source,
            offset,
            line,
            column,
        }
    }

    /// The kind of syntax violation.
    #[must_use]
    pub fn kind(&self) -> &SyntaxError {
        &self.source
    }
}

/// Kinds of syntax violation reported by the parser.
#[allow(missing_docs)]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("invalid character '{0}'")]
    InvalidCharacter(char),
    #[error("invalid hex character '{0}' in unicode escape")]
    InvalidUnicodeEscapeChar(char),
    #[error("invalid escaped character '{0}'")]
    InvalidEscape(char),
    #[error("quoted string not terminated")]
    UnterminatedString,
    #[error("NULL byte in string")]
    NullByteInString,
    #[error("unterminated array")]
    UnterminatedArray,
    #[error("unterminated object")]
    UnterminatedObject,
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("not a number")]
    InvalidNumber,
    #[error("expected null, true or false")]
    InvalidLiteral,
    #[error("unexpected comma")]
    UnexpectedComma,
    #[error("unexpected colon")]
    UnexpectedColon,
    #[error("unexpected array close")]
    UnexpectedArrayClose,
    #[error("unexpected object close")]
    UnexpectedObjectClose,
    #[error("expected a string key")]
    ExpectedKey,
    #[error("expected a colon after the key")]
    ExpectedColon,
    #[error("unexpected characters after the JSON document")]
    TrailingCharacters,
    #[error("empty input")]
    Empty,
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,
    #[error("{0}")]
    Other(&'static str),
}

fn line_column(input: &[u8], offset: usize) -> (usize, usize) {
    let head = &input[..offset];
    let line = 1 + head.iter().filter(|&&b| b == b'\n').count();
    let line_start = head.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
    let column = 1 + String::from_utf8_lossy(&head[line_start..]).chars().count();
    (line, column)
}
