//! Token type and the closed token-kind enumeration.

use serde::Serialize;
use sqlvine_expr::Position;

/// Kind tags for every token a dialect can produce.
///
/// The set is closed: dialects remap source text onto these kinds (through
/// keyword, single-token and format-string tables) rather than adding new
/// ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    // punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Amp,
    Caret,
    Colon,
    Comma,
    Dot,
    Dash,
    Eq,
    Gt,
    Lt,
    Mod,
    Not,
    Pipe,
    Plus,
    Semicolon,
    Slash,
    Backslash,
    Star,
    Tilde,
    Placeholder,
    Parameter,
    Hash,

    // multi-character operators
    DColon,
    QDColon,
    DPipe,
    PipeGt,
    Gte,
    Lte,
    Neq,
    ColonEq,
    NullsafeEq,
    Arrow,
    DArrow,
    FArrow,
    HashArrow,
    DHashArrow,
    LrArrow,
    DAmp,
    DQMark,
    AmpLt,
    AmpGt,
    Adjacent,
    BlockStart,
    BlockEnd,
    Hint,

    // literals
    String,
    Number,
    Identifier,
    Var,
    BitString,
    HexString,
    ByteString,
    NationalString,
    RawString,
    HeredocString,
    UnicodeString,

    // type names
    Bit,
    Boolean,
    TinyInt,
    SmallInt,
    MediumInt,
    Int,
    BigInt,
    Int128,
    UInt,
    UInt128,
    Float,
    Double,
    Decimal,
    BigDecimal,
    Char,
    NChar,
    Varchar,
    NVarchar,
    Text,
    TinyText,
    MediumText,
    LongText,
    Binary,
    VarBinary,
    Json,
    JsonB,
    Time,
    TimeTz,
    Timestamp,
    TimestampTz,
    TimestampLtz,
    TimestampNtz,
    Date,
    Datetime,
    Uuid,
    Array,
    List,
    Map,
    Struct,
    Enum,
    Object,
    Inet,
    Variant,
    Geography,
    Geometry,
    Vector,
    Sequence,
    UserDefined,
    Nullable,

    // keywords
    Alias,
    All,
    Alter,
    Analyze,
    And,
    Anti,
    Any,
    Apply,
    Asc,
    Asof,
    AutoIncrement,
    Begin,
    Between,
    Cache,
    Case,
    CharacterSet,
    ClusterBy,
    Collate,
    Column,
    Command,
    Comment,
    Commit,
    ConnectBy,
    Constraint,
    Copy,
    Create,
    Cross,
    Cube,
    CurrentCatalog,
    CurrentDate,
    CurrentSchema,
    CurrentTime,
    CurrentTimestamp,
    CurrentUser,
    Database,
    Default,
    Delete,
    Desc,
    Describe,
    Distinct,
    DistributeBy,
    Div,
    Drop,
    Else,
    End,
    Escape,
    Except,
    Execute,
    Exists,
    False,
    Fetch,
    Filter,
    First,
    For,
    ForeignKey,
    Format,
    From,
    Full,
    Function,
    Glob,
    Grant,
    GroupBy,
    GroupingSets,
    Having,
    ILike,
    In,
    Index,
    Inner,
    Insert,
    Intersect,
    Interval,
    Into,
    IrLike,
    Is,
    IsNull,
    Join,
    Keep,
    Kill,
    Lateral,
    Left,
    Like,
    Limit,
    Load,
    LocalTime,
    LocalTimestamp,
    Lock,
    Merge,
    Namespace,
    Natural,
    Next,
    NotNull,
    Null,
    Offset,
    On,
    Operator,
    Or,
    OrderBy,
    Ordinality,
    Out,
    Outer,
    Over,
    Overlaps,
    Overwrite,
    Partition,
    PartitionBy,
    Percent,
    Pivot,
    Pragma,
    PrimaryKey,
    Procedure,
    Qualify,
    Range,
    Recursive,
    References,
    Rename,
    Replace,
    Returning,
    Revoke,
    Right,
    RLike,
    Rollback,
    Rollup,
    Row,
    Rows,
    Schema,
    Select,
    Semi,
    Session,
    SessionUser,
    Set,
    Settings,
    Show,
    SimilarTo,
    Some,
    SortBy,
    StartWith,
    StraightJoin,
    Table,
    TableSample,
    Temporary,
    Then,
    True,
    Trigger,
    Truncate,
    Uncache,
    Union,
    Unique,
    Unknown,
    Unnest,
    Unpivot,
    Update,
    Use,
    Using,
    Values,
    View,
    Volatile,
    When,
    Where,
    Window,
    With,
    Xor,
}

/// One lexed token. `start` and `end` are inclusive character offsets into
/// the source, so two tokens are adjacent exactly when
/// `prev.end + 1 == next.start`. `line` and `col` refer to the token's last
/// character (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: u32,
    pub col: u32,
    pub start: usize,
    pub end: usize,
    pub comments: Vec<String>,
}

impl Token {
    #[must_use]
    pub fn new(
        kind: TokenKind,
        text: impl Into<String>,
        line: u32,
        col: u32,
        start: usize,
        end: usize,
        comments: Vec<String>,
    ) -> Token {
        Token {
            kind,
            text: text.into(),
            line,
            col,
            start,
            end,
            comments,
        }
    }

    /// Synthetic token with no meaningful source span.
    #[must_use]
    pub fn synthetic(kind: TokenKind, text: impl Into<String>) -> Token {
        Token::new(kind, text, 1, 1, 0, 0, Vec::new())
    }

    #[must_use]
    pub fn number(value: i64) -> Token {
        Token::synthetic(TokenKind::Number, value.to_string())
    }

    #[must_use]
    pub fn string(text: impl Into<String>) -> Token {
        Token::synthetic(TokenKind::String, text)
    }

    #[must_use]
    pub fn identifier(text: impl Into<String>) -> Token {
        Token::synthetic(TokenKind::Identifier, text)
    }

    #[must_use]
    pub fn var(text: impl Into<String>) -> Token {
        Token::synthetic(TokenKind::Var, text)
    }
}

impl From<&Token> for Position {
    fn from(token: &Token) -> Position {
        Position {
            line: token.line,
            col: token.col,
            start: token.start,
            end: token.end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_constructors() {
        let number = Token::number(42);
        assert_eq!(number.kind, TokenKind::Number);
        assert_eq!(number.text, "42");
        assert_eq!((number.start, number.end), (0, 0));

        assert_eq!(Token::string("abc").kind, TokenKind::String);
        assert_eq!(Token::identifier("t").kind, TokenKind::Identifier);
        assert_eq!(Token::var("x").kind, TokenKind::Var);
    }

    #[test]
    fn test_position_from_token() {
        let token = Token::new(TokenKind::Select, "SELECT", 1, 6, 0, 5, Vec::new());
        let position = Position::from(&token);
        assert_eq!(position.line, 1);
        assert_eq!(position.col, 6);
        assert_eq!(position.start, 0);
        assert_eq!(position.end, 5);
    }

    #[test]
    fn test_token_serializes_to_json() {
        let token = Token::new(TokenKind::Number, "1", 1, 8, 7, 7, Vec::new());
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["kind"], "Number");
        assert_eq!(json["text"], "1");
        assert_eq!(json["start"], 7);
        assert_eq!(json["end"], 7);
    }
}
