//! Dialect lexing rules: the data that makes one SQL dialect tokenize
//! differently from another.
//!
//! [`DialectRules`] is immutable once built. Construction goes through
//! [`DialectBuilder`], which starts from the ANSI-flavored base tables below
//! and lets a dialect swap quote pairs, comment markers, escape sets, literal
//! prefixes and keyword entries. `build` derives everything the lexer needs
//! up front: the format-string table, the comment map and the keyword trie.

use std::collections::{HashMap, HashSet};

use crate::token::TokenKind;
use crate::trie::Trie;

/// Base single-character token table.
const SINGLE_TOKENS: &[(char, TokenKind)] = &[
    ('(', TokenKind::LParen),
    (')', TokenKind::RParen),
    ('[', TokenKind::LBracket),
    (']', TokenKind::RBracket),
    ('{', TokenKind::LBrace),
    ('}', TokenKind::RBrace),
    ('&', TokenKind::Amp),
    ('^', TokenKind::Caret),
    (':', TokenKind::Colon),
    (',', TokenKind::Comma),
    ('.', TokenKind::Dot),
    ('-', TokenKind::Dash),
    ('=', TokenKind::Eq),
    ('>', TokenKind::Gt),
    ('<', TokenKind::Lt),
    ('%', TokenKind::Mod),
    ('!', TokenKind::Not),
    ('|', TokenKind::Pipe),
    ('+', TokenKind::Plus),
    (';', TokenKind::Semicolon),
    ('/', TokenKind::Slash),
    ('\\', TokenKind::Backslash),
    ('*', TokenKind::Star),
    ('~', TokenKind::Tilde),
    ('?', TokenKind::Placeholder),
    ('@', TokenKind::Parameter),
    ('#', TokenKind::Hash),
    // Quote characters break a var like x'y'; the kind itself is never used.
    ('\'', TokenKind::Unknown),
    ('`', TokenKind::Unknown),
    ('"', TokenKind::Unknown),
];

/// Base keyword table: multi-character operators, word keywords and type
/// names, all mapped onto [`TokenKind`].
const KEYWORDS: &[(&str, TokenKind)] = &[
    ("&<", TokenKind::AmpLt),
    ("&>", TokenKind::AmpGt),
    ("==", TokenKind::Eq),
    ("::", TokenKind::DColon),
    ("?::", TokenKind::QDColon),
    ("||", TokenKind::DPipe),
    ("|>", TokenKind::PipeGt),
    (">=", TokenKind::Gte),
    ("<=", TokenKind::Lte),
    ("<>", TokenKind::Neq),
    ("!=", TokenKind::Neq),
    (":=", TokenKind::ColonEq),
    ("<=>", TokenKind::NullsafeEq),
    ("->", TokenKind::Arrow),
    ("->>", TokenKind::DArrow),
    ("=>", TokenKind::FArrow),
    ("#>", TokenKind::HashArrow),
    ("#>>", TokenKind::DHashArrow),
    ("<->", TokenKind::LrArrow),
    ("&&", TokenKind::DAmp),
    ("??", TokenKind::DQMark),
    ("~~~", TokenKind::Glob),
    ("~~", TokenKind::Like),
    ("~~*", TokenKind::ILike),
    ("~*", TokenKind::IrLike),
    ("-|-", TokenKind::Adjacent),
    ("ALL", TokenKind::All),
    ("ALTER", TokenKind::Alter),
    ("ANALYZE", TokenKind::Analyze),
    ("AND", TokenKind::And),
    ("ANTI", TokenKind::Anti),
    ("ANY", TokenKind::Any),
    ("APPLY", TokenKind::Apply),
    ("AS", TokenKind::Alias),
    ("ASC", TokenKind::Asc),
    ("ASOF", TokenKind::Asof),
    ("AUTOINCREMENT", TokenKind::AutoIncrement),
    ("AUTO_INCREMENT", TokenKind::AutoIncrement),
    ("BEGIN", TokenKind::Begin),
    ("BETWEEN", TokenKind::Between),
    ("CACHE", TokenKind::Cache),
    ("CASE", TokenKind::Case),
    ("CHARACTER SET", TokenKind::CharacterSet),
    ("CLUSTER BY", TokenKind::ClusterBy),
    ("COLLATE", TokenKind::Collate),
    ("COLUMN", TokenKind::Column),
    ("COMMIT", TokenKind::Commit),
    ("CONNECT BY", TokenKind::ConnectBy),
    ("CONSTRAINT", TokenKind::Constraint),
    ("COPY", TokenKind::Copy),
    ("CREATE", TokenKind::Create),
    ("CROSS", TokenKind::Cross),
    ("CUBE", TokenKind::Cube),
    ("CURRENT_CATALOG", TokenKind::CurrentCatalog),
    ("CURRENT_DATE", TokenKind::CurrentDate),
    ("CURRENT_SCHEMA", TokenKind::CurrentSchema),
    ("CURRENT_TIME", TokenKind::CurrentTime),
    ("CURRENT_TIMESTAMP", TokenKind::CurrentTimestamp),
    ("CURRENT_USER", TokenKind::CurrentUser),
    ("DATABASE", TokenKind::Database),
    ("DEFAULT", TokenKind::Default),
    ("DELETE", TokenKind::Delete),
    ("DESC", TokenKind::Desc),
    ("DESCRIBE", TokenKind::Describe),
    ("DISTINCT", TokenKind::Distinct),
    ("DISTRIBUTE BY", TokenKind::DistributeBy),
    ("DIV", TokenKind::Div),
    ("DROP", TokenKind::Drop),
    ("ELSE", TokenKind::Else),
    ("END", TokenKind::End),
    ("ESCAPE", TokenKind::Escape),
    ("EXCEPT", TokenKind::Except),
    ("EXECUTE", TokenKind::Execute),
    ("EXISTS", TokenKind::Exists),
    ("FALSE", TokenKind::False),
    ("FETCH", TokenKind::Fetch),
    ("FILTER", TokenKind::Filter),
    ("FIRST", TokenKind::First),
    ("FOR", TokenKind::For),
    ("FOREIGN KEY", TokenKind::ForeignKey),
    ("FORMAT", TokenKind::Format),
    ("FROM", TokenKind::From),
    ("FULL", TokenKind::Full),
    ("FUNCTION", TokenKind::Function),
    ("GLOB", TokenKind::Glob),
    ("GRANT", TokenKind::Grant),
    ("GROUP BY", TokenKind::GroupBy),
    ("GROUPING SETS", TokenKind::GroupingSets),
    ("HAVING", TokenKind::Having),
    ("ILIKE", TokenKind::ILike),
    ("IN", TokenKind::In),
    ("INDEX", TokenKind::Index),
    ("INNER", TokenKind::Inner),
    ("INSERT", TokenKind::Insert),
    ("INTERSECT", TokenKind::Intersect),
    ("INTERVAL", TokenKind::Interval),
    ("INTO", TokenKind::Into),
    ("IS", TokenKind::Is),
    ("ISNULL", TokenKind::IsNull),
    ("JOIN", TokenKind::Join),
    ("KEEP", TokenKind::Keep),
    ("KILL", TokenKind::Kill),
    ("LATERAL", TokenKind::Lateral),
    ("LEFT", TokenKind::Left),
    ("LIKE", TokenKind::Like),
    ("LIMIT", TokenKind::Limit),
    ("LOAD", TokenKind::Load),
    ("LOCALTIME", TokenKind::LocalTime),
    ("LOCALTIMESTAMP", TokenKind::LocalTimestamp),
    ("LOCK", TokenKind::Lock),
    ("MERGE", TokenKind::Merge),
    ("NAMESPACE", TokenKind::Namespace),
    ("NATURAL", TokenKind::Natural),
    ("NEXT", TokenKind::Next),
    ("NOT", TokenKind::Not),
    ("NOTNULL", TokenKind::NotNull),
    ("NULL", TokenKind::Null),
    ("OFFSET", TokenKind::Offset),
    ("ON", TokenKind::On),
    ("OPERATOR", TokenKind::Operator),
    ("OR", TokenKind::Or),
    ("ORDER BY", TokenKind::OrderBy),
    ("ORDINALITY", TokenKind::Ordinality),
    ("OUT", TokenKind::Out),
    ("OUTER", TokenKind::Outer),
    ("OVER", TokenKind::Over),
    ("OVERLAPS", TokenKind::Overlaps),
    ("OVERWRITE", TokenKind::Overwrite),
    ("PARTITION", TokenKind::Partition),
    ("PARTITION BY", TokenKind::PartitionBy),
    ("PARTITIONED BY", TokenKind::PartitionBy),
    ("PARTITIONED_BY", TokenKind::PartitionBy),
    ("PERCENT", TokenKind::Percent),
    ("PIVOT", TokenKind::Pivot),
    ("PRAGMA", TokenKind::Pragma),
    ("PRIMARY KEY", TokenKind::PrimaryKey),
    ("PROCEDURE", TokenKind::Procedure),
    ("QUALIFY", TokenKind::Qualify),
    ("RANGE", TokenKind::Range),
    ("RECURSIVE", TokenKind::Recursive),
    ("REFERENCES", TokenKind::References),
    ("REGEXP", TokenKind::RLike),
    ("RENAME", TokenKind::Rename),
    ("REPLACE", TokenKind::Replace),
    ("RETURNING", TokenKind::Returning),
    ("REVOKE", TokenKind::Revoke),
    ("RIGHT", TokenKind::Right),
    ("RLIKE", TokenKind::RLike),
    ("ROLLBACK", TokenKind::Rollback),
    ("ROLLUP", TokenKind::Rollup),
    ("ROW", TokenKind::Row),
    ("ROWS", TokenKind::Rows),
    ("SCHEMA", TokenKind::Schema),
    ("SELECT", TokenKind::Select),
    ("SEMI", TokenKind::Semi),
    ("SESSION", TokenKind::Session),
    ("SESSION_USER", TokenKind::SessionUser),
    ("SET", TokenKind::Set),
    ("SETTINGS", TokenKind::Settings),
    ("SHOW", TokenKind::Show),
    ("SIMILAR TO", TokenKind::SimilarTo),
    ("SOME", TokenKind::Some),
    ("SORT BY", TokenKind::SortBy),
    ("START WITH", TokenKind::StartWith),
    ("STRAIGHT_JOIN", TokenKind::StraightJoin),
    ("TABLE", TokenKind::Table),
    ("TABLESAMPLE", TokenKind::TableSample),
    ("TEMP", TokenKind::Temporary),
    ("TEMPORARY", TokenKind::Temporary),
    ("THEN", TokenKind::Then),
    ("TRIGGER", TokenKind::Trigger),
    ("TRUE", TokenKind::True),
    ("TRUNCATE", TokenKind::Truncate),
    ("UNCACHE", TokenKind::Uncache),
    ("UNION", TokenKind::Union),
    ("UNIQUE", TokenKind::Unique),
    ("UNKNOWN", TokenKind::Unknown),
    ("UNNEST", TokenKind::Unnest),
    ("UNPIVOT", TokenKind::Unpivot),
    ("UPDATE", TokenKind::Update),
    ("USE", TokenKind::Use),
    ("USING", TokenKind::Using),
    ("VALUES", TokenKind::Values),
    ("VIEW", TokenKind::View),
    ("VOLATILE", TokenKind::Volatile),
    ("WHEN", TokenKind::When),
    ("WHERE", TokenKind::Where),
    ("WINDOW", TokenKind::Window),
    ("WITH", TokenKind::With),
    ("XOR", TokenKind::Xor),
    // type names
    ("ARRAY", TokenKind::Array),
    ("BIGDECIMAL", TokenKind::BigDecimal),
    ("BIGINT", TokenKind::BigInt),
    ("BIGNUMERIC", TokenKind::BigDecimal),
    ("BINARY", TokenKind::Binary),
    ("BIT", TokenKind::Bit),
    ("BLOB", TokenKind::VarBinary),
    ("BOOL", TokenKind::Boolean),
    ("BOOLEAN", TokenKind::Boolean),
    ("BPCHAR", TokenKind::Char),
    ("BYTEA", TokenKind::VarBinary),
    ("CHAR", TokenKind::Char),
    ("CHAR VARYING", TokenKind::Varchar),
    ("CHARACTER", TokenKind::Char),
    ("CHARACTER VARYING", TokenKind::Varchar),
    ("CLOB", TokenKind::Text),
    ("DATE", TokenKind::Date),
    ("DATETIME", TokenKind::Datetime),
    ("DEC", TokenKind::Decimal),
    ("DECIMAL", TokenKind::Decimal),
    ("DOUBLE", TokenKind::Double),
    ("DOUBLE PRECISION", TokenKind::Double),
    ("ENUM", TokenKind::Enum),
    ("FIXED", TokenKind::Decimal),
    ("FLOAT", TokenKind::Float),
    ("FLOAT4", TokenKind::Float),
    ("FLOAT8", TokenKind::Double),
    ("GEOGRAPHY", TokenKind::Geography),
    ("GEOMETRY", TokenKind::Geometry),
    ("HUGEINT", TokenKind::Int128),
    ("INET", TokenKind::Inet),
    ("INT", TokenKind::Int),
    ("INT1", TokenKind::TinyInt),
    ("INT128", TokenKind::Int128),
    ("INT16", TokenKind::SmallInt),
    ("INT2", TokenKind::SmallInt),
    ("INT32", TokenKind::Int),
    ("INT4", TokenKind::Int),
    ("INT64", TokenKind::BigInt),
    ("INTEGER", TokenKind::Int),
    ("JSON", TokenKind::Json),
    ("JSONB", TokenKind::JsonB),
    ("LIST", TokenKind::List),
    ("LONG", TokenKind::BigInt),
    ("LONGTEXT", TokenKind::LongText),
    ("LONGVARCHAR", TokenKind::Text),
    ("MAP", TokenKind::Map),
    ("MEDIUMINT", TokenKind::MediumInt),
    ("MEDIUMTEXT", TokenKind::MediumText),
    ("NCHAR", TokenKind::NChar),
    ("NULLABLE", TokenKind::Nullable),
    ("NUMBER", TokenKind::Decimal),
    ("NUMERIC", TokenKind::Decimal),
    ("NVARCHAR", TokenKind::NVarchar),
    ("NVARCHAR2", TokenKind::NVarchar),
    ("OBJECT", TokenKind::Object),
    ("REAL", TokenKind::Float),
    ("SEQUENCE", TokenKind::Sequence),
    ("SHORT", TokenKind::SmallInt),
    ("SMALLINT", TokenKind::SmallInt),
    ("STR", TokenKind::Text),
    ("STRING", TokenKind::Text),
    ("STRUCT", TokenKind::Struct),
    ("TEXT", TokenKind::Text),
    ("TIME", TokenKind::Time),
    ("TIMESTAMP", TokenKind::Timestamp),
    ("TIMESTAMPLTZ", TokenKind::TimestampLtz),
    ("TIMESTAMPNTZ", TokenKind::TimestampNtz),
    ("TIMESTAMPTZ", TokenKind::TimestampTz),
    ("TIMESTAMP_LTZ", TokenKind::TimestampLtz),
    ("TIMESTAMP_NTZ", TokenKind::TimestampNtz),
    ("TIMETZ", TokenKind::TimeTz),
    ("TINYINT", TokenKind::TinyInt),
    ("TINYTEXT", TokenKind::TinyText),
    ("UINT", TokenKind::UInt),
    ("UINT128", TokenKind::UInt128),
    ("USER-DEFINED", TokenKind::UserDefined),
    ("UUID", TokenKind::Uuid),
    ("VARBINARY", TokenKind::VarBinary),
    ("VARCHAR", TokenKind::Varchar),
    ("VARCHAR2", TokenKind::Varchar),
    ("VARIANT", TokenKind::Variant),
    ("VECTOR", TokenKind::Vector),
    // commands
    ("CALL", TokenKind::Command),
    ("COMMENT", TokenKind::Comment),
    ("EXPLAIN", TokenKind::Command),
    ("OPTIMIZE", TokenKind::Command),
    ("PREPARE", TokenKind::Command),
    ("VACUUM", TokenKind::Command),
];

/// Compiled, immutable lexing rules for one dialect.
#[derive(Debug)]
pub struct DialectRules {
    pub(crate) single_tokens: HashMap<char, TokenKind>,
    pub(crate) keywords: HashMap<String, TokenKind>,
    pub(crate) quotes: HashMap<String, String>,
    pub(crate) format_strings: HashMap<String, (String, TokenKind)>,
    pub(crate) identifiers: HashMap<char, char>,
    pub(crate) comments: HashMap<String, Option<String>>,
    pub(crate) string_escapes: HashSet<char>,
    pub(crate) byte_string_escapes: HashSet<char>,
    pub(crate) identifier_escapes: HashSet<char>,
    pub(crate) escape_follow_chars: HashSet<char>,
    pub(crate) commands: HashSet<TokenKind>,
    pub(crate) command_prefix_tokens: HashSet<TokenKind>,
    pub(crate) nested_comments: bool,
    pub(crate) hint_start: String,
    pub(crate) tokens_preceding_hint: HashSet<TokenKind>,
    pub(crate) has_bit_strings: bool,
    pub(crate) has_hex_strings: bool,
    pub(crate) numeric_literals: HashMap<String, String>,
    pub(crate) var_single_tokens: HashSet<char>,
    pub(crate) string_escapes_allowed_in_raw_strings: bool,
    pub(crate) heredoc_tag_is_identifier: bool,
    pub(crate) heredoc_string_alternative: TokenKind,
    pub(crate) keyword_trie: Trie,
    // Single-character quote openers; a doubled opener inside a string is an
    // escape only when both characters match.
    pub(crate) quote_start_chars: HashSet<char>,
    pub(crate) numbers_can_be_underscore_separated: bool,
    pub(crate) identifiers_can_start_with_digit: bool,
    pub(crate) unescaped_sequences: HashMap<String, String>,
}

impl DialectRules {
    #[must_use]
    pub fn builder() -> DialectBuilder {
        DialectBuilder::default()
    }

    /// Rules for the ANSI-flavored base dialect.
    #[must_use]
    pub fn ansi() -> DialectRules {
        DialectRules::builder().build()
    }
}

fn pairs(values: &[(&str, &str)]) -> Vec<(String, String)> {
    values
        .iter()
        .map(|(a, b)| ((*a).to_string(), (*b).to_string()))
        .collect()
}

/// Configurable construction of [`DialectRules`]. Defaults match the base
/// dialect: `'...'` strings, `"..."` identifiers, `--` and `/* */` comments,
/// `''` escaping inside strings, `/*+` hints after DML keywords.
#[derive(Debug, Clone)]
pub struct DialectBuilder {
    quotes: Vec<(String, String)>,
    identifiers: Vec<(String, String)>,
    bit_strings: Vec<(String, String)>,
    byte_strings: Vec<(String, String)>,
    hex_strings: Vec<(String, String)>,
    raw_strings: Vec<(String, String)>,
    heredoc_strings: Vec<(String, String)>,
    unicode_strings: Vec<(String, String)>,
    string_escapes: Vec<char>,
    byte_string_escapes: Option<Vec<char>>,
    identifier_escapes: Vec<char>,
    escape_follow_chars: Vec<char>,
    var_single_tokens: Vec<char>,
    comments: Vec<(String, Option<String>)>,
    nested_comments: bool,
    hint_start: String,
    tokens_preceding_hint: Vec<TokenKind>,
    commands: Vec<TokenKind>,
    command_prefix_tokens: Vec<TokenKind>,
    numeric_literals: Vec<(String, String)>,
    heredoc_tag_is_identifier: bool,
    heredoc_string_alternative: TokenKind,
    string_escapes_allowed_in_raw_strings: bool,
    numbers_can_be_underscore_separated: bool,
    identifiers_can_start_with_digit: bool,
    unescaped_sequences: Vec<(String, String)>,
    extra_keywords: Vec<(String, TokenKind)>,
    extra_single_tokens: Vec<(char, TokenKind)>,
}

impl Default for DialectBuilder {
    fn default() -> Self {
        DialectBuilder {
            quotes: pairs(&[("'", "'")]),
            identifiers: pairs(&[("\"", "\"")]),
            bit_strings: Vec::new(),
            byte_strings: Vec::new(),
            hex_strings: Vec::new(),
            raw_strings: Vec::new(),
            heredoc_strings: Vec::new(),
            unicode_strings: Vec::new(),
            string_escapes: vec!['\''],
            byte_string_escapes: None,
            identifier_escapes: Vec::new(),
            escape_follow_chars: Vec::new(),
            var_single_tokens: Vec::new(),
            comments: vec![
                ("--".to_string(), None),
                ("/*".to_string(), Some("*/".to_string())),
            ],
            nested_comments: true,
            hint_start: "/*+".to_string(),
            tokens_preceding_hint: vec![
                TokenKind::Select,
                TokenKind::Insert,
                TokenKind::Update,
                TokenKind::Delete,
            ],
            commands: vec![
                TokenKind::Command,
                TokenKind::Execute,
                TokenKind::Fetch,
                TokenKind::Show,
                TokenKind::Rename,
            ],
            command_prefix_tokens: vec![TokenKind::Semicolon, TokenKind::Begin],
            numeric_literals: Vec::new(),
            heredoc_tag_is_identifier: false,
            heredoc_string_alternative: TokenKind::Var,
            string_escapes_allowed_in_raw_strings: true,
            numbers_can_be_underscore_separated: false,
            identifiers_can_start_with_digit: false,
            unescaped_sequences: Vec::new(),
            extra_keywords: Vec::new(),
            extra_single_tokens: Vec::new(),
        }
    }
}

impl DialectBuilder {
    #[must_use]
    pub fn quotes(mut self, values: &[(&str, &str)]) -> Self {
        self.quotes = pairs(values);
        self
    }

    #[must_use]
    pub fn identifiers(mut self, values: &[(&str, &str)]) -> Self {
        self.identifiers = pairs(values);
        self
    }

    #[must_use]
    pub fn bit_strings(mut self, values: &[(&str, &str)]) -> Self {
        self.bit_strings = pairs(values);
        self
    }

    #[must_use]
    pub fn byte_strings(mut self, values: &[(&str, &str)]) -> Self {
        self.byte_strings = pairs(values);
        self
    }

    #[must_use]
    pub fn hex_strings(mut self, values: &[(&str, &str)]) -> Self {
        self.hex_strings = pairs(values);
        self
    }

    #[must_use]
    pub fn raw_strings(mut self, values: &[(&str, &str)]) -> Self {
        self.raw_strings = pairs(values);
        self
    }

    #[must_use]
    pub fn heredoc_strings(mut self, values: &[(&str, &str)]) -> Self {
        self.heredoc_strings = pairs(values);
        self
    }

    #[must_use]
    pub fn unicode_strings(mut self, values: &[(&str, &str)]) -> Self {
        self.unicode_strings = pairs(values);
        self
    }

    #[must_use]
    pub fn string_escapes(mut self, values: &[char]) -> Self {
        self.string_escapes = values.to_vec();
        self
    }

    /// Defaults to the string escape set when not configured.
    #[must_use]
    pub fn byte_string_escapes(mut self, values: &[char]) -> Self {
        self.byte_string_escapes = Some(values.to_vec());
        self
    }

    #[must_use]
    pub fn identifier_escapes(mut self, values: &[char]) -> Self {
        self.identifier_escapes = values.to_vec();
        self
    }

    /// When non-empty, `\` only escapes characters *not* in this set.
    #[must_use]
    pub fn escape_follow_chars(mut self, values: &[char]) -> Self {
        self.escape_follow_chars = values.to_vec();
        self
    }

    /// Single-token characters allowed inside free-form vars.
    #[must_use]
    pub fn var_single_tokens(mut self, values: &[char]) -> Self {
        self.var_single_tokens = values.to_vec();
        self
    }

    /// Comment markers; `None` end means line comment.
    #[must_use]
    pub fn comments(mut self, values: &[(&str, Option<&str>)]) -> Self {
        self.comments = values
            .iter()
            .map(|(s, e)| ((*s).to_string(), e.map(str::to_string)))
            .collect();
        self
    }

    #[must_use]
    pub fn nested_comments(mut self, value: bool) -> Self {
        self.nested_comments = value;
        self
    }

    /// Suffix-to-keyword table for numeric literals, e.g. `L` -> `BIGINT`.
    #[must_use]
    pub fn numeric_literals(mut self, values: &[(&str, &str)]) -> Self {
        self.numeric_literals = pairs(values);
        self
    }

    #[must_use]
    pub fn heredoc_tag_is_identifier(mut self, value: bool) -> Self {
        self.heredoc_tag_is_identifier = value;
        self
    }

    #[must_use]
    pub fn heredoc_string_alternative(mut self, value: TokenKind) -> Self {
        self.heredoc_string_alternative = value;
        self
    }

    #[must_use]
    pub fn string_escapes_allowed_in_raw_strings(mut self, value: bool) -> Self {
        self.string_escapes_allowed_in_raw_strings = value;
        self
    }

    #[must_use]
    pub fn numbers_can_be_underscore_separated(mut self, value: bool) -> Self {
        self.numbers_can_be_underscore_separated = value;
        self
    }

    #[must_use]
    pub fn identifiers_can_start_with_digit(mut self, value: bool) -> Self {
        self.identifiers_can_start_with_digit = value;
        self
    }

    /// Two-character sequences substituted inside non-raw strings, e.g.
    /// `\n` -> newline.
    #[must_use]
    pub fn unescaped_sequences(mut self, values: &[(&str, &str)]) -> Self {
        self.unescaped_sequences = pairs(values);
        self
    }

    #[must_use]
    pub fn keyword(mut self, text: &str, kind: TokenKind) -> Self {
        self.extra_keywords.push((text.to_string(), kind));
        self
    }

    #[must_use]
    pub fn single_token(mut self, ch: char, kind: TokenKind) -> Self {
        self.extra_single_tokens.push((ch, kind));
        self
    }

    /// Compiles the configuration into immutable rules, deriving the
    /// format-string table, the comment map and the keyword trie.
    #[must_use]
    pub fn build(self) -> DialectRules {
        let mut single_tokens: HashMap<char, TokenKind> = SINGLE_TOKENS.iter().copied().collect();
        single_tokens.extend(self.extra_single_tokens);

        let mut keywords: HashMap<String, TokenKind> = KEYWORDS
            .iter()
            .map(|(k, v)| ((*k).to_string(), *v))
            .collect();
        // Templating block markers, with whitespace-control variants.
        for marker in ["{%", "{%+", "{%-", "{{+", "{{-"] {
            keywords.insert(marker.to_string(), TokenKind::BlockStart);
        }
        for marker in ["%}", "+%}", "-%}", "+}}", "-}}"] {
            keywords.insert(marker.to_string(), TokenKind::BlockEnd);
        }
        keywords.insert(self.hint_start.clone(), TokenKind::Hint);
        keywords.extend(self.extra_keywords);

        let quotes: HashMap<String, String> = self.quotes.iter().cloned().collect();

        let mut format_strings: HashMap<String, (String, TokenKind)> = HashMap::new();
        for (start, end) in &quotes {
            for prefix in ["n", "N"] {
                format_strings.insert(
                    format!("{prefix}{start}"),
                    (end.clone(), TokenKind::NationalString),
                );
            }
        }
        let format_classes = [
            (&self.bit_strings, TokenKind::BitString),
            (&self.byte_strings, TokenKind::ByteString),
            (&self.hex_strings, TokenKind::HexString),
            (&self.raw_strings, TokenKind::RawString),
            (&self.heredoc_strings, TokenKind::HeredocString),
            (&self.unicode_strings, TokenKind::UnicodeString),
        ];
        for (table, kind) in format_classes {
            for (start, end) in table {
                format_strings.insert(start.clone(), (end.clone(), kind));
            }
        }

        let mut comments: HashMap<String, Option<String>> = self.comments.into_iter().collect();
        // Jinja comments tokenize correctly in every dialect.
        comments.insert("{#".to_string(), Some("#}".to_string()));
        if keywords.contains_key(&self.hint_start) {
            comments.insert(self.hint_start.clone(), Some("*/".to_string()));
        }

        let trie_keys: Vec<String> = keywords
            .keys()
            .chain(comments.keys())
            .chain(quotes.keys())
            .chain(format_strings.keys())
            .filter(|key| {
                key.contains(' ') || key.chars().any(|c| single_tokens.contains_key(&c))
            })
            .map(|key| key.to_uppercase())
            .collect();
        let keyword_trie = Trie::from_keys(trie_keys);

        let identifiers: HashMap<char, char> = self
            .identifiers
            .iter()
            .filter_map(|(start, end)| Some((start.chars().next()?, end.chars().next()?)))
            .collect();

        let quote_start_chars: HashSet<char> = quotes
            .keys()
            .filter_map(|k| {
                let mut chars = k.chars();
                let first = chars.next()?;
                chars.next().is_none().then_some(first)
            })
            .collect();

        let string_escapes: HashSet<char> = self.string_escapes.iter().copied().collect();
        let byte_string_escapes: HashSet<char> = self
            .byte_string_escapes
            .map_or_else(|| string_escapes.clone(), |v| v.into_iter().collect());

        DialectRules {
            single_tokens,
            keywords,
            has_bit_strings: !self.bit_strings.is_empty(),
            has_hex_strings: !self.hex_strings.is_empty(),
            quotes,
            format_strings,
            identifiers,
            comments,
            string_escapes,
            byte_string_escapes,
            identifier_escapes: self.identifier_escapes.into_iter().collect(),
            escape_follow_chars: self.escape_follow_chars.into_iter().collect(),
            commands: self.commands.into_iter().collect(),
            command_prefix_tokens: self.command_prefix_tokens.into_iter().collect(),
            nested_comments: self.nested_comments,
            hint_start: self.hint_start,
            tokens_preceding_hint: self.tokens_preceding_hint.into_iter().collect(),
            numeric_literals: self
                .numeric_literals
                .into_iter()
                .map(|(k, v)| (k.to_uppercase(), v))
                .collect(),
            var_single_tokens: self.var_single_tokens.into_iter().collect(),
            string_escapes_allowed_in_raw_strings: self.string_escapes_allowed_in_raw_strings,
            heredoc_tag_is_identifier: self.heredoc_tag_is_identifier,
            heredoc_string_alternative: self.heredoc_string_alternative,
            keyword_trie,
            quote_start_chars,
            numbers_can_be_underscore_separated: self.numbers_can_be_underscore_separated,
            identifiers_can_start_with_digit: self.identifiers_can_start_with_digit,
            unescaped_sequences: self.unescaped_sequences.into_iter().collect(),
        }
    }
}
