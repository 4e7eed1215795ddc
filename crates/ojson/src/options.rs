use core::fmt;
use std::sync::OnceLock;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default nesting limit for both dumping and parsing.
pub const MAX_DEPTH: usize = 1000;

/// A named bundle of encoding and decoding policy.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Plain JSON only; anything else is an error.
    Strict,
    /// Plain JSON only; anything else becomes `null`.
    Null,
    /// Type-preserving output with `^`-prefixed tags.
    #[default]
    Object,
    /// Compatible with the classic JSON gem behaviour.
    Compat,
    /// Schema-free output of objects as field maps.
    Custom,
    /// Rails-flavoured output.
    Rails,
    /// Web Application Bridge: a small, strictly typed subset.
    Wab,
}

impl Mode {
    /// The lowercase name of the mode.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Null => "null",
            Self::Object => "object",
            Self::Compat => "compat",
            Self::Custom => "custom",
            Self::Rails => "rails",
            Self::Wab => "wab",
        }
    }

    /// The escape table used when [`Options::escape_mode`] is unset.
    #[must_use]
    pub fn default_escape(self) -> EscapeMode {
        match self {
            Self::Rails => EscapeMode::Rails,
            _ => EscapeMode::Json,
        }
    }

    /// The class tag key used when [`Options::class_tag_key`] is unset.
    #[must_use]
    pub fn default_class_tag(self) -> &'static str {
        match self {
            Self::Object => "^o",
            _ => "json_class",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which bytes of a string are escaped on output.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EscapeMode {
    /// Standard JSON: control characters, `"` and `\`.
    #[default]
    Json,
    /// Standard JSON, but newlines pass through unescaped.
    Newline,
    /// Everything at or above 0x7F is written as `\uXXXX`.
    Ascii,
    /// ASCII plus `&`, `<`, `>` and `/`.
    Xss,
    /// Standard JSON plus `&`, `<`, `>` and U+2028/U+2029.
    JsonXss,
    /// The Rails default, identical to [`JsonXss`](Self::JsonXss).
    Rails,
}

/// Output format for time values.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TimeFormat {
    /// `1325775487.123456789`
    #[default]
    Unix,
    /// `1325775487.123456789e32400`, the exponent being the UTC offset in
    /// seconds (`86400` marks UTC).
    UnixZone,
    /// `2012-01-05T23:58:07.123456789+09:00`
    Xml,
    /// `2012-01-05 23:58:07 +0900`
    Ruby,
}

/// What to emit for `NaN` and the infinities.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NanPolicy {
    /// Fail with [`Error::Nan`](crate::Error::Nan).
    Raise,
    /// Emit `null`.
    Null,
    /// Emit `NaN`, `Infinity` or `-Infinity` (not standard JSON).
    Word,
    /// Emit an absurdly large literal that the parser maps back.
    Huge,
    /// Pick per mode.
    #[default]
    Auto,
}

impl NanPolicy {
    /// Resolves [`NanPolicy::Auto`] for `mode`.
    #[must_use]
    pub fn resolve(self, mode: Mode) -> Self {
        match (self, mode) {
            (Self::Auto, Mode::Strict | Mode::Wab) => Self::Raise,
            (Self::Auto, Mode::Null | Mode::Custom | Mode::Rails) => Self::Null,
            (Self::Auto, Mode::Compat) => Self::Word,
            (Self::Auto, Mode::Object) => Self::Huge,
            (policy, _) => policy,
        }
    }
}

/// How non-integer numbers are materialized when parsing.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DecimalLoad {
    /// Floats, unless more than 15 significant digits are present, in which
    /// case the exact text is kept as a [`Decimal`](crate::Decimal).
    #[default]
    Auto,
    /// Always floats.
    Float,
    /// Always [`Decimal`](crate::Decimal).
    BigDecimal,
}

/// Separator and newline strings, overriding the plain integer indent.
///
/// With the default (all empty) output is compact. Each open container
/// writes its newline string followed by `indent` repeated once per level
/// before every element and before its closing bracket.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    /// Indentation for one nesting level.
    pub indent: String,
    /// Written between an object key and the colon.
    pub before_colon: String,
    /// Written between the colon and the value.
    pub after_colon: String,
    /// Newline string for objects.
    pub object_nl: String,
    /// Newline string for arrays.
    pub array_nl: String,
}

/// Options shared by every dump and parse entry point.
///
/// # Default
///
/// The defaults reproduce the classic engine: object mode, compact output,
/// no circular tracking.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// The dump/parse mode.
    ///
    /// # Default
    ///
    /// [`Mode::Object`]
    pub mode: Mode,

    /// Spaces per nesting level. When non-zero every element starts on a
    /// new line and a newline follows the closing bracket of the document.
    ///
    /// # Default
    ///
    /// `0`
    pub indent: usize,

    /// Explicit separators, taking precedence over `indent`.
    ///
    /// # Default
    ///
    /// `None`
    pub layout: Option<Layout>,

    /// Detect repeated composite values and emit back-references instead of
    /// recursing. Without it a cyclic value recurses until the depth guard
    /// trips.
    ///
    /// # Default
    ///
    /// `false`
    pub circular: bool,

    /// String escaping. `None` picks [`Mode::default_escape`].
    ///
    /// # Default
    ///
    /// `None`
    pub escape_mode: Option<EscapeMode>,

    /// Significant digits for floats; `0` uses the shortest round-trip
    /// representation.
    ///
    /// # Default
    ///
    /// `16`
    pub float_precision: u8,

    /// Fractional second digits for times, `0..=9`.
    ///
    /// # Default
    ///
    /// `9`
    pub sec_precision: u8,

    /// Time format for modes that honour it.
    ///
    /// # Default
    ///
    /// [`TimeFormat::Unix`]
    pub time_format: TimeFormat,

    /// Handling of non-finite floats.
    ///
    /// # Default
    ///
    /// [`NanPolicy::Auto`]
    pub nan_policy: NanPolicy,

    /// Skip object fields and map entries whose value is `null`.
    ///
    /// # Default
    ///
    /// `false`
    pub omit_nil_fields: bool,

    /// Key naming the type of a tagged object. `None` picks
    /// [`Mode::default_class_tag`].
    ///
    /// # Default
    ///
    /// `None`
    pub class_tag_key: Option<String>,

    /// Maximum nesting depth for dumping and parsing.
    ///
    /// # Default
    ///
    /// [`MAX_DEPTH`] (1000)
    pub max_depth: usize,

    /// Dump tagged objects in compat and custom modes, and reconstruct them
    /// when parsing.
    ///
    /// # Default
    ///
    /// `false`
    pub create_additions: bool,

    /// Accept `NaN`, `Infinity` and `-Infinity` when parsing.
    ///
    /// # Default
    ///
    /// `true`
    pub allow_nan: bool,

    /// Materialization of non-integer numbers when parsing.
    ///
    /// # Default
    ///
    /// [`DecimalLoad::Auto`]
    pub decimal_load: DecimalLoad,

    /// Produce symbol keys when parsing.
    ///
    /// # Default
    ///
    /// `false`
    pub symbol_keys: bool,

    /// Replace unpaired surrogate escapes with U+FFFD instead of failing.
    ///
    /// # Default
    ///
    /// `false`
    pub allow_invalid_unicode: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            indent: 0,
            layout: None,
            circular: false,
            escape_mode: None,
            float_precision: 16,
            sec_precision: 9,
            time_format: TimeFormat::default(),
            nan_policy: NanPolicy::default(),
            omit_nil_fields: false,
            class_tag_key: None,
            max_depth: MAX_DEPTH,
            create_additions: false,
            allow_nan: true,
            decimal_load: DecimalLoad::default(),
            symbol_keys: false,
            allow_invalid_unicode: false,
        }
    }
}

impl Options {
    /// Default options with `mode` set.
    #[must_use]
    pub fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// The escape table in effect.
    #[must_use]
    pub fn effective_escape(&self) -> EscapeMode {
        self.escape_mode.unwrap_or(self.mode.default_escape())
    }

    /// The class tag key in effect.
    #[must_use]
    pub fn effective_class_tag(&self) -> &str {
        self.class_tag_key
            .as_deref()
            .unwrap_or(self.mode.default_class_tag())
    }

    /// The NaN policy in effect.
    #[must_use]
    pub fn effective_nan_policy(&self) -> NanPolicy {
        self.nan_policy.resolve(self.mode)
    }
}

static DEFAULT_OPTIONS: OnceLock<Options> = OnceLock::new();

/// Installs the process-wide default options.
///
/// May succeed at most once, and should happen before the first call to
/// [`default_options`]; afterwards the defaults are frozen and the rejected
/// value is handed back.
///
/// # Errors
///
/// Returns `options` unchanged if defaults were already installed or read.
pub fn set_default_options(options: Options) -> Result<(), Options> {
    DEFAULT_OPTIONS.set(options)
}

/// The process-wide default options.
///
/// The first call freezes the defaults: if nothing was installed by
/// [`set_default_options`], [`Options::default`] is used from then on.
pub fn default_options() -> &'static Options {
    DEFAULT_OPTIONS.get_or_init(Options::default)
}
