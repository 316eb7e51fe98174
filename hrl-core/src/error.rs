use std::path::PathBuf;
use thiserror::Error;

pub type HrlResult<T> = Result<T, HrlError>;

/// Everything that can go wrong while running a session.
#[derive(Debug, Error)]
pub enum HrlError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A raw button code the active key map has no label for.
    #[error("unknown button code {0}")]
    UnknownButtonCode(u32),

    #[error("unknown key label '{0}'")]
    UnknownKey(String),

    /// A result path was configured without the column list to go with it.
    #[error("a result file was requested but no result headers were given")]
    MissingResultHeaders,

    #[error("invalid column name '{0}': names must be non-empty and contain no whitespace")]
    InvalidHeader(String),

    #[error("column '{0}' is declared twice")]
    DuplicateHeader(String),

    #[error("{} was written with columns [{}], expected [{}]", path.display(), found.join(" "), expected.join(" "))]
    HeaderMismatch {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("result row is missing column '{0}'")]
    MissingColumn(String),

    #[error("result row has column '{0}' which is not in the header")]
    UnexpectedColumn(String),

    #[error("value '{value}' for column '{column}' must be a single non-empty token")]
    InvalidValue { column: String, value: String },

    #[error("{} line {line}: expected {expected} fields, found {found}", path.display())]
    RowWidth {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("{} has no header line", .0.display())]
    EmptyMatrix(PathBuf),

    /// The result file records more trials than the design file holds.
    #[error("cannot resume at trial {completed}: the design only has {available} rows")]
    ResumeBeyondDesign { completed: usize, available: usize },

    #[error("{} line {line}: '{value}' is not a number", path.display())]
    NotANumber {
        path: PathBuf,
        line: usize,
        value: String,
    },

    #[error("lookup table: {0}")]
    InvalidLut(String),

    #[error("luminance {0} is outside [0, 1]")]
    LuminanceOutOfRange(f32),

    #[error("pixel ({x}, {y}) is outside the {width}x{height} canvas")]
    PixelOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    /// A device did not answer a command before its read timeout.
    #[error("no reply to '{0}' before the read timeout")]
    Timeout(String),

    #[error("photometer reported: {0}")]
    Photometer(String),

    /// A fault reported by a vendor backend, passed through as-is.
    #[error("device error: {0}")]
    Device(String),

    #[error("config: {0}")]
    Config(String),

    #[error("session is closed")]
    Closed,
}
