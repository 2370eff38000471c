use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

static LEGACY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]{3}[0-9]{4}$").unwrap());

static MERCOSUL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{3}[0-9][A-Z][0-9]{2}$").unwrap());

pub const PLATE_LEN: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlateFormat {
    /// LLLDDDD
    Legacy,
    /// LLLDLDD
    Mercosul,
}

#[derive(Debug, Clone, PartialEq, Eq, Fail)]
pub enum PlateError {
    #[fail(display = "plate must have {} characters, got {}", _1, _0)]
    WrongLength(usize, usize),
    #[fail(display = "plate {} is neither legacy nor Mercosul", _0)]
    UnknownPattern(String),
    #[fail(display = "plate is not valid UTF-8 once decoded")]
    Encoding,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plate {
    text: String,
    format: PlateFormat,
}

/// Drops everything but ASCII letters and digits, uppercased.
pub fn clean(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

pub fn classify(cleaned: &str) -> Option<PlateFormat> {
    if LEGACY_RE.is_match(cleaned) {
        Some(PlateFormat::Legacy)
    } else if MERCOSUL_RE.is_match(cleaned) {
        Some(PlateFormat::Mercosul)
    } else {
        None
    }
}

impl Plate {
    pub fn parse(raw: &str) -> Result<Plate, PlateError> {
        let text = clean(raw);
        if text.len() != PLATE_LEN {
            return Err(PlateError::WrongLength(text.len(), PLATE_LEN));
        }
        match classify(&text) {
            Some(format) => Ok(Plate { text, format }),
            None => Err(PlateError::UnknownPattern(text)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn format(&self) -> PlateFormat {
        self.format
    }

    /// The three leading letters. Both formats start with them.
    pub fn prefix(&self) -> &str {
        &self.text[..3]
    }

    /// Human form: `ABC-1234` for legacy plates, `ABC1D23` for Mercosul.
    pub fn formatted(&self) -> String {
        match self.format {
            PlateFormat::Legacy => format!("{}-{}", &self.text[..3], &self.text[3..]),
            PlateFormat::Mercosul => self.text.clone(),
        }
    }
}

impl fmt::Display for PlateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlateFormat::Legacy => f.write_str("legacy"),
            PlateFormat::Mercosul => f.write_str("mercosul"),
        }
    }
}

impl fmt::Display for Plate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
