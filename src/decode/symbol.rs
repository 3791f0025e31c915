//! Decoded symbol values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Symbology of a decoded value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolFormat {
    /// QR Code.
    QrCode,
    /// Code 39.
    Code39,
    /// Code 93.
    Code93,
    /// Code 128.
    Code128,
    /// EAN-13.
    Ean13,
    /// EAN-8.
    Ean8,
    /// UPC-A.
    UpcA,
    /// UPC-E.
    UpcE,
    /// A format reported by a backend that has no dedicated variant.
    Other(String),
}

impl SymbolFormat {
    /// Parses the identifiers barcode detectors commonly report
    /// (`qr_code`, `ean_13`, `code_128`, ...).
    pub fn from_label(label: &str) -> Self {
        let normalized: String = label
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "qr" | "qrcode" => Self::QrCode,
            "code39" => Self::Code39,
            "code93" => Self::Code93,
            "code128" => Self::Code128,
            "ean13" => Self::Ean13,
            "ean8" => Self::Ean8,
            "upca" => Self::UpcA,
            "upce" => Self::UpcE,
            _ => Self::Other(label.to_string()),
        }
    }
}

impl fmt::Display for SymbolFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::QrCode => "qr_code",
            Self::Code39 => "code_39",
            Self::Code93 => "code_93",
            Self::Code128 => "code_128",
            Self::Ean13 => "ean_13",
            Self::Ean8 => "ean_8",
            Self::UpcA => "upc_a",
            Self::UpcE => "upc_e",
            Self::Other(name) => name,
        };
        f.write_str(label)
    }
}

/// One raw decode result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Decoded payload.
    pub value: String,
    /// Symbology the payload was read from.
    pub format: SymbolFormat,
}

impl Symbol {
    /// Creates a symbol.
    pub fn new(value: impl Into<String>, format: SymbolFormat) -> Self {
        Self {
            value: value.into(),
            format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label_accepts_detector_names() {
        assert_eq!(SymbolFormat::from_label("qr_code"), SymbolFormat::QrCode);
        assert_eq!(SymbolFormat::from_label("EAN-13"), SymbolFormat::Ean13);
        assert_eq!(SymbolFormat::from_label("code_128"), SymbolFormat::Code128);
        assert_eq!(
            SymbolFormat::from_label("aztec"),
            SymbolFormat::Other("aztec".into())
        );
    }

    #[test]
    fn test_display_matches_detector_names() {
        assert_eq!(SymbolFormat::UpcA.to_string(), "upc_a");
        assert_eq!(SymbolFormat::from_label(&SymbolFormat::Code93.to_string()), SymbolFormat::Code93);
    }
}
