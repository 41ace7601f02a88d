/// Error correction level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ECLevel {
    /// Low (~7% recovery capacity)
    L,
    /// Medium (~15% recovery capacity)
    M,
    /// Quartile (~25% recovery capacity)
    Q,
    /// High (~30% recovery capacity)
    H,
}

impl ECLevel {
    /// Map the two EC bits as they appear in the format information
    /// (01=L, 00=M, 11=Q, 10=H)
    pub fn from_format_bits(bits: u16) -> Option<Self> {
        match bits {
            0b01 => Some(ECLevel::L),
            0b00 => Some(ECLevel::M),
            0b11 => Some(ECLevel::Q),
            0b10 => Some(ECLevel::H),
            _ => None,
        }
    }
}

/// A successfully decoded QR payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Decoded text content
    pub content: String,
    /// Name of the backend that produced it
    pub backend: &'static str,
    /// Symbol version (1-40), when the backend reports it
    pub version: Option<u8>,
    /// Error correction level, when the backend reports it
    pub error_correction: Option<ECLevel>,
}

impl Decoded {
    /// Payload with no symbol metadata
    pub fn new(content: impl Into<String>, backend: &'static str) -> Self {
        Self {
            content: content.into(),
            backend,
            version: None,
            error_correction: None,
        }
    }
}
