use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("section truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("bad section magic: expected 0x{expected:08x}, got 0x{found:08x}")]
    BadMagic { expected: u32, found: u32 },

    #[error("unsupported section version {0}")]
    UnsupportedVersion(u16),

    #[error("checksum mismatch: stored 0x{stored:016x}, computed 0x{computed:016x}")]
    ChecksumMismatch { stored: u64, computed: u64 },

    #[error("invalid {field} value {value}")]
    InvalidValue { field: &'static str, value: u32 },

    #[error("{0} trailing bytes after section body")]
    TrailingBytes(usize),
}
