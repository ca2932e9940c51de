//! The `restrictions` section: feature-to-feature turn rules.
//!
//! ```text
//! magic "RSTR", version, reserved
//! restriction count u32
//!   kind u8 (0: no, 1: only), reserved [u8; 3], from u32, to u32
//! crc64 u64
//! ```

use bytes::{BufMut, Bytes};
use strum::{Display, EnumString};

use crate::section::{begin, open, seal};
use crate::{CodecError, FeatureId};

pub const MAGIC: u32 = u32::from_le_bytes(*b"RSTR");

const RECORD_SIZE: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum RestrictionKind {
    /// Travelling from the first feature onto the second is forbidden.
    No = 0,
    /// The second feature is the only permitted continuation of the first.
    Only = 1,
}

impl TryFrom<u8> for RestrictionKind {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RestrictionKind::No),
            1 => Ok(RestrictionKind::Only),
            other => Err(CodecError::InvalidValue {
                field: "restriction kind",
                value: other as u32,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Restriction {
    pub kind: RestrictionKind,
    pub from: FeatureId,
    pub to: FeatureId,
}

impl Restriction {
    pub const fn no(from: FeatureId, to: FeatureId) -> Self {
        Restriction {
            kind: RestrictionKind::No,
            from,
            to,
        }
    }

    pub const fn only(from: FeatureId, to: FeatureId) -> Self {
        Restriction {
            kind: RestrictionKind::Only,
            from,
            to,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestrictionSection {
    pub restrictions: Vec<Restriction>,
}

impl RestrictionSection {
    pub fn new(restrictions: Vec<Restriction>) -> Self {
        RestrictionSection { restrictions }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = begin(MAGIC, 4 + self.restrictions.len() * RECORD_SIZE);

        buf.put_u32_le(self.restrictions.len() as u32);
        for restriction in &self.restrictions {
            buf.put_u8(restriction.kind as u8);
            buf.put_bytes(0, 3);
            buf.put_u32_le(restriction.from);
            buf.put_u32_le(restriction.to);
        }

        seal(buf)
    }

    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let mut reader = open(data, MAGIC)?;

        let count = reader.count(RECORD_SIZE)?;
        let mut restrictions = Vec::with_capacity(count);
        for _ in 0..count {
            let kind = RestrictionKind::try_from(reader.u8()?)?;
            for _ in 0..3 {
                reader.u8()?;
            }

            restrictions.push(Restriction {
                kind,
                from: reader.u32()?,
                to: reader.u32()?,
            });
        }

        reader.finish()?;
        Ok(RestrictionSection { restrictions })
    }
}
