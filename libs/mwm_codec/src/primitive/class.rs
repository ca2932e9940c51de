use strum::{AsRefStr, Display, EnumString};

use crate::CodecError;

/// Functional class of a road, ordered from most to least important.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum RoadClass {
    Motorway = 0,
    MotorwayLink = 1,
    Trunk = 2,
    TrunkLink = 3,
    Primary = 4,
    PrimaryLink = 5,
    Secondary = 6,
    SecondaryLink = 7,
    Tertiary = 8,
    TertiaryLink = 9,
    Unclassified = 10,
    Residential = 11,
    LivingStreet = 12,
    Service = 13,
    Track = 14,
    Cycleway = 15,
    Footway = 16,
    Path = 17,
    Steps = 18,
}

impl RoadClass {
    pub const ALL: [RoadClass; 19] = [
        RoadClass::Motorway,
        RoadClass::MotorwayLink,
        RoadClass::Trunk,
        RoadClass::TrunkLink,
        RoadClass::Primary,
        RoadClass::PrimaryLink,
        RoadClass::Secondary,
        RoadClass::SecondaryLink,
        RoadClass::Tertiary,
        RoadClass::TertiaryLink,
        RoadClass::Unclassified,
        RoadClass::Residential,
        RoadClass::LivingStreet,
        RoadClass::Service,
        RoadClass::Track,
        RoadClass::Cycleway,
        RoadClass::Footway,
        RoadClass::Path,
        RoadClass::Steps,
    ];
}

impl TryFrom<u8> for RoadClass {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        RoadClass::ALL
            .get(value as usize)
            .copied()
            .ok_or(CodecError::InvalidValue {
                field: "road class",
                value: value as u32,
            })
    }
}
