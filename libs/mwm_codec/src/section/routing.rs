//! The `routing` section: roads and the joints connecting them.
//!
//! ```text
//! magic "RTNG", version, reserved
//! road count u32
//!   id u32, class u8, flags u8 (bit 0: one-way), mask u8, reserved u8,
//!   max speed u16 (0: none), vertex count u32, vertices [lon i32, lat i32]
//! joint count u32
//!   road point count u32, road points [feature u32, point u32]
//! crc64 u64
//! ```
//!
//! Coordinates are stored as fixed-point degrees scaled by 1e7.

use std::collections::HashMap;

use bytes::{BufMut, Bytes, BytesMut};
use geo::Point;

use crate::section::{Reader, begin, open, seal};
use crate::{CodecError, Road, RoadClass, RoadPoint, VehicleMask};

pub const MAGIC: u32 = u32::from_le_bytes(*b"RTNG");

const COORD_SCALE: f64 = 1e7;
const FLAG_ONE_WAY: u8 = 0b0000_0001;

const ROAD_HEADER_SIZE: usize = 14;
const VERTEX_SIZE: usize = 8;
const ROAD_POINT_SIZE: usize = 8;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingSection {
    pub roads: Vec<Road>,
    /// Each joint lists the road points meeting at one location.
    pub joints: Vec<Vec<RoadPoint>>,
}

impl RoutingSection {
    pub fn new(roads: Vec<Road>, joints: Vec<Vec<RoadPoint>>) -> Self {
        RoutingSection { roads, joints }
    }

    /// Derives joints from road geometry.
    ///
    /// Vertices are grouped by their stored (fixed-point) coordinate. A group
    /// becomes a joint when it holds a road end or more than one road point.
    /// Joints are ordered by first appearance.
    pub fn from_roads(roads: Vec<Road>) -> Self {
        let mut lookup: HashMap<(i32, i32), usize> = HashMap::new();
        let mut groups: Vec<(bool, Vec<RoadPoint>)> = Vec::new();

        for road in &roads {
            let last = road.last_point();
            for (index, point) in road.points.iter().enumerate() {
                let key = (to_fixed(point.x()), to_fixed(point.y()));
                let slot = *lookup.entry(key).or_insert_with(|| {
                    groups.push((false, Vec::new()));
                    groups.len() - 1
                });

                let index = index as u32;
                let (is_end, members) = &mut groups[slot];
                *is_end |= index == 0 || index == last;
                members.push(RoadPoint::new(road.id, index));
            }
        }

        let joints = groups
            .into_iter()
            .filter(|(is_end, members)| *is_end || members.len() > 1)
            .map(|(_, members)| members)
            .collect();

        RoutingSection { roads, joints }
    }

    pub fn encode(&self) -> Bytes {
        let capacity = self
            .roads
            .iter()
            .map(|road| ROAD_HEADER_SIZE + road.points.len() * VERTEX_SIZE)
            .sum::<usize>()
            + self
                .joints
                .iter()
                .map(|joint| 4 + joint.len() * ROAD_POINT_SIZE)
                .sum::<usize>()
            + 8;

        let mut buf = begin(MAGIC, capacity);

        buf.put_u32_le(self.roads.len() as u32);
        for road in &self.roads {
            encode_road(&mut buf, road);
        }

        buf.put_u32_le(self.joints.len() as u32);
        for joint in &self.joints {
            buf.put_u32_le(joint.len() as u32);
            for road_point in joint {
                buf.put_u32_le(road_point.feature);
                buf.put_u32_le(road_point.point);
            }
        }

        seal(buf)
    }

    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let mut reader = open(data, MAGIC)?;

        let road_count = reader.count(ROAD_HEADER_SIZE)?;
        let mut roads = Vec::with_capacity(road_count);
        for _ in 0..road_count {
            roads.push(decode_road(&mut reader)?);
        }

        let joint_count = reader.count(4)?;
        let mut joints = Vec::with_capacity(joint_count);
        for _ in 0..joint_count {
            let len = reader.count(ROAD_POINT_SIZE)?;
            let mut joint = Vec::with_capacity(len);
            for _ in 0..len {
                joint.push(RoadPoint::new(reader.u32()?, reader.u32()?));
            }
            joints.push(joint);
        }

        reader.finish()?;
        Ok(RoutingSection { roads, joints })
    }
}

fn encode_road(buf: &mut BytesMut, road: &Road) {
    buf.put_u32_le(road.id);
    buf.put_u8(road.class as u8);
    buf.put_u8(if road.one_way { FLAG_ONE_WAY } else { 0 });
    buf.put_u8(road.mask.bits());
    buf.put_u8(0);
    buf.put_u16_le(road.max_speed.unwrap_or(0));
    buf.put_u32_le(road.points.len() as u32);

    for point in &road.points {
        buf.put_i32_le(to_fixed(point.x()));
        buf.put_i32_le(to_fixed(point.y()));
    }
}

fn decode_road(reader: &mut Reader<'_>) -> Result<Road, CodecError> {
    let id = reader.u32()?;
    let class = RoadClass::try_from(reader.u8()?)?;
    let flags = reader.u8()?;

    let mask_bits = reader.u8()?;
    let mask = VehicleMask::from_bits(mask_bits).ok_or(CodecError::InvalidValue {
        field: "vehicle mask",
        value: mask_bits as u32,
    })?;

    let _reserved = reader.u8()?;
    let max_speed = match reader.u16()? {
        0 => None,
        kmh => Some(kmh),
    };

    let vertex_count = reader.count(VERTEX_SIZE)?;
    let mut points = Vec::with_capacity(vertex_count);
    for _ in 0..vertex_count {
        let x = from_fixed(reader.i32()?);
        let y = from_fixed(reader.i32()?);
        points.push(Point::new(x, y));
    }

    Ok(Road {
        id,
        class,
        one_way: flags & FLAG_ONE_WAY != 0,
        max_speed,
        mask,
        points,
    })
}

#[inline]
fn to_fixed(degrees: f64) -> i32 {
    (degrees * COORD_SCALE).round() as i32
}

#[inline]
fn from_fixed(value: i32) -> f64 {
    value as f64 / COORD_SCALE
}
