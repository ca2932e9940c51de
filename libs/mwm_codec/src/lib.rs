//! Codec primitives for single-tile routing.
//!
//! A tile carries its road network in two binary sections:
//!
//! - [`ROUTING_SECTION`]: every routable road (geometry, class, access) and the
//!   joints at which road points coincide. See [`RoutingSection`].
//! - [`RESTRICTIONS_SECTION`]: forbidden (or mandatory) feature-to-feature
//!   transitions. See [`RestrictionSection`].
//!
//! Both sections are little-endian, versioned and checksummed with CRC-64.

pub mod error;
pub mod primitive;
pub mod section;


pub use error::CodecError;
pub use primitive::{FeatureId, Road, RoadClass, RoadPoint, VehicleMask};
pub use section::restriction::{Restriction, RestrictionKind, RestrictionSection};
pub use section::routing::RoutingSection;

/// Tag of the section holding roads and joints.
pub const ROUTING_SECTION: &str = "routing";

/// Tag of the section holding turn restrictions.
pub const RESTRICTIONS_SECTION: &str = "restrictions";
