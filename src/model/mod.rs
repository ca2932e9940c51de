//! Vehicle profiles: which roads a vehicle may use and how fast it moves on them.

#[cfg(test)]
mod test;

use std::fmt::Debug;
use std::sync::Arc;

use log::debug;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use strum::{AsRefStr, Display, EnumString};

use crate::codec::{Road, RoadClass, VehicleMask};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Car,
    Bicycle,
    Pedestrian,
}

impl VehicleType {
    pub fn mask(self) -> VehicleMask {
        match self {
            VehicleType::Car => VehicleMask::CAR,
            VehicleType::Bicycle => VehicleMask::BICYCLE,
            VehicleType::Pedestrian => VehicleMask::PEDESTRIAN,
        }
    }
}

pub trait VehicleModel: Debug + Send + Sync {
    fn vehicle(&self) -> VehicleType;

    /// Speed in km/h on the given road. Only meaningful for accessible roads.
    fn speed(&self, road: &Road) -> f64;

    /// Upper bound of [`VehicleModel::speed`] over every road, in km/h.
    fn max_speed(&self) -> f64;

    /// Whether a road of this class and access mask may be used at all.
    fn is_accessible_by(&self, class: RoadClass, mask: VehicleMask) -> bool;

    fn is_accessible(&self, road: &Road) -> bool {
        self.is_accessible_by(road.class, road.mask)
    }

    fn is_one_way(&self, road: &Road) -> bool {
        road.one_way
    }
}

/// A vehicle model backed by a per-class speed table.
#[derive(Debug, Clone)]
pub struct SpeedTable {
    vehicle: VehicleType,
    speeds: FxHashMap<RoadClass, f64>,
    max_speed: f64,
    follows_one_way: bool,
}

impl SpeedTable {
    pub fn new(vehicle: VehicleType, speeds: &[(RoadClass, f64)], max_speed: f64) -> Self {
        SpeedTable {
            vehicle,
            speeds: speeds.iter().copied().collect(),
            max_speed,
            follows_one_way: vehicle != VehicleType::Pedestrian,
        }
    }

    pub fn car() -> Self {
        Self::new(
            VehicleType::Car,
            &[
                (RoadClass::Motorway, 110.0),
                (RoadClass::MotorwayLink, 70.0),
                (RoadClass::Trunk, 90.0),
                (RoadClass::TrunkLink, 60.0),
                (RoadClass::Primary, 70.0),
                (RoadClass::PrimaryLink, 50.0),
                (RoadClass::Secondary, 60.0),
                (RoadClass::SecondaryLink, 45.0),
                (RoadClass::Tertiary, 50.0),
                (RoadClass::TertiaryLink, 40.0),
                (RoadClass::Unclassified, 40.0),
                (RoadClass::Residential, 30.0),
                (RoadClass::LivingStreet, 10.0),
                (RoadClass::Service, 15.0),
                (RoadClass::Track, 10.0),
            ],
            130.0,
        )
    }

    pub fn bicycle() -> Self {
        Self::new(
            VehicleType::Bicycle,
            &[
                (RoadClass::Primary, 18.0),
                (RoadClass::PrimaryLink, 18.0),
                (RoadClass::Secondary, 18.0),
                (RoadClass::SecondaryLink, 18.0),
                (RoadClass::Tertiary, 18.0),
                (RoadClass::TertiaryLink, 18.0),
                (RoadClass::Unclassified, 16.0),
                (RoadClass::Residential, 16.0),
                (RoadClass::LivingStreet, 12.0),
                (RoadClass::Service, 14.0),
                (RoadClass::Track, 12.0),
                (RoadClass::Cycleway, 20.0),
                (RoadClass::Footway, 8.0),
                (RoadClass::Path, 12.0),
            ],
            25.0,
        )
    }

    pub fn pedestrian() -> Self {
        Self::new(
            VehicleType::Pedestrian,
            &[
                (RoadClass::Primary, 5.0),
                (RoadClass::PrimaryLink, 5.0),
                (RoadClass::Secondary, 5.0),
                (RoadClass::SecondaryLink, 5.0),
                (RoadClass::Tertiary, 5.0),
                (RoadClass::TertiaryLink, 5.0),
                (RoadClass::Unclassified, 5.0),
                (RoadClass::Residential, 5.0),
                (RoadClass::LivingStreet, 5.0),
                (RoadClass::Service, 5.0),
                (RoadClass::Track, 4.5),
                (RoadClass::Cycleway, 5.0),
                (RoadClass::Footway, 5.0),
                (RoadClass::Path, 4.5),
                (RoadClass::Steps, 3.0),
            ],
            5.0,
        )
    }

    pub fn for_vehicle(vehicle: VehicleType) -> Self {
        match vehicle {
            VehicleType::Car => Self::car(),
            VehicleType::Bicycle => Self::bicycle(),
            VehicleType::Pedestrian => Self::pedestrian(),
        }
    }
}

impl VehicleModel for SpeedTable {
    fn vehicle(&self) -> VehicleType {
        self.vehicle
    }

    fn speed(&self, road: &Road) -> f64 {
        let class_speed = self.speeds.get(&road.class).copied().unwrap_or(0.0);

        // Cars drive at the posted limit, slower vehicles are only ever capped by it.
        let speed = match (self.vehicle, road.max_speed) {
            (VehicleType::Car, Some(limit)) => limit as f64,
            (_, Some(limit)) => class_speed.min(limit as f64),
            (_, None) => class_speed,
        };

        speed.min(self.max_speed)
    }

    fn max_speed(&self) -> f64 {
        self.max_speed
    }

    fn is_accessible_by(&self, class: RoadClass, mask: VehicleMask) -> bool {
        mask.contains(self.vehicle.mask()) && self.speeds.contains_key(&class)
    }

    fn is_one_way(&self, road: &Road) -> bool {
        self.follows_one_way && road.one_way
    }
}

/// Picks the vehicle model used inside a given country.
pub trait VehicleModelFactory: Debug + Send + Sync {
    fn vehicle(&self) -> VehicleType;

    fn model_for_country(&self, country: &str) -> Arc<dyn VehicleModel>;
}

/// Serves one default table, with optional per-country replacements.
#[derive(Debug)]
pub struct DefaultModelFactory {
    vehicle: VehicleType,
    default: Arc<dyn VehicleModel>,
    countries: FxHashMap<String, Arc<dyn VehicleModel>>,
}

impl DefaultModelFactory {
    pub fn new(vehicle: VehicleType) -> Self {
        DefaultModelFactory {
            vehicle,
            default: Arc::new(SpeedTable::for_vehicle(vehicle)),
            countries: FxHashMap::default(),
        }
    }

    pub fn with_country(mut self, country: impl Into<String>, model: Arc<dyn VehicleModel>) -> Self {
        self.countries.insert(country.into(), model);
        self
    }
}

impl VehicleModelFactory for DefaultModelFactory {
    fn vehicle(&self) -> VehicleType {
        self.vehicle
    }

    fn model_for_country(&self, country: &str) -> Arc<dyn VehicleModel> {
        match self.countries.get(country) {
            Some(model) => Arc::clone(model),
            None => {
                debug!("No {} model for {country}, using the default table", self.vehicle);
                Arc::clone(&self.default)
            }
        }
    }
}
