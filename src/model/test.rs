use std::str::FromStr;
use std::sync::Arc;

use geo::point;

use crate::codec::{Road, RoadClass, VehicleMask};
use crate::model::{DefaultModelFactory, SpeedTable, VehicleModel, VehicleModelFactory, VehicleType};

fn road(class: RoadClass) -> Road {
    Road::new(
        1,
        class,
        vec![point! { x: 0.0, y: 0.0 }, point! { x: 0.001, y: 0.0 }],
    )
}

#[test_log::test]
fn cars_stay_off_footways() {
    let car = SpeedTable::car();

    assert!(car.is_accessible(&road(RoadClass::Primary)));
    assert!(!car.is_accessible(&road(RoadClass::Footway)));
    assert!(!car.is_accessible(&road(RoadClass::Primary).with_mask(VehicleMask::PEDESTRIAN)));
}

#[test_log::test]
fn pedestrians_ignore_one_way() {
    let one_way = road(RoadClass::Residential).one_way();

    assert!(SpeedTable::car().is_one_way(&one_way));
    assert!(SpeedTable::bicycle().is_one_way(&one_way));
    assert!(!SpeedTable::pedestrian().is_one_way(&one_way));
}

#[test_log::test]
fn posted_limit_overrides_class_speed_for_cars() {
    let limited = road(RoadClass::Residential).with_max_speed(50);

    assert_eq!(SpeedTable::car().speed(&limited), 50.0);
    assert_eq!(SpeedTable::bicycle().speed(&limited), 16.0);
    assert_eq!(SpeedTable::car().speed(&road(RoadClass::Residential)), 30.0);
}

#[test_log::test]
fn speed_never_exceeds_model_maximum() {
    let autobahn = road(RoadClass::Motorway).with_max_speed(250);
    let car = SpeedTable::car();

    assert!(car.speed(&autobahn) <= car.max_speed());

    for model in [SpeedTable::car(), SpeedTable::bicycle(), SpeedTable::pedestrian()] {
        for class in RoadClass::ALL {
            assert!(model.speed(&road(class)) <= model.max_speed());
        }
    }
}

#[test_log::test]
fn factory_prefers_country_override() {
    let slow = Arc::new(SpeedTable::new(
        VehicleType::Car,
        &[(RoadClass::Residential, 20.0)],
        20.0,
    ));

    let factory = DefaultModelFactory::new(VehicleType::Car).with_country("Slowland", slow);

    assert_eq!(factory.model_for_country("Slowland").max_speed(), 20.0);
    assert_eq!(factory.model_for_country("Elsewhere").max_speed(), 130.0);
    assert_eq!(factory.vehicle(), VehicleType::Car);
}

#[test]
fn vehicle_type_parses() {
    assert_eq!(VehicleType::from_str("bicycle"), Ok(VehicleType::Bicycle));
    assert_eq!(VehicleType::Pedestrian.to_string(), "pedestrian");
    assert_eq!(VehicleType::Car.mask(), VehicleMask::CAR);
}
