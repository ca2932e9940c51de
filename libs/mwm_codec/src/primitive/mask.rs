use bitflags::bitflags;

bitflags! {
    /// Set of vehicle profiles permitted on a road.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct VehicleMask: u8 {
        const CAR = 0b0000_0001;
        const BICYCLE = 0b0000_0010;
        const PEDESTRIAN = 0b0000_0100;
    }
}

impl Default for VehicleMask {
    fn default() -> Self {
        VehicleMask::all()
    }
}
