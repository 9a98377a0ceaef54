//! One frame of lap telemetry and its merge rule.

/// Decimal places kept per field.
pub mod precision {
    pub const LAP_DISTANCE: i32 = 2;
    pub const LAP_TIME: i32 = 0;
    pub const SPEED: i32 = 0;
    pub const BRAKE: i32 = 3;
    pub const THROTTLE: i32 = 3;
    pub const GEAR: i32 = 0;
    pub const STEER: i32 = 3;
    pub const DRS: i32 = 0;
}

/// Telemetry observed for one frame id.
///
/// Several packet kinds describe the same frame; each fills the fields it
/// carries and leaves the rest `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TelemetryFrame {
    /// Metres from the start line.
    pub lap_distance: Option<f64>,
    /// Milliseconds into the lap.
    pub lap_time: Option<f64>,
    /// km/h
    pub speed: Option<f64>,
    pub brake: Option<f64>,
    pub throttle: Option<f64>,
    pub gear: Option<f64>,
    pub steer: Option<f64>,
    pub drs: Option<f64>,
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

impl TelemetryFrame {
    /// Frame carrying the lap-data fields.
    pub fn from_lap_data(lap_distance: f32, lap_time_ms: u32) -> Self {
        Self {
            lap_distance: Some(f64::from(lap_distance)),
            lap_time: Some(f64::from(lap_time_ms)),
            ..Self::default()
        }
    }

    /// Frame carrying the car-telemetry fields.
    pub fn from_car_telemetry(
        speed_kmh: u16,
        throttle: f32,
        brake: f32,
        steer: f32,
        gear: i8,
        drs: u8,
    ) -> Self {
        Self {
            speed: Some(f64::from(speed_kmh)),
            throttle: Some(f64::from(throttle)),
            brake: Some(f64::from(brake)),
            steer: Some(f64::from(steer)),
            gear: Some(f64::from(gear)),
            drs: Some(f64::from(drs)),
            ..Self::default()
        }
    }

    /// Every present field rounded to its stored precision.
    pub fn rounded(self) -> Self {
        let r = |v: Option<f64>, places| v.map(|v| round_to(v, places));
        Self {
            lap_distance: r(self.lap_distance, precision::LAP_DISTANCE),
            lap_time: r(self.lap_time, precision::LAP_TIME),
            speed: r(self.speed, precision::SPEED),
            brake: r(self.brake, precision::BRAKE),
            throttle: r(self.throttle, precision::THROTTLE),
            gear: r(self.gear, precision::GEAR),
            steer: r(self.steer, precision::STEER),
            drs: r(self.drs, precision::DRS),
        }
    }

    /// First writer wins per field: a field already set in `existing` is
    /// kept, otherwise the rounded incoming value is taken.
    pub fn merge(existing: &TelemetryFrame, incoming: &TelemetryFrame) -> TelemetryFrame {
        let incoming = incoming.rounded();
        TelemetryFrame {
            lap_distance: existing.lap_distance.or(incoming.lap_distance),
            lap_time: existing.lap_time.or(incoming.lap_time),
            speed: existing.speed.or(incoming.speed),
            brake: existing.brake.or(incoming.brake),
            throttle: existing.throttle.or(incoming.throttle),
            gear: existing.gear.or(incoming.gear),
            steer: existing.steer.or(incoming.steer),
            drs: existing.drs.or(incoming.drs),
        }
    }
}
