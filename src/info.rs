use serde::Serialize;
use tracing::trace;

use crate::{
    coordinate::{Axis, CoordinateComponent},
    error::ParseErrorKind,
};

/// The `[INFO]` block. Only the name is required, the other lines are read when they parse.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SectorInfo {
    pub name: Option<String>,
    pub default_callsign: Option<String>,
    pub default_airport: Option<String>,
    pub centre_latitude: Option<CoordinateComponent>,
    pub centre_longitude: Option<CoordinateComponent>,
    pub nm_per_deg_lat: Option<f64>,
    pub nm_per_deg_lng: Option<f64>,
    pub magnetic_variation: Option<f64>,
    pub scale: Option<f64>,
}

fn lenient<T, E: std::fmt::Display>(field: &str, parsed: Result<T, E>) -> Option<T> {
    parsed
        .inspect_err(|e| trace!("ignoring unreadable INFO {field}: {e}"))
        .ok()
}

impl SectorInfo {
    /// `position` counts the lines inside the section, starting at 1.
    pub fn parse_line(&mut self, position: usize, value: &str) -> Result<(), ParseErrorKind> {
        match position {
            1 => self.name = Some(value.to_string()),
            2 => self.default_callsign = Some(value.to_string()),
            3 => self.default_airport = Some(value.to_string()),
            4 => {
                self.centre_latitude = lenient(
                    "centre latitude",
                    CoordinateComponent::parse_on_axis(value, Axis::Latitude),
                );
            }
            5 => {
                self.centre_longitude = lenient(
                    "centre longitude",
                    CoordinateComponent::parse_on_axis(value, Axis::Longitude),
                );
            }
            6 => self.nm_per_deg_lat = lenient("NM per degree latitude", value.parse()),
            7 => self.nm_per_deg_lng = lenient("NM per degree longitude", value.parse()),
            8 => self.magnetic_variation = lenient("magnetic variation", value.parse()),
            9 => self.scale = lenient("scale", value.parse()),
            _ => return Err(ParseErrorKind::InfoOverflow(position)),
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::error::ParseErrorKind;

    use super::SectorInfo;

    #[test]
    fn test_info() {
        let mut info = SectorInfo::default();
        for (idx, line) in [
            "AeroNav München 2401/1-1 EDMM 20240125",
            "AERO_NAV",
            "ZZZZ",
            "N048.21.13.618",
            "EDDM",
            "60",
            "39",
            "-3",
            "1",
        ]
        .into_iter()
        .enumerate()
        {
            assert_eq!(info.parse_line(idx + 1, line), Ok(()));
        }

        assert_eq!(
            info.name.as_deref(),
            Some("AeroNav München 2401/1-1 EDMM 20240125")
        );
        assert_eq!(info.default_airport.as_deref(), Some("ZZZZ"));
        assert_eq!(
            info.centre_latitude.map(|lat| lat.to_string()),
            Some("N048.21.13.618".to_string())
        );
        // fix names are not resolved here
        assert_eq!(info.centre_longitude, None);
        assert_eq!(info.magnetic_variation, Some(-3.0));
        assert_eq!(
            info.parse_line(10, "one too many"),
            Err(ParseErrorKind::InfoOverflow(10))
        );
    }
}
