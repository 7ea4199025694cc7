use std::{fmt::Display, str::FromStr};

use bevy_reflect::Reflect;
use geo::{point, Point};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

const SECONDS_DECIMALS: i32 = 3;
const DEGREES_DECIMALS: i32 = 7;

// anything DMS-shaped is parsed as DMS and never looked up as a fix name
static DMS_LIKE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[NESWnesw]\d{1,3}[.,]").unwrap());

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CoordinateError {
    #[error("{0} is not a valid DMS coordinate")]
    InvalidFormat(String),
    #[error("{token} is a {found} coordinate, expected {expected}")]
    AxisMismatch {
        token: String,
        expected: Axis,
        found: Axis,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Reflect)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Axis::Latitude => "latitude",
            Axis::Longitude => "longitude",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Reflect)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'N' => Some(Self::North),
            'S' => Some(Self::South),
            'E' => Some(Self::East),
            'W' => Some(Self::West),
            _ => None,
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Self::North | Self::South => Axis::Latitude,
            Self::East | Self::West => Axis::Longitude,
        }
    }

    fn sign(self) -> f64 {
        match self {
            Self::North | Self::East => 1.0,
            Self::South | Self::West => -1.0,
        }
    }

    fn for_decimal(decimal: f64, axis: Axis) -> Self {
        match (axis, decimal < 0.0) {
            (Axis::Latitude, false) => Self::North,
            (Axis::Latitude, true) => Self::South,
            (Axis::Longitude, false) => Self::East,
            (Axis::Longitude, true) => Self::West,
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::North => "N",
            Self::South => "S",
            Self::East => "E",
            Self::West => "W",
        })
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

fn digits<T: FromStr>(part: &str) -> Option<T> {
    (!part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
        .then(|| part.parse().ok())
        .flatten()
}

/// One half of a coordinate in degrees, minutes and seconds, e.g. `N048.21.13.618`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Reflect)]
pub struct CoordinateComponent {
    pub direction: Direction,
    pub degrees: u16,
    pub minutes: u8,
    pub seconds: f64,
}

impl CoordinateComponent {
    pub fn new(direction: Direction, degrees: u16, minutes: u8, seconds: f64) -> Self {
        Self {
            direction,
            degrees,
            minutes,
            seconds: round_to(seconds, SECONDS_DECIMALS),
        }
    }

    pub fn axis(&self) -> Axis {
        self.direction.axis()
    }

    /// Signed decimal degrees, rounded to 7 decimals.
    pub fn to_decimal(&self) -> f64 {
        let magnitude = f64::from(self.degrees)
            + f64::from(self.minutes) / 60.0
            + self.seconds / 3600.0;
        round_to(self.direction.sign() * magnitude, DEGREES_DECIMALS)
    }

    pub fn from_decimal(decimal: f64, axis: Axis) -> Self {
        let direction = Direction::for_decimal(decimal, axis);
        let magnitude = decimal.abs();
        let mut degrees = magnitude.trunc();
        let total_minutes = (magnitude - degrees) * 60.0;
        let mut minutes = total_minutes.trunc();
        let mut seconds = round_to((total_minutes - minutes) * 60.0, SECONDS_DECIMALS);

        if seconds >= 60.0 {
            seconds = round_to(seconds - 60.0, SECONDS_DECIMALS);
            minutes += 1.0;
        }
        if minutes >= 60.0 {
            minutes -= 60.0;
            degrees += 1.0;
        }

        Self {
            direction,
            degrees: degrees as u16,
            minutes: minutes as u8,
            seconds,
        }
    }

    /// Whether a token should be treated as a DMS value rather than a fix name.
    pub fn looks_like_dms(token: &str) -> bool {
        DMS_LIKE_RE.is_match(token)
    }

    pub fn parse_on_axis(token: &str, axis: Axis) -> Result<Self, CoordinateError> {
        let component = token.parse::<Self>()?;
        if component.axis() == axis {
            Ok(component)
        } else {
            Err(CoordinateError::AxisMismatch {
                token: token.to_string(),
                expected: axis,
                found: component.axis(),
            })
        }
    }
}

impl FromStr for CoordinateComponent {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoordinateError::InvalidFormat(s.to_string());

        let mut chars = s.chars();
        let direction = chars
            .next()
            .and_then(Direction::from_char)
            .ok_or_else(invalid)?;
        let parts = chars.as_str().split(['.', ',']).collect::<Vec<_>>();
        let (degrees, minutes, whole_seconds, fraction) = match parts.as_slice() {
            [deg, min, sec, frac] => (*deg, *min, *sec, Some(*frac)),
            [deg, min, sec] => (*deg, *min, *sec, None),
            _ => return Err(invalid()),
        };

        // degrees stay unchecked, dummy entries use e.g. S999.00.00.000
        let degrees = digits::<u16>(degrees).ok_or_else(invalid)?;
        let minutes = digits::<u8>(minutes)
            .filter(|minutes| *minutes < 60)
            .ok_or_else(invalid)?;
        let whole_seconds = digits::<u32>(whole_seconds)
            .filter(|seconds| *seconds < 60)
            .ok_or_else(invalid)?;
        let seconds = match fraction {
            Some(fraction) => {
                digits::<u64>(fraction).ok_or_else(invalid)?;
                format!("{whole_seconds}.{fraction}")
                    .parse::<f64>()
                    .map_err(|_| invalid())?
            }
            None => f64::from(whole_seconds),
        };

        Ok(Self::new(direction, degrees, minutes, seconds))
    }
}

impl Display for CoordinateComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{:03}.{:02}.{:06.3}",
            self.direction, self.degrees, self.minutes, self.seconds
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Reflect)]
pub struct Coordinate {
    pub latitude: CoordinateComponent,
    pub longitude: CoordinateComponent,
}

impl Coordinate {
    pub fn new(
        latitude: CoordinateComponent,
        longitude: CoordinateComponent,
    ) -> Result<Self, CoordinateError> {
        for (component, expected) in [(latitude, Axis::Latitude), (longitude, Axis::Longitude)] {
            if component.axis() != expected {
                return Err(CoordinateError::AxisMismatch {
                    token: component.to_string(),
                    expected,
                    found: component.axis(),
                });
            }
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn from_decimal(lat: f64, lng: f64) -> Self {
        Self {
            latitude: CoordinateComponent::from_decimal(lat, Axis::Latitude),
            longitude: CoordinateComponent::from_decimal(lng, Axis::Longitude),
        }
    }

    pub fn component(&self, axis: Axis) -> CoordinateComponent {
        match axis {
            Axis::Latitude => self.latitude,
            Axis::Longitude => self.longitude,
        }
    }

    pub fn point(&self) -> Point {
        point! { x: self.longitude.to_decimal(), y: self.latitude.to_decimal() }
    }

    pub fn midpoint(&self, other: &Coordinate) -> Point {
        let (a, b) = (self.point(), other.point());
        point! { x: (a.x() + b.x()) / 2.0, y: (a.y() + b.y()) / 2.0 }
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.latitude, self.longitude)
    }
}
