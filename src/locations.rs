use std::fmt::Display;

use bevy_reflect::Reflect;
use geo::{Distance as _, Haversine, Point};
use multimap::MultiMap;
use serde::Serialize;
use tracing::trace;
use uom::si::{f64::Length, length::meter, length::nautical_mile};

use crate::{
    coordinate::{Axis, Coordinate, CoordinateComponent},
    error::ParseErrorKind,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Fix {
    pub designator: String,
    pub coordinate: Coordinate,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Reflect)]
pub enum NavaidType {
    Vor,
    Ndb,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Navaid {
    #[serde(flatten)]
    pub fix: Fix,
    /// frequency * 1000, i.e. kHz for VORs and Hz for NDBs
    pub frequency: u32,
    pub navaid_type: NavaidType,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Reflect)]
pub enum AirspaceClass {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

impl AirspaceClass {
    pub fn from_designator(designator: &str) -> Option<Self> {
        match designator.to_ascii_uppercase().as_str() {
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "C" => Some(Self::C),
            "D" => Some(Self::D),
            "E" => Some(Self::E),
            "F" => Some(Self::F),
            "G" => Some(Self::G),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Runway {
    pub designator: String,
    pub threshold: Coordinate,
    pub heading: u16,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Airport {
    #[serde(flatten)]
    pub fix: Fix,
    /// not part of sector files, left for consumers that know it
    pub iata: Option<String>,
    pub airspace_class: Option<AirspaceClass>,
    pub runways: Vec<Runway>,
}

/// Anything an airway can pass through.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Waypoint {
    Fix(Fix),
    Navaid(Navaid),
    Airport(Airport),
}

impl Waypoint {
    pub fn fix(&self) -> &Fix {
        match self {
            Waypoint::Fix(fix) => fix,
            Waypoint::Navaid(navaid) => &navaid.fix,
            Waypoint::Airport(airport) => &airport.fix,
        }
    }

    pub fn designator(&self) -> &str {
        &self.fix().designator
    }

    pub fn coordinate(&self) -> &Coordinate {
        &self.fix().coordinate
    }
}

impl Display for Waypoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.designator(), self.coordinate())
    }
}

fn index_key(designator: &str) -> String {
    designator.to_ascii_uppercase()
}

/// Everything that can be referenced by name or position, in file order.
#[derive(Clone, Debug, Default)]
pub struct Locations {
    pub fixes: Vec<Fix>,
    pub navaids: Vec<Navaid>,
    pub airports: Vec<Airport>,
    fix_names: MultiMap<String, usize>,
    navaid_names: MultiMap<String, usize>,
    airport_names: MultiMap<String, usize>,
}

fn closest_within<'a, T>(
    items: &'a [T],
    fix: impl Fn(&T) -> &Fix,
    target: Point,
    tolerance: Length,
) -> Option<&'a T> {
    let tolerance_m = tolerance.get::<meter>();
    // one minute of latitude is one nautical mile anywhere
    let tolerance_deg = tolerance.get::<nautical_mile>() / 60.0;

    items
        .iter()
        .filter_map(|item| {
            let point = fix(item).coordinate.point();
            if (point.y() - target.y()).abs() > tolerance_deg {
                return None;
            }
            let distance = Haversine::distance(point, target);
            (distance <= tolerance_m).then_some((item, distance))
        })
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(item, _)| item)
}

fn planar_distance(a: Point, b: Point) -> f64 {
    (a.x() - b.x()).hypot(a.y() - b.y())
}

impl Locations {
    pub fn add_fix(&mut self, fix: Fix) {
        self.fix_names
            .insert(index_key(&fix.designator), self.fixes.len());
        self.fixes.push(fix);
    }

    pub fn add_navaid(&mut self, navaid: Navaid) {
        self.navaid_names
            .insert(index_key(&navaid.fix.designator), self.navaids.len());
        self.navaids.push(navaid);
    }

    pub fn add_airport(&mut self, airport: Airport) {
        self.airport_names
            .insert(index_key(&airport.fix.designator), self.airports.len());
        self.airports.push(airport);
    }

    /// First definition wins, searched in fixes, navaids, airports.
    pub fn find_by_designator(&self, designator: &str) -> Option<&Fix> {
        let key = index_key(designator);
        self.fix_names
            .get(&key)
            .map(|idx| &self.fixes[*idx])
            .or_else(|| self.navaid_names.get(&key).map(|idx| &self.navaids[*idx].fix))
            .or_else(|| {
                self.airport_names
                    .get(&key)
                    .map(|idx| &self.airports[*idx].fix)
            })
    }

    /// Sector files cover small areas, so plain distance on decimal degrees is good enough here.
    fn nearest_airport(&self, point: Point) -> Option<usize> {
        self.airports
            .iter()
            .enumerate()
            .map(|(idx, airport)| (idx, planar_distance(airport.fix.coordinate.point(), point)))
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(idx, _)| idx)
    }

    /// The airport named by the runway line if it is known, otherwise the one nearest to the
    /// runway's midpoint.
    pub fn airport_for_runway_mut(
        &mut self,
        aerodrome: Option<&str>,
        midpoint: Point,
    ) -> Option<&mut Airport> {
        let named = aerodrome.and_then(|designator| {
            let idx = self.airport_names.get(&index_key(designator)).copied();
            if idx.is_none() {
                trace!("runway airport {designator} unknown, falling back to proximity");
            }
            idx
        });
        let idx = named.or_else(|| self.nearest_airport(midpoint))?;
        self.airports.get_mut(idx)
    }

    /// Resolves a segment endpoint back to a named waypoint. The first collection (fixes,
    /// navaids, airports) with anything inside `tolerance` decides, its closest entry wins.
    pub fn waypoint_near(&self, coordinate: &Coordinate, tolerance: Length) -> Option<Waypoint> {
        let target = coordinate.point();
        let waypoint = closest_within(&self.fixes, |fix| fix, target, tolerance)
            .cloned()
            .map(Waypoint::Fix)
            .or_else(|| {
                closest_within(&self.navaids, |navaid| &navaid.fix, target, tolerance)
                    .cloned()
                    .map(Waypoint::Navaid)
            })
            .or_else(|| {
                closest_within(&self.airports, |airport| &airport.fix, target, tolerance)
                    .cloned()
                    .map(Waypoint::Airport)
            });

        trace!(
            "{coordinate} resolved to {}",
            waypoint.as_ref().map_or("nothing", Waypoint::designator)
        );

        waypoint
    }

    /// A coordinate token is either a DMS value on `axis` or the name of a known fix.
    pub fn resolve_component(
        &self,
        token: &str,
        axis: Axis,
    ) -> Result<CoordinateComponent, ParseErrorKind> {
        if CoordinateComponent::looks_like_dms(token) {
            return Ok(CoordinateComponent::parse_on_axis(token, axis)?);
        }

        self.find_by_designator(token)
            .map(|fix| fix.coordinate.component(axis))
            .ok_or_else(|| ParseErrorKind::UnresolvedFixReference(token.to_string()))
    }

    pub fn resolve_coordinate(&self, lat: &str, lng: &str) -> Result<Coordinate, ParseErrorKind> {
        let latitude = self.resolve_component(lat, Axis::Latitude)?;
        let longitude = self.resolve_component(lng, Axis::Longitude)?;
        Ok(Coordinate::new(latitude, longitude)?)
    }
}
