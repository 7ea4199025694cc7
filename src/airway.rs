use std::ptr;

use bevy_reflect::Reflect;
use itertools::Itertools as _;
use multimap::MultiMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{trace, warn};
use uom::si::{f64::Length, length::nautical_mile};

use crate::{
    coordinate::Coordinate,
    error::{ParseErrorKind, ParseErrors},
    locations::{Locations, Waypoint},
};

static ROUTE_IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{1,2}[0-9]{1,3}").unwrap());

/// One line of an airway section, before it is stitched into an [`Airway`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NamedSegment {
    pub label: String,
    pub start: Coordinate,
    pub end: Coordinate,
    pub line_number: usize,
    pub line: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Reflect)]
pub enum AirwayType {
    Low,
    High,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Reflect)]
pub enum AirwayDirection {
    Unidirectional,
    Omnidirectional,
}

pub trait PredefinedRoute {
    fn designator(&self) -> &str;
    fn fixes(&self) -> &[Waypoint];

    fn contains(&self, designator: &str) -> bool {
        self.fixes()
            .iter()
            .any(|fix| fix.designator() == designator)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Airway {
    pub designator: String,
    pub airway_type: AirwayType,
    pub direction: AirwayDirection,
    pub fixes: Vec<Waypoint>,
}

impl PredefinedRoute for Airway {
    fn designator(&self) -> &str {
        &self.designator
    }

    fn fixes(&self) -> &[Waypoint] {
        &self.fixes
    }
}

/// `J1-1` and `j1` both belong to `J1`, labels without a route designator are kept whole.
pub fn canonical_identifier(label: &str) -> String {
    ROUTE_IDENTIFIER_RE
        .find(label)
        .map_or(label, |m| m.as_str())
        .to_ascii_uppercase()
}

struct Stitcher<'a> {
    airway: &'a str,
    locations: &'a Locations,
    tolerance: Length,
    route: Vec<Waypoint>,
}

impl Stitcher<'_> {
    fn push(&mut self, coordinate: &Coordinate) -> Result<(), ParseErrorKind> {
        let waypoint = self
            .locations
            .waypoint_near(coordinate, self.tolerance)
            .ok_or_else(|| ParseErrorKind::NoFixNearCoordinate {
                coordinate: coordinate.to_string(),
                tolerance_nm: self.tolerance.get::<nautical_mile>(),
            })?;

        if self
            .route
            .iter()
            .any(|fix| fix.designator() == waypoint.designator())
        {
            return Err(ParseErrorKind::CyclicOrMalformedAirway {
                airway: self.airway.to_string(),
                fix: waypoint.designator().to_string(),
            });
        }

        self.route.push(waypoint);
        Ok(())
    }

    fn unsupported(&self, reason: String) -> ParseErrorKind {
        ParseErrorKind::UnsupportedAirwayTopology {
            airway: self.airway.to_string(),
            reason,
        }
    }
}

/// Orders the segments of one airway into a fix sequence by matching each segment's end to the
/// next segment's start.
pub fn reconstruct_airway(
    airway: &str,
    segments: &[&NamedSegment],
    locations: &Locations,
    tolerance: Length,
) -> Result<Vec<Waypoint>, ParseErrorKind> {
    // the same leg listed twice is not a branch
    let segments = segments
        .iter()
        .copied()
        .unique_by(|segment| (segment.start.to_string(), segment.end.to_string()))
        .collect::<Vec<_>>();

    let mut stitcher = Stitcher {
        airway,
        locations,
        tolerance,
        route: Vec::with_capacity(segments.len() + 1),
    };

    let (first, last) = match segments.as_slice() {
        [] => return Err(ParseErrorKind::NoSegmentsForRoute(airway.to_string())),
        [single] => (*single, Some(*single)),
        _ => {
            let firsts = segments
                .iter()
                .filter(|segment| {
                    !segments
                        .iter()
                        .any(|other| !ptr::eq(*other, **segment) && other.end == segment.start)
                })
                .collect::<Vec<_>>();
            let lasts = segments
                .iter()
                .filter(|segment| {
                    !segments
                        .iter()
                        .any(|other| !ptr::eq(*other, **segment) && other.start == segment.end)
                })
                .collect::<Vec<_>>();

            let first = match firsts.as_slice() {
                [first] => **first,
                // closed loop, reported once the walk comes back to a fix it has seen
                [] => segments[0],
                _ => return Err(stitcher.unsupported("more than one starting segment".to_string())),
            };
            let last = match lasts.as_slice() {
                [last] => Some(**last),
                [] => None,
                _ => return Err(stitcher.unsupported("more than one final segment".to_string())),
            };
            (first, last)
        }
    };

    stitcher.push(&first.start)?;
    stitcher.push(&first.end)?;

    let mut current = first;
    let mut consumed = 1;
    while !last.is_some_and(|last| ptr::eq(current, last)) {
        let successors = segments
            .iter()
            .filter(|segment| segment.start == current.end)
            .collect::<Vec<_>>();
        let next = match successors.as_slice() {
            [next] => **next,
            [] => {
                return Err(stitcher.unsupported(format!("no segment continues at {}", current.end)))
            }
            _ => return Err(stitcher.unsupported(format!("airway branches at {}", current.end))),
        };

        stitcher.push(&next.end)?;
        trace!("{airway}: {} -> {}", current.end, next.end);
        current = next;
        consumed += 1;
    }

    if consumed < segments.len() {
        return Err(stitcher.unsupported(format!(
            "{} segments are not connected to the rest",
            segments.len() - consumed
        )));
    }

    Ok(stitcher.route)
}

/// Builds one airway per canonical identifier, in order of first appearance. Failures are
/// recorded against the first line of the airway and skip only that airway.
pub fn reconstruct_airways(
    segments: &[NamedSegment],
    airway_type: AirwayType,
    locations: &Locations,
    tolerance: Length,
    errors: &mut ParseErrors,
) -> Vec<Airway> {
    let groups = segments
        .iter()
        .map(|segment| (canonical_identifier(&segment.label), segment))
        .collect::<MultiMap<_, _>>();

    segments
        .iter()
        .map(|segment| canonical_identifier(&segment.label))
        .unique()
        .filter_map(|designator| {
            let group = groups
                .get_vec(&designator)
                .map(Vec::as_slice)
                .unwrap_or_default();

            match reconstruct_airway(&designator, group, locations, tolerance) {
                Ok(fixes) => Some(Airway {
                    designator,
                    airway_type,
                    direction: AirwayDirection::Omnidirectional,
                    fixes,
                }),
                Err(kind) => {
                    match group.first() {
                        Some(origin) => errors.record(origin.line_number, &origin.line, kind),
                        None => warn!("{kind}"),
                    }
                    None
                }
            }
        })
        .collect()
}
