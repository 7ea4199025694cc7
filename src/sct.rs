use serde::Serialize;
use tracing::{debug, trace};
use uom::si::{f64::Length, length::nautical_mile};

use crate::{
    airway::{reconstruct_airways, Airway, AirwayType, NamedSegment},
    error::{ParseErrorKind, ParseErrors, SctError},
    info::SectorInfo,
    line::{classify, Line},
    locations::{Airport, Fix, Locations, Navaid, NavaidType},
    read_to_string,
    records::{
        parse_airport, parse_fix, parse_navaid, parse_runway, parse_segment, RunwayRecord,
    },
    section::{scan, Event, Pass, Section},
};

#[derive(Clone, Debug, PartialEq)]
pub struct ParseSettings {
    /// How far an airway segment's endpoint may be from the fix it is resolved to.
    pub fix_tolerance: Length,
}

impl Default for ParseSettings {
    fn default() -> Self {
        Self {
            fix_tolerance: Length::new::<nautical_mile>(1.0),
        }
    }
}

/// Everything that could be read from a sector file, plus what could not.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Sct {
    pub info: SectorInfo,
    pub airports: Vec<Airport>,
    pub fixes: Vec<Fix>,
    pub navaids: Vec<Navaid>,
    #[serde(skip)]
    pub low_segments: Vec<NamedSegment>,
    #[serde(skip)]
    pub high_segments: Vec<NamedSegment>,
    pub low_airways: Vec<Airway>,
    pub high_airways: Vec<Airway>,
    pub errors: ParseErrors,
}

pub type SctResult = Result<Sct, SctError>;

/// State threaded through both passes of a single parse.
#[derive(Default)]
struct ParseContext {
    info: SectorInfo,
    locations: Locations,
    low_segments: Vec<NamedSegment>,
    high_segments: Vec<NamedSegment>,
    errors: ParseErrors,
}

impl ParseContext {
    fn record(&mut self, line: &Line, kind: ParseErrorKind) {
        self.errors.record(line.number, line.content, kind);
    }

    fn read_navdata(mut self, event: Event) -> Self {
        match event {
            Event::UnknownSection { name, line } => {
                self.record(line, ParseErrorKind::UnknownSectionHeader(name.to_string()));
            }
            Event::Orphaned(line) => self.record(line, ParseErrorKind::OrphanedLine),
            Event::Record {
                section,
                position,
                line,
            } if section.pass() == Some(Pass::Navdata) => {
                let locations = &mut self.locations;
                let read = match section {
                    Section::Info => self.info.parse_line(position, line.content),
                    Section::Vor => parse_navaid(line.content, NavaidType::Vor, locations)
                        .map(|vor| locations.add_navaid(vor)),
                    Section::Ndb => parse_navaid(line.content, NavaidType::Ndb, locations)
                        .map(|ndb| locations.add_navaid(ndb)),
                    Section::Airport => parse_airport(line.content, locations)
                        .map(|airport| locations.add_airport(airport)),
                    Section::Fixes => {
                        parse_fix(line.content, locations).map(|fix| locations.add_fix(fix))
                    }
                    _ => Ok(()),
                };
                if let Err(kind) = read {
                    self.record(line, kind);
                }
            }
            Event::Header | Event::Record { .. } | Event::Skipped => {}
        }

        self
    }

    fn read_references(mut self, event: Event) -> Self {
        let Event::Record { section, line, .. } = event else {
            return self;
        };

        let read = match section {
            Section::Runway => parse_runway(line.content, &self.locations)
                .and_then(|runway| self.add_runway(runway)),
            Section::LowAirway => parse_segment(line, section, &self.locations)
                .map(|segment| self.low_segments.push(segment)),
            Section::HighAirway => parse_segment(line, section, &self.locations)
                .map(|segment| self.high_segments.push(segment)),
            _ => Ok(()),
        };
        if let Err(kind) = read {
            self.record(line, kind);
        }

        self
    }

    fn add_runway(&mut self, runway: RunwayRecord) -> Result<(), ParseErrorKind> {
        let [first, second] = runway.ends;
        let midpoint = first.threshold.midpoint(&second.threshold);
        let airport = self
            .locations
            .airport_for_runway_mut(runway.aerodrome.as_deref(), midpoint)
            .ok_or_else(|| {
                ParseErrorKind::NoSuitableAirportForRunway(
                    first.designator.clone(),
                    second.designator.clone(),
                )
            })?;

        trace!(
            "runway {}/{} belongs to {}",
            first.designator,
            second.designator,
            airport.fix.designator
        );
        airport.runways.extend([first, second]);
        Ok(())
    }
}

impl Sct {
    pub fn parse(content: &[u8]) -> SctResult {
        Ok(Self::parse_str(&read_to_string(content)?))
    }

    pub fn parse_str(content: &str) -> Self {
        Self::parse_with_settings(content, &ParseSettings::default())
    }

    /// Never fails as a whole: lines, records and airways that cannot be read end up in
    /// [`Sct::errors`].
    pub fn parse_with_settings(content: &str, settings: &ParseSettings) -> Self {
        let lines = classify(content);

        let context = scan(&lines).fold(ParseContext::default(), ParseContext::read_navdata);
        let mut context = scan(&lines).fold(context, ParseContext::read_references);

        let low_airways = reconstruct_airways(
            &context.low_segments,
            AirwayType::Low,
            &context.locations,
            settings.fix_tolerance,
            &mut context.errors,
        );
        let high_airways = reconstruct_airways(
            &context.high_segments,
            AirwayType::High,
            &context.locations,
            settings.fix_tolerance,
            &mut context.errors,
        );

        let ParseContext {
            info,
            locations,
            low_segments,
            high_segments,
            mut errors,
        } = context;
        errors.sort_by_key(|error| error.line_number);

        debug!(
            "parsed {} fixes, {} navaids, {} airports, {} low and {} high airways with {} errors",
            locations.fixes.len(),
            locations.navaids.len(),
            locations.airports.len(),
            low_airways.len(),
            high_airways.len(),
            errors.len()
        );

        Sct {
            info,
            airports: locations.airports,
            fixes: locations.fixes,
            navaids: locations.navaids,
            low_segments,
            high_segments,
            low_airways,
            high_airways,
            errors,
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions_sorted::assert_eq_sorted;

    use crate::{
        airway::{AirwayDirection, AirwayType, PredefinedRoute},
        error::ParseErrorKind,
        locations::{AirspaceClass, NavaidType, Waypoint},
        section::Section,
        sct::Sct,
    };

    const SCT: &[u8] = b"
;=========================================================================================================================;

[INFO]
AeroNav M\xfcnchen 2401/1-1 EDMM 20240125
AERO_NAV
ZZZZ
N048.21.13.618
E011.47.09.909
60
39
-3
1

#define COLOR_APP       16711680
#define COLOR_AirspaceA  8421376

[VOR]
NUB  115.750 N049.30.10.508 E011.02.06.000
OTT  112.300 N048.10.49.418 E011.48.59.529

[NDB]
MIQ  426.000 N048.34.12.810 E011.35.51.010
RTT  303.000 N047.25.51.319 E011.56.24.190

[FIXES]
(FM-C) N049.31.05.999 E008.26.42.000
ARMUT N049.43.20.999 E012.19.23.998
GEDSO N047.04.50.001 E011.52.13.000
INBED N049.23.15.000 E010.56.30.001
UNKUL N049.08.13.999 E011.27.34.999
VEMUT N049.48.38.678 E012.27.40.489

[AIRPORT]
EDDM 000.000 N048.21.13.618 E011.47.09.909 D
EDNX 000.000 N048.14.20.399 E011.33.33.001 D
LIPB 000.000 N046.27.37.000 E011.19.35.000 D

[RUNWAY]
08R 26L 080 260 N048.20.26.408 E011.45.03.661 N048.20.41.269 E011.48.16.610 EDDM
08L 26R 080 260 N048.21.45.961 E011.46.03.179 N048.22.00.789 E011.49.16.219
07  25  071 251 N048.14.17.710 E011.33.14.090 N048.14.24.388 E011.33.51.998 EDNX

[SID]
EDDM SID 26L BIBAGxS                     N048.20.25.315 E011.44.49.465 N048.20.15.608 E011.42.33.951
                                         N048.20.15.608 E011.42.33.951 N048.17.15.248 E011.42.28.821

[ARTCC HIGH]
EDJA_ILR_APP                             N048.10.28.000 E009.34.15.000 N048.18.09.000 E009.55.25.000

[GEO]
EDDN Groundlayout Holding Points         N049.29.58.736 E011.03.33.028 N049.29.58.942 E011.03.34.353 COLOR_Stopbar

[HIGH AIRWAY]
UN850      N049.43.20.999 E012.19.23.998 N049.48.38.678 E012.27.40.489
UN850-1    INBED          INBED          ARMUT          ARMUT

[LOW AIRWAY]
T161       UNKUL UNKUL OTT OTT
T161       N048.10.49.418 E011.48.59.529 N048.34.12.810 E011.35.51.010
Y101       GEDSO GEDSO RTT RTT
";

    fn route(airway: &impl PredefinedRoute) -> String {
        airway
            .fixes()
            .iter()
            .map(Waypoint::designator)
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_sct() {
        let sct = Sct::parse(SCT).unwrap();

        assert_eq_sorted!(sct.errors.0, vec![]);
        assert_eq!(
            sct.info.name.as_deref(),
            Some("AeroNav München 2401/1-1 EDMM 20240125")
        );

        assert_eq!(
            sct.navaids
                .iter()
                .map(|navaid| (
                    navaid.fix.designator.as_str(),
                    navaid.frequency,
                    navaid.navaid_type
                ))
                .collect::<Vec<_>>(),
            vec![
                ("NUB", 115_750, NavaidType::Vor),
                ("OTT", 112_300, NavaidType::Vor),
                ("MIQ", 426_000, NavaidType::Ndb),
                ("RTT", 303_000, NavaidType::Ndb),
            ]
        );
        assert_eq!(sct.fixes.len(), 6);
        assert_eq!(
            sct.fixes[1].coordinate.to_string(),
            "N049.43.20.999 E012.19.23.998"
        );

        let runways = sct
            .airports
            .iter()
            .map(|airport| {
                (
                    airport.fix.designator.as_str(),
                    airport.airspace_class,
                    airport
                        .runways
                        .iter()
                        .map(|runway| (runway.designator.as_str(), runway.heading))
                        .collect::<Vec<_>>(),
                )
            })
            .collect::<Vec<_>>();
        assert_eq_sorted!(
            runways,
            vec![
                (
                    "EDDM",
                    Some(AirspaceClass::D),
                    vec![("08R", 80), ("26L", 260), ("08L", 80), ("26R", 260)]
                ),
                ("EDNX", Some(AirspaceClass::D), vec![("07", 71), ("25", 251)]),
                ("LIPB", Some(AirspaceClass::D), vec![]),
            ]
        );

        assert_eq!(sct.high_airways.len(), 1);
        assert_eq!(sct.high_airways[0].designator, "UN850");
        assert_eq!(sct.high_airways[0].airway_type, AirwayType::High);
        assert_eq!(
            sct.high_airways[0].direction,
            AirwayDirection::Omnidirectional
        );
        assert_eq!(route(&sct.high_airways[0]), "INBED ARMUT VEMUT");

        assert_eq!(
            sct.low_airways
                .iter()
                .map(|airway| format!("{}: {}", airway.designator, route(airway)))
                .collect::<Vec<_>>(),
            vec!["T161: UNKUL OTT MIQ", "Y101: GEDSO RTT"]
        );
        assert!(matches!(sct.low_airways[0].fixes[1], Waypoint::Navaid(_)));
        assert_eq!(sct.low_segments.len(), 3);
        assert_eq!(sct.high_segments.len(), 2);
    }

    #[test]
    fn test_malformed_airport_line() {
        let sct = Sct::parse_str(
            "[AIRPORT]
EDDM 000.000 N048.21.13.618 E011.47.09.909 D
EDNX 000.000 N048.14.20.399
LIPB 000.000 N046.27.37.000 E011.19.35.000 D

[FIXES]
ARMUT N049.43.20.999 E012.19.23.998
",
        );

        assert_eq!(sct.errors.len(), 1);
        assert_eq!(sct.errors[0].line_number, 3);
        assert_eq!(sct.errors[0].line, "EDNX 000.000 N048.14.20.399");
        assert_eq!(
            sct.errors[0].kind,
            ParseErrorKind::MalformedRecord(Section::Airport)
        );
        assert_eq!(sct.airports.len(), 2);
        assert_eq!(sct.fixes.len(), 1);
    }

    #[test]
    fn test_unknown_section() {
        let sct = Sct::parse_str(
            "[FOO]
some data
more data
[FIXES]
ARMUT N049.43.20.999 E012.19.23.998
",
        );

        assert_eq!(sct.errors.len(), 1);
        assert_eq!(
            sct.errors[0].kind,
            ParseErrorKind::UnknownSectionHeader("FOO".to_string())
        );
        assert_eq!(sct.errors[0].line_number, 1);
        assert_eq!(sct.fixes.len(), 1);
    }

    #[test]
    fn test_orphaned_lines_and_info_overflow() {
        let sct = Sct::parse_str(
            "orphan ; comment
[INFO]
1
2
3
4
5
6
7
8
9
10
",
        );

        assert_eq!(
            sct.errors
                .iter()
                .map(|error| (error.line_number, error.kind.clone()))
                .collect::<Vec<_>>(),
            vec![
                (1, ParseErrorKind::OrphanedLine),
                (12, ParseErrorKind::InfoOverflow(10)),
            ]
        );
        assert_eq!(sct.errors[0].line, "orphan");
    }

    #[test]
    fn test_header_with_trailing_text() {
        let sct = Sct::parse_str(
            "[FIXES] generated 2024-01-25
ARMUT N049.43.20.999 E012.19.23.998
",
        );

        assert_eq_sorted!(sct.errors.0, vec![]);
        assert_eq!(sct.fixes.len(), 1);
    }

    #[test]
    fn test_runway_without_airport() {
        let sct = Sct::parse_str(
            "[RUNWAY]
07 25 071 251 N048.14.17.710 E011.33.14.090 N048.14.24.388 E011.33.51.998
",
        );

        assert_eq!(
            sct.errors[0].kind,
            ParseErrorKind::NoSuitableAirportForRunway("07".to_string(), "25".to_string())
        );
    }

    #[test]
    fn test_cyclic_airway() {
        let sct = Sct::parse_str(
            "[FIXES]
AAA N048.00.00.000 E011.00.00.000
BBB N048.30.00.000 E011.30.00.000
CCC N049.00.00.000 E012.00.00.000

[LOW AIRWAY]
J1 AAA AAA BBB BBB
J1 BBB BBB CCC CCC
L1 AAA AAA BBB BBB
L1 BBB BBB AAA AAA
",
        );

        assert_eq!(sct.low_airways.len(), 1);
        assert_eq!(sct.low_airways[0].designator, "J1");
        assert_eq!(sct.errors.len(), 1);
        assert_eq!(sct.errors[0].line_number, 9);
        assert_eq!(
            sct.errors[0].message(),
            "fix AAA found multiple times in airway L1"
        );
    }

    #[test]
    fn test_forward_references_in_second_pass() {
        // airways and runways may come before the sections they refer to
        let sct = Sct::parse_str(
            "[LOW AIRWAY]
V1 XRAY XRAY YANKE YANKE
[RUNWAY]
09 27 090 270 N048.00.00.000 E011.00.00.000 N048.00.00.000 E011.01.00.000
[FIXES]
XRAY N048.00.00.000 E011.00.00.000
YANKE N048.10.00.000 E011.10.00.000
[AIRPORT]
EXXX 000.000 N048.00.00.000 E011.00.30.000
",
        );

        assert_eq_sorted!(sct.errors.0, vec![]);
        assert_eq!(sct.low_airways[0].fixes.len(), 2);
        assert_eq!(sct.airports[0].runways.len(), 2);
    }

    #[test]
    fn test_idempotent() {
        assert_eq!(Sct::parse(SCT).unwrap(), Sct::parse(SCT).unwrap());
    }

    #[test]
    fn test_serialize() {
        let sct = Sct::parse(SCT).unwrap();
        let json = serde_json::to_value(&sct).unwrap();

        assert_eq!(json["navaids"][0]["designator"], "NUB");
        assert_eq!(json["high_airways"][0]["fixes"][0]["type"], "Fix");
        assert!(json.get("low_segments").is_none());
    }
}
