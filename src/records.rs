use pest::{iterators::Pair, Parser};
use pest_derive::Parser;
use tracing::debug;

use crate::{
    airway::NamedSegment,
    error::ParseErrorKind,
    line::Line,
    locations::{AirspaceClass, Airport, Fix, Locations, Navaid, NavaidType, Runway},
    section::Section,
};

#[derive(Parser)]
#[grammar = "pest/sct.pest"]
pub struct SctParser;

/// Both ends of one runway line, plus the airport the line names, if any.
#[derive(Clone, Debug, PartialEq)]
pub struct RunwayRecord {
    pub ends: [Runway; 2],
    pub aerodrome: Option<String>,
}

fn fields(
    rule: Rule,
    section: Section,
    content: &str,
) -> Result<Vec<Pair<'_, Rule>>, ParseErrorKind> {
    SctParser::parse(rule, content)
        .ok()
        .and_then(|mut pairs| pairs.next())
        .map(|record| {
            record
                .into_inner()
                .filter(|pair| pair.as_rule() != Rule::EOI)
                .collect()
        })
        .ok_or(ParseErrorKind::MalformedRecord(section))
}

/// `115.750` becomes `115750`, anything unreadable becomes 0.
pub fn parse_frequency(frequency: &str) -> u32 {
    match frequency.parse::<f64>() {
        Ok(mhz) if mhz.is_finite() && mhz >= 0.0 => (mhz * 1000.0).round() as u32,
        _ => {
            debug!("invalid frequency {frequency}, using 0");
            0
        }
    }
}

fn parse_heading(heading: &Pair<Rule>, section: Section) -> Result<u16, ParseErrorKind> {
    heading
        .as_str()
        .parse()
        .map_err(|_| ParseErrorKind::MalformedRecord(section))
}

pub fn parse_navaid(
    content: &str,
    navaid_type: NavaidType,
    locations: &Locations,
) -> Result<Navaid, ParseErrorKind> {
    let section = match navaid_type {
        NavaidType::Vor => Section::Vor,
        NavaidType::Ndb => Section::Ndb,
    };
    let fields = fields(Rule::navaid, section, content)?;
    let [designator, frequency, lat, lng] = &fields[..] else {
        return Err(ParseErrorKind::MalformedRecord(section));
    };

    Ok(Navaid {
        fix: Fix {
            designator: designator.as_str().to_string(),
            coordinate: locations.resolve_coordinate(lat.as_str(), lng.as_str())?,
        },
        frequency: parse_frequency(frequency.as_str()),
        navaid_type,
    })
}

pub fn parse_airport(content: &str, locations: &Locations) -> Result<Airport, ParseErrorKind> {
    let fields = fields(Rule::airport, Section::Airport, content)?;
    let (designator, lat, lng, class) = match &fields[..] {
        [designator, _, lat, lng] => (designator, lat, lng, None),
        [designator, _, lat, lng, class] => (designator, lat, lng, Some(class.as_str())),
        _ => return Err(ParseErrorKind::MalformedRecord(Section::Airport)),
    };
    let airspace_class = class
        .map(|class| {
            AirspaceClass::from_designator(class)
                .ok_or_else(|| ParseErrorKind::InvalidAirspaceClass(class.to_string()))
        })
        .transpose()?;

    Ok(Airport {
        fix: Fix {
            designator: designator.as_str().to_string(),
            coordinate: locations.resolve_coordinate(lat.as_str(), lng.as_str())?,
        },
        iata: None,
        airspace_class,
        runways: vec![],
    })
}

pub fn parse_fix(content: &str, locations: &Locations) -> Result<Fix, ParseErrorKind> {
    let fields = fields(Rule::fix, Section::Fixes, content)?;
    let [designator, lat, lng] = &fields[..] else {
        return Err(ParseErrorKind::MalformedRecord(Section::Fixes));
    };

    Ok(Fix {
        designator: designator.as_str().to_string(),
        coordinate: locations.resolve_coordinate(lat.as_str(), lng.as_str())?,
    })
}

pub fn parse_runway(content: &str, locations: &Locations) -> Result<RunwayRecord, ParseErrorKind> {
    let fields = fields(Rule::runway, Section::Runway, content)?;
    let (Some([id1, id2, hdg1, hdg2, lat1, lng1, lat2, lng2]), rest) =
        (fields.first_chunk::<8>(), fields.get(8..))
    else {
        return Err(ParseErrorKind::MalformedRecord(Section::Runway));
    };
    let aerodrome = rest
        .and_then(|rest| rest.iter().find(|pair| pair.as_rule() == Rule::aerodrome))
        .map(|aerodrome| aerodrome.as_str().to_string());

    Ok(RunwayRecord {
        ends: [
            Runway {
                designator: id1.as_str().to_string(),
                threshold: locations.resolve_coordinate(lat1.as_str(), lng1.as_str())?,
                heading: parse_heading(hdg1, Section::Runway)?,
            },
            Runway {
                designator: id2.as_str().to_string(),
                threshold: locations.resolve_coordinate(lat2.as_str(), lng2.as_str())?,
                heading: parse_heading(hdg2, Section::Runway)?,
            },
        ],
        aerodrome,
    })
}

pub fn parse_segment(
    line: &Line,
    section: Section,
    locations: &Locations,
) -> Result<NamedSegment, ParseErrorKind> {
    let fields = fields(Rule::segment, section, line.content)?;
    let [label, lat1, lng1, lat2, lng2] = &fields[..] else {
        return Err(ParseErrorKind::MalformedRecord(section));
    };

    Ok(NamedSegment {
        label: label.as_str().to_string(),
        start: locations.resolve_coordinate(lat1.as_str(), lng1.as_str())?,
        end: locations.resolve_coordinate(lat2.as_str(), lng2.as_str())?,
        line_number: line.number,
        line: line.content.to_string(),
    })
}
