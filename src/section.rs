use std::fmt::Display;

use bevy_reflect::Reflect;
use itertools::Itertools as _;
use phf::phf_map;
use serde::Serialize;

use crate::line::{Line, LineKind};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Reflect)]
pub enum Section {
    Info,
    Vor,
    Ndb,
    Airport,
    Runway,
    Fixes,
    LowAirway,
    HighAirway,
    Artcc,
    ArtccHigh,
    ArtccLow,
    Sid,
    Star,
    Geo,
    Regions,
    Labels,
}

static SECTIONS: phf::Map<&'static str, Section> = phf_map! {
    "INFO" => Section::Info,
    "VOR" => Section::Vor,
    "NDB" => Section::Ndb,
    "AIRPORT" => Section::Airport,
    "RUNWAY" => Section::Runway,
    "FIXES" => Section::Fixes,
    "LOW AIRWAY" => Section::LowAirway,
    "HIGH AIRWAY" => Section::HighAirway,
    "ARTCC" => Section::Artcc,
    "ARTCC HIGH" => Section::ArtccHigh,
    "ARTCC LOW" => Section::ArtccLow,
    "SID" => Section::Sid,
    "STAR" => Section::Star,
    "GEO" => Section::Geo,
    "REGIONS" => Section::Regions,
    "LABELS" => Section::Labels,
};

/// Sections that only define entities are read first, everything that refers to them second.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Pass {
    Navdata,
    References,
}

impl Section {
    pub fn from_header(name: &str) -> Option<Self> {
        let normalised = name.split_whitespace().join(" ").to_ascii_uppercase();
        SECTIONS.get(normalised.as_str()).copied()
    }

    /// `None` for sections that are recognised but not interpreted.
    pub fn pass(self) -> Option<Pass> {
        match self {
            Self::Info | Self::Vor | Self::Ndb | Self::Airport | Self::Fixes => Some(Pass::Navdata),
            Self::Runway | Self::LowAirway | Self::HighAirway => Some(Pass::References),
            Self::Artcc
            | Self::ArtccHigh
            | Self::ArtccLow
            | Self::Sid
            | Self::Star
            | Self::Geo
            | Self::Regions
            | Self::Labels => None,
        }
    }
}

impl Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = SECTIONS
            .entries()
            .find_map(|(name, section)| (section == self).then_some(*name))
            .unwrap_or_default();
        f.write_str(name)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Scope {
    #[default]
    BeforeFirstSection,
    Within(Section),
    Unknown,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event<'a> {
    Header,
    UnknownSection {
        name: &'a str,
        line: &'a Line<'a>,
    },
    Orphaned(&'a Line<'a>),
    /// `position` is 1-based within the current section.
    Record {
        section: Section,
        position: usize,
        line: &'a Line<'a>,
    },
    Skipped,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanState {
    pub scope: Scope,
    position: usize,
}

impl ScanState {
    pub fn step<'a>(&mut self, line: &'a Line<'a>) -> Event<'a> {
        match &line.kind {
            LineKind::Header {
                section: Some(section),
                ..
            } => {
                *self = Self {
                    scope: Scope::Within(*section),
                    position: 0,
                };
                Event::Header
            }
            LineKind::Header {
                name,
                section: None,
            } => {
                *self = Self {
                    scope: Scope::Unknown,
                    position: 0,
                };
                Event::UnknownSection { name, line }
            }
            LineKind::Data => match self.scope {
                Scope::BeforeFirstSection => Event::Orphaned(line),
                Scope::Unknown => Event::Skipped,
                Scope::Within(section) => {
                    self.position += 1;
                    Event::Record {
                        section,
                        position: self.position,
                        line,
                    }
                }
            },
        }
    }
}

pub fn scan<'a>(lines: &'a [Line<'a>]) -> impl Iterator<Item = Event<'a>> + 'a {
    lines
        .iter()
        .scan(ScanState::default(), |state, line| Some(state.step(line)))
}

#[cfg(test)]
mod test {
    use crate::line::classify;

    use super::{scan, Event, Pass, Section};

    #[test]
    fn test_from_header() {
        assert_eq!(Section::from_header("low airway"), Some(Section::LowAirway));
        assert_eq!(Section::from_header("ARTCC  HIGH"), Some(Section::ArtccHigh));
        assert_eq!(Section::from_header("Fixes"), Some(Section::Fixes));
        assert_eq!(Section::from_header("FOO"), None);
        assert_eq!(Section::Geo.pass(), None);
        assert_eq!(Section::Runway.pass(), Some(Pass::References));
        assert_eq!(Section::HighAirway.to_string(), "HIGH AIRWAY");
    }

    #[test]
    fn test_scan() {
        let lines = classify(
            "orphan\n[FIXES]\nA N0.0.0 E0.0.0\nB N0.0.0 E0.0.0\n[FOO]\nignored\n[GEO]\ngeo line\n",
        );
        let events = scan(&lines)
            .map(|event| match event {
                Event::Header => "header".to_string(),
                Event::UnknownSection { name, line } => format!("unknown {name}@{}", line.number),
                Event::Orphaned(line) => format!("orphan@{}", line.number),
                Event::Record {
                    section,
                    position,
                    line,
                } => format!("{section} #{position}@{}", line.number),
                Event::Skipped => "skipped".to_string(),
            })
            .collect::<Vec<_>>();

        assert_eq!(
            events,
            vec![
                "orphan@1",
                "header",
                "FIXES #1@3",
                "FIXES #2@4",
                "unknown FOO@5",
                "skipped",
                "header",
                "GEO #1@8",
            ]
        );
    }
}
