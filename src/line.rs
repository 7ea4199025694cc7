use pest::Parser as _;

use crate::{
    records::{Rule, SctParser},
    section::Section,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineKind {
    Header {
        name: String,
        section: Option<Section>,
    },
    Data,
}

/// A non-empty line with comments stripped, still carrying its position in the input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line<'a> {
    pub number: usize,
    pub content: &'a str,
    pub kind: LineKind,
}

/// `\r\n`, `\n` and a lone `\r` each end a line, also when mixed in one file.
fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .flat_map(|line| line.strip_suffix('\r').unwrap_or(line).split('\r'))
        .collect()
}

/// Cuts the line at the first `;` or `//` that is not inside double quotes.
pub fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    let mut chars = line.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => return &line[..idx],
            '/' if !in_quotes && chars.peek().is_some_and(|(_, next)| *next == '/') => {
                return &line[..idx];
            }
            _ => {}
        }
    }

    line
}

fn is_define(line: &str) -> bool {
    line.get(..7)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("#define"))
}

fn parse_header(content: &str) -> LineKind {
    let name = SctParser::parse(Rule::section_header, content)
        .ok()
        .and_then(|mut pairs| pairs.next())
        .and_then(|header| {
            header
                .into_inner()
                .find(|pair| pair.as_rule() == Rule::section_name)
        })
        .map(|name| name.as_str().trim().to_string());

    match name {
        Some(name) => LineKind::Header {
            section: Section::from_header(&name),
            name,
        },
        // e.g. a missing closing bracket, reported with the whole line as its name
        None => LineKind::Header {
            name: content.trim_start_matches('[').to_string(),
            section: None,
        },
    }
}

pub fn classify(text: &str) -> Vec<Line<'_>> {
    split_lines(text)
        .into_iter()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let content = strip_comment(raw).trim();
            if content.is_empty() || is_define(content) {
                return None;
            }

            let kind = if content.starts_with('[') {
                parse_header(content)
            } else {
                LineKind::Data
            };

            Some(Line {
                number: idx + 1,
                content,
                kind,
            })
        })
        .collect()
}
