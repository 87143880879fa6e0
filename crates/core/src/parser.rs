use std::fmt;
use std::ops::Range;

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::model::Priority;

static DIRECTIVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!(?:(?P<digit>[0-9])|before)").expect("valid regex"));
const CLOSING_PUNCTUATION: [char; 6] = [',', '.', ';', ':', '?', ')'];

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<day>[0-9]{2})(?P<sep1>[.\-])(?P<month>[0-9]{2})(?P<sep2>[.\-])(?P<year>[0-9]{4})")
        .expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    Priority,
    Deadline,
}

impl DirectiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DirectiveKind::Priority => "priority",
            DirectiveKind::Deadline => "deadline",
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directive that was honored and stripped from the title. `span` is the
/// byte range it occupied in the raw input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MacroDirective {
    Priority {
        level: Priority,
        span: Range<usize>,
    },
    Deadline {
        at: DateTime<Utc>,
        span: Range<usize>,
    },
}

impl MacroDirective {
    pub fn kind(&self) -> DirectiveKind {
        match self {
            MacroDirective::Priority { .. } => DirectiveKind::Priority,
            MacroDirective::Deadline { .. } => DirectiveKind::Deadline,
        }
    }

    pub fn span(&self) -> &Range<usize> {
        match self {
            MacroDirective::Priority { span, .. } | MacroDirective::Deadline { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MacroErrorReason {
    #[error("unrecognized priority level")]
    UnrecognizedPriority,
    #[error("invalid or past macro deadline")]
    InvalidOrPastDeadline,
}

/// A directive that failed validation. Its text stays in the title.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind} directive '{text}': {reason}")]
pub struct MacroError {
    pub kind: DirectiveKind,
    pub text: String,
    pub span: Range<usize>,
    pub reason: MacroErrorReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseResult {
    pub title: String,
    pub priority: Option<Priority>,
    pub deadline: Option<DateTime<Utc>>,
    pub directives: Vec<MacroDirective>,
    pub errors: Vec<MacroError>,
}

impl ParseResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parse inline directives using the machine's local time zone for deadlines.
pub fn parse_title(raw: &str, now: DateTime<Utc>) -> ParseResult {
    parse_title_in(raw, now, &Local)
}

/// Parse inline directives, interpreting `!before` dates as the start of the
/// day in `tz`.
///
/// Only the first directive of each kind is considered; later ones are left
/// as plain text. Invalid directives are reported and kept in the title.
pub fn parse_title_in<Tz: TimeZone>(raw: &str, now: DateTime<Utc>, tz: &Tz) -> ParseResult {
    let mut directives = Vec::new();
    let mut errors = Vec::new();
    let mut priority = None;
    let mut deadline = None;
    let mut seen_priority = false;
    let mut seen_deadline = false;
    let mut cursor = 0;

    while let Some(mat) = DIRECTIVE_RE.captures_at(raw, cursor) {
        let Some(whole) = mat.get(0) else {
            break;
        };
        cursor = whole.end();

        if !at_token_boundary(&raw[whole.end()..]) {
            continue;
        }

        if let Some(digit) = mat.name("digit") {
            if seen_priority {
                continue;
            }
            seen_priority = true;
            let span = whole.range();
            match priority_for_digit(digit.as_str()) {
                Some(level) => {
                    priority = Some(level);
                    directives.push(MacroDirective::Priority { level, span });
                }
                None => errors.push(MacroError {
                    kind: DirectiveKind::Priority,
                    text: raw[span.clone()].to_string(),
                    span,
                    reason: MacroErrorReason::UnrecognizedPriority,
                }),
            }
            continue;
        }

        if seen_deadline {
            continue;
        }
        seen_deadline = true;

        let (argument, argument_start) = deadline_argument(raw, whole.end());
        match parse_deadline(argument, now, tz) {
            Some((at, consumed)) => {
                let span = whole.start()..argument_start + consumed;
                cursor = span.end;
                deadline = Some(at);
                directives.push(MacroDirective::Deadline { at, span });
            }
            None => {
                let span = whole.start()..argument_start + argument.len();
                cursor = cursor.max(span.end);
                errors.push(MacroError {
                    kind: DirectiveKind::Deadline,
                    text: raw[span.clone()].to_string(),
                    span,
                    reason: MacroErrorReason::InvalidOrPastDeadline,
                });
            }
        }
    }

    let spans: Vec<Range<usize>> = directives.iter().map(|d| d.span().clone()).collect();
    ParseResult {
        title: strip_spans(raw, &spans),
        priority,
        deadline,
        directives,
        errors,
    }
}

fn priority_for_digit(digit: &str) -> Option<Priority> {
    match digit {
        "1" => Some(Priority::Critical),
        "2" => Some(Priority::High),
        "3" => Some(Priority::Medium),
        "4" => Some(Priority::Low),
        _ => None,
    }
}

fn at_token_boundary(rest: &str) -> bool {
    rest.chars()
        .next()
        .map_or(true, |c| !(c.is_alphanumeric() || c == '_'))
}

/// Returns the argument following `!before` and its byte offset. It ends at
/// whitespace or at the next `!`, and is empty when none is present.
fn deadline_argument(raw: &str, keyword_end: usize) -> (&str, usize) {
    let rest = &raw[keyword_end..];
    let trimmed = rest.trim_start();
    let start = keyword_end + (rest.len() - trimmed.len());
    if start == keyword_end || trimmed.starts_with('!') {
        return ("", keyword_end);
    }
    let len = trimmed
        .find(|c: char| c.is_whitespace() || c == '!')
        .unwrap_or(trimmed.len());
    (&trimmed[..len], start)
}

/// Parses `DD.MM.YYYY` (or `DD-MM-YYYY`) at the start of `argument`. Returns
/// the instant and the number of bytes the date occupied; trailing
/// punctuation is left to the title.
fn parse_deadline<Tz: TimeZone>(
    argument: &str,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Option<(DateTime<Utc>, usize)> {
    let caps = DATE_RE.captures(argument)?;
    if caps["sep1"] != caps["sep2"] {
        return None;
    }
    let consumed = caps.get(0)?.end();
    if argument[consumed..].chars().any(char::is_alphanumeric) {
        return None;
    }

    let day: u32 = caps["day"].parse().ok()?;
    let month: u32 = caps["month"].parse().ok()?;
    let year: i32 = caps["year"].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let at = start_of_day(date, tz)?;

    if at <= now {
        return None;
    }
    Some((at, consumed))
}

fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Option<DateTime<Utc>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    tz.from_local_datetime(&midnight)
        .earliest()
        // Zones that skip midnight on a DST change start the day an hour later.
        .or_else(|| {
            tz.from_local_datetime(&(midnight + Duration::hours(1)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
}

/// Removes `spans` from `raw`, collapsing the whitespace around each removed
/// span into at most one space. Returns `raw` untouched when nothing is removed.
fn strip_spans(raw: &str, spans: &[Range<usize>]) -> String {
    if spans.is_empty() {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut seam: Option<bool> = None;
    let mut cursor = 0;

    for span in spans {
        push_segment(&mut out, &raw[cursor..span.start], &mut seam);
        let kept = out.trim_end().len();
        let had_space = kept != out.len();
        out.truncate(kept);
        seam = Some(seam.unwrap_or(false) || had_space);
        cursor = span.end;
    }
    push_segment(&mut out, &raw[cursor..], &mut seam);

    out.trim().to_string()
}

fn push_segment(out: &mut String, segment: &str, seam: &mut Option<bool>) {
    let Some(had_space) = *seam else {
        out.push_str(segment);
        return;
    };

    let rest = segment.trim_start();
    let had_space = had_space || rest.len() != segment.len();
    if rest.is_empty() {
        *seam = Some(had_space);
        return;
    }
    if had_space && !out.is_empty() && !rest.starts_with(&CLOSING_PUNCTUATION[..]) {
        out.push(' ');
    }
    out.push_str(rest);
    *seam = None;
}
