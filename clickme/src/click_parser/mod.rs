//! Parser for serialized ClickMe click lists.
//!
//! A trial is stored as a stringified list of `(x,y)` integer tuples,
//! optionally wrapped in braces and quotes:
//!
//! ```text
//! "{(120,33),(121,40),(98,12)}"
//! ```
//!
//! Only the first `", "`-separated segment carries clicks; anything after it
//! is ignored. Trials with fewer than [`MIN_TRIAL_POINTS`] points are
//! reported as [`ParseError::Empty`]. A single click is indistinguishable
//! from the placeholder written for empty annotations, so it is rejected too.

use serde::{Deserialize, Serialize};
use thiserror::Error;


/// Fewest points a trial needs to count as a real annotation.
pub const MIN_TRIAL_POINTS: usize = 2;

/// Characters stripped before tokenizing.
const WRAPPER_CHARS: &[char] = &['{', '}', '"', '\'', '[', ']'];

const SEGMENT_SEPARATOR: &str = ", ";
const TUPLE_SEPARATOR: &str = "),(";

/// Integer click coordinate, `x` is the column and `y` the row.
pub type ClickPoint = (i32, i32);

/// Ordered clicks from one subject viewing one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trial {
    points: Vec<ClickPoint>,
}

impl Trial {
    pub fn new(points: Vec<ClickPoint>) -> Self {
        Self { points }
    }

    #[inline]
    pub fn points(&self) -> &[ClickPoint] {
        &self.points
    }

    /// Number of clicks.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Reasons a serialized trial is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Empty annotation ({points} points)")]
    Empty { points: usize },

    #[error("Malformed click tuple '{token}': {reason}")]
    Malformed { token: String, reason: String },
}

/// Parses one serialized click list into a [`Trial`].
pub fn parse_clicks(raw: &str) -> Result<Trial, ParseError> {
    let raw = raw.trim();
    if raw.chars().count() <= 2 {
        return Err(ParseError::Empty { points: 0 });
    }

    let cleaned: String = raw.chars().filter(|c| !WRAPPER_CHARS.contains(c)).collect();
    let segment = cleaned
        .split(SEGMENT_SEPARATOR)
        .next()
        .unwrap_or_default()
        .trim();
    let body = segment.trim_start_matches('(').trim_end_matches(')');
    if body.is_empty() {
        return Err(ParseError::Empty { points: 0 });
    }

    let points = body
        .split(TUPLE_SEPARATOR)
        .map(parse_pair)
        .collect::<Result<Vec<_>, _>>()?;

    if points.len() < MIN_TRIAL_POINTS {
        return Err(ParseError::Empty {
            points: points.len(),
        });
    }
    Ok(Trial::new(points))
}

fn parse_pair(token: &str) -> Result<ClickPoint, ParseError> {
    let malformed = |reason: &str| ParseError::Malformed {
        token: token.to_string(),
        reason: reason.to_string(),
    };

    let mut parts = token.split(',');
    let (Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(malformed("expected exactly two coordinates"));
    };
    let x = x
        .trim()
        .parse::<i32>()
        .map_err(|e| malformed(&e.to_string()))?;
    let y = y
        .trim()
        .parse::<i32>()
        .map_err(|e| malformed(&e.to_string()))?;
    Ok((x, y))
}
