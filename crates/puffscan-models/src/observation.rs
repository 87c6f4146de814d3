//! Per-window observations collected while scanning a video.

use serde::{Deserialize, Serialize};

/// A yes/no verdict reported by the model for one sub-question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Answer {
    Yes,
    No,
}

impl Answer {
    /// Numeric score used by the store and the aggregator (YES → 1, NO → 0).
    pub fn score(&self) -> u8 {
        match self {
            Answer::Yes => 1,
            Answer::No => 0,
        }
    }

    /// Parse a verdict token, case-insensitively.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "YES" => Some(Answer::Yes),
            "NO" => Some(Answer::No),
            _ => None,
        }
    }
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Answer::Yes => write!(f, "YES"),
            Answer::No => write!(f, "NO"),
        }
    }
}

/// One (time, verdict, confidence) triple recorded for an action step
/// during a single scan window.
///
/// Confidence is the model's self-reported scalar in [0, 1]; it is advisory
/// metadata and never gates control flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Window start time in seconds, rounded to one decimal place.
    pub time: f64,
    pub answer: Answer,
    pub confidence: Option<f64>,
}

impl Observation {
    pub fn new(time: f64, answer: Answer, confidence: Option<f64>) -> Self {
        Self {
            time: round1(time),
            answer,
            confidence,
        }
    }
}

/// Round a timestamp to one decimal place.
///
/// All observation timestamps carry this rounding so that parallel runs
/// with identical scan parameters merge by exact timestamp identity.
pub fn round1(t: f64) -> f64 {
    (t * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_score() {
        assert_eq!(Answer::Yes.score(), 1);
        assert_eq!(Answer::No.score(), 0);
    }

    #[test]
    fn test_answer_from_token() {
        assert_eq!(Answer::from_token("yes"), Some(Answer::Yes));
        assert_eq!(Answer::from_token("NO"), Some(Answer::No));
        assert_eq!(Answer::from_token("maybe"), None);
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(2.9999999), 3.0);
        assert_eq!(round1(0.25), 0.3);
        assert_eq!(round1(6.0), 6.0);
    }

    #[test]
    fn test_observation_rounds_time() {
        let obs = Observation::new(1.2499, Answer::Yes, Some(0.9));
        assert_eq!(obs.time, 1.2);
    }
}
