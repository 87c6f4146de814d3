//! Tolerant extraction of structured verdicts from free-form model text.
//!
//! Models wrap the requested format in markdown emphasis, change case,
//! and reorder lines. The regexes here accept all of that; anything that
//! still fails to match degrades (Unknown overall, missing confidence)
//! instead of failing the window.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

/// Task 1 verdict for a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overall {
    Yes,
    No,
    /// No recognizable `Overall_Answer:` marker in the text.
    Unknown,
}

impl Overall {
    /// Only an explicit YES halts the scan.
    pub fn is_positive(&self) -> bool {
        matches!(self, Overall::Yes)
    }
}

/// Task 2 verdict for one numbered question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuestionVerdict {
    pub yes: bool,
    pub confidence: Option<f64>,
}

/// Everything extracted from one model response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub overall: Overall,
    pub questions: BTreeMap<u32, QuestionVerdict>,
}

fn overall_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\*{0,2}Overall_Answer:\s*\*{0,2}\s*(YES|NO)").expect("valid regex")
    })
}

fn answer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\*{0,2}Q(\d+)_Answer:\s*\*{0,2}\s*(YES|NO)").expect("valid regex")
    })
}

fn confidence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\*{0,2}Q(\d+)_Confidence:\s*\*{0,2}\s*(\d+(?:\.\d+)?)")
            .expect("valid regex")
    })
}

/// Parse a raw model response.
pub fn parse_response(text: &str) -> ParsedResponse {
    let overall = match overall_re().captures(text) {
        Some(caps) => {
            if caps[1].eq_ignore_ascii_case("YES") {
                Overall::Yes
            } else {
                Overall::No
            }
        }
        None => {
            debug!("No Overall_Answer marker in response");
            Overall::Unknown
        }
    };

    let mut questions = BTreeMap::new();
    for caps in answer_re().captures_iter(text) {
        let Ok(index) = caps[1].parse::<u32>() else {
            continue;
        };
        let yes = caps[2].eq_ignore_ascii_case("YES");
        questions.insert(
            index,
            QuestionVerdict {
                yes,
                confidence: None,
            },
        );
    }

    for caps in confidence_re().captures_iter(text) {
        let Ok(index) = caps[1].parse::<u32>() else {
            continue;
        };
        // A confidence line with no matching answer line is dropped.
        if let Some(verdict) = questions.get_mut(&index) {
            verdict.confidence = caps[2].parse::<f64>().ok();
        }
    }

    ParsedResponse { overall, questions }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_format() {
        let parsed = parse_response(
            "Overall_Answer: NO\n\
             Reason: The inhaler is on the table.\n\
             Q1_Answer: YES\n\
             Q1_Confidence: 0.85\n\
             Q2_Answer: NO\n\
             Q2_Confidence: 0.4\n",
        );

        assert_eq!(parsed.overall, Overall::No);
        assert_eq!(parsed.questions.len(), 2);
        assert_eq!(
            parsed.questions[&1],
            QuestionVerdict {
                yes: true,
                confidence: Some(0.85)
            }
        );
        assert_eq!(
            parsed.questions[&2],
            QuestionVerdict {
                yes: false,
                confidence: Some(0.4)
            }
        );
    }

    #[test]
    fn test_markdown_emphasis_and_case_tolerated() {
        let parsed = parse_response(
            "**Overall_Answer:** yes\n\
             **Q1_Answer:** **NO**\n\
             **q1_confidence:** 0.7\n",
        );

        assert_eq!(parsed.overall, Overall::Yes);
        assert!(parsed.overall.is_positive());
        assert_eq!(
            parsed.questions[&1],
            QuestionVerdict {
                yes: false,
                confidence: Some(0.7)
            }
        );
    }

    #[test]
    fn test_missing_overall_is_unknown() {
        let parsed = parse_response("Q1_Answer: YES\nQ1_Confidence: 0.9\n");
        assert_eq!(parsed.overall, Overall::Unknown);
        assert!(!parsed.overall.is_positive());
        assert_eq!(parsed.questions.len(), 1);
    }

    #[test]
    fn test_missing_confidence_is_none() {
        let parsed = parse_response("Overall_Answer: NO\nQ3_Answer: YES\n");
        assert_eq!(
            parsed.questions[&3],
            QuestionVerdict {
                yes: true,
                confidence: None
            }
        );
    }

    #[test]
    fn test_malformed_confidence_does_not_abort() {
        let parsed = parse_response(
            "Overall_Answer: NO\n\
             Q1_Answer: YES\n\
             Q1_Confidence: very sure\n\
             Q2_Answer: NO\n\
             Q2_Confidence: 0.3\n",
        );

        assert_eq!(parsed.questions[&1].confidence, None);
        assert_eq!(parsed.questions[&2].confidence, Some(0.3));
    }

    #[test]
    fn test_arbitrary_question_indices() {
        let parsed = parse_response(
            "Overall_Answer: YES\n\
             Q12_Answer: NO\n\
             Q12_Confidence: 0.55\n",
        );
        assert_eq!(
            parsed.questions[&12],
            QuestionVerdict {
                yes: false,
                confidence: Some(0.55)
            }
        );
    }

    #[test]
    fn test_orphan_confidence_dropped() {
        let parsed = parse_response("Overall_Answer: NO\nQ5_Confidence: 0.9\n");
        assert!(parsed.questions.is_empty());
    }

    #[test]
    fn test_empty_text() {
        let parsed = parse_response("");
        assert_eq!(parsed.overall, Overall::Unknown);
        assert!(parsed.questions.is_empty());
    }
}
