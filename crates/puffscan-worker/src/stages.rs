//! The canonical scan stages of the inhaler workflow.
//!
//! Three reference points are located in order, each scan starting where
//! the previous one halted: the inhaler entering frame, the inhaler at the
//! face, and the inhaler leaving frame. Each stage maps its numbered
//! sub-questions onto a subset of the action catalogue.

use puffscan_models::{ActionCatalog, QuestionMap, ReferenceCatalog};
use puffscan_vlm::{build_scan_prompt, PromptPair};

use crate::error::{WorkerError, WorkerResult};
use crate::scanner::ScanParams;

/// One scan stage: which reference point it finds, how wide its windows
/// are, and which catalogue keys its sub-questions map to.
#[derive(Debug, Clone)]
pub struct StageSpec {
    pub reference_key: &'static str,
    pub segment_secs: f64,
    questions: &'static [(u32, &'static str)],
}

impl StageSpec {
    /// Sub-question index to catalogue key mapping for the commit.
    pub fn question_map(&self) -> QuestionMap {
        self.questions
            .iter()
            .map(|&(q, key)| (q, key.to_string()))
            .collect()
    }

    pub fn params(&self) -> ScanParams {
        ScanParams::for_segment(self.segment_secs)
    }

    /// Build the dual-task prompt for this stage from the catalogues.
    pub fn prompt(
        &self,
        references: &ReferenceCatalog,
        actions: &ActionCatalog,
    ) -> WorkerResult<PromptPair> {
        let reference_question = references.description(self.reference_key).ok_or_else(|| {
            WorkerError::config_error(format!(
                "Reference key '{}' missing from catalogue",
                self.reference_key
            ))
        })?;

        let mut sub_questions = Vec::with_capacity(self.questions.len());
        for &(question, key) in self.questions {
            let text = actions.description(key).ok_or_else(|| {
                WorkerError::config_error(format!(
                    "Q{} maps to unknown action key '{}'",
                    question, key
                ))
            })?;
            sub_questions.push(text.to_string());
        }

        Ok(build_scan_prompt(reference_question, &sub_questions))
    }
}

/// The three stages, in scan order.
pub fn canonical_stages() -> Vec<StageSpec> {
    vec![
        StageSpec {
            reference_key: "inhaler_in",
            segment_secs: 3.0,
            questions: &[(1, "sit_stand")],
        },
        StageSpec {
            reference_key: "face_on_inhaler",
            segment_secs: 2.0,
            questions: &[
                (1, "sit_stand"),
                (2, "remove_cover"),
                (3, "inspect_mouthpiece"),
                (4, "shake_inhaler"),
                (5, "hold_inhaler"),
                (6, "load_dose"),
                (7, "exhale_before"),
                (8, "seal_lips"),
            ],
        },
        StageSpec {
            reference_key: "inhaler_out",
            segment_secs: 3.0,
            questions: &[
                (1, "seal_lips"),
                (2, "inhale_deeply"),
                (3, "remove_inhaler"),
                (4, "hold_breath"),
                (5, "exhale_after"),
                (6, "remove_capsule"),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_and_windows() {
        let stages = canonical_stages();
        assert_eq!(stages.len(), 3);
        assert_eq!(stages[0].reference_key, "inhaler_in");
        assert_eq!(stages[1].reference_key, "face_on_inhaler");
        assert_eq!(stages[2].reference_key, "inhaler_out");

        assert!((stages[1].segment_secs - 2.0).abs() < 1e-9);
        assert_eq!(stages[1].params().columns(), 10);
    }

    #[test]
    fn test_all_stage_keys_resolve_in_catalogues() {
        let references = ReferenceCatalog::inhaler();
        let actions = ActionCatalog::inhaler();

        for stage in canonical_stages() {
            assert!(references.get(stage.reference_key).is_some());
            for key in stage.question_map().values() {
                assert!(actions.contains(key), "unknown action key {}", key);
            }
        }
    }

    #[test]
    fn test_stage_prompt_contains_mapped_questions() {
        let references = ReferenceCatalog::inhaler();
        let actions = ActionCatalog::inhaler();
        let stages = canonical_stages();

        let prompt = stages[1].prompt(&references, &actions).unwrap();
        assert!(prompt.user.contains("Q8_Answer"));
        assert!(prompt.user.contains("mouthpiece cover"));
        assert!(!prompt.user.contains("Q9"));

        let prompt = stages[0].prompt(&references, &actions).unwrap();
        assert!(prompt
            .user
            .contains("Is the inhaler visible at any point throughout the images?"));
        assert!(prompt.user.contains("sitting or standing"));
    }

    #[test]
    fn test_prompt_with_missing_key_is_config_error() {
        let references = ReferenceCatalog::new(vec![]);
        let actions = ActionCatalog::inhaler();
        let stages = canonical_stages();

        let err = stages[0].prompt(&references, &actions).unwrap_err();
        assert!(matches!(err, WorkerError::ConfigError(_)));
    }
}
