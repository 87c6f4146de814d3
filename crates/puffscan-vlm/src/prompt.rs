//! Dual-task prompt construction.
//!
//! The user prompt carries two tasks in one message: Task 1 asks the
//! overall reference question per image, Task 2 asks the numbered
//! sub-questions over the frames as a sequence. The output format lines
//! here and the regexes in `parser` are two halves of one contract;
//! change them together.

/// System and user prompt for one scan window.
#[derive(Debug, Clone)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that analyzes images and \
     videos to determine if the user is performing a specific action.";

/// Build the dual-task prompt for a reference question plus ordered
/// sub-question texts (numbered Q1..Qn in slice order).
pub fn build_scan_prompt(reference_question: &str, sub_questions: &[String]) -> PromptPair {
    let mut user = String::new();

    user.push_str("[Task 1] Individual Image Analysis\n");
    user.push_str("Analyze each image independently without using context from other images.\n\n");
    user.push_str(&format!("Question: {}\n\n", reference_question));
    user.push_str("* Judgment Criteria (apply all):\n");
    user.push_str("- Each image is evaluated as a standalone frame.\n");
    user.push_str("- If the person holds an object, treat it as an inhaler.\n");
    user.push_str(
        "- If consecutive images satisfy the above conditions, the overall answer is YES; \
         otherwise, NO.\n\n",
    );
    user.push_str("* Output Format:\n");
    user.push_str("Overall_Answer: [YES or NO]\n");
    user.push_str("Reason: {Explain the decision very briefly.}\n\n");

    user.push_str("[Task 2] Sequential Video Analysis\n");
    user.push_str("Analyze the sequence of images as consecutive video frames.\n\n");
    for (i, question) in sub_questions.iter().enumerate() {
        user.push_str(&format!("Q{}. {}\n", i + 1, question));
    }
    user.push('\n');
    user.push_str("* Judgment Criteria (apply all):\n");
    user.push_str("- Treat all frames as parts of a continuous video.\n");
    user.push_str(
        "- Use temporal continuity to determine whether the inhaler appears across frames.\n",
    );
    user.push_str(
        "- Allow inference of inhaler visibility even if partially obscured in some frames, \
         based on continuity.\n\n",
    );
    user.push_str("* Output Format:\n");
    for i in 1..=sub_questions.len() {
        user.push_str(&format!("Q{}_Answer: [YES or NO]\n", i));
        user.push_str(&format!(
            "Q{}_Confidence: [0.0 to 1.0, indicating your confidence level in the answer]\n",
            i
        ));
    }

    PromptPair {
        system: DEFAULT_SYSTEM_PROMPT.to_string(),
        user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_numbers_questions_in_order() {
        let prompt = build_scan_prompt(
            "Is the inhaler near the face?",
            &[
                "Is the person seated?".to_string(),
                "Is the cover removed?".to_string(),
            ],
        );

        assert!(prompt.user.contains("Question: Is the inhaler near the face?"));
        assert!(prompt.user.contains("Q1. Is the person seated?"));
        assert!(prompt.user.contains("Q2. Is the cover removed?"));
        assert!(prompt.user.contains("Q2_Answer: [YES or NO]"));
        assert!(prompt.user.contains("Q2_Confidence:"));
        assert!(!prompt.user.contains("Q3"));
    }

    #[test]
    fn test_prompt_carries_both_tasks() {
        let prompt = build_scan_prompt("Is the inhaler visible?", &["Q text".to_string()]);
        assert!(prompt.user.contains("[Task 1] Individual Image Analysis"));
        assert!(prompt.user.contains("[Task 2] Sequential Video Analysis"));
        assert!(prompt.user.contains("Overall_Answer: [YES or NO]"));
        assert_eq!(prompt.system, DEFAULT_SYSTEM_PROMPT);
    }
}
