//! Prompt text sent to the generation service, and the deterministic
//! feedback used when the service cannot provide any.

use crate::model::FeedbackSource;

/// Default prompt for generating a new problem.
pub const PROBLEM_PROMPT: &str = "Generate a single math word problem suitable for a Primary 5 student. The answer must be a whole number, and the problem must be parsable as a JSON object with 'problem_text' (string) and 'final_answer' (number) keys.";

/// Default system prompt for all generation calls.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly math tutor for primary school students. When asked for JSON, respond with a single JSON object and nothing else.";

/// Build the feedback request for a graded answer.
///
/// The incorrect-path prompt names the correct answer but asks the service
/// not to give away the full solution.
pub fn feedback_prompt(
    problem_text: &str,
    user_answer: f64,
    correct_answer: f64,
    is_correct: bool,
) -> String {
    if is_correct {
        format!(
            "The user correctly answered the following math problem: \"{problem_text}\". \
             Their answer was {user_answer}. Generate a congratulatory and encouraging \
             feedback message for a Primary 5 student. The response must be ONLY a JSON \
             object with a 'feedback_text' field."
        )
    } else {
        format!(
            "The user answered {user_answer} for the math problem: \"{problem_text}\". \
             The correct answer is {correct_answer}. Generate an encouraging, corrective, \
             and personalized feedback message for a Primary 5 student. Gently point out \
             the error without giving the full solution immediately. The response must be \
             ONLY a JSON object with a 'feedback_text' field."
        )
    }
}

/// Feedback used when the generation service gave nothing usable.
pub fn fallback_feedback(is_correct: bool, correct_answer: f64, source: FeedbackSource) -> String {
    let reason = match source {
        FeedbackSource::ServiceFallback => "AI service error",
        FeedbackSource::ParseFallback | FeedbackSource::Generated => "AI parsing failed",
    };
    if is_correct {
        format!("That's correct! Excellent work. ({reason}, using default feedback)")
    } else {
        format!("Incorrect. The correct answer is {correct_answer}. ({reason}, using default feedback)")
    }
}
