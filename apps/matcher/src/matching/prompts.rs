// Prompt text for the Match Oracle.

/// System prompt for scoring — the reply must be a bare number.
pub const SCORE_SYSTEM: &str = "You are a job matching expert. \
    You MUST respond with a single decimal number between 0 and 1. \
    Do NOT include any other text, labels, units or explanations.";

/// Builds the scoring prompt from an already truncated description and the skill list.
pub fn score_prompt(description: &str, skills: &str) -> String {
    format!(
        "Given a job description and a list of candidate skills, determine how well the \
candidate matches the job on a scale of 0 to 1 (0 = no match, 1 = perfect match). \
Consider skill relevance, implied requirements, and context. \
Return only a float value between 0 and 1.

Job Description:
{description}

Candidate Skills:
{skills}"
    )
}
