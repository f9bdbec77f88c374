use crate::models::domain::question::Difficulty;

pub const GENERATION_SYSTEM_PROMPT: &str =
    "You are an expert quiz question generator. Return only valid JSON arrays with quiz questions.";

/// Builds the topic-based generation prompt. The output contract is a bare
/// JSON array of {question, option_a..option_d, correct_answer, explanation}
/// objects; anything else is rejected by candidate validation.
pub fn build_generation_prompt(
    topic: &str,
    category: &str,
    difficulty: Difficulty,
    count: usize,
    concepts: &[String],
) -> String {
    let concept_block = if concepts.is_empty() {
        format!("Generate questions about {topic} in the {category} category.")
    } else {
        concepts
            .iter()
            .enumerate()
            .map(|(i, concept)| format!("{}. {}", i + 1, concept))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You are an expert exam question setter for competitive exams.

Topic: {topic}
Category: {category}
Difficulty: {difficulty}

Generate exactly {count} UNIQUE multiple choice questions about {topic}.

REQUIREMENTS:
1. Each question must be clear and unambiguous
2. All 4 options must be plausible
3. Only one correct answer per question
4. Questions should match the {difficulty} difficulty level:
   - Easy: Basic recall and simple concepts
   - Medium: Application and understanding
   - Hard: Analysis, complex scenarios, edge cases

Focus on these concepts: {concept_block}

OUTPUT FORMAT - Return ONLY a JSON array with exactly {count} questions:
[
  {{
    "question": "Your question text here?",
    "option_a": "First option",
    "option_b": "Second option",
    "option_c": "Third option",
    "option_d": "Fourth option",
    "correct_answer": "A",
    "explanation": "Brief explanation of why this is correct"
  }}
]

IMPORTANT: Return ONLY the JSON array. No text before or after.
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_numbers_concepts() {
        let concepts = vec!["closures".to_string(), "decorators".to_string()];
        let prompt =
            build_generation_prompt("Python", "Programming", Difficulty::Medium, 5, &concepts);

        assert!(prompt.contains("1. closures"));
        assert!(prompt.contains("2. decorators"));
        assert!(prompt.contains("exactly 5 UNIQUE"));
        assert!(prompt.contains("Difficulty: medium"));
    }

    #[test]
    fn prompt_falls_back_when_no_concepts() {
        let prompt = build_generation_prompt("Python", "Programming", Difficulty::Easy, 3, &[]);

        assert!(prompt.contains("Generate questions about Python in the Programming category."));
    }
}
