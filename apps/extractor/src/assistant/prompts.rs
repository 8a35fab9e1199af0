// Prompt builders for the job-description assistant.

use super::conversation::NamedDocument;

pub fn jd_generation_prompt(request: &str) -> String {
    format!(
        "Generate a Job Description in strict JSON format based on: {request}. \
         Include role, skills, experience, responsibilities."
    )
}

pub fn extraction_prompt(job_description: &str, question: &str) -> String {
    format!(
        "Job Description: {job_description}\n\n\
         Answer only factual extraction questions. Question: {question}"
    )
}

pub fn reasoning_prompt(job_description: &str, question: &str) -> String {
    format!("Job Description: {job_description}\n\nAnswer reasoning question: {question}")
}

/// Candidate-matching prompt; résumés are numbered from 1 in upload order.
pub fn matching_prompt(job_description: &str, resumes: &[NamedDocument], question: &str) -> String {
    let combined = resumes
        .iter()
        .enumerate()
        .map(|(i, r)| format!("Resume {}:\n{}", i + 1, r.text))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Job Description: {job_description}\n\n\
         Resumes:\n{combined}\n\n\
         Task: Compare resumes against the JD. Identify best matching candidate(s). \
         Provide reasons for selection. If none match, clearly state 'No suitable candidate found'.\n\
         User Query: {question}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str, text: &str) -> NamedDocument {
        NamedDocument {
            name: name.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_matching_prompt_numbers_resumes_in_order() {
        let prompt = matching_prompt(
            "Senior Rust engineer",
            &[doc("b.pdf", "Bob"), doc("a.pdf", "Alice")],
            "Who fits best?",
        );

        assert!(prompt.starts_with("Job Description: Senior Rust engineer"));
        assert!(prompt.contains("Resume 1:\nBob\n\nResume 2:\nAlice"));
        assert!(prompt.contains("No suitable candidate found"));
        assert!(prompt.ends_with("User Query: Who fits best?"));
    }

    #[test]
    fn test_extraction_and_reasoning_prompts_differ() {
        let extraction = extraction_prompt("JD", "Which skills?");
        let reasoning = reasoning_prompt("JD", "Why Rust?");

        assert!(extraction.contains("Answer only factual extraction questions. Question: Which skills?"));
        assert!(reasoning.ends_with("Answer reasoning question: Why Rust?"));
    }

    #[test]
    fn test_generation_prompt_embeds_request() {
        let prompt = jd_generation_prompt("data engineer, 5 years");
        assert!(prompt.contains("based on: data engineer, 5 years."));
        assert!(prompt.contains("strict JSON"));
    }
}
