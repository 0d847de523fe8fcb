//! Fixed instructions for the two completion tasks.

use crate::{ChatMessage, CompletionRequest};

pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"You convert raw job postings into structured data.
Read the posting supplied by the user and reply with a single JSON object with exactly these keys:
{
  "jobTitle": "the position title",
  "company": "the hiring company name",
  "country": "the country where the role is located, or \"Remote\" when no country applies",
  "description": "a concise bullet list (one '- ' item per line) of the key requirements and responsibilities"
}
Use an empty string for any value the posting does not state. Do not invent details.
Reply with the JSON object only, without commentary or markdown."#;

pub const COMPARISON_SYSTEM_PROMPT: &str = r#"You are a recruiter assessing how well a candidate fits a job.
The user sends the candidate's resume as JSON, then the job posting text.
Reply with a single JSON object with exactly these keys:
{
  "matchScore": "an integer from 0 to 100 describing overall fit",
  "missingSkills": ["skills the posting asks for that the resume lacks"],
  "experienceGap": ["places where the candidate's experience falls short of the posting"],
  "recommendations": ["specific changes that would improve the application"]
}
Keep every list item short. Use an empty list when nothing applies.
Reply with the JSON object only, without commentary or markdown."#;

/// Extraction call: the raw posting is the only user message.
pub fn extraction_request(model: &str, posting: &str) -> CompletionRequest {
    CompletionRequest::json_object(
        model,
        vec![
            ChatMessage::system(EXTRACTION_SYSTEM_PROMPT),
            ChatMessage::user(posting),
        ],
    )
}

/// Comparison call: the resume goes in as compact JSON, followed by the posting.
pub fn comparison_request(model: &str, resume: &serde_json::Value, posting: &str) -> CompletionRequest {
    CompletionRequest::json_object(
        model,
        vec![
            ChatMessage::system(COMPARISON_SYSTEM_PROMPT),
            ChatMessage::user(format!("Resume:\n{resume}")),
            ChatMessage::user(format!("Job Posting:\n{posting}")),
        ],
    )
}
