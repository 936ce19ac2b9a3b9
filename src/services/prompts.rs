//! Prompt templates for the assessment pipeline.
//!
//! Every prompt that asks for a final assessment embeds [`ASSESSMENT_SCHEMA`]
//! so the response parser has a single wrapping convention to look for.

/// Output format every final-assessment prompt asks the model to follow.
pub const ASSESSMENT_SCHEMA: &str = r#"```json
{
    "title": "Assessment Title",
    "grade": "Letter grade (A+, A, A-, B+, etc.)",
    "score": A number between 0 and 100,
    "summary": "One paragraph summary of the work",
    "strengths": ["Strength 1", "Strength 2", "Strength 3"],
    "areas_for_improvement": ["Area 1", "Area 2", "Area 3"],
    "detailed_feedback": "Comprehensive feedback in 3-4 paragraphs",
    "category_scores": {
        "Content": Score between 0 and 100,
        "Structure": Score between 0 and 100,
        "Analysis": Score between 0 and 100,
        "Language": Score between 0 and 100,
        "References": Score between 0 and 100
    }
}
```"#;

const ASSESSOR_PREAMBLE: &str = "You are an expert academic assessor.";

const CLOSING_INSTRUCTION: &str =
    "Ensure your assessment is fair, constructive, and specific to help the student improve.";

/// Fills the requirements placeholder shared by all templates.
pub fn requirements_context(requirements: Option<&str>) -> String {
    match requirements.map(str::trim).filter(|r| !r.is_empty()) {
        Some(requirements) => format!(
            "Assess the assignment against the following assignment requirements, \
             and ground every judgement in how well the work meets them:\n\n\
             --- REQUIREMENTS ---\n{}\n--- END REQUIREMENTS ---",
            requirements
        ),
        None => "Carefully analyze this student assignment on its own merits, \
                 judging its content, structure, analysis, language, and use of references."
            .to_string(),
    }
}

/// Map-phase prompt for one chunk of a long document. Asks for free-form
/// notes, not the JSON schema.
pub fn chunk_analysis_prompt(chunk: &str, requirements: Option<&str>) -> String {
    format!(
        "{preamble} {context}\n\n\
         Analyze this portion of an academic paper or assignment:\n\n\
         {chunk}\n\n\
         Extract key points, strengths, and weaknesses from this section.",
        preamble = ASSESSOR_PREAMBLE,
        context = requirements_context(requirements),
        chunk = chunk,
    )
}

/// Single-pass prompt for documents under the long-document threshold.
pub fn short_document_prompt(assignment_text: &str, requirements: Option<&str>) -> String {
    format!(
        "{preamble} {context}\n\n\
         {text}\n\n\
         Provide a comprehensive assessment in the following JSON format:\n\n\
         {schema}\n\n\
         {closing}",
        preamble = ASSESSOR_PREAMBLE,
        context = requirements_context(requirements),
        text = assignment_text,
        schema = ASSESSMENT_SCHEMA,
        closing = CLOSING_INSTRUCTION,
    )
}

/// Reduce-phase prompt over the concatenated partial summaries.
pub fn final_assessment_prompt(combined_summary: &str, requirements: Option<&str>) -> String {
    format!(
        "{preamble} Below are summaries from different parts of a student assignment.\n\n\
         {summary}\n\n\
         {context}\n\n\
         Based on these summaries, provide the assessment in the following JSON format:\n\n\
         {schema}\n\n\
         {closing}",
        preamble = ASSESSOR_PREAMBLE,
        summary = combined_summary,
        context = requirements_context(requirements),
        schema = ASSESSMENT_SCHEMA,
        closing = CLOSING_INSTRUCTION,
    )
}

/// Prompt sent alongside an uploaded document handle.
pub fn file_analysis_prompt(requirements: Option<&str>) -> String {
    format!(
        "{preamble} {context}\n\n\
         Provide a comprehensive assessment of the attached document in the following JSON format:\n\n\
         {schema}\n\n\
         {closing}",
        preamble = ASSESSOR_PREAMBLE,
        context = requirements_context(requirements),
        schema = ASSESSMENT_SCHEMA,
        closing = CLOSING_INSTRUCTION,
    )
}
