// Prompt text for section extraction and competency classification.
// Replace `{instruction}`, `{template_json}` and `{resume_text}` before sending.

/// Frame shared by every section prompt.
pub const SECTION_PROMPT_TEMPLATE: &str = "You are an expert résumé parser. \
{instruction} \
Fill the JSON template below using only facts found in the résumé. \
Leave a field empty when the résumé does not mention it. \
{strict_json}

JSON template:
{template_json}

Resume text:
{resume_text}";

pub const PERSONAL_INSTRUCTION: &str =
    "Extract the PersonalDetails section into the exact JSON object below.";

pub const CONTACT_INSTRUCTION: &str = "Extract the ContactDetails section \
    (email, phone, websites, address) into the exact JSON object below.";

pub const IDENTITY_INSTRUCTION: &str = "Extract the PassportDetails, Identification \
    and CategoryDetails sections into the exact JSON object below, keeping each \
    section under its own key.";

pub const EDUCATION_INSTRUCTION: &str = "Extract the Education section: one array \
    entry per qualification, shaped like the exact JSON array below.";

pub const WORK_INSTRUCTION: &str = "Extract the WorkExperience section: one array \
    entry per position held, shaped like the exact JSON array below.";

pub const PROJECTS_INSTRUCTION: &str = "Extract the Projects section: one array \
    entry per project, shaped like the exact JSON array below.";

pub const SKILLS_INSTRUCTION: &str = "Extract the SegregatedSkill section: split \
    skills into TechnicalSkills and SoftSkills, one entry per skill, shaped like \
    the exact JSON object below.";

pub const MISC_INSTRUCTION: &str = "Extract the remaining résumé sections \
    (WorkedPeriod, Achievements, Publications, Hobbies, References, LanguagesKnown) \
    exactly as laid out in the JSON object below.";

/// Competency classification prompt. Replace `{resume_text}`.
pub const COMPETENCY_PROMPT_TEMPLATE: &str = "You are an expert résumé evaluator. \
Based ONLY on the résumé text below, determine the overall competency level \
as Beginner, Intermediate, or Advanced by considering:
- Total years of professional experience
- Highest education level attained
- Relevant certifications or courses
- Complexity and scope of projects described
- Seniority of roles held

Return only one of these exact words:
Beginner
Intermediate
Advanced

No markdown, no extra text.

Resume text:
{resume_text}";

pub const COMPETENCY_SYSTEM: &str = "You are a strict classifier. \
    Answer with a single word and nothing else.";
