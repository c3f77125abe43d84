// All LLM prompt constants for the matching module.

/// System prompt for structured CV extraction.
pub const CV_PARSE_SYSTEM: &str = "You are a meticulous CV parser. \
    Extract facts exactly as written in the CV; never invent employers, dates or skills. \
    You MUST respond with a single JSON object only.";

/// CV extraction prompt. Replace `{cv_text}` before sending.
pub const CV_PARSE_PROMPT_TEMPLATE: &str = r#"Extract from this CV and return ONLY JSON:
{cv_text}

Required Format:
```json
{
  "name": "Full Name",
  "email": "email@example.com",
  "technical_skills": ["skill1", "skill2"],
  "soft_skills": ["communication", "leadership", "teamwork"],
  "experience": [
    {"role": "Position", "company": "Company", "years": 2}
  ],
  "education": "Degree"
}
```

For technical_skills, extract hard/technical/domain-specific skills relevant to any industry.
For soft_skills, extract interpersonal abilities, traits and transferable skills.
For experience, "years" is a whole number of years in that role (0 if under a year)."#;

/// System prompt for rubric scoring.
pub const SCORE_SYSTEM: &str = "You are an expert CV-to-Job matching system. \
    You score candidates strictly by the rubric you are given. \
    You MUST respond with a single JSON object only.";

/// Rubric scoring prompt.
/// Replace: {job_description}, {technical_pct}, {soft_pct}, {technical_skills},
///          {soft_skills}, {experience_json}, {education}
pub const SCORE_PROMPT_TEMPLATE: &str = r#"Analyze the following CV against the job description and:

1. Assign a relevance score (0-100), broken down as follows:
   - Hard skills match (50% weight):
     - Required skills: 70% of this category
     - Bonus/nice-to-have skills: 30% of this category
     - Full match = 1.0, partial/related = 0.5, missing = 0.0
   - Experience duration vs requirement (20% weight):
     - Matches or exceeds: 100%
     - Undershoots by <1 year: 75%
     - Undershoots by 1-2 years: 50%
     - Undershoots by 2+ years: 20%
     - Not stated: 0%
   - Education/certifications (15% weight):
     - Direct match: 100%
     - Related field: 50%
     - Irrelevant/missing: 0%
   - Domain or industry fit (10% weight):
     - Has relevant experience in target domain: 100%
     - Adjacent/related domain: 50%
     - Irrelevant or no domain context: 0%
   - Soft skills / role fit indicators (5% weight)

   Where evidence for technical and interpersonal fit conflicts, weigh technical
   evidence at {technical_pct}% and soft-skill evidence at {soft_pct}%.

2. List:
   - Matched skills (required and bonus)
   - Missing or weak requirements
   - Any relevant soft skills or domain experience

3. Output ONLY valid JSON.

Job Description: {job_description}

CV Data:
- Technical Skills: {technical_skills}
- Soft Skills: {soft_skills}
- Experience: {experience_json}
- Education: {education}

Output format:
```json
{
  "relevance_score": 0,
  "justification": "concise reason",
  "key_matches": ["skill1", "skill2"],
  "missing_requirements": ["requirement1", "requirement2"],
  "soft_skills": ["skillA", "skillB"],
  "domain_fit": "industry or domain match, or 'None'"
}
```

Important rules:
- relevance_score is a single integer from 0 to 100
- For key_matches, list EXACT qualifications that match the job requirements (at most 5)
- If there are no matches at all, set key_matches to ["None"]
- missing_requirements: at most 5 items; soft_skills: at most 3 items
- In justification, refer to the person only as "the candidate"
- Domain fit should be a short phrase describing industry relevance"#;

/// System prompt for CV improvement feedback.
pub const FEEDBACK_SYSTEM: &str = "You are a helpful career advisor.";

/// Feedback prompt. Replace: {cv_text}, {job_description}
pub const FEEDBACK_PROMPT_TEMPLATE: &str = r#"Provide a concise and actionable summary (75ish words maximum, no lists) of feedback on how to improve the following CV to better fit the job description. Focus on missing skills, experiences, and formatting improvements. Make some remarks about the uploaded document, for example, 'I see you majored in x and have some experience in y'.

CV:
{cv_text}

Job Description:
{job_description}

Feedback:"#;
