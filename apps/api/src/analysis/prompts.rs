// Analysis prompt templates. Placeholders are substituted with `str::replace`.

pub const ANALYZE_ROLE: &str = "You are an expert ATS (Applicant Tracking System) analyst and \
senior technical recruiter. You compare resumes against job descriptions and score them honestly.";

pub const ANALYZE_PROMPT_TEMPLATE: &str = r#"Compare the following resume with the job description and evaluate how well the candidate matches.

RESUME (JSON):
{resume}

JOB TITLE:
{job_title}

JOB DESCRIPTION:
{job_description}

Return exactly this JSON structure. Every score is an integer from 0 to 100.
{
  "overallScore": number,
  "keywordMatch": number,
  "skillsMatch": number,
  "experienceMatch": number,
  "formatScore": number,
  "strengths": ["string"],
  "improvements": ["string"],
  "missingKeywords": ["string"],
  "keywordData": [{"category": "string", "matched": number, "total": number, "percentage": number}],
  "detailedAnalysis": {
    "skills": {"score": number, "feedback": "string"},
    "experience": {"score": number, "feedback": "string"},
    "education": {"score": number, "feedback": "string"},
    "format": {"score": number, "feedback": "string"}
  },
  "recommendations": {
    "immediate": ["string"],
    "shortTerm": ["string"],
    "longTerm": ["string"]
  }
}"#;

pub const PARSE_RESUME_ROLE: &str = "You are a precise resume data extractor. \
You convert raw resume text into structured JSON without inventing information.";

pub const PARSE_RESUME_PROMPT_TEMPLATE: &str = r#"Extract the candidate's details from the resume text below.

RESUME TEXT:
{resume_text}

Return exactly this JSON structure. Use an empty string or empty array for anything not present.
{
  "name": "string",
  "email": "string",
  "phone": "string",
  "summary": "string",
  "experience": [{"company": "string", "position": "string", "duration": "string", "description": "string"}],
  "education": [{"institution": "string", "degree": "string", "year": "string", "gpa": "string"}],
  "skills": "comma separated string"
}"#;

pub const OPTIMIZE_ROLE: &str = "You are a professional resume writer who tailors resumes to \
specific job postings while keeping every claim truthful.";

pub const OPTIMIZE_PROMPT_TEMPLATE: &str = r#"Suggest concrete edits that make this resume a stronger match for the job.

RESUME (JSON):
{resume}

JOB TITLE:
{job_title}

JOB DESCRIPTION:
{job_description}

Return exactly this JSON structure:
{
  "summary": "a rewritten professional summary",
  "skillsToAdd": ["string"],
  "keywordsToAdd": ["string"],
  "bulletImprovements": [{"original": "string", "improved": "string", "reason": "string"}]
}"#;
