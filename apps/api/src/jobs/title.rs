//! Deterministic job-title guess from raw posting text. No model call.

pub const FALLBACK_TITLE: &str = "Job Position";

const MAX_LINE_CHARS: usize = 99;
const MIN_LINE_CHARS: usize = 4;
const SEPARATORS: [&str; 3] = [" - ", " at ", " @ "];

/// Returns the first plausible heading line, cut at the first company separator.
pub fn extract_title(description: &str) -> String {
    description
        .lines()
        .map(str::trim)
        .find(|line| is_title_candidate(line))
        .map(cut_at_separator)
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| FALLBACK_TITLE.to_string())
}

fn is_title_candidate(line: &str) -> bool {
    let len = line.chars().count();
    !line.is_empty()
        && len <= MAX_LINE_CHARS
        && len >= MIN_LINE_CHARS
        && !line.contains('•')
        && !line.contains('-')
        && !line.starts_with("Requirements")
}

fn cut_at_separator(line: &str) -> String {
    let end = SEPARATORS
        .iter()
        .filter_map(|sep| line.find(sep))
        .min()
        .unwrap_or(line.len());
    line[..end].trim().to_string()
}
