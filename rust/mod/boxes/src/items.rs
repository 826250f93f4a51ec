/// Turn free-form multi-line text into an ordered item list.
///
/// Each line is trimmed; blank lines are dropped; order is kept. No
/// deduplication, case folding or length checks happen here.
pub fn normalize(raw_text: &str) -> Vec<String> {
    raw_text
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
