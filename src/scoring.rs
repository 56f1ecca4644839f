//! Typing accuracy against a reference sentence, based on edit distance
//! over normalized text.

const STRIPPED_PUNCTUATION: &[char] = &[
    '.', ',', '/', '#', '!', '$', '%', '^', '&', '*', ';', ':', '{', '}', '=', '-', '_', '`', '~',
    '(', ')', '\'', '"', '?',
];

/// Lowercase, strip punctuation, collapse whitespace runs and trim.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn normalize_opt(text: Option<&str>) -> String {
    text.map(normalize).unwrap_or_default()
}

/// Levenshtein distance with unit costs, counted in chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut dp = vec![vec![0; b.len() + 1]; a.len() + 1];

    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b.len() {
        dp[0][j] = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            dp[i][j] = (dp[i - 1][j] + 1)
                .min(dp[i][j - 1] + 1)
                .min(dp[i - 1][j - 1] + cost);
        }
    }
    dp[a.len()][b.len()]
}

/// Score in `[0, 1]` of how closely `typed` reproduces `target`.
///
/// The denominator is the normalized target length, so the score is not
/// symmetric in its arguments.
pub fn accuracy(typed: &str, target: &str) -> f64 {
    let typed = normalize(typed);
    let target = normalize(target);
    let target_len = target.chars().count();

    if target_len == 0 {
        return if typed.is_empty() { 1.0 } else { 0.0 };
    }
    if typed.is_empty() {
        return 0.0;
    }

    let distance = levenshtein(&typed, &target);
    (target_len.saturating_sub(distance)) as f64 / target_len as f64
}

/// True when `typed` matches `target` once both are normalized.
pub fn is_exact_match(typed: &str, target: &str) -> bool {
    normalize(typed) == normalize(target)
}
