// pattern-diagnostics-rs/src/analysis.rs
// Text analysis primitives: normalization, tokenization, edit distance
// and the token-overlap similarity score.

/// Collapse internal whitespace to single spaces and trim.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercased word tokens of the input.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Literal keywords a pattern is anchored on: alphabetic runs of length
/// >= 3 left after stripping regex metacharacters. Alternation branches
/// contribute every branch word.
pub fn anchor_keywords(pattern: &str) -> Vec<String> {
    let mut keywords = Vec::new();
    for token in pattern
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 3)
    {
        let lowered = token.to_lowercase();
        if !keywords.contains(&lowered) {
            keywords.push(lowered);
        }
    }
    keywords
}

/// Restricted Damerau-Levenshtein (optimal string alignment) distance.
/// Adjacent transpositions count as one edit, so "trun" -> "turn" is 1.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());
    if n == 0 {
        return m;
    }
    if m == 0 {
        return n;
    }

    let mut dist = vec![vec![0usize; m + 1]; n + 1];
    for (i, row) in dist.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=m {
        dist[0][j] = j;
    }

    for i in 1..=n {
        for j in 1..=m {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut best = (dist[i - 1][j] + 1)
                .min(dist[i][j - 1] + 1)
                .min(dist[i - 1][j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(dist[i - 2][j - 2] + 1);
            }
            dist[i][j] = best;
        }
    }
    dist[n][m]
}

/// Maximum edit distance still considered a typo for a keyword of the
/// given length: 1 for short words (<= 6 chars), 2 otherwise.
pub fn typo_threshold(keyword_len: usize) -> usize {
    if keyword_len <= 6 {
        1
    } else {
        2
    }
}

/// Token-overlap similarity in [0, 1] between a pattern's keywords and
/// the input tokens, weighted by sequence proximity: full weight when the
/// matched keywords appear in the input in pattern order, reduced weight
/// when they appear scrambled.
pub fn similarity(keywords: &[String], input_tokens: &[String]) -> f64 {
    if keywords.is_empty() || input_tokens.is_empty() {
        return 0.0;
    }

    let mut positions = Vec::new();
    let mut matched = 0usize;
    for kw in keywords {
        if let Some(pos) = input_tokens.iter().position(|t| t == kw) {
            matched += 1;
            positions.push(pos);
        }
    }
    if matched == 0 {
        return 0.0;
    }

    let overlap = matched as f64 / keywords.len() as f64;

    // Sequence proximity: fraction of adjacent matched pairs that keep
    // their relative order in the input.
    let order_score = if positions.len() < 2 {
        1.0
    } else {
        let ordered_pairs = positions.windows(2).filter(|w| w[0] < w[1]).count();
        ordered_pairs as f64 / (positions.len() - 1) as f64
    };

    overlap * (0.7 + 0.3 * order_score)
}
