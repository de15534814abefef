#[must_use]
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    let Some((clip_idx, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };

    let mut out = text[..clip_idx].to_string();
    out.push_str("...");
    out
}

/// Lowercased alphanumeric tokens with their byte span in `text`.
pub(crate) fn tokenize_spans(text: &str) -> Vec<(usize, usize, String)> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (idx, ch) in text.char_indices() {
        match (ch.is_alphanumeric(), start) {
            (true, None) => start = Some(idx),
            (false, Some(begin)) => {
                tokens.push((begin, idx, text[begin..idx].to_lowercase()));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(begin) = start {
        tokens.push((begin, text.len(), text[begin..].to_lowercase()));
    }
    tokens
}

pub(crate) fn tokenize(text: &str) -> Vec<String> {
    tokenize_spans(text)
        .into_iter()
        .map(|(_, _, token)| token)
        .collect()
}

/// Levenshtein distance over chars, giving up once it exceeds `limit`.
pub(crate) fn edit_distance_within(a: &str, b: &str, limit: usize) -> bool {
    let a = a.chars().collect::<Vec<_>>();
    let b = b.chars().collect::<Vec<_>>();
    if a.len().abs_diff(b.len()) > limit {
        return false;
    }
    let mut prev = (0..=b.len()).collect::<Vec<_>>();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
            row_min = row_min.min(curr[j + 1]);
        }
        if row_min > limit {
            return false;
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()] <= limit
}
