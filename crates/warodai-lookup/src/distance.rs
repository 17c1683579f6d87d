//! Similarity score used to rank deep-search candidates.

/// Score how close `candidate` is to `query`; higher is closer.
///
/// The score is the number of query characters found in the candidate minus
/// the edit distance between the two, floored at zero. A candidate sharing no
/// character with the query gets the negated edit distance, which marks the
/// pair as not comparable.
pub fn distance(query: &str, candidate: &str) -> i64 {
    let query: Vec<char> = query.chars().collect();
    let candidate: Vec<char> = candidate.chars().collect();
    let shared = query.iter().filter(|ch| candidate.contains(ch)).count() as i64;
    let edits = levenshtein(&query, &candidate) as i64;
    if shared > 0 {
        (shared - edits).max(0)
    } else {
        -edits
    }
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            cur[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}
