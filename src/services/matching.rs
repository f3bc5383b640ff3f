//! Fuzzy name matching for stores
//!
//! Exact matches outrank substring matches. Several equally good
//! candidates are reported as ambiguous rather than picked silently.

/// Outcome of matching a user-typed name against candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Match<T> {
    None,
    One(T),
    Ambiguous(Vec<T>),
}

impl<T> Match<T> {
    pub fn is_none(&self) -> bool {
        matches!(self, Match::None)
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Match `query` against candidate names. `name_of` extracts the
/// candidate's display name.
pub fn match_by_name<T, F>(query: &str, candidates: &[T], name_of: F) -> Match<T>
where
    T: Clone,
    F: Fn(&T) -> &str,
{
    let query = normalize(query);
    if query.is_empty() {
        return Match::None;
    }

    let exact: Vec<T> = candidates
        .iter()
        .filter(|c| normalize(name_of(c)) == query)
        .cloned()
        .collect();
    match exact.len() {
        1 => return Match::One(exact.into_iter().next().unwrap()),
        n if n > 1 => return Match::Ambiguous(exact),
        _ => {}
    }

    let partial: Vec<T> = candidates
        .iter()
        .filter(|c| normalize(name_of(c)).contains(&query))
        .cloned()
        .collect();
    match partial.len() {
        0 => Match::None,
        1 => Match::One(partial.into_iter().next().unwrap()),
        _ => Match::Ambiguous(partial),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_match_wins() {
        let stores = names(&["Lucky Noodles", "Lucky Noodles Express"]);
        let m = match_by_name("lucky noodles", &stores, |s| s.as_str());
        assert_eq!(m, Match::One("Lucky Noodles".to_string()));
    }

    #[test]
    fn test_substring_match() {
        let stores = names(&["Golden Dumpling House", "Sunrise Cafe"]);
        let m = match_by_name("dumpling", &stores, |s| s.as_str());
        assert_eq!(m, Match::One("Golden Dumpling House".to_string()));
    }

    #[test]
    fn test_ambiguous_substring_never_auto_picked() {
        let stores = names(&["Lucky Noodles", "Noodle King", "Sunrise Cafe"]);
        let m = match_by_name("noodle", &stores, |s| s.as_str());
        assert_matches::assert_matches!(m, Match::Ambiguous(hits) if hits.len() == 2);
    }

    #[test]
    fn test_no_match() {
        let stores = names(&["Sunrise Cafe"]);
        assert!(match_by_name("pizza", &stores, |s| s.as_str()).is_none());
    }

    #[test]
    fn test_empty_query_matches_nothing() {
        let stores = names(&["Sunrise Cafe"]);
        assert!(match_by_name("   ", &stores, |s| s.as_str()).is_none());
    }
}
