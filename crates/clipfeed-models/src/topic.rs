use crate::Id;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Topic {
    pub id: Id,
    pub name: String,
    pub slug: String,
    pub path: String,
    pub parent_id: Option<Id>,
    pub depth: i32,
    pub clip_count: i64,
}

/// TopicEdge is a weighted directed lateral link used by the affinity
/// boost's lateral BFS (§4.6). `relation` is a free-text label
/// ("related", "alternative", ...) that this crate does not interpret.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TopicEdge {
    pub source_id: Id,
    pub target_id: Id,
    pub relation: String,
    pub weight: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClipTopic {
    pub clip_id: Id,
    pub topic_id: Id,
    pub confidence: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UserTopicAffinity {
    pub user_id: Id,
    pub topic_id: Id,
    pub weight: f64,
}

/// Slugify lowercases, strips non-alphanumerics, and collapses whitespace
/// runs to a single hyphen, per §4.5's topic resolver. It is idempotent:
/// `slugify(slugify(x)) == slugify(x)` (§8 round-trip law).
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_hyphen = true;
        }
        // Any other punctuation is simply stripped, matching "non-alphanumeric stripped".
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Italian Cuisine"), "italian-cuisine");
        assert_eq!(slugify("  Cooking!!  "), "cooking");
        assert_eq!(slugify("skate/longboard"), "skatelongboard");
    }

    #[test]
    fn slugify_is_idempotent() {
        for input in ["Italian Cuisine", "  messy__input--here  ", "already-a-slug"] {
            let once = slugify(input);
            let twice = slugify(&once);
            assert_eq!(once, twice, "slugify not idempotent for {input:?}");
        }
    }

    #[test]
    fn slugify_collapses_runs_of_separators() {
        assert_eq!(slugify("a   b--c__d"), "a-b-c-d");
    }
}
