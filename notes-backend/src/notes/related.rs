//! Ranks notes against each other by shared tags.

use super::codec::dedupe_tags;
use super::timestamp::date_part;
use notes_types::{Note, RelatedNote};

pub const MAX_RELATED: usize = 5;
pub const TAG_WEIGHT: f64 = 0.7;
pub const SAME_DAY_BONUS: f64 = 0.3;

/// Scoring variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scoring {
    /// `tag_similarity * 0.7`, plus 0.3 when both notes share a calendar day
    TagsWithSameDay,
    /// Plain `tag_similarity`
    TagsOnly,
}

/// Rank `candidates` against `target`.
///
/// `candidates` must be newest-first; the sort is stable, so equal scores keep
/// the most recently created note first. The target itself is skipped.
pub fn rank(target: &Note, candidates: &[Note], scoring: Scoring) -> Vec<RelatedNote> {
    // Tags are compared as sets; stored notes may repeat a tag
    let target_tags = dedupe_tags(target.tags.clone());
    if target_tags.is_empty() {
        return Vec::new();
    }

    let target_day = date_part(&target.timestamp);

    let mut related: Vec<RelatedNote> = candidates
        .iter()
        .filter(|note| note.timestamp != target.timestamp)
        .filter_map(|note| {
            let common_tags = dedupe_tags(
                note.tags
                    .iter()
                    .filter(|tag| target_tags.contains(tag))
                    .cloned()
                    .collect(),
            );
            let tag_similarity = common_tags.len() as f64 / target_tags.len() as f64;

            let similarity = match scoring {
                Scoring::TagsOnly => tag_similarity,
                Scoring::TagsWithSameDay => {
                    let bonus = if date_part(&note.timestamp) == target_day {
                        SAME_DAY_BONUS
                    } else {
                        0.0
                    };
                    tag_similarity * TAG_WEIGHT + bonus
                }
            };

            (similarity > 0.0).then(|| RelatedNote {
                note: note.clone(),
                similarity,
                common_tags,
            })
        })
        .collect();

    related.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    related.truncate(MAX_RELATED);
    related
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(tags: &[&str], timestamp: &str) -> Note {
        Note {
            question: format!("q {}", timestamp),
            answer: "a".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            timestamp: timestamp.to_string(),
        }
    }

    #[test]
    fn test_half_overlap_is_half_similarity() {
        let a = note(&["x", "y"], "2026/01/01 10:00:00");
        let b = note(&["x"], "2026/01/05 10:00:00");

        let related = rank(&a, &[b.clone(), a.clone()], Scoring::TagsOnly);
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].note, b);
        assert_eq!(related[0].similarity, 0.5);
        assert_eq!(related[0].common_tags, vec!["x"]);
    }

    #[test]
    fn test_untagged_target_has_no_related() {
        let target = note(&[], "2026/01/01 10:00:00");
        let same_day = note(&["x"], "2026/01/01 11:00:00");

        assert!(rank(&target, &[same_day.clone()], Scoring::TagsWithSameDay).is_empty());
        assert!(rank(&target, &[same_day], Scoring::TagsOnly).is_empty());
    }

    #[test]
    fn test_same_day_bonus() {
        let target = note(&["x", "y"], "2026/01/01 10:00:00");
        let same_day_no_tags = note(&[], "2026/01/01 09:00:00");
        let other_day_full = note(&["x", "y"], "2025/12/01 09:00:00");
        let same_day_half = note(&["y"], "2026/01/01 08:00:00.1767225600000");

        let related = rank(
            &target,
            &[same_day_no_tags.clone(), other_day_full.clone(), same_day_half.clone()],
            Scoring::TagsWithSameDay,
        );

        assert_eq!(related.len(), 3);
        assert_eq!(related[0].note, other_day_full);
        assert!((related[0].similarity - 0.7).abs() < 1e-9);
        // 0.5 * 0.7 + 0.3
        assert_eq!(related[1].note, same_day_half);
        assert!((related[1].similarity - 0.65).abs() < 1e-9);
        assert_eq!(related[2].note, same_day_no_tags);
        assert!((related[2].similarity - 0.3).abs() < 1e-9);
        assert!(related[2].common_tags.is_empty());
    }

    #[test]
    fn test_repeated_tags_count_once() {
        let target = note(&["x", "y", "y"], "2026/01/01 10:00:00");
        let repeats = note(&["x", "x"], "2026/01/01 09:00:00");

        let related = rank(&target, &[repeats.clone()], Scoring::TagsOnly);
        assert_eq!(related[0].similarity, 0.5);
        assert_eq!(related[0].common_tags, vec!["x"]);

        let related = rank(&target, &[repeats], Scoring::TagsWithSameDay);
        assert!((related[0].similarity - 0.65).abs() < 1e-9);
        assert!(related[0].similarity <= 1.0);
    }

    #[test]
    fn test_zero_score_excluded() {
        let target = note(&["x"], "2026/01/01 10:00:00");
        let unrelated = note(&["z"], "2025/01/01 10:00:00");

        assert!(rank(&target, &[unrelated.clone()], Scoring::TagsWithSameDay).is_empty());
        assert!(rank(&target, &[unrelated], Scoring::TagsOnly).is_empty());
    }

    #[test]
    fn test_ties_keep_newest_first_and_truncate() {
        let target = note(&["x"], "2026/01/01 10:00:00");
        // newest-first input
        let candidates: Vec<Note> = (0..7)
            .map(|i| note(&["x"], &format!("2025/12/{:02} 10:00:00", 20 - i)))
            .collect();

        let related = rank(&target, &candidates, Scoring::TagsOnly);
        assert_eq!(related.len(), MAX_RELATED);
        let stamps: Vec<&str> = related.iter().map(|r| r.note.timestamp.as_str()).collect();
        assert_eq!(
            stamps,
            vec![
                "2025/12/20 10:00:00",
                "2025/12/19 10:00:00",
                "2025/12/18 10:00:00",
                "2025/12/17 10:00:00",
                "2025/12/16 10:00:00",
            ]
        );
    }
}
