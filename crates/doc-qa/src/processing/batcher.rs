//! Partitioning questions into ordered groups that remember their position

/// A contiguous run of questions from the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionGroup {
    /// Position of the first question in the original request
    pub offset: usize,
    /// The questions, in request order
    pub questions: Vec<String>,
}

impl QuestionGroup {
    /// Number of questions in the group
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the group has no questions
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Split into at most `parts` sub-groups that keep absolute offsets
    pub fn split(&self, parts: usize) -> Vec<QuestionGroup> {
        partition(&self.questions, parts, self.offset)
    }
}

/// Split `questions` into at most `parts` contiguous groups of near-equal size.
///
/// With `base = len / parts` and `remainder = len % parts`, the first
/// `remainder` groups get `base + 1` questions and the rest get `base`.
/// Empty groups are omitted, so fewer questions than parts yields one group
/// per question. `parts == 0` is treated as 1.
pub fn split_into_parts(questions: &[String], parts: usize) -> Vec<QuestionGroup> {
    partition(questions, parts, 0)
}

fn partition(questions: &[String], parts: usize, base_offset: usize) -> Vec<QuestionGroup> {
    let parts = parts.max(1);
    let base = questions.len() / parts;
    let remainder = questions.len() % parts;

    let mut groups = Vec::with_capacity(parts.min(questions.len()));
    let mut start = 0usize;

    for i in 0..parts {
        let size = base + usize::from(i < remainder);
        if size == 0 {
            continue;
        }
        groups.push(QuestionGroup {
            offset: base_offset + start,
            questions: questions[start..start + size].to_vec(),
        });
        start += size;
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn questions(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("q{}", i)).collect()
    }

    #[test]
    fn test_remainder_goes_to_first_groups() {
        let groups = split_into_parts(&questions(7), 3);
        let sizes: Vec<usize> = groups.iter().map(QuestionGroup::len).collect();
        let offsets: Vec<usize> = groups.iter().map(|g| g.offset).collect();
        assert_eq!(sizes, vec![3, 2, 2]);
        assert_eq!(offsets, vec![0, 3, 5]);
    }

    #[test]
    fn test_fewer_questions_than_parts() {
        let groups = split_into_parts(&questions(2), 12);
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.len() == 1));
    }

    #[test]
    fn test_empty_and_zero_parts() {
        assert!(split_into_parts(&[], 12).is_empty());
        let groups = split_into_parts(&questions(3), 0);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);
    }

    #[test]
    fn test_sub_groups_keep_absolute_offsets() {
        let groups = split_into_parts(&questions(10), 2);
        let subs = groups[1].split(2);
        assert_eq!(subs[0].offset, 5);
        assert_eq!(subs[0].questions, vec!["q5", "q6", "q7"]);
        assert_eq!(subs[1].offset, 8);
        assert_eq!(subs[1].questions, vec!["q8", "q9"]);
    }

    proptest! {
        #[test]
        fn prop_true_ordered_partition(n in 0usize..200, parts in 0usize..30) {
            let input = questions(n);
            let groups = split_into_parts(&input, parts);

            prop_assert!(groups.len() <= parts.max(1));
            prop_assert!(groups.iter().all(|g| !g.is_empty()));

            let mut expected_offset = 0;
            for group in &groups {
                prop_assert_eq!(group.offset, expected_offset);
                expected_offset += group.len();
            }

            let rebuilt: Vec<String> = groups.into_iter().flat_map(|g| g.questions).collect();
            prop_assert_eq!(rebuilt, input);
        }

        #[test]
        fn prop_sizes_differ_by_at_most_one(n in 1usize..200, parts in 1usize..30) {
            let groups = split_into_parts(&questions(n), parts);
            let max = groups.iter().map(QuestionGroup::len).max().unwrap();
            let min = groups.iter().map(QuestionGroup::len).min().unwrap();
            prop_assert!(max - min <= 1);
        }
    }
}
