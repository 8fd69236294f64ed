//! Topic unlock resolution.
//!
//! A pure function of the subject's topics and one learner's progress
//! snapshot. Topic order is taken from `order_index`, never from slice
//! position, so callers may pass topics in any order.

use std::collections::BTreeMap;

use crate::model::{ProgressSnapshot, Topic, TopicId};

/// Display state of a topic for one learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicState {
    Locked,
    Available,
    InProgress,
    Completed,
}

impl TopicState {
    /// Whether the learner may open the topic.
    #[must_use]
    pub fn is_accessible(self) -> bool {
        !matches!(self, Self::Locked)
    }
}

/// Compute the state of every topic in a subject.
///
/// - completed: the ledger record has `completed_at`
/// - in progress: a record with percent > 0
/// - topics at the lowest `order_index` are always at least available
/// - any other topic is available iff every topic at the closest lower
///   `order_index` is completed; otherwise locked
#[must_use]
pub fn resolve_topic_states(
    topics: &[Topic],
    progress: &ProgressSnapshot,
) -> BTreeMap<TopicId, TopicState> {
    // order_index -> topics at that index
    let mut by_order: BTreeMap<u32, Vec<TopicId>> = BTreeMap::new();
    for topic in topics {
        by_order
            .entry(topic.order_index())
            .or_default()
            .push(topic.id());
    }

    let is_completed =
        |id: TopicId| progress.get(id).is_some_and(|record| record.is_completed());

    topics
        .iter()
        .map(|topic| {
            let id = topic.id();
            let state = if is_completed(id) {
                TopicState::Completed
            } else if progress.percent(id) > 0 {
                TopicState::InProgress
            } else {
                match by_order.range(..topic.order_index()).next_back() {
                    None => TopicState::Available,
                    Some((_, predecessors)) if predecessors.iter().all(|p| is_completed(*p)) => {
                        TopicState::Available
                    }
                    Some(_) => TopicState::Locked,
                }
            };
            (id, state)
        })
        .collect()
}

/// Same as [`resolve_topic_states`] but ordered for display by
/// `(order_index, id)`.
#[must_use]
pub fn ordered_topic_states(
    topics: &[Topic],
    progress: &ProgressSnapshot,
) -> Vec<(TopicId, TopicState)> {
    let states = resolve_topic_states(topics, progress);
    let mut ordered: Vec<&Topic> = topics.iter().collect();
    ordered.sort_by_key(|t| (t.order_index(), t.id()));
    ordered
        .into_iter()
        .filter_map(|t| states.get(&t.id()).map(|s| (t.id(), *s)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LearnerId, ProgressPercent, ProgressRecord, SubjectId};
    use crate::time::fixed_now;
    use proptest::prelude::*;

    fn topic(id: u64, order: u32) -> Topic {
        Topic::new(TopicId::new(id), SubjectId::new(1), format!("Topic {id}"), order).unwrap()
    }

    fn record(topic_id: u64, percent: i32) -> ProgressRecord {
        ProgressRecord::apply(
            None,
            LearnerId::new(uuid::Uuid::from_u128(9)),
            TopicId::new(topic_id),
            ProgressPercent::new(percent).unwrap(),
            0,
            fixed_now(),
        )
        .record
    }

    #[test]
    fn first_topic_is_available_without_progress() {
        let topics = vec![topic(1, 0), topic(2, 1), topic(3, 2)];
        let states = resolve_topic_states(&topics, &ProgressSnapshot::default());
        assert_eq!(states[&TopicId::new(1)], TopicState::Available);
        assert_eq!(states[&TopicId::new(2)], TopicState::Locked);
        assert_eq!(states[&TopicId::new(3)], TopicState::Locked);
    }

    #[test]
    fn completing_a_topic_unlocks_the_next_one_only() {
        let topics = vec![topic(1, 0), topic(2, 1), topic(3, 2)];
        let snapshot = ProgressSnapshot::new([record(1, 100)]);
        let states = resolve_topic_states(&topics, &snapshot);
        assert_eq!(states[&TopicId::new(1)], TopicState::Completed);
        assert_eq!(states[&TopicId::new(2)], TopicState::Available);
        assert_eq!(states[&TopicId::new(3)], TopicState::Locked);
    }

    #[test]
    fn partial_progress_is_in_progress() {
        let topics = vec![topic(1, 0), topic(2, 1)];
        let snapshot = ProgressSnapshot::new([record(1, 50)]);
        let states = resolve_topic_states(&topics, &snapshot);
        assert_eq!(states[&TopicId::new(1)], TopicState::InProgress);
        assert_eq!(states[&TopicId::new(2)], TopicState::Locked);
    }

    #[test]
    fn gaps_use_closest_lower_index_not_position() {
        // Shuffled input with a gap between 2 and 7.
        let topics = vec![topic(30, 7), topic(10, 0), topic(20, 2)];
        let snapshot = ProgressSnapshot::new([record(10, 100), record(20, 100)]);
        let states = resolve_topic_states(&topics, &snapshot);
        assert_eq!(states[&TopicId::new(30)], TopicState::Available);

        let snapshot = ProgressSnapshot::new([record(10, 100)]);
        let states = resolve_topic_states(&topics, &snapshot);
        assert_eq!(states[&TopicId::new(20)], TopicState::Available);
        assert_eq!(states[&TopicId::new(30)], TopicState::Locked);
    }

    #[test]
    fn lowest_index_need_not_be_zero() {
        let topics = vec![topic(1, 3), topic(2, 4)];
        let states = resolve_topic_states(&topics, &ProgressSnapshot::default());
        assert_eq!(states[&TopicId::new(1)], TopicState::Available);
        assert_eq!(states[&TopicId::new(2)], TopicState::Locked);
    }

    #[test]
    fn duplicate_predecessors_must_all_be_completed() {
        let topics = vec![topic(1, 0), topic(2, 0), topic(3, 1)];
        let snapshot = ProgressSnapshot::new([record(1, 100)]);
        let states = resolve_topic_states(&topics, &snapshot);
        assert_eq!(states[&TopicId::new(2)], TopicState::Available);
        assert_eq!(states[&TopicId::new(3)], TopicState::Locked);
    }

    #[test]
    fn ordered_states_follow_order_index() {
        let topics = vec![topic(3, 2), topic(1, 0), topic(2, 1)];
        let ordered = ordered_topic_states(&topics, &ProgressSnapshot::default());
        let ids: Vec<u64> = ordered.iter().map(|(id, _)| id.value()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    proptest! {
        #[test]
        fn resolution_is_deterministic_and_respects_unlock_rule(
            percents in proptest::collection::vec(0_i32..=100, 1..12)
        ) {
            let topics: Vec<Topic> = (0..percents.len())
                .map(|i| topic(i as u64 + 1, i as u32))
                .collect();
            let snapshot = ProgressSnapshot::new(
                percents.iter().enumerate().map(|(i, p)| record(i as u64 + 1, *p)),
            );

            let first = resolve_topic_states(&topics, &snapshot);
            let second = resolve_topic_states(&topics, &snapshot);
            prop_assert_eq!(&first, &second);

            prop_assert_ne!(first[&TopicId::new(1)], TopicState::Locked);
            for i in 1..percents.len() {
                let id = TopicId::new(i as u64 + 1);
                if percents[i] == 0 {
                    let prev_done = percents[i - 1] == 100;
                    let expected = if prev_done { TopicState::Available } else { TopicState::Locked };
                    prop_assert_eq!(first[&id], expected);
                }
            }
        }
    }
}
