use crate::common::*;

pub fn channel<T>(capacity: impl Into<Option<usize>>) -> (flume::Sender<T>, flume::Receiver<T>) {
    match capacity.into() {
        Some(capacity) => flume::bounded(capacity),
        None => flume::unbounded(),
    }
}

/// Places `(index, item)` pairs back into index order. Missing indexes stay `None`.
pub fn reorder_enumerated<T>(len: usize, items: impl IntoIterator<Item = (usize, T)>) -> Vec<Option<T>> {
    let mut slots: Vec<Option<T>> = iter::repeat_with(|| None).take(len).collect();

    for (index, item) in items {
        let prev = mem::replace(&mut slots[index], Some(item));
        assert!(
            prev.is_none(),
            "the index number {} appears more than once",
            index
        );
    }

    slots
}

/// Converts a strict-weak "less than" predicate into a total [Ordering].
pub fn less_to_ordering<T, F>(less: &F, lhs: &T, rhs: &T) -> Ordering
where
    F: Fn(&T, &T) -> bool,
{
    if less(lhs, rhs) {
        Ordering::Less
    } else if less(rhs, lhs) {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reorder_fills_slots() {
        let slots = reorder_enumerated(4, vec![(2, 'c'), (0, 'a'), (3, 'd')]);
        assert_eq!(slots, vec![Some('a'), None, Some('c'), Some('d')]);
    }

    #[test]
    #[should_panic(expected = "appears more than once")]
    fn reorder_rejects_duplicates() {
        reorder_enumerated(2, vec![(1, 'a'), (1, 'b')]);
    }

    #[test]
    fn less_predicate_ordering() {
        let less = |a: &i32, b: &i32| a < b;
        assert_eq!(less_to_ordering(&less, &1, &2), Ordering::Less);
        assert_eq!(less_to_ordering(&less, &2, &1), Ordering::Greater);
        assert_eq!(less_to_ordering(&less, &2, &2), Ordering::Equal);
    }
}
