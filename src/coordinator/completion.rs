use std::collections::HashSet;

pub(crate) struct Completion {
    expected: usize,
    done: HashSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Signal {
    First,
    Repeated,
    // The set is already full and `name` is not in it
    Overflow,
}

impl Completion {
    pub fn new(expected: usize) -> Self {
        Completion {
            expected,
            done: HashSet::new(),
        }
    }

    pub fn signal(&mut self, name: String) -> Signal {
        if self.done.contains(&name) {
            Signal::Repeated
        } else if self.done.len() == self.expected {
            Signal::Overflow
        } else {
            self.done.insert(name);
            Signal::First
        }
    }

    pub fn signalled(&self) -> usize {
        self.done.len()
    }

    pub fn is_complete(&self) -> bool {
        self.done.len() == self.expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completes_at_expected() {
        let mut completion = Completion::new(2);

        assert_eq!(completion.signal("alice".to_string()), Signal::First);
        assert!(!completion.is_complete());

        assert_eq!(completion.signal("bob".to_string()), Signal::First);
        assert!(completion.is_complete());
    }

    #[test]
    fn idempotent() {
        let mut completion = Completion::new(2);

        assert_eq!(completion.signal("alice".to_string()), Signal::First);
        assert_eq!(completion.signal("alice".to_string()), Signal::Repeated);

        assert_eq!(completion.signalled(), 1);
        assert!(!completion.is_complete());
    }

    #[test]
    fn huge_expected_count() {
        let mut completion = Completion::new(usize::MAX);

        assert_eq!(completion.signal("alice".to_string()), Signal::First);
        assert!(!completion.is_complete());
    }

    #[test]
    fn never_exceeds_expected() {
        let mut completion = Completion::new(1);

        completion.signal("alice".to_string());

        assert_eq!(completion.signal("bob".to_string()), Signal::Overflow);
        assert_eq!(completion.signal("alice".to_string()), Signal::Repeated);

        assert_eq!(completion.signalled(), 1);
        assert!(completion.is_complete());
    }
}
