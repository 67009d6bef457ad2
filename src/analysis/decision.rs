// Ordered decision list - first matching rule wins
//
// Rules are evaluated top to bottom and evaluation stops at the first
// predicate that returns true. Position is part of the result so callers
// can report which rule fired.

/// Predicate over a context value
pub type Predicate<C> = Box<dyn Fn(&C) -> bool + Send + Sync>;

/// Outcome of evaluating a decision list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision<T> {
    pub outcome: T,
    /// 1-based position of the matching rule; `len + 1` for the fallback
    pub position: usize,
    pub matched: bool,
}

/// Ordered (outcome, predicate) pairs with a terminal fallback
pub struct DecisionList<C, T> {
    rules: Vec<(T, Predicate<C>)>,
    fallback: T,
}

impl<C, T: Copy> DecisionList<C, T> {
    pub fn new(fallback: T) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
        }
    }

    /// Append a rule below the existing ones
    pub fn rule<F>(mut self, outcome: T, predicate: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        self.rules.push((outcome, Box::new(predicate)));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Outcomes in evaluation order
    pub fn outcomes(&self) -> Vec<T> {
        self.rules.iter().map(|(outcome, _)| *outcome).collect()
    }

    pub fn evaluate(&self, context: &C) -> Decision<T> {
        for (idx, (outcome, predicate)) in self.rules.iter().enumerate() {
            if predicate(context) {
                return Decision {
                    outcome: *outcome,
                    position: idx + 1,
                    matched: true,
                };
            }
        }
        Decision {
            outcome: self.fallback,
            position: self.rules.len() + 1,
            matched: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> DecisionList<i32, &'static str> {
        DecisionList::new("other")
            .rule("negative", |v: &i32| *v < 0)
            .rule("small", |v: &i32| *v < 10)
            .rule("even", |v: &i32| *v % 2 == 0)
    }

    #[test]
    fn test_first_match_wins() {
        let rules = list();
        // -4 is negative, small and even; only the first rule counts.
        let decision = rules.evaluate(&-4);
        assert_eq!(decision.outcome, "negative");
        assert_eq!(decision.position, 1);
        assert!(decision.matched);
        assert_eq!(rules.evaluate(&4).outcome, "small");
        assert_eq!(rules.evaluate(&12).outcome, "even");
    }

    #[test]
    fn test_fallback() {
        let rules = list();
        let decision = rules.evaluate(&13);
        assert_eq!(decision.outcome, "other");
        assert_eq!(decision.position, 4);
        assert!(!decision.matched);
    }

    #[test]
    fn test_outcomes_in_order() {
        assert_eq!(list().outcomes(), vec!["negative", "small", "even"]);
        assert_eq!(list().len(), 3);
    }
}
