//! Types for representing an ordered list of steps to run.

use crate::core::step::Step;
use std::fmt;

/// An ordered list of [Step]s.
///
/// Steps run in the order they were added. A [Plan] may borrow the collaborators its steps use
/// (key generator, agent, clipboard) for the lifetime `'a`.
#[derive(Default)]
pub struct Plan<'a> {
    steps: Vec<Box<dyn Step + 'a>>,
}

impl<'a> Plan<'a> {
    /// Creates an empty [Plan].
    pub fn new() -> Self {
        Plan { steps: Vec::new() }
    }

    /// Adds a step. It will run after all previously added steps.
    pub fn push(&mut self, step: impl Step + 'a) {
        self.steps.push(Box::new(step));
    }

    /// Appends every step of `other`, in order.
    pub fn append(&mut self, other: Plan<'a>) {
        self.steps.extend(other.steps);
    }

    /// The steps in execution order.
    pub fn steps(&self) -> impl Iterator<Item = &(dyn Step + 'a)> {
        self.steps.iter().map(|step| step.as_ref())
    }

    /// The names of the steps in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Debug for Plan<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan").field("steps", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::FakeStep;
    use crate::core::Class;

    #[test]
    fn preserves_order() {
        let mut plan = Plan::new();
        plan.push(FakeStep::new("first", Class::Required, true));
        plan.push(FakeStep::new("second", Class::BestEffort, true));

        let mut tail = Plan::new();
        tail.push(FakeStep::new("third", Class::Required, false));
        plan.append(tail);

        assert_eq!(vec!["first", "second", "third"], plan.names());
        assert_eq!(3, plan.len());
        assert!(!plan.is_empty());
    }

    #[test]
    fn debug_lists_names() {
        let mut plan = Plan::new();
        plan.push(FakeStep::new("only", Class::Required, true));
        assert_eq!(r#"Plan { steps: ["only"] }"#, format!("{plan:?}"));
    }
}
