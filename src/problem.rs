//! Pluggable reporting of structural configuration problems. Reporters decide whether a problem
//! halts the current pass immediately or whether problems accumulate and surface once the pass
//! completes.

use crate::error::ConfigurationError;
use crate::metadata::ClassId;
use derive_more::Constructor;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, PoisonError};

/// A structural problem found in a configuration class.
#[derive(Clone, Debug, Eq, PartialEq, Constructor)]
pub struct Problem {
    pub message: String,
    pub class: ClassId,
}

impl Display for Problem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.class, self.message)
    }
}

/// Collaborator receiving validation problems.
pub trait ProblemReporter {
    /// Reports a single problem. Fail-fast implementations return it as an error immediately.
    fn report(&self, problem: Problem) -> Result<(), ConfigurationError>;

    /// Called once at the end of a validation pass; collecting implementations surface their
    /// accumulated problems here.
    fn finish(&self) -> Result<(), ConfigurationError> {
        Ok(())
    }
}

/// [ProblemReporter] turning the first reported problem into an error.
#[derive(Default, Copy, Clone, Eq, PartialEq, Debug)]
pub struct FailFastProblemReporter;

impl ProblemReporter for FailFastProblemReporter {
    fn report(&self, problem: Problem) -> Result<(), ConfigurationError> {
        Err(ConfigurationError::IllegalConfiguration {
            class: problem.class,
            message: problem.message,
        })
    }
}

/// [ProblemReporter] accumulating problems and surfacing them together when the pass finishes.
#[derive(Default, Debug)]
pub struct CollectingProblemReporter {
    problems: Mutex<Vec<Problem>>,
}

impl ProblemReporter for CollectingProblemReporter {
    fn report(&self, problem: Problem) -> Result<(), ConfigurationError> {
        self.problems
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(problem);
        Ok(())
    }

    fn finish(&self) -> Result<(), ConfigurationError> {
        let mut problems = self.problems.lock().unwrap_or_else(PoisonError::into_inner);
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigurationError::Problems(problems.drain(..).collect()))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ConfigurationError;
    use crate::metadata::ClassId;
    use crate::problem::{
        CollectingProblemReporter, FailFastProblemReporter, Problem, ProblemReporter,
    };

    fn create_problem(message: &str) -> Problem {
        Problem::new(message.to_string(), ClassId::new("test::Config"))
    }

    #[test]
    fn should_fail_on_first_problem() {
        let reporter = FailFastProblemReporter;

        assert!(matches!(
            reporter.report(create_problem("sealed")).unwrap_err(),
            ConfigurationError::IllegalConfiguration { .. }
        ));
        assert!(reporter.finish().is_ok());
    }

    #[test]
    fn should_collect_problems_until_finished() {
        let reporter = CollectingProblemReporter::default();
        reporter.report(create_problem("first")).unwrap();
        reporter.report(create_problem("second")).unwrap();

        assert!(matches!(
            reporter.finish().unwrap_err(),
            ConfigurationError::Problems(problems) if problems.len() == 2
        ));

        // problems are drained when surfaced
        assert!(reporter.finish().is_ok());
    }
}
