//! The session driver.
//!
//! An [`Interpreter`] owns the long-lived global environment: it seeds the
//! reserved atoms and their Spanish aliases, loads the standard prelude, and
//! evaluates source text one top-level form at a time. A failing form reports
//! its error and leaves the session (and every definition made before the
//! failure) intact, so interactive use survives bad input.

use crate::Error;
use crate::ast::Value;
use crate::evaluator::{Environment, create_global_env, evaluate};
use crate::parser::parse_forms;

/// Standard definitions loaded into every session, written in the language
/// itself. `factorial` validates its argument and delegates to an iterative
/// helper, so large inputs run as a `while` loop rather than deep recursion.
const PRELUDE: &str = "
(defun factorial (n)
  (cond ((< n 0) 0)
        ((equal n 0) 1)
        (t (factorial-iter n 1 1))))

(defun factorial-iter (n acc i)
  (while (<= i n)
    (setq acc (* acc i))
    (setq i (+ i 1))
    acc))
";

/// A long-lived interpreter session: one global environment, evaluated
/// against by every call to [`Interpreter::run`].
pub struct Interpreter {
    env: Environment,
}

impl Interpreter {
    /// Create a session with the reserved atoms, the `verdadero`/`falso`
    /// aliases, and the standard prelude already in place.
    ///
    /// # Panics
    ///
    /// Panics if the built-in prelude fails to parse or evaluate. The prelude
    /// is fixed source compiled into this crate, so that can only happen when
    /// the crate itself is broken, never from caller input.
    pub fn new() -> Self {
        let mut env = create_global_env();
        env.define_variable("verdadero", Value::truth());
        env.define_variable("falso", Value::nil());

        let mut interpreter = Interpreter { env };
        // The prelude is fixed source shipped with the crate; failing to load
        // it is a bug in the crate, not a runtime condition
        interpreter
            .run(PRELUDE)
            .expect("standard prelude must evaluate cleanly");
        interpreter
    }

    /// Parse and evaluate every top-level form in `source`, in order, against
    /// the session environment. Returns the value of the last form, or `None`
    /// when the source holds no forms (blank input, only comments).
    ///
    /// The first error aborts the remaining forms, but bindings established
    /// by the forms that already ran persist in the session.
    pub fn run(&mut self, source: &str) -> Result<Option<Value>, Error> {
        let forms = parse_forms(source)?;
        let mut last = None;
        for form in &forms {
            last = Some(evaluate(form, &mut self.env)?);
        }
        Ok(last)
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}
