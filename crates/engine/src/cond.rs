//! Conditional-assembly stack.
//!
//! Frames are tri-state so `.elseif` chains behave like gas: once a branch
//! in a chain has been taken, every later `.elseif`/`.else` stays suppressed.

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondState {
    /// Current branch is emitting
    True,
    /// Current branch is suppressed, no branch taken yet
    False,
    /// A branch was already taken; the rest of the chain is suppressed
    Taken,
}

/// Stack of nested `.if*` frames.
#[derive(Debug, Default)]
pub struct CondStack {
    frames: Vec<CondState>,
}

impl CondStack {
    pub fn new() -> Self {
        CondStack::default()
    }

    /// True when every frame on the stack is currently emitting.
    pub fn is_active(&self) -> bool {
        self.frames.iter().all(|f| *f == CondState::True)
    }

    /// True when all frames below the innermost are emitting.
    ///
    /// Used to decide whether a new `.if`/`.elseif` condition needs to be
    /// evaluated at all.
    pub fn parent_active(&self) -> bool {
        let n = self.frames.len();
        n == 0 || self.frames[..n - 1].iter().all(|f| *f == CondState::True)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push(&mut self, value: bool) {
        self.frames.push(if value {
            CondState::True
        } else {
            CondState::False
        });
    }

    /// `.elseif`: re-evaluate an untaken frame, or mark a taken one.
    pub fn elseif(&mut self, value: bool) -> Result<(), EngineError> {
        match self.frames.last_mut() {
            None => Err(EngineError::Directive(
                ".elseif without matching .if".to_string(),
            )),
            Some(top @ CondState::True) => {
                *top = CondState::Taken;
                Ok(())
            }
            Some(CondState::Taken) => Ok(()),
            Some(top @ CondState::False) => {
                if value {
                    *top = CondState::True;
                }
                Ok(())
            }
        }
    }

    /// `.else`: flip the innermost frame unless its chain was already taken.
    pub fn else_(&mut self) -> Result<(), EngineError> {
        match self.frames.last_mut() {
            None => Err(EngineError::Directive(
                ".else without matching .if".to_string(),
            )),
            Some(top @ CondState::True) => {
                *top = CondState::Taken;
                Ok(())
            }
            Some(CondState::Taken) => Ok(()),
            Some(top @ CondState::False) => {
                *top = CondState::True;
                Ok(())
            }
        }
    }

    pub fn endif(&mut self) -> Result<(), EngineError> {
        self.frames
            .pop()
            .map(|_| ())
            .ok_or_else(|| EngineError::Directive(".endif without matching .if".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_if_else() {
        let mut stack = CondStack::new();
        stack.push(true);
        assert!(stack.is_active());
        stack.else_().unwrap();
        assert!(!stack.is_active());
        stack.endif().unwrap();
        assert!(stack.is_active());
    }

    #[test]
    fn test_elseif_selects_first_true_branch() {
        let mut stack = CondStack::new();
        stack.push(false);
        assert!(!stack.is_active());
        stack.elseif(true).unwrap();
        assert!(stack.is_active());
        // Branch was taken; the rest of the chain stays off
        stack.elseif(true).unwrap();
        assert!(!stack.is_active());
        stack.else_().unwrap();
        assert!(!stack.is_active());
        stack.endif().unwrap();
    }

    #[test]
    fn test_nested_suppression() {
        let mut stack = CondStack::new();
        stack.push(false);
        stack.push(true);
        assert!(!stack.is_active());
        assert!(!stack.parent_active());
        stack.endif().unwrap();
        stack.endif().unwrap();
        assert!(stack.is_active());
    }

    #[test]
    fn test_unmatched_closers() {
        let mut stack = CondStack::new();
        assert!(stack.endif().is_err());
        assert!(stack.else_().is_err());
        assert!(stack.elseif(true).is_err());
    }
}
