use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{LoxError, Result};
use crate::value::Value;

/// One frame of the lexical scope chain.  Frames are shared (`Rc`) because
/// closures keep their defining frame alive past its syntactic scope.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Installs `name` in this frame unconditionally, shadowing any
    /// enclosing binding.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Walks the chain outward and returns the first match.
    pub fn get(&self, name: &str, line: usize) -> Result<Value> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// Walks the chain outward and updates the first frame containing
    /// `name`; errors if no frame does.
    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// Reads `name` from the frame exactly `distance` links out, without
    /// walking any further.  The resolver guarantees the binding is there.
    pub fn get_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        line: usize,
    ) -> Result<Value> {
        let target: Rc<RefCell<Environment>> = Environment::ancestor(env, distance, line)?;

        let value: Option<Value> = target.borrow().values.get(name).cloned();

        value.ok_or_else(|| LoxError::runtime(line, format!("Undefined variable '{}'.", name)))
    }

    /// Writes `name` in the frame exactly `distance` links out.
    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        value: Value,
        line: usize,
    ) -> Result<()> {
        let target: Rc<RefCell<Environment>> = Environment::ancestor(env, distance, line)?;

        let mut target_ref = target.borrow_mut();
        match target_ref.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }

            None => Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            )),
        }
    }

    // A chain shorter than a resolved depth indicates a resolver bug, not a
    // user error; it is still reported rather than panicking.
    fn ancestor(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        line: usize,
    ) -> Result<Rc<RefCell<Environment>>> {
        let mut current: Rc<RefCell<Environment>> = Rc::clone(env);

        for _ in 0..distance {
            let next: Option<Rc<RefCell<Environment>>> = current.borrow().enclosing.clone();

            current = next.ok_or_else(|| {
                LoxError::runtime(line, "Scope chain shorter than resolved depth.")
            })?;
        }

        Ok(current)
    }
}
