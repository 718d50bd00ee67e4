use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::LoxError;
use crate::token::Token;
use crate::value::Value;

/// One scope: a name→value table plus an optional link to the enclosing
/// scope.  Environments are shared by reference (`Rc<RefCell<_>>`): the same
/// environment underlies a function's closure and any block currently
/// executing inside it, so mutations through one alias are visible to all.
#[derive(Debug)]
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

    /// Unconditionally set in the current scope; redefinition is allowed.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &Token) -> Result<Value, LoxError> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(LoxError::runtime(
                name,
                format!("Undefined variable '{}'.", name.lexeme),
            ))
        }
    }

    pub fn assign(&mut self, name: &Token, value: Value) -> Result<(), LoxError> {
        if self.values.contains_key(&name.lexeme) {
            self.values.insert(name.lexeme.clone(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(LoxError::runtime(
                name,
                format!("Undefined variable '{}'.", name.lexeme),
            ))
        }
    }

    /// Read a name at an exact depth recorded by the resolver.  A missing
    /// binding here is a resolver bug, not a user error.
    pub fn get_at(environment: &Rc<RefCell<Environment>>, distance: usize, name: &str) -> Value {
        Self::ancestor(environment, distance)
            .borrow()
            .values
            .get(name)
            .cloned()
            .expect("resolved variable missing from its scope")
    }

    pub fn assign_at(
        environment: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &Token,
        value: Value,
    ) {
        Self::ancestor(environment, distance)
            .borrow_mut()
            .values
            .insert(name.lexeme.clone(), value);
    }

    fn ancestor(environment: &Rc<RefCell<Environment>>, distance: usize) -> Rc<RefCell<Environment>> {
        let mut current: Rc<RefCell<Environment>> = environment.clone();

        for _ in 0..distance {
            let enclosing = current
                .borrow()
                .enclosing
                .clone()
                .expect("environment chain shorter than resolved distance");

            current = enclosing;
        }

        current
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
