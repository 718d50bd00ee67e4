//! Tree-walk evaluator.
//!
//! Statements execute against a chain of environments rooted at the globals
//! (where `clock` is predefined).  Variable occurrences that the resolver
//! bound to a lexical depth are read through `get_at`/`assign_at`; everything
//! else falls through to the global environment.
//!
//! `return` travels on its own channel ([`Unwind::Return`]), never through
//! the error type: expression evaluation can only fail, and the signal is
//! always caught by the function call that owns the frame.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::environment::Environment;
use crate::error::LoxError;
use crate::token::{Token, TokenType};
use crate::value::{LoxClass, LoxFunction, LoxInstance, Value};

/// Why statement execution stopped early.
pub enum Unwind {
    /// A `return` statement; unwinds to the enclosing function call.
    Return(Value),

    /// A runtime fault; unwinds to the top of the program.
    Fault(LoxError),
}

impl From<LoxError> for Unwind {
    fn from(error: LoxError) -> Self {
        Unwind::Fault(error)
    }
}

pub struct Interpreter<'out, W: Write> {
    output: &'out mut W,
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
}

impl<'out, W: Write> Interpreter<'out, W> {
    pub fn new(output: &'out mut W) -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction {
                name: "clock".to_string(),
                arity: 0,
                func: clock_native,
            },
        );

        Interpreter {
            output,
            environment: globals.clone(),
            globals,
            locals: HashMap::new(),
        }
    }

    /// Record a lexical binding distance for one variable occurrence.
    /// Called by the resolver; absence of an entry means "global".
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Run a resolved program to completion or to the first runtime fault.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), LoxError> {
        for stmt in statements {
            match self.execute(stmt) {
                Ok(()) => {}

                Err(Unwind::Fault(error)) => return Err(error),

                Err(Unwind::Return(_)) => {
                    unreachable!("return signal escaped to top level; the resolver forbids this")
                }
            }
        }

        Ok(())
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<(), Unwind> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(())
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;

                writeln!(self.output, "{}", value).map_err(LoxError::from)?;

                Ok(())
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(())
            }

            Stmt::Block(statements) => {
                let environment = Rc::new(RefCell::new(Environment::with_enclosing(
                    self.environment.clone(),
                )));

                self.execute_block(statements, environment)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)?;
                }

                Ok(())
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    self.execute(body)?;
                }

                Ok(())
            }

            Stmt::Function(declaration) => {
                let function = LoxFunction::new(declaration.clone(), self.environment.clone(), false);

                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));

                Ok(())
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Err(Unwind::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    /// Run `statements` in `environment`, restoring the previous environment
    /// on every exit path, including `return` and fault unwinds.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> Result<(), Unwind> {
        let previous: Rc<RefCell<Environment>> =
            std::mem::replace(&mut self.environment, environment);

        let result = statements.iter().try_for_each(|stmt| self.execute(stmt));

        self.environment = previous;

        result
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<(), Unwind> {
        let superclass_value: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => {
                let superclass_name: &Token = match expr {
                    Expr::Variable { name, .. } => name,

                    _ => unreachable!("superclass is always parsed as a variable"),
                };

                match self.evaluate(expr)? {
                    Value::Class(class) => Some(class),

                    _ => {
                        return Err(LoxError::runtime(
                            superclass_name,
                            "Superclass must be a class.",
                        )
                        .into())
                    }
                }
            }

            None => None,
        };

        // Defined as nil first so methods can refer to the class by name.
        self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

        let previous: Option<Rc<RefCell<Environment>>> = superclass_value.as_ref().map(|class| {
            let environment = Rc::new(RefCell::new(Environment::with_enclosing(
                self.environment.clone(),
            )));

            environment
                .borrow_mut()
                .define("super", Value::Class(class.clone()));

            std::mem::replace(&mut self.environment, environment)
        });

        let mut method_table: HashMap<String, Rc<LoxFunction>> = HashMap::new();

        for method in methods {
            let function = LoxFunction::new(
                method.clone(),
                self.environment.clone(),
                method.name.lexeme == "init",
            );

            method_table.insert(method.name.lexeme.clone(), Rc::new(function));
        }

        let class = Value::Class(Rc::new(LoxClass::new(
            name.lexeme.clone(),
            superclass_value,
            method_table,
        )));

        if let Some(previous) = previous {
            self.environment = previous;
        }

        self.environment.borrow_mut().assign(name, class)?;

        Ok(())
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, LoxError> {
        match expr {
            Expr::Literal(literal) => Ok(Value::from(literal)),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_val: Value = self.evaluate(left)?;

                match operator.token_type {
                    TokenType::OR if left_val.is_truthy() => Ok(left_val),

                    TokenType::AND if !left_val.is_truthy() => Ok(left_val),

                    _ => self.evaluate(right),
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(name, *id),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        Environment::assign_at(&self.environment, distance, name, value.clone());
                    }

                    None => {
                        self.globals.borrow_mut().assign(name, value.clone())?;
                    }
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),

                _ => Err(LoxError::runtime(name, "Only instances have properties.")),
            },

            Expr::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value: Value = self.evaluate(value)?;

                    instance.borrow_mut().set(name, value.clone());

                    Ok(value)
                }

                _ => Err(LoxError::runtime(name, "Only instances have fields.")),
            },

            Expr::This { id, keyword } => self.look_up_variable(keyword, *id),

            Expr::Super { id, method, .. } => self.evaluate_super(*id, method),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> Result<Value, LoxError> {
        let value: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match value {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(LoxError::runtime(operator, "Operand must be a number.")),
            },

            TokenType::BANG => Ok(Value::Bool(!value.is_truthy())),

            _ => unreachable!("parser only emits '!' and '-' unary operators"),
        }
    }

    fn evaluate_binary(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> Result<Value, LoxError> {
        let left_val: Value = self.evaluate(left)?;
        let right_val: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                _ => Err(LoxError::runtime(
                    operator,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenType::MINUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),

                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            TokenType::STAR => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),

                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            TokenType::SLASH => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => {
                    if b == 0.0 {
                        Err(LoxError::runtime(operator, "Division by zero."))
                    } else {
                        Ok(Value::Number(a / b))
                    }
                }

                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_val == right_val)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left_val != right_val)),

            TokenType::LESS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),

                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            TokenType::LESS_EQUAL => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),

                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            TokenType::GREATER => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),

                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            TokenType::GREATER_EQUAL => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),

                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            _ => unreachable!("parser only emits arithmetic and comparison binary operators"),
        }
    }

    fn evaluate_call(
        &mut self,
        callee: &Expr,
        paren: &Token,
        arguments: &[Expr],
    ) -> Result<Value, LoxError> {
        let callee_val: Value = self.evaluate(callee)?;

        let mut args: Vec<Value> = Vec::with_capacity(arguments.len());

        for argument in arguments {
            args.push(self.evaluate(argument)?);
        }

        match callee_val {
            Value::NativeFunction { arity, func, .. } => {
                check_arity(arity, args.len(), paren)?;

                func(&args).map_err(|message| LoxError::runtime(paren, message))
            }

            Value::Function(function) => {
                check_arity(function.arity(), args.len(), paren)?;

                function.call(self, args)
            }

            Value::Class(class) => {
                check_arity(class.arity(), args.len(), paren)?;

                class.call(self, args)
            }

            _ => Err(LoxError::runtime(
                paren,
                "Can only call functions and classes.",
            )),
        }
    }

    fn evaluate_super(&mut self, id: ExprId, method: &Token) -> Result<Value, LoxError> {
        let distance: usize = *self
            .locals
            .get(&id)
            .expect("'super' reached evaluation without a resolved depth");

        let superclass: Rc<LoxClass> =
            match Environment::get_at(&self.environment, distance, "super") {
                Value::Class(class) => class,

                _ => unreachable!("'super' is always bound to a class"),
            };

        // The bound instance lives one scope inside the `super` scope.
        let object: Rc<RefCell<LoxInstance>> =
            match Environment::get_at(&self.environment, distance - 1, "this") {
                Value::Instance(instance) => instance,

                _ => unreachable!("'this' is always bound to an instance"),
            };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(found.bind(object))),

            None => Err(LoxError::runtime(
                method,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> Result<Value, LoxError> {
        match self.locals.get(&id) {
            Some(&distance) => Ok(Environment::get_at(&self.environment, distance, &name.lexeme)),

            None => self.globals.borrow().get(name),
        }
    }
}

fn check_arity(expected: usize, got: usize, paren: &Token) -> Result<(), LoxError> {
    if expected != got {
        return Err(LoxError::runtime(
            paren,
            format!("Expected {} arguments but got {}.", expected, got),
        ));
    }

    Ok(())
}

fn clock_native(_args: &[Value]) -> Result<Value, String> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| format!("Clock error: {}", e))?
        .as_secs_f64();

    Ok(Value::Number(timestamp))
}
