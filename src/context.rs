use std::fmt::Display;

/// A single stack cell. Integer instructions truncate it at the point of use.
pub type Value = f32;

/// Variable names are compared on this many characters
pub const MAX_NAME_LEN: usize = 32;

/// Why a stack or variable operation refused to run. The state is left untouched whenever one
/// of these is returned.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ContextError {
    EmptyStack,
    InsufficientOperands,
    DivisionByZero,
    UnknownVariable,
}

impl Display for ContextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextError::EmptyStack => write!(f, "the stack is empty"),
            ContextError::InsufficientOperands => {
                write!(f, "the stack is composed of less than 2 elements")
            }
            ContextError::DivisionByZero => write!(f, "the top element has a value of zero"),
            ContextError::UnknownVariable => write!(f, "the variable doesn't exist"),
        }
    }
}

/// Relations tested by the binary conditionals, always `second <relation> top`
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Relation {
    Equal,
    Different,
    Greater,
    Lower,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Variable {
    pub name: String,
    pub value: Value,
}

fn key(name: &str) -> &str {
    match name.char_indices().nth(MAX_NAME_LEN) {
        Some((end, _)) => &name[..end],
        None => name,
    }
}

fn as_int(value: Value) -> i32 {
    value as i32
}

/// The value stack and the variable store of one program run
#[derive(Debug, Default, Clone)]
pub struct Context {
    stack: Vec<Value>,
    variables: Vec<Variable>,
}

impl Context {
    pub fn new() -> Context {
        Context::default()
    }

    /// Stack contents, bottom first
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn top(&self) -> Option<Value> {
        self.stack.last().copied()
    }

    pub fn reset(&mut self) {
        self.stack.clear();
        self.variables.clear();
    }

    fn require(&self, count: usize) -> Result<(), ContextError> {
        match (self.stack.len(), count) {
            (len, _) if len >= count => Ok(()),
            (0, 1) => Err(ContextError::EmptyStack),
            _ => Err(ContextError::InsufficientOperands),
        }
    }

    fn top_mut(&mut self) -> Result<&mut Value, ContextError> {
        self.stack.last_mut().ok_or(ContextError::EmptyStack)
    }

    /// `(second, top)` without removing them
    fn operands(&self) -> Result<(Value, Value), ContextError> {
        self.require(2)?;
        let len = self.stack.len();
        Ok((self.stack[len - 2], self.stack[len - 1]))
    }

    /// Replaces the two top elements with `op(second, top)`
    fn binary<F>(&mut self, op: F) -> Result<(), ContextError>
    where
        F: FnOnce(Value, Value) -> Value,
    {
        let (second, top) = self.operands()?;
        self.stack.truncate(self.stack.len() - 2);
        self.stack.push(op(second, top));

        Ok(())
    }

    fn unary<F>(&mut self, op: F) -> Result<(), ContextError>
    where
        F: FnOnce(Value) -> Value,
    {
        let top = self.top_mut()?;
        *top = op(*top);

        Ok(())
    }

    /// Single operand bitwise instructions still want two elements on the stack
    fn unary_bitwise<F>(&mut self, op: F) -> Result<(), ContextError>
    where
        F: FnOnce(i32) -> i32,
    {
        self.require(2)?;
        self.unary(|value| op(as_int(value)) as Value)
    }

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Result<Value, ContextError> {
        self.stack.pop().ok_or(ContextError::EmptyStack)
    }

    pub fn dup(&mut self) -> Result<(), ContextError> {
        let top = self.top().ok_or(ContextError::EmptyStack)?;
        self.stack.push(top);

        Ok(())
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }

    pub fn swap(&mut self) -> Result<(), ContextError> {
        self.require(2)?;
        let len = self.stack.len();
        self.stack.swap(len - 2, len - 1);

        Ok(())
    }

    pub fn sum(&mut self) -> Result<(), ContextError> {
        self.binary(|second, top| second + top)
    }

    pub fn sub(&mut self) -> Result<(), ContextError> {
        self.binary(|second, top| second - top)
    }

    pub fn mult(&mut self) -> Result<(), ContextError> {
        self.binary(|second, top| second * top)
    }

    pub fn div(&mut self) -> Result<(), ContextError> {
        let (_, top) = self.operands()?;
        if top == 0.0 {
            return Err(ContextError::DivisionByZero);
        }
        self.binary(|second, top| second / top)
    }

    /// Integer remainder of the truncated operands
    pub fn rem(&mut self) -> Result<(), ContextError> {
        let (_, top) = self.operands()?;
        if as_int(top) == 0 {
            return Err(ContextError::DivisionByZero);
        }
        self.binary(|second, top| as_int(second).wrapping_rem(as_int(top)) as Value)
    }

    pub fn to_int(&mut self) -> Result<(), ContextError> {
        self.unary(|value| as_int(value) as Value)
    }

    pub fn inc(&mut self) -> Result<(), ContextError> {
        self.unary(|value| value + 1.0)
    }

    pub fn dec(&mut self) -> Result<(), ContextError> {
        self.unary(|value| value - 1.0)
    }

    pub fn and(&mut self) -> Result<(), ContextError> {
        self.binary(|second, top| (as_int(second) & as_int(top)) as Value)
    }

    pub fn or(&mut self) -> Result<(), ContextError> {
        self.binary(|second, top| (as_int(second) | as_int(top)) as Value)
    }

    pub fn xor(&mut self) -> Result<(), ContextError> {
        self.binary(|second, top| (as_int(second) ^ as_int(top)) as Value)
    }

    pub fn not(&mut self) -> Result<(), ContextError> {
        self.unary_bitwise(|value| !value)
    }

    pub fn left_shift(&mut self) -> Result<(), ContextError> {
        self.unary_bitwise(|value| value.wrapping_shl(1))
    }

    pub fn right_shift(&mut self) -> Result<(), ContextError> {
        self.unary_bitwise(|value| value >> 1)
    }

    pub fn abs(&mut self) -> Result<(), ContextError> {
        self.unary(Value::abs)
    }

    pub fn pow(&mut self) -> Result<(), ContextError> {
        self.binary(Value::powf)
    }

    pub fn ln(&mut self) -> Result<(), ContextError> {
        self.unary(Value::ln)
    }

    pub fn log(&mut self) -> Result<(), ContextError> {
        self.unary(Value::log10)
    }

    pub fn log_two(&mut self) -> Result<(), ContextError> {
        self.unary(Value::log2)
    }

    pub fn ceil(&mut self) -> Result<(), ContextError> {
        self.unary(Value::ceil)
    }

    pub fn sqrt(&mut self) -> Result<(), ContextError> {
        self.unary(Value::sqrt)
    }

    pub fn sin(&mut self) -> Result<(), ContextError> {
        self.unary(Value::sin)
    }

    pub fn cos(&mut self) -> Result<(), ContextError> {
        self.unary(Value::cos)
    }

    pub fn tan(&mut self) -> Result<(), ContextError> {
        self.unary(Value::tan)
    }

    /// Tests `second <relation> top`, leaving both on the stack
    pub fn compare(&self, relation: Relation) -> Result<bool, ContextError> {
        let (second, top) = self.operands()?;
        Ok(match relation {
            Relation::Equal => second == top,
            Relation::Different => second != top,
            Relation::Greater => second > top,
            Relation::Lower => second < top,
        })
    }

    /// Tests whether the element below the top equals `expected`. Two elements are required.
    pub fn truth(&self, expected: Value) -> Result<bool, ContextError> {
        let (second, _) = self.operands()?;
        Ok(second == expected)
    }

    fn variable_mut(&mut self, name: &str) -> Result<&mut Variable, ContextError> {
        let name = key(name);
        self.variables
            .iter_mut()
            .find(|variable| variable.name == name)
            .ok_or(ContextError::UnknownVariable)
    }

    pub fn variable(&self, name: &str) -> Option<Value> {
        let name = key(name);
        self.variables
            .iter()
            .find(|variable| variable.name == name)
            .map(|variable| variable.value)
    }

    pub fn declare_var(&mut self, name: &str) {
        self.variables.push(Variable {
            name: key(name).to_string(),
            value: 0.0,
        });
    }

    /// Copies the top of the stack into the variable
    pub fn store_var(&mut self, name: &str) -> Result<(), ContextError> {
        let top = self.top();
        let variable = self.variable_mut(name)?;
        variable.value = top.ok_or(ContextError::EmptyStack)?;

        Ok(())
    }

    /// Moves the top of the stack into the variable
    pub fn pop_store_var(&mut self, name: &str) -> Result<(), ContextError> {
        if self.stack.is_empty() {
            return Err(ContextError::EmptyStack);
        }
        self.store_var(name)?;
        self.stack.pop();

        Ok(())
    }

    pub fn load_var(&mut self, name: &str) -> Result<(), ContextError> {
        let value = self.variable(name).ok_or(ContextError::UnknownVariable)?;
        self.stack.push(value);

        Ok(())
    }

    pub fn delete_var(&mut self, name: &str) -> Result<(), ContextError> {
        let name = key(name);
        let index = self
            .variables
            .iter()
            .position(|variable| variable.name == name)
            .ok_or(ContextError::UnknownVariable)?;
        self.variables.remove(index);

        Ok(())
    }

    pub fn clear_vars(&mut self) {
        self.variables.clear();
    }
}
