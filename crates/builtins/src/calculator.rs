//! Integer arithmetic tools.
//!
//! Operands are 64-bit integers. Addition, subtraction and multiplication
//! return integers and fail on overflow. Division returns an integer when the
//! quotient is exact and a floating-point number otherwise.

use runtime::{Arguments, ParamType, Tool, ToolDeclaration, ToolError};
use serde::Deserialize;
use serde_json::{Value, json};

/// The four calculator operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    pub const ALL: [Operation; 4] = [Self::Add, Self::Subtract, Self::Multiply, Self::Divide];

    pub fn name(self) -> &'static str {
        match self {
            Self::Add => "add_two_numbers",
            Self::Subtract => "subtract_two_numbers",
            Self::Multiply => "multiply_two_numbers",
            Self::Divide => "divide_two_numbers",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Add => "Adds two numbers together and returns the sum.",
            Self::Subtract => "Subtracts the second number from the first and returns the difference.",
            Self::Multiply => "Multiplies two numbers together and returns the product.",
            Self::Divide => "Divides the first number by the second and returns the quotient.",
        }
    }

    pub fn apply(self, a: i64, b: i64) -> Result<Value, ToolError> {
        let overflow = || ToolError::execution(format!("integer overflow in {}", self.name()));
        match self {
            Self::Add => a.checked_add(b).map(Value::from).ok_or_else(overflow),
            Self::Subtract => a.checked_sub(b).map(Value::from).ok_or_else(overflow),
            Self::Multiply => a.checked_mul(b).map(Value::from).ok_or_else(overflow),
            Self::Divide => divide(a, b),
        }
    }
}

fn divide(a: i64, b: i64) -> Result<Value, ToolError> {
    if b == 0 {
        return Err(ToolError::execution("division by zero"));
    }
    match (a.checked_rem(b), a.checked_div(b)) {
        (Some(0), Some(quotient)) => Ok(Value::from(quotient)),
        (Some(_), _) => Ok(json!(a as f64 / b as f64)),
        _ => Err(ToolError::execution("integer overflow in divide_two_numbers")),
    }
}

#[derive(Debug, Deserialize)]
struct Operands {
    a: i64,
    b: i64,
}

/// One calculator operation exposed as a tool.
#[derive(Debug, Clone, Copy)]
pub struct Calculator(pub Operation);

impl Tool for Calculator {
    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration::new(self.0.name(), self.0.description())
            .param("a", ParamType::Integer, "The first number.")
            .param("b", ParamType::Integer, "The second number.")
    }

    fn call(&self, args: Arguments) -> Result<Value, ToolError> {
        let Operands { a, b } = args.parse()?;
        self.0.apply(a, b)
    }
}

/// All calculator tools, in a stable order.
pub fn tools() -> impl Iterator<Item = Calculator> {
    Operation::ALL.into_iter().map(Calculator)
}
