//! Expression AST and evaluation
//!
//! The expression language is a deliberately small arithmetic subset with
//! one free variable `x` and a fixed allowlist of math functions. There is
//! no assignment, no identifiers beyond the allowlist and no way to reach
//! the host environment; expressions are stored as untrusted user-editable
//! configuration.
//!
//! Evaluation is total over f64: domain errors (e.g. `sqrt(-1)`) produce
//! NaN and division by zero produces infinity, following IEEE semantics.

/// Binary arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

/// Allowlisted math functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Abs,
    Sqrt,
    Exp,
    Ln,
    Log10,
    Sin,
    Cos,
    Tan,
    Floor,
    Ceil,
    Round,
    Min,
    Max,
    Pow,
}

impl Func {
    /// Look up a function by name; None for anything outside the allowlist
    pub fn from_name(name: &str) -> Option<Func> {
        Some(match name {
            "abs" => Func::Abs,
            "sqrt" => Func::Sqrt,
            "exp" => Func::Exp,
            "ln" => Func::Ln,
            "log10" => Func::Log10,
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "floor" => Func::Floor,
            "ceil" => Func::Ceil,
            "round" => Func::Round,
            "min" => Func::Min,
            "max" => Func::Max,
            "pow" => Func::Pow,
            _ => return None,
        })
    }

    /// Number of arguments the function takes
    pub fn arity(&self) -> usize {
        match self {
            Func::Min | Func::Max | Func::Pow => 2,
            _ => 1,
        }
    }

    /// Apply the function to already-evaluated arguments.
    /// The argument count is checked at parse time.
    pub fn apply(&self, args: &[f64]) -> f64 {
        match self {
            Func::Abs => args[0].abs(),
            Func::Sqrt => args[0].sqrt(),
            Func::Exp => args[0].exp(),
            Func::Ln => args[0].ln(),
            Func::Log10 => args[0].log10(),
            Func::Sin => args[0].sin(),
            Func::Cos => args[0].cos(),
            Func::Tan => args[0].tan(),
            Func::Floor => args[0].floor(),
            Func::Ceil => args[0].ceil(),
            Func::Round => args[0].round(),
            Func::Min => args[0].min(args[1]),
            Func::Max => args[0].max(args[1]),
            Func::Pow => args[0].powf(args[1]),
        }
    }
}

/// Parsed expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal
    Number(f64),
    /// The free variable `x`
    Var,
    /// Unary negation
    Neg(Box<Expr>),
    /// Binary operation
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// Function call with arity-checked arguments
    Call(Func, Vec<Expr>),
}

impl Expr {
    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn neg(inner: Expr) -> Expr {
        Expr::Neg(Box::new(inner))
    }

    /// Evaluate with the free variable bound to `x`
    pub fn eval(&self, x: f64) -> f64 {
        match self {
            Expr::Number(n) => *n,
            Expr::Var => x,
            Expr::Neg(inner) => -inner.eval(x),
            Expr::Binary(op, lhs, rhs) => {
                let (a, b) = (lhs.eval(x), rhs.eval(x));
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / b,
                    BinOp::Rem => a % b,
                    BinOp::Pow => a.powf(b),
                }
            }
            Expr::Call(func, args) => {
                let evaluated: Vec<f64> = args.iter().map(|a| a.eval(x)).collect();
                func.apply(&evaluated)
            }
        }
    }
}
