//! Symbolic inversion of the Amdahl speedup formula.
//!
//! The speedup equation is stated over five symbols, its denominator is
//! cleared, and the resulting equation (affine in the parallel fraction) is
//! solved once. The closed form is then compiled into a numeric evaluator.

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Symbol {
    FracPar,
    Speedup,
    Nodes,
    AccelSpeedup,
    Nprocs,
}

impl Symbol {
    pub fn name(self) -> &'static str {
        match self {
            Symbol::FracPar => "frac_par",
            Symbol::Speedup => "speedup",
            Symbol::Nodes => "nodes",
            Symbol::AccelSpeedup => "accel_speedup",
            Symbol::Nprocs => "nprocs",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SolveError {
    #[error("no solution for {0}")]
    NoSolution(&'static str),

    #[error("equation is not linear in {0}")]
    NonLinear(&'static str),

    #[error("symbol {0} is not bound to an argument")]
    UnboundSymbol(&'static str),

    #[error("expected {expected} arguments, got {found}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("{found} process counts for {expected} speedup samples")]
    ColumnLength { expected: usize, found: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Const(f64),
    Sym(Symbol),
    Add(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
}

impl Expr {
    pub fn constant(value: f64) -> Self {
        Expr::Const(value)
    }

    pub fn sym(symbol: Symbol) -> Self {
        Expr::Sym(symbol)
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Const(c) if *c == 0.0)
    }

    fn is_one(&self) -> bool {
        matches!(self, Expr::Const(c) if *c == 1.0)
    }

    pub fn contains(&self, symbol: Symbol) -> bool {
        match self {
            Expr::Const(_) => false,
            Expr::Sym(s) => *s == symbol,
            Expr::Add(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) => {
                a.contains(symbol) || b.contains(symbol)
            }
            Expr::Neg(a) => a.contains(symbol),
        }
    }

    fn collect_symbols(&self, out: &mut Vec<Symbol>) {
        match self {
            Expr::Const(_) => {}
            Expr::Sym(s) => {
                if !out.contains(s) {
                    out.push(*s);
                }
            }
            Expr::Add(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            }
            Expr::Neg(a) => a.collect_symbols(out),
        }
    }

    /// Constant folding plus the additive/multiplicative identities.
    pub fn simplify(&self) -> Expr {
        match self {
            Expr::Const(_) | Expr::Sym(_) => self.clone(),
            Expr::Add(a, b) => match (a.simplify(), b.simplify()) {
                (Expr::Const(x), Expr::Const(y)) => Expr::Const(x + y),
                (a, b) if a.is_zero() => b,
                (a, b) if b.is_zero() => a,
                (a, b) => Expr::Add(Box::new(a), Box::new(b)),
            },
            Expr::Mul(a, b) => match (a.simplify(), b.simplify()) {
                (Expr::Const(x), Expr::Const(y)) => Expr::Const(x * y),
                (a, b) if a.is_zero() || b.is_zero() => Expr::Const(0.0),
                (a, b) if a.is_one() => b,
                (a, b) if b.is_one() => a,
                (a, b) => Expr::Mul(Box::new(a), Box::new(b)),
            },
            Expr::Div(a, b) => match (a.simplify(), b.simplify()) {
                (Expr::Const(x), Expr::Const(y)) if y != 0.0 => Expr::Const(x / y),
                (a, b) if a.is_zero() && !b.is_zero() => Expr::Const(0.0),
                (a, b) if b.is_one() => a,
                (a, b) => Expr::Div(Box::new(a), Box::new(b)),
            },
            Expr::Neg(a) => match a.simplify() {
                Expr::Const(x) => Expr::Const(-x),
                Expr::Neg(inner) => *inner,
                a => Expr::Neg(Box::new(a)),
            },
        }
    }

    /// Split an expression that is affine in `symbol` into
    /// `(constant, coefficient)` so that `self == constant + coefficient * symbol`.
    ///
    /// `symbol` may not appear in a denominator; clear it first.
    pub fn linear_in(&self, symbol: Symbol) -> Result<(Expr, Expr), SolveError> {
        let (c0, c1) = match self {
            Expr::Const(_) => (self.clone(), Expr::Const(0.0)),
            Expr::Sym(s) if *s == symbol => (Expr::Const(0.0), Expr::Const(1.0)),
            Expr::Sym(_) => (self.clone(), Expr::Const(0.0)),
            Expr::Add(a, b) => {
                let (a0, a1) = a.linear_in(symbol)?;
                let (b0, b1) = b.linear_in(symbol)?;
                (a0 + b0, a1 + b1)
            }
            Expr::Neg(a) => {
                let (a0, a1) = a.linear_in(symbol)?;
                (-a0, -a1)
            }
            Expr::Mul(a, b) => {
                let (a0, a1) = a.linear_in(symbol)?;
                let (b0, b1) = b.linear_in(symbol)?;
                if !a1.is_zero() && !b1.is_zero() {
                    return Err(SolveError::NonLinear(symbol.name()));
                }
                (a0.clone() * b0.clone(), a0 * b1 + a1 * b0)
            }
            Expr::Div(a, b) => {
                if b.contains(symbol) {
                    return Err(SolveError::NonLinear(symbol.name()));
                }
                let (a0, a1) = a.linear_in(symbol)?;
                (a0 / (**b).clone(), a1 / (**b).clone())
            }
        };
        Ok((c0.simplify(), c1.simplify()))
    }

    /// Turn the expression into a numeric function of `args`, in that order.
    pub fn compile(&self, args: &[Symbol]) -> Result<CompiledExpr, SolveError> {
        let mut used = Vec::new();
        self.collect_symbols(&mut used);
        if let Some(missing) = used.iter().find(|s| !args.contains(*s)) {
            return Err(SolveError::UnboundSymbol(missing.name()));
        }

        Ok(CompiledExpr {
            arity: args.len(),
            func: self.build(args),
        })
    }

    fn build(&self, args: &[Symbol]) -> EvalFn {
        match self {
            Expr::Const(c) => {
                let c = *c;
                Box::new(move |_: &[f64]| c)
            }
            Expr::Sym(s) => {
                // compile() has already checked every symbol is bound
                let idx = args.iter().position(|a| a == s).unwrap_or(0);
                Box::new(move |xs: &[f64]| xs[idx])
            }
            Expr::Add(a, b) => {
                let (a, b) = (a.build(args), b.build(args));
                Box::new(move |xs: &[f64]| a(xs) + b(xs))
            }
            Expr::Mul(a, b) => {
                let (a, b) = (a.build(args), b.build(args));
                Box::new(move |xs: &[f64]| a(xs) * b(xs))
            }
            Expr::Div(a, b) => {
                let (a, b) = (a.build(args), b.build(args));
                Box::new(move |xs: &[f64]| a(xs) / b(xs))
            }
            Expr::Neg(a) => {
                let a = a.build(args);
                Box::new(move |xs: &[f64]| -a(xs))
            }
        }
    }
}

impl Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::Add(Box::new(self), Box::new(rhs))
    }
}

impl Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::Add(Box::new(self), Box::new(-rhs))
    }
}

impl Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::Mul(Box::new(self), Box::new(rhs))
    }
}

impl Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::Div(Box::new(self), Box::new(rhs))
    }
}

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::Neg(Box::new(self))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(c) => write!(f, "{}", c),
            Expr::Sym(s) => write!(f, "{}", s.name()),
            Expr::Add(a, b) => match &**b {
                Expr::Neg(inner) => write!(f, "({} - {})", a, inner),
                _ => write!(f, "({} + {})", a, b),
            },
            Expr::Mul(a, b) => {
                write_operand(f, a, is_div)?;
                write!(f, "*")?;
                write_operand(f, b, is_div)
            }
            Expr::Div(a, b) => {
                write_operand(f, a, is_div)?;
                write!(f, "/")?;
                write_operand(f, b, |e| is_div(e) || matches!(e, Expr::Mul(..)))
            }
            Expr::Neg(a) => write!(f, "-{}", a),
        }
    }
}

fn is_div(e: &Expr) -> bool {
    matches!(e, Expr::Div(..))
}

// Add already brackets itself; products and quotients need it where they bind looser.
fn write_operand(
    f: &mut fmt::Formatter<'_>,
    e: &Expr,
    needs_parens: impl Fn(&Expr) -> bool,
) -> fmt::Result {
    if needs_parens(e) {
        write!(f, "({})", e)
    } else {
        write!(f, "{}", e)
    }
}

/// `lhs = rhs`
#[derive(Clone, Debug, PartialEq)]
pub struct Equation {
    pub lhs: Expr,
    pub rhs: Expr,
}

impl Equation {
    pub fn new(lhs: Expr, rhs: Expr) -> Self {
        Self { lhs, rhs }
    }

    /// Multiply both sides by a top-level denominator: `a = n / d` becomes `a * d = n`.
    pub fn clear_denominator(self) -> Equation {
        match (self.lhs, self.rhs) {
            (lhs, Expr::Div(num, den)) => Equation::new(lhs * *den, *num),
            (Expr::Div(num, den), rhs) => Equation::new(*num, rhs * *den),
            (lhs, rhs) => Equation::new(lhs, rhs),
        }
    }

    /// All solutions of the equation for `symbol`. An equation whose
    /// coefficient vanishes identically has none.
    pub fn solve_for(&self, symbol: Symbol) -> Result<Vec<Expr>, SolveError> {
        let (c0, c1) = (self.lhs.clone() - self.rhs.clone()).linear_in(symbol)?;
        if c1.is_zero() {
            return Ok(Vec::new());
        }
        Ok(vec![(-c0 / c1).simplify()])
    }
}

type EvalFn = Box<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// A closed-form expression compiled into nested closures.
pub struct CompiledExpr {
    arity: usize,
    func: EvalFn,
}

impl CompiledExpr {
    pub fn eval(&self, args: &[f64]) -> Result<f64, SolveError> {
        if args.len() != self.arity {
            return Err(SolveError::ShapeMismatch {
                expected: self.arity,
                found: args.len(),
            });
        }
        Ok((self.func)(args))
    }
}

impl fmt::Debug for CompiledExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpr").field("arity", &self.arity).finish()
    }
}

const FRACTION_ARGS: [Symbol; 4] = [
    Symbol::Speedup,
    Symbol::Nodes,
    Symbol::AccelSpeedup,
    Symbol::Nprocs,
];

/// Parallel fraction as a function of observed speedup, nodes, accelerator
/// speedup and process count.
#[derive(Debug)]
pub struct FractionSolver {
    expr: Expr,
    func: CompiledExpr,
}

impl FractionSolver {
    pub fn new() -> Result<Self, SolveError> {
        let frac_par = Expr::sym(Symbol::FracPar);
        let serial = Expr::constant(1.0) - frac_par.clone();

        let numerator = serial.clone() + Expr::sym(Symbol::Nodes) * frac_par.clone();
        let denominator = serial
            + frac_par / (Expr::sym(Symbol::AccelSpeedup) * Expr::sym(Symbol::Nprocs));

        let original = Equation::new(Expr::sym(Symbol::Speedup), numerator / denominator);
        let cleared = original.clear_denominator();

        let expr = cleared
            .solve_for(Symbol::FracPar)?
            .into_iter()
            .next()
            .ok_or(SolveError::NoSolution(Symbol::FracPar.name()))?;
        let func = expr.compile(&FRACTION_ARGS)?;

        Ok(Self { expr, func })
    }

    pub fn expression(&self) -> &Expr {
        &self.expr
    }

    /// Only meaningful for `nprocs > 1`; at one process the formula is 0/0.
    pub fn solve_fraction(
        &self,
        speedup: f64,
        nodes: f64,
        accel_speedup: f64,
        nprocs: f64,
    ) -> Result<f64, SolveError> {
        self.func.eval(&[speedup, nodes, accel_speedup, nprocs])
    }

    /// Vectorized `solve_fraction` over paired speedup and process-count samples.
    pub fn solve_fractions(
        &self,
        speedups: &[f64],
        nodes: f64,
        accel_speedup: f64,
        nprocs: &[f64],
    ) -> Result<Vec<f64>, SolveError> {
        if speedups.len() != nprocs.len() {
            return Err(SolveError::ColumnLength {
                expected: speedups.len(),
                found: nprocs.len(),
            });
        }
        speedups
            .iter()
            .zip(nprocs)
            .map(|(&s, &n)| self.solve_fraction(s, nodes, accel_speedup, n))
            .collect()
    }
}
