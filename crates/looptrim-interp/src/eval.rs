//! Tree-walking evaluation of statements and expressions.

use looptrim::ir::{intrinsics, CallType, Expr, Scope, Stmt, Type};

use crate::memory::mix;
use crate::{ops, EvalResult, EvalTrap, Memory, Value};

/// Default loop iteration budget.
const DEFAULT_FUEL: u64 = 1 << 20;

/// Opaque calls return values in `[0, OPAQUE_RANGE)` so that comparisons
/// against small constants go both ways.
const OPAQUE_RANGE: u64 = 16;

/// A call to an effectful intrinsic, with its evaluated arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Effect {
    pub name: String,
    pub args: Vec<Value>,
}

/// Interpreter state: variable bindings, memory and the effect log.
pub struct Interpreter {
    env: Scope<Value>,
    memory: Memory,
    effects: Vec<Effect>,
    fuel: u64,
}

impl Interpreter {
    pub fn new(memory: Memory) -> Self {
        Self {
            env: Scope::new(),
            memory,
            effects: Vec::new(),
            fuel: DEFAULT_FUEL,
        }
    }

    /// Limits the total number of loop iterations.
    pub fn with_fuel(mut self, fuel: u64) -> Self {
        self.fuel = fuel;
        self
    }

    /// Binds a free variable of the program.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.env.push(name, value);
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    /// Final memory and effect log.
    pub fn into_observations(self) -> (Memory, Vec<Effect>) {
        (self.memory, self.effects)
    }

    fn scoped<T>(
        &mut self,
        name: &str,
        value: Value,
        f: impl FnOnce(&mut Self) -> EvalResult<T>,
    ) -> EvalResult<T> {
        self.env.push(name, value);
        let result = f(self);
        self.env.pop(name);
        result
    }

    // ── Statements ───────────────────────────────────────────────────────────

    pub fn run(&mut self, s: &Stmt) -> EvalResult<()> {
        match s {
            Stmt::Store { name, index, value } => {
                let i = self.eval(index)?.as_i64()?;
                let v = self.eval(value)?;
                self.memory.store(name, i, value.ty(), v);
                Ok(())
            }
            Stmt::For {
                name,
                min,
                extent,
                body,
                ..
            } => {
                let min_value = self.eval(min)?;
                let lo = min_value.as_i64()?;
                let extent = self.eval(extent)?.as_i64()?;
                for v in lo..lo.saturating_add(extent) {
                    if self.fuel == 0 {
                        return Err(EvalTrap::FuelExhausted);
                    }
                    self.fuel -= 1;
                    let var = match min_value {
                        Value::UInt(_) => Value::UInt(v as u64),
                        _ => Value::Int(v),
                    };
                    self.scoped(name, var, |this| this.run(body))?;
                }
                Ok(())
            }
            Stmt::IfThenElse {
                cond,
                then_case,
                else_case,
            } => {
                if self.eval(cond)?.as_bool()? {
                    self.run(then_case)
                } else if let Some(else_case) = else_case {
                    self.run(else_case)
                } else {
                    Ok(())
                }
            }
            Stmt::LetStmt { name, value, body } => {
                let v = self.eval(value)?;
                self.scoped(name, v, |this| this.run(body))
            }
            Stmt::Evaluate(e) => self.eval(e).map(|_| ()),
            Stmt::Block(stmts) => stmts.iter().try_for_each(|s| self.run(s)),
        }
    }

    // ── Expressions ──────────────────────────────────────────────────────────

    pub fn eval(&mut self, e: &Expr) -> EvalResult<Value> {
        match e {
            Expr::IntImm { value, .. } => Ok(Value::Int(*value)),
            Expr::UIntImm { value, .. } => Ok(Value::UInt(*value)),
            Expr::FloatImm { bits, .. } => Ok(Value::Float(f64::from_bits(*bits))),
            Expr::BoolImm(b) => Ok(Value::Bool(*b)),
            Expr::Var { name, .. } => self.env.get(name).copied().ok_or(EvalTrap::UnboundVariable),
            Expr::Binary { op, a, b } => {
                let ty = a.ty();
                let (a, b) = (self.eval(a)?, self.eval(b)?);
                ops::binary(*op, ty, a, b)
            }
            Expr::Cmp { op, a, b } => {
                let (a, b) = (self.eval(a)?, self.eval(b)?);
                ops::compare(*op, a, b).map(Value::Bool)
            }
            Expr::And(a, b) => {
                if self.eval(a)?.as_bool()? {
                    self.eval(b)
                } else {
                    Ok(Value::Bool(false))
                }
            }
            Expr::Or(a, b) => {
                if self.eval(a)?.as_bool()? {
                    Ok(Value::Bool(true))
                } else {
                    self.eval(b)
                }
            }
            Expr::Not(a) => Ok(Value::Bool(!self.eval(a)?.as_bool()?)),
            Expr::Select { cond, t, f } => {
                if self.eval(cond)?.as_bool()? {
                    self.eval(t)
                } else {
                    self.eval(f)
                }
            }
            Expr::Load { ty, name, index } => {
                let i = self.eval(index)?.as_i64()?;
                Ok(self.memory.load(name, i, *ty))
            }
            Expr::Call {
                ty,
                name,
                args,
                call_type,
            } => {
                let args = args
                    .iter()
                    .map(|a| self.eval(a))
                    .collect::<EvalResult<Vec<_>>>()?;
                match call_type {
                    CallType::Intrinsic => self.intrinsic(*ty, name, args),
                    CallType::Extern => Ok(opaque_call(*ty, name, &args)),
                }
            }
            Expr::Let { name, value, body } => {
                let v = self.eval(value)?;
                self.scoped(name, v, |this| this.eval(body))
            }
        }
    }

    fn intrinsic(&mut self, ty: Type, name: &str, args: Vec<Value>) -> EvalResult<Value> {
        if intrinsics::is_effectful(name) {
            self.effects.push(Effect {
                name: name.to_string(),
                args,
            });
            return Ok(Value::zero(ty));
        }
        match name {
            intrinsics::TRACE_EXPR => Ok(args
                .get(intrinsics::TRACE_VALUE_ARG)
                .copied()
                .unwrap_or_else(|| Value::zero(ty))),
            intrinsics::RETURN_SECOND | intrinsics::LIKELY => {
                args.last().copied().ok_or(EvalTrap::TypeMismatch)
            }
            _ => Err(EvalTrap::UnknownIntrinsic),
        }
    }
}

/// Result of an ordinary call: a fixed function of the name and arguments.
fn opaque_call(ty: Type, name: &str, args: &[Value]) -> Value {
    let seed = name.bytes().fold(0u64, |h, b| mix(h, u64::from(b)));
    let h = args.iter().fold(seed, |h, a| mix(h, a.bits()));
    Value::from_raw(ty, h % OPAQUE_RANGE)
}
