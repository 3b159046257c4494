//! Shared helpers for the looptrim integration tests.
//!
//! - [`SplitMix64`]: small deterministic random number generator
//! - [`ProgramGen`]: random loop nests in the text format
//! - [`observe`]: runs a program under the reference interpreter

use anyhow::{ensure, Context, Result};
use looptrim::ir::Stmt;
use looptrim::parser::parse_stmt;
use looptrim_interp::{Effect, EvalResult, Fill, Interpreter, Memory, Value};

// ── Random numbers ───────────────────────────────────────────────────────────

/// splitmix64 generator. Same seed, same sequence, on every platform.
pub struct SplitMix64(u64);

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, n)`.
    pub fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n.max(1)
    }

    /// Uniform in `[lo, hi]`.
    pub fn range(&mut self, lo: i64, hi: i64) -> i64 {
        lo + self.below((hi - lo + 1) as u64) as i64
    }

    pub fn one_in(&mut self, n: u64) -> bool {
        self.below(n) == 0
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.below(items.len() as u64) as usize]
    }
}

// ── Program generation ───────────────────────────────────────────────────────

/// Free variables of generated programs. Bound by [`observe`].
pub const FREE_VARS: [&str; 2] = ["n", "m"];

/// Read-only input buffer. Conditions and loop bounds only load from it, so
/// no loop can change the values its own bounds depend on.
pub const INPUT: &str = "src";

/// Buffers generated programs write to.
pub const OUTPUTS: [&str; 2] = ["a", "b"];

pub const MAX_LOOP_DEPTH: usize = 3;
pub const MAX_IF_DEPTH: usize = 2;
const MAX_EXPR_DEPTH: u32 = 2;

/// Upper bound on the printed size of a generated program. Loop and `if`
/// depth are capped, so generation always stays well below it.
pub const MAX_PROGRAM_LEN: usize = 1 << 20;

/// Generates random loop nests with guarded stores, self-copies, effectful
/// calls and lets, biased towards shapes the pass can trim.
pub struct ProgramGen {
    rng: SplitMix64,
    loop_vars: Vec<String>,
    if_depth: usize,
    lets: Vec<String>,
    next_name: usize,
    device_loops: bool,
}

impl ProgramGen {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SplitMix64::new(seed),
            loop_vars: Vec::new(),
            if_depth: 0,
            lets: Vec::new(),
            next_name: 0,
            device_loops: false,
        }
    }

    /// Also emit `gpu_block` and `gpu_thread` loops.
    pub fn with_device_loops(mut self) -> Self {
        self.device_loops = true;
        self
    }

    pub fn program(&mut self) -> String {
        self.block()
    }

    fn fresh(&mut self, base: &str) -> String {
        self.next_name += 1;
        format!("{base}{}", self.next_name)
    }

    fn block(&mut self) -> String {
        let lets_before = self.lets.len();
        let count = self.rng.range(1, 3);
        let mut out = String::new();
        for _ in 0..count {
            out.push_str(&self.stmt());
            out.push('\n');
        }
        self.lets.truncate(lets_before);
        out
    }

    fn stmt(&mut self) -> String {
        let can_loop = self.loop_vars.len() < MAX_LOOP_DEPTH;
        let can_branch = !self.loop_vars.is_empty() && self.if_depth < MAX_IF_DEPTH;
        match self.rng.below(12) {
            0..=3 if can_loop => self.for_loop(),
            0..=5 if can_branch => self.if_stmt(),
            6..=7 => {
                let buf = self.rng.pick(&OUTPUTS);
                format!("{buf}[{}] = {}", self.index(), self.int_expr(MAX_EXPR_DEPTH))
            }
            8..=9 => {
                let buf = self.rng.pick(&OUTPUTS);
                let idx = self.index();
                if self.rng.one_in(2) {
                    format!("{buf}[{idx}] = likely({buf}[{idx}])")
                } else {
                    format!("{buf}[{idx}] = {buf}[{idx}]")
                }
            }
            10 => format!("image_store({}, {})", self.index(), self.int_expr(1)),
            11 => {
                let name = self.fresh("t");
                let value = self.int_expr(MAX_EXPR_DEPTH);
                self.lets.push(name.clone());
                format!("let {name} = {value}")
            }
            _ => format!("b[{}] = 0", self.index()),
        }
    }

    fn for_loop(&mut self) -> String {
        let name = self.fresh("i");
        let min = match self.rng.below(4) {
            0 | 1 => "0".to_string(),
            2 => self.rng.range(-2, 4).to_string(),
            _ => self.atom(),
        };
        let extent = match self.rng.below(5) {
            0..=2 => self.rng.range(0, 8).to_string(),
            3 => self.rng.pick(&FREE_VARS).to_string(),
            _ => "(n - m)".to_string(),
        };
        let kind = if self.device_loops && self.rng.one_in(3) {
            *self.rng.pick(&["gpu_block ", "gpu_thread "])
        } else {
            ""
        };
        self.loop_vars.push(name.clone());
        let body = self.block();
        self.loop_vars.pop();
        format!("{kind}for ({name}, {min}, {extent}) {{\n{body}}}")
    }

    fn if_stmt(&mut self) -> String {
        let cond = self.cond(MAX_EXPR_DEPTH);
        self.if_depth += 1;
        let then_case = self.block();
        let out = if self.rng.one_in(3) {
            let else_case = self.block();
            format!("if ({cond}) {{\n{then_case}}} else {{\n{else_case}}}")
        } else {
            format!("if ({cond}) {{\n{then_case}}}")
        };
        self.if_depth -= 1;
        out
    }

    fn loop_var(&mut self) -> Option<String> {
        if self.loop_vars.is_empty() {
            None
        } else {
            Some(self.rng.pick(&self.loop_vars).clone())
        }
    }

    /// A variable or small constant.
    fn atom(&mut self) -> String {
        let mut choices: Vec<String> = FREE_VARS.iter().map(|v| v.to_string()).collect();
        choices.extend(self.loop_vars.iter().cloned());
        choices.extend(self.lets.iter().cloned());
        if self.rng.one_in(3) {
            self.rng.range(-3, 9).to_string()
        } else {
            self.rng.pick(&choices).clone()
        }
    }

    fn index(&mut self) -> String {
        match (self.loop_var(), self.rng.below(4)) {
            (Some(v), 0) => v,
            (Some(v), 1) => format!("{v} + {}", self.rng.range(0, 3)),
            (Some(v), 2) => format!("{v} * 2"),
            _ => self.rng.range(0, 6).to_string(),
        }
    }

    fn int_expr(&mut self, depth: u32) -> String {
        if depth == 0 {
            return self.atom();
        }
        let d = depth - 1;
        match self.rng.below(11) {
            0 | 1 => self.atom(),
            2 => format!("{INPUT}[{}]", self.index()),
            3 => format!("({} + {})", self.int_expr(d), self.int_expr(d)),
            4 => format!("({} - {})", self.int_expr(d), self.int_expr(d)),
            5 => format!("({} * {})", self.int_expr(d), self.rng.range(-2, 3)),
            6 => format!("({} / {})", self.int_expr(d), self.rng.range(1, 3)),
            7 => format!("({} % {})", self.int_expr(d), self.rng.range(2, 4)),
            8 => {
                let f = *self.rng.pick(&["min", "max"]);
                format!("{f}({}, {})", self.int_expr(d), self.int_expr(d))
            }
            9 => format!("f({})", self.int_expr(d)),
            _ => format!(
                "select({}, {}, {})",
                self.cond(d),
                self.int_expr(d),
                self.int_expr(d)
            ),
        }
    }

    fn cond(&mut self, depth: u32) -> String {
        let op = *self.rng.pick(&["<", "<=", ">", ">=", "==", "!="]);
        let pick = if depth == 0 { 0 } else { self.rng.below(6) };
        match pick {
            0..=2 => {
                // Bias towards `loop_var op bound`, the shape that narrows.
                let lhs = match self.loop_var() {
                    Some(v) if !self.rng.one_in(4) => v,
                    _ => self.int_expr(0),
                };
                let rhs = match self.rng.below(3) {
                    0 => self.rng.range(-1, 8).to_string(),
                    1 => self.atom(),
                    _ => format!("{} + {}", self.atom(), self.rng.range(-2, 2)),
                };
                format!("{lhs} {op} {rhs}")
            }
            3 => format!("{} {op} {}", self.int_expr(depth - 1), self.int_expr(depth - 1)),
            4 => {
                let join = *self.rng.pick(&["&&", "||"]);
                format!("({}) {join} ({})", self.cond(depth - 1), self.cond(depth - 1))
            }
            _ => format!("!({})", self.cond(depth - 1)),
        }
    }
}

/// Generates and parses one program from `generator`.
pub fn make_program(generator: &mut ProgramGen) -> Result<(String, Stmt)> {
    let src = generator.program();
    ensure!(
        src.len() <= MAX_PROGRAM_LEN,
        "generated program is {} bytes, over the {MAX_PROGRAM_LEN} byte limit",
        src.len()
    );
    let stmt = parse_stmt(&src).with_context(|| format!("generated program does not parse:\n{src}"))?;
    Ok((src, stmt))
}

// ── Execution ────────────────────────────────────────────────────────────────

/// Everything the reference interpreter lets an observer see.
#[derive(Debug, PartialEq)]
pub struct Observation {
    pub result: EvalResult<()>,
    pub memory: Memory,
    pub effects: Vec<Effect>,
}

/// Starting memory for environment `env`.
pub fn make_memory(env: u64) -> Memory {
    Memory::new()
        .with_buffer(INPUT, Fill::Hashed { seed: env, modulus: 8 })
        .with_buffer("a", Fill::Hashed { seed: env ^ 0x5a5a, modulus: 3 })
        .with_buffer("b", Fill::Zero)
}

/// Runs `program` in environment `env`: free variables and buffer contents
/// are derived from `env`.
pub fn observe(program: &Stmt, env: u64) -> Observation {
    let mut rng = SplitMix64::new(env.wrapping_mul(31).wrapping_add(7));
    let mut interp = Interpreter::new(make_memory(env));
    for var in FREE_VARS {
        interp.bind(var, Value::Int(rng.range(-2, 10)));
    }
    let result = interp.run(program);
    let (memory, effects) = interp.into_observations();
    Observation {
        result,
        memory,
        effects,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splitmix_is_deterministic() {
        let mut a = SplitMix64::new(42);
        let mut b = SplitMix64::new(42);
        for _ in 0..10 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn range_is_inclusive() {
        let mut rng = SplitMix64::new(1);
        let mut seen = [false; 3];
        for _ in 0..100 {
            let v = rng.range(-1, 1);
            seen[(v + 1) as usize] = true;
        }
        assert_eq!(seen, [true; 3]);
    }

    /// Deepest `(loop, if)` nesting in `s`.
    fn nesting(s: &Stmt) -> (usize, usize) {
        let deepest = |a: (usize, usize), b: (usize, usize)| (a.0.max(b.0), a.1.max(b.1));
        match s {
            Stmt::For { body, .. } => {
                let (loops, ifs) = nesting(body);
                (loops + 1, ifs)
            }
            Stmt::IfThenElse {
                then_case,
                else_case,
                ..
            } => {
                let inner = else_case
                    .iter()
                    .map(|e| nesting(e))
                    .fold(nesting(then_case), deepest);
                (inner.0, inner.1 + 1)
            }
            Stmt::LetStmt { body, .. } => nesting(body),
            Stmt::Block(stmts) => stmts.iter().map(nesting).fold((0, 0), deepest),
            Stmt::Store { .. } | Stmt::Evaluate(_) => (0, 0),
        }
    }

    #[test]
    fn generated_nesting_is_bounded() {
        for seed in 0..400 {
            let (src, program) = make_program(&mut ProgramGen::new(seed))
                .unwrap_or_else(|e| panic!("seed {seed}: {e:#}"));
            let (loops, ifs) = nesting(&program);
            assert!(loops <= MAX_LOOP_DEPTH, "seed {seed}: {loops} nested loops\n{src}");
            assert!(ifs <= MAX_IF_DEPTH, "seed {seed}: {ifs} nested ifs\n{src}");
        }
    }

    #[test]
    fn generation_terminates_with_device_loops() {
        for seed in 0..200 {
            let (src, _) = make_program(&mut ProgramGen::new(seed).with_device_loops())
                .unwrap_or_else(|e| panic!("seed {seed}: {e:#}"));
            assert!(src.len() <= MAX_PROGRAM_LEN, "seed {seed}");
        }
    }

    #[test]
    fn generated_programs_parse_and_run() {
        for seed in 0..50 {
            let (src, program) = make_program(&mut ProgramGen::new(seed))
                .unwrap_or_else(|e| panic!("seed {seed}: {e:#}"));
            let obs = observe(&program, seed);
            assert_eq!(obs.result, Ok(()), "seed {seed} traps\n{src}");
        }
    }
}
