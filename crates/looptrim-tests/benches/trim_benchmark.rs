use criterion::{criterion_group, criterion_main, Criterion};
use looptrim::ir::Stmt;
use looptrim::parser::parse_stmt;
use looptrim::trim_no_ops;
use looptrim_tests::ProgramGen;
use std::hint::black_box;

/// `depth` nested loops, each guarded on its own variable.
fn guarded_nest(depth: usize) -> Stmt {
    let mut src = String::new();
    for d in 0..depth {
        src.push_str(&format!("for (i{d}, 0, 64) {{ if (i{d} >= {}) {{\n", d * 4));
    }
    let index: Vec<String> = (0..depth).map(|d| format!("i{d}")).collect();
    src.push_str(&format!("a[{}] = 1\n", index.join(" + ")));
    for _ in 0..depth {
        src.push_str("} }\n");
    }
    parse_stmt(&src).expect("benchmark program parses")
}

fn guarded_nest_3_bench(c: &mut Criterion) {
    let program = guarded_nest(3);
    c.bench_function("trim guarded loop nest depth 3", |b| {
        b.iter(|| trim_no_ops(black_box(&program)))
    });
}

fn guarded_nest_6_bench(c: &mut Criterion) {
    let program = guarded_nest(6);
    c.bench_function("trim guarded loop nest depth 6", |b| {
        b.iter(|| trim_no_ops(black_box(&program)))
    });
}

// ─── Random programs ─────────────────────────────────────────────────────────

fn random_programs_bench(c: &mut Criterion) {
    let programs: Vec<Stmt> = (0..32)
        .map(|seed| parse_stmt(&ProgramGen::new(seed).program()).expect("generated program parses"))
        .collect();
    c.bench_function("trim 32 random programs", |b| {
        b.iter(|| {
            for p in &programs {
                black_box(trim_no_ops(black_box(p)));
            }
        })
    });
}

criterion_group!(
    benches,
    guarded_nest_3_bench,
    guarded_nest_6_bench,
    random_programs_bench
);
criterion_main!(benches);
