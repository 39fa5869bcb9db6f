use criterion::{black_box, criterion_group, criterion_main, Criterion};

use yavra::ir::instruction::{Alloc, Binary, BinaryOp, Cmp, Load, Opcode, Predicate, Store};
use yavra::ir::{Function, Type};
use yavra::{analyze, Config, FunctionGraph, LocationKind, Module, ModuleGraph, Op};

// ------------------------------------------------------------------
// Helpers

/// A function with `loops` sequential counting loops over stack slots,
/// the shape the merge engine works hardest on.
fn counting_loops(loops: usize) -> (Module, ModuleGraph) {
    let mut func = Function::new("bench");
    let mut graph = FunctionGraph::new();
    let n = func.arg(Type::Int(64));
    let zero = func.constant(0);
    let one = func.constant(1);

    let mut cur = graph.add_location(LocationKind::Entry);
    let mut step = |graph: &mut FunctionGraph, cur: &mut _, op| {
        let next = graph.add_location(LocationKind::Plain);
        graph.add_edge(*cur, next, op);
        *cur = next;
    };

    for _ in 0..loops {
        let (alloc, slot) = func.inst(Opcode::Alloc(Alloc {}), Type::Ptr);
        let st0 = func.inst_void(Opcode::Store(Store {
            pointer: slot,
            value: zero,
        }));
        let (ld, i0) = func.inst(Opcode::Load(Load { pointer: slot }), Type::Int(64));
        let (cmp, cond) = func.inst(
            Opcode::Cmp(Cmp {
                pred: Predicate::Slt,
                lhs: i0,
                rhs: n,
            }),
            Type::Int(1),
        );
        let (add, i1) = func.inst(
            Opcode::Binary(Binary {
                op: BinaryOp::Add,
                lhs: i0,
                rhs: one,
            }),
            Type::Int(64),
        );
        let st1 = func.inst_void(Opcode::Store(Store {
            pointer: slot,
            value: i1,
        }));

        step(&mut graph, &mut cur, Op::Instruction(alloc));
        step(&mut graph, &mut cur, Op::Instruction(st0));

        let header = graph.add_location(LocationKind::LoopJoin);
        graph.add_edge(cur, header, Op::Noop);
        graph.set_tree_pred(header, cur);
        graph.set_loop_body(header, vec![ld, cmp, add, st1]);
        cur = header;

        step(&mut graph, &mut cur, Op::Instruction(ld));
        step(&mut graph, &mut cur, Op::Instruction(cmp));
        let branch = cur;
        step(
            &mut graph,
            &mut cur,
            Op::AssumeBool {
                value: cond,
                assumption: true,
            },
        );
        step(&mut graph, &mut cur, Op::Instruction(add));
        step(&mut graph, &mut cur, Op::Instruction(st1));
        graph.add_edge(cur, header, Op::Noop);

        cur = branch;
        step(
            &mut graph,
            &mut cur,
            Op::AssumeBool {
                value: cond,
                assumption: false,
            },
        );
    }

    (
        Module {
            functions: vec![func],
        },
        ModuleGraph {
            functions: vec![graph],
        },
    )
}

// ------------------------------------------------------------------

pub fn loops_8(c: &mut Criterion) {
    let (module, graphs) = counting_loops(8);
    c.bench_function("analyze(loops-8)", |b| {
        b.iter(|| {
            let mut graphs = graphs.clone();
            analyze(black_box(&module), &mut graphs, &Config::default())
        })
    });
}

pub fn loops_32(c: &mut Criterion) {
    let (module, graphs) = counting_loops(32);
    c.bench_function("analyze(loops-32)", |b| {
        b.iter(|| {
            let mut graphs = graphs.clone();
            analyze(black_box(&module), &mut graphs, &Config::default())
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = loops_8, loops_32
}
criterion_main!(benches);
