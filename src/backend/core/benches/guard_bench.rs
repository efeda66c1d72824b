//! Benchmarks for guard evaluation and route-table navigation.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use zigma_core::guard::{evaluate, evaluate_nested, navigate, GuardConfig};
use zigma_core::rbac::{Capability, Role};
use zigma_core::session::{AuthState, Session};

const PATHS: [&str; 8] = ["/", "/login", "/dashboard", "/investors/42", "/users", "/investor/documents", "/settings", "/missing"];

fn states() -> Vec<(&'static str, AuthState)> {
    let session = Session::new("user-1", Some("bench@zigma.io".into()));
    vec![
        ("loading", AuthState::loading()),
        ("anonymous", AuthState::anonymous()),
        ("admin", AuthState::authenticated(session.clone(), Role::Admin)),
        ("staff", AuthState::authenticated(session.clone(), Role::Staff)),
        ("investor", AuthState::authenticated(session, Role::Investor)),
    ]
}

fn bench_guard_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("guard_evaluate");
    let config = GuardConfig::new().require(Capability::ManageUsers).allow_roles(&[Role::Admin, Role::Staff]);
    for (label, state) in states() {
        group.bench_with_input(BenchmarkId::from_parameter(label), &state, |b, s| { b.iter(|| black_box(evaluate(s, &config))); });
    }
    group.finish();
}

fn bench_guard_nested(c: &mut Criterion) {
    let mut group = c.benchmark_group("guard_nested");
    let state = AuthState::authenticated(Session::new("user-1", None), Role::Admin);
    for depth in [1usize, 4, 16] {
        let guards = vec![GuardConfig::new().require(Capability::ViewFunds); depth];
        group.bench_with_input(BenchmarkId::from_parameter(depth), &guards, |b, g| { b.iter(|| black_box(evaluate_nested(&state, g))); });
    }
    group.finish();
}

fn bench_navigate(c: &mut Criterion) {
    let mut group = c.benchmark_group("navigate");
    group.throughput(Throughput::Elements(PATHS.len() as u64));
    for (label, state) in states() {
        group.bench_with_input(BenchmarkId::from_parameter(label), &state, |b, s| {
            b.iter(|| { for path in PATHS { black_box(navigate(s, path)); } });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_guard_evaluate, bench_guard_nested, bench_navigate);
criterion_main!(benches);
