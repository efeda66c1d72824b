//! Benchmarks for permission-filtered navigation menus.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use zigma_core::navigation::{filter_navigation, visible_navigation, NavigationItem, STAFF_NAVIGATION};
use zigma_core::rbac::{Capability, PermissionSet, Role};
use zigma_core::session::{AuthState, Session};

fn bench_filter_by_role(c: &mut Criterion) {
    let mut group = c.benchmark_group("navigation_filter_by_role");
    for role in Role::ALL {
        let permissions = PermissionSet::for_role(role);
        group.bench_with_input(BenchmarkId::from_parameter(role), &permissions, |b, p| { b.iter(|| black_box(filter_navigation(STAFF_NAVIGATION, Some(p)))); });
    }
    group.finish();
}

fn bench_filter_large_menu(c: &mut Criterion) {
    let mut group = c.benchmark_group("navigation_filter_large_menu");
    let permissions = Role::Staff.permissions();
    for size in [10usize, 100, 1_000] {
        let items: Vec<NavigationItem> = (0..size)
            .map(|i| { let capability = Capability::ALL[i % Capability::ALL.len()]; NavigationItem::new("Item", "/item", "circle").requires(capability) })
            .collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &items, |b, menu| { b.iter(|| black_box(filter_navigation(menu, Some(&permissions)))); });
    }
    group.finish();
}

fn bench_visible_navigation(c: &mut Criterion) {
    let mut group = c.benchmark_group("navigation_visible");
    for role in Role::ALL {
        let state = AuthState::authenticated(Session::new("user-1", None), role);
        group.bench_with_input(BenchmarkId::from_parameter(role), &state, |b, s| { b.iter(|| black_box(visible_navigation(s))); });
    }
    group.finish();
}

criterion_group!(benches, bench_filter_by_role, bench_filter_large_menu, bench_visible_navigation);
criterion_main!(benches);
