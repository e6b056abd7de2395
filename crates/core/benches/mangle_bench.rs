//! Benchmarks for symbol mangling and matching
//!
//! Run with: cargo bench -p jnicheck-core --bench mangle_bench

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use jnicheck_core::{DeclaredBinding, ImplementedBinding, Mangler, Matcher, Origin, Primitive, TypeTag};
use std::hint::black_box;

fn create_binding(idx: usize) -> DeclaredBinding {
  DeclaredBinding {
    owner: vec![
      "com".to_string(),
      "example".to_string(),
      format!("Bridge_{}", idx / 10),
    ],
    method: format!("native${}", idx),
    params: vec![
      TypeTag::string(),
      TypeTag::Primitive(Primitive::Int).array_of(),
      TypeTag::Primitive(Primitive::Long),
    ],
    return_type: TypeTag::Primitive(Primitive::Void),
    is_static: true,
    origin: Origin::new(format!("src/Bridge{}.java", idx / 10), idx as u32 + 1),
  }
}

fn implement(mangler: &Mangler, binding: &DeclaredBinding) -> ImplementedBinding {
  let symbol = mangler.short_name(&binding.owner, &binding.method);
  ImplementedBinding {
    symbol,
    decoded_owner: binding.owner.clone(),
    decoded_method: binding.method.clone(),
    overload_suffix: None,
    is_definition: true,
    exported: true,
    origin: Origin::new("bridge.cpp", binding.origin.line),
  }
}

fn bench_mangle(c: &mut Criterion) {
  let mangler = Mangler::default();
  let binding = create_binding(42);
  let symbol = mangler.long_name(&binding.owner, &binding.method, &binding.params);

  let mut group = c.benchmark_group("mangle");
  group.bench_function("long_name", |b| {
    b.iter(|| mangler.long_name(black_box(&binding.owner), black_box(&binding.method), &binding.params))
  });
  group.bench_function("demangle", |b| b.iter(|| mangler.demangle(black_box(&symbol))));
  group.finish();
}

fn bench_match(c: &mut Criterion) {
  let mangler = Mangler::default();
  let matcher = Matcher::default();

  let mut group = c.benchmark_group("match");
  for size in [100usize, 1_000, 10_000] {
    let declared: Vec<DeclaredBinding> = (0..size).map(create_binding).collect();
    // Every other binding implemented
    let implemented: Vec<ImplementedBinding> = declared.iter().step_by(2).map(|b| implement(&mangler, b)).collect();

    group.throughput(Throughput::Elements(size as u64));
    group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
      b.iter(|| matcher.run(black_box(&declared), black_box(&implemented)))
    });
  }
  group.finish();
}

criterion_group!(benches, bench_mangle, bench_match);
criterion_main!(benches);
