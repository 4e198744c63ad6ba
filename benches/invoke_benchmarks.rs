//! Benchmarks for descriptor construction, invocation and weak decoding.
//!
//! ```bash
//! cargo bench --bench invoke_benchmarks
//! ```

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use reflectify::{Ptr, Reflect, Resolution, Value, ValueMap, reflect, reflect_fn};

#[derive(Debug, Clone, Default, Reflect)]
#[reflect(methods(greet, rename))]
pub struct User {
    pub name: String,
    pub age: i64,
    pub admin: bool,
    pub tags: Vec<String>,
}

impl User {
    pub fn greet(&self, greeting: String) -> String {
        format!("{greeting}, {}", self.name)
    }

    pub fn rename(&mut self, name: String) {
        self.name = name;
    }
}

fn user_source() -> ValueMap {
    let mut source = ValueMap::default();
    source.insert("name".to_string(), Value::from("ada"));
    source.insert("AGE".to_string(), Value::from("36"));
    source.insert("admin".to_string(), Value::from("true"));
    source.insert(
        "tags".to_string(),
        Value::List(vec![Value::from("a"), Value::Int(2)]),
    );
    source
}

fn descriptor_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("descriptor");

    group.bench_function("reflect_struct", |b| {
        b.iter(|| black_box(reflect(User::default())));
    });

    group.bench_function("methods_of_pointer", |b| {
        let refl = reflect(Ptr::new(User::default()));
        b.iter(|| black_box(refl.methods()));
    });

    group.bench_function("new_instance", |b| {
        let mut refl = reflect(Ptr::new(User::default()));
        b.iter(|| black_box(refl.new_instance()));
    });

    group.finish();
}

fn invoke_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("invoke");
    group.throughput(Throughput::Elements(1));

    group.bench_function("scalar_params_fallback", |b| {
        let refl = reflect_fn(|a: i64, b: String, c: bool| a + b.len() as i64 + i64::from(c));
        let args = [Value::from("12"), Value::Int(3), Value::from("t")];
        b.iter(|| black_box(refl.call(black_box(&args))));
    });

    group.bench_function("resolver_chain", |b| {
        let mut refl = reflect_fn(|user: Ptr<User>, greeting: String| {
            format!("{greeting}, {}", user.borrow().name)
        });
        let current = Ptr::new(User {
            name: "ada".to_string(),
            ..Default::default()
        });
        refl.add_resolver(move |param, _raw| {
            if param.is_pointer() && param.name() == "User" {
                Resolution::provide(current.clone())
            } else {
                Resolution::Declined
            }
        });
        let args = [Value::from("hello")];
        b.iter(|| black_box(refl.call(black_box(&args))));
    });

    group.bench_function("call_method", |b| {
        let refl = reflect(Ptr::new(User::default()));
        let args = [Value::from("hi")];
        b.iter(|| black_box(refl.call_method("greet", black_box(&args))));
    });

    group.finish();
}

fn decode_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    let source = user_source();

    group.bench_function("fill_struct", |b| {
        let mut refl = reflect(User::default());
        b.iter(|| black_box(refl.fill(black_box(&source))));
    });

    group.bench_function("fill_pointer", |b| {
        let mut refl = reflect(Ptr::new(User::default()));
        b.iter(|| black_box(refl.fill(black_box(&source))));
    });

    group.finish();
}

criterion_group!(benches, descriptor_benchmarks, invoke_benchmarks, decode_benchmarks);

criterion_main!(benches);
