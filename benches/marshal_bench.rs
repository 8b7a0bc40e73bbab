use criterion::{black_box, criterion_group, criterion_main, Criterion};
use native_bridge::{
    Bridge, BridgeConfig, FromScript, KeyShape, MarshaledValue, NativeFunction, Shape,
    TypeDefinition,
};
use std::collections::BTreeMap;

struct Counter(i32);

fn bench_bridge() -> Bridge {
    Bridge::builder(BridgeConfig::default())
        .register_type(
            TypeDefinition::<Counter>::new("MyObject")
                .constructor(|(start,): (i32,)| Ok(Counter(start)))
                .method("plusOne", |this: &mut Counter, (): ()| {
                    this.0 += 1;
                    Ok(this.0)
                }),
        )
        .unwrap()
        .register_function(NativeFunction::new(
            "performance_param_arr_str",
            |_: &Bridge, (items,): (Vec<String>,)| Ok(items.len() as i32),
        ))
        .unwrap()
        .register_function(NativeFunction::new(
            "performance_param_map_is",
            |_: &Bridge, (entries,): (BTreeMap<i32, String>,)| Ok(entries.len() as i32),
        ))
        .unwrap()
        .build()
        .unwrap()
}

fn bench_marshal(c: &mut Criterion) {
    let strings = MarshaledValue::Sequence((0..100).map(|i| format!("item{}", i).into()).collect());
    let map = MarshaledValue::map_of((0..100i64).map(|i| (i, format!("value{}", i))));

    c.bench_function("marshal_in Sequence<String>", |b| {
        let shape = Shape::sequence(Shape::String);
        b.iter(|| native_bridge::marshal_in(black_box(&strings), &shape).unwrap())
    });

    c.bench_function("marshal_in Map<Int, String>", |b| {
        let shape = Shape::map(KeyShape::Int, Shape::String);
        b.iter(|| native_bridge::marshal_in(black_box(&map), &shape).unwrap())
    });

    c.bench_function("from_script BTreeMap<i32, String>", |b| {
        b.iter(|| BTreeMap::<i32, String>::from_script(black_box(&map)).unwrap())
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let bridge = bench_bridge();
    let handle = bridge.construct("MyObject", &[0.into()]).unwrap();
    let strings = [MarshaledValue::Sequence(
        (0..100).map(|i| format!("item{}", i).into()).collect(),
    )];
    let map = [MarshaledValue::map_of(
        (0..100i64).map(|i| (i, format!("value{}", i))),
    )];

    c.bench_function("invoke plusOne", |b| {
        b.iter(|| bridge.invoke(black_box(&handle), "plusOne", &[]).unwrap())
    });

    c.bench_function("call performance_param_arr_str", |b| {
        b.iter(|| bridge.call("performance_param_arr_str", black_box(&strings)).unwrap())
    });

    c.bench_function("call performance_param_map_is", |b| {
        b.iter(|| bridge.call("performance_param_map_is", black_box(&map)).unwrap())
    });
}

criterion_group!(benches, bench_marshal, bench_dispatch);
criterion_main!(benches);
