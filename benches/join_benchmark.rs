use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use samyama_pattern::rdf::{RdfStore, RdfTerm, Triple};
use samyama_pattern::{
    BinaryOp, EngineConfig, EngineRegistry, Expression, OrderingStrategy, PatternTerm, Query,
    QueryTriple,
};

const EX: &str = "http://example.org/";

fn iri(local: &str) -> RdfTerm {
    RdfTerm::iri(&format!("{}{}", EX, local)).unwrap()
}

/// People with an age and `fanout` outgoing `knows` edges each
fn build_store(people: usize, fanout: usize) -> RdfStore {
    let mut store = RdfStore::new();
    for i in 0..people {
        let person = iri(&format!("p{}", i));
        store
            .insert(Triple::from_terms(person.clone(), iri("age"), RdfTerm::literal((i % 90) as i64)).unwrap())
            .unwrap();
        for k in 1..=fanout {
            let friend = iri(&format!("p{}", (i + k) % people));
            store
                .insert(Triple::from_terms(person.clone(), iri("knows"), friend).unwrap())
                .unwrap();
        }
    }
    store
}

/// ?a knows ?b . ?b knows ?c . ?c age ?n  FILTER ?n > 50
fn friends_of_friends(registry: &EngineRegistry, ordering: OrderingStrategy) -> Query {
    let config = EngineConfig {
        ordering,
        ..EngineConfig::default()
    };
    let mut query = registry.create_query("triples", config, None).unwrap();
    query
        .add_prefix("ex", EX)
        .add_select("a")
        .add_select("c")
        .add_triple(QueryTriple::new(PatternTerm::var("c"), PatternTerm::qname("ex:age"), PatternTerm::var("n")))
        .add_triple(QueryTriple::new(PatternTerm::var("a"), PatternTerm::qname("ex:knows"), PatternTerm::var("b")))
        .add_triple(QueryTriple::new(PatternTerm::var("b"), PatternTerm::qname("ex:knows"), PatternTerm::var("c")))
        .add_constraint(Expression::binary(BinaryOp::Gt, Expression::var("n"), Expression::integer(50)));
    query.prepare().unwrap();
    query
}

/// Benchmark the join under both ordering strategies
fn bench_two_hop_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("two_hop_join");
    let registry = EngineRegistry::with_defaults();

    for size in [100, 1000].iter() {
        let store = build_store(*size, 3);

        for ordering in [OrderingStrategy::Connectivity, OrderingStrategy::Declared] {
            let mut query = friends_of_friends(&registry, ordering);
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", ordering), size),
                size,
                |b, _| {
                    b.iter(|| {
                        let count = query.execute(&store).unwrap().count();
                        criterion::black_box(count);
                    });
                },
            );
        }
    }
    group.finish();
}

/// Benchmark compiling a query (resolve, bind, order)
fn bench_compile(c: &mut Criterion) {
    let registry = EngineRegistry::with_defaults();
    c.bench_function("compile_three_patterns", |b| {
        b.iter(|| {
            let query = friends_of_friends(&registry, OrderingStrategy::Connectivity);
            criterion::black_box(query.ordering().len());
        });
    });
}

criterion_group!(benches, bench_two_hop_join, bench_compile);
criterion_main!(benches);
