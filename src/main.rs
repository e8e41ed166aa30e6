use anyhow::Result;
use samyama_pattern::rdf::{NamedNode, Quad, RdfStore, RdfTerm, Triple};
use samyama_pattern::{
    BinaryOp, EngineConfig, EngineRegistry, Expression, PatternTerm, QueryTriple, ResultFormat,
};

const EX: &str = "http://example.org/";
const FOAF: &str = "http://xmlns.com/foaf/0.1/";

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("Samyama Pattern v{}", samyama_pattern::version());
    println!("==========================================");
    println!();

    let store = build_store()?;
    println!("✓ Loaded {} triples in {} named graphs", store.len(), store.list_graphs().len());

    let registry = EngineRegistry::with_defaults();

    demo_join(&registry, &store)?;
    demo_constraints(&registry, &store)?;
    demo_sources(&registry, &store)?;
    demo_failure(&registry, &store)?;

    Ok(())
}

fn iri(base: &str, local: &str) -> Result<RdfTerm> {
    Ok(RdfTerm::iri(&format!("{}{}", base, local))?)
}

fn build_store() -> Result<RdfStore> {
    let mut store = RdfStore::new();
    let people = [("p1", "Alice", 30i64), ("p2", "Bob", 25), ("p3", "Carol", 35)];

    for (id, name, age) in people {
        let person = iri(EX, id)?;
        store.insert(Triple::from_terms(person.clone(), iri(FOAF, "name")?, RdfTerm::literal(name))?)?;
        store.insert(Triple::from_terms(person, iri(FOAF, "age")?, RdfTerm::literal(age))?)?;
    }

    let social = NamedNode::new(&format!("{}graph/social", EX))?;
    for (from, to) in [("p1", "p2"), ("p2", "p3")] {
        let triple = Triple::from_terms(iri(EX, from)?, iri(FOAF, "knows")?, iri(EX, to)?)?;
        store.insert_quad(Quad::new(triple.subject, triple.predicate, triple.object, Some(social.clone())))?;
    }

    Ok(store)
}

fn demo_join(registry: &EngineRegistry, store: &RdfStore) -> Result<()> {
    println!("\n=== Demo 1: Two-pattern join ===");
    let mut query = registry.create_query("triples", EngineConfig::default(), None)?;
    query
        .add_prefix("foaf", FOAF)
        .add_select("x")
        .add_select("y")
        .add_triple(QueryTriple::new(
            PatternTerm::var("x"),
            PatternTerm::qname("foaf:name"),
            PatternTerm::literal("Alice"),
        ))
        .add_triple(QueryTriple::new(
            PatternTerm::var("x"),
            PatternTerm::qname("foaf:knows"),
            PatternTerm::var("y"),
        ));
    query.prepare()?;

    for triple in query.ordered_triples() {
        println!("  plan: {}", triple);
    }

    let results = query.execute(store)?.into_results()?;
    print!("{}", results.serialize(ResultFormat::Tsv)?);
    Ok(())
}

fn demo_constraints(registry: &EngineRegistry, store: &RdfStore) -> Result<()> {
    println!("\n=== Demo 2: Constraints ===");
    let mut query = registry.create_query("triples", EngineConfig::default(), None)?;
    query
        .add_prefix("foaf", FOAF)
        .set_select_all(true)
        .add_triple(QueryTriple::new(
            PatternTerm::var("person"),
            PatternTerm::qname("foaf:age"),
            PatternTerm::var("age"),
        ))
        .add_triple(QueryTriple::new(
            PatternTerm::var("person"),
            PatternTerm::qname("foaf:name"),
            PatternTerm::var("name"),
        ))
        .add_constraint(Expression::binary(
            BinaryOp::Ge,
            Expression::var("age"),
            Expression::integer(30),
        ))
        .add_constraint(Expression::binary(
            BinaryOp::StrMatch,
            Expression::var("name"),
            Expression::string("/^[ac]/i"),
        ));
    query.prepare()?;

    let results = query.execute(store)?.into_results()?;
    println!("{}", results.serialize(ResultFormat::Json)?);
    Ok(())
}

fn demo_sources(registry: &EngineRegistry, store: &RdfStore) -> Result<()> {
    println!("\n=== Demo 3: Named graph sources ===");
    let mut query = registry.create_query("triples", EngineConfig::default(), None)?;
    query
        .add_prefix("foaf", FOAF)
        .add_source(format!("{}graph/social", EX))
        .set_select_all(true)
        .add_triple(QueryTriple::new(
            PatternTerm::var("a"),
            PatternTerm::qname("foaf:knows"),
            PatternTerm::var("b"),
        ));
    query.prepare()?;

    let scope = store.scoped(query.sources());
    let results = query.execute(&scope)?.into_results()?;
    println!("✓ {} edges in the social graph", results.len());
    Ok(())
}

fn demo_failure(registry: &EngineRegistry, store: &RdfStore) -> Result<()> {
    println!("\n=== Demo 4: Compile failure ===");
    let mut query = registry.create_query("triples", EngineConfig::default(), None)?;
    query.add_select("x").add_triple(QueryTriple::new(
        PatternTerm::var("x"),
        PatternTerm::qname("undeclared:p"),
        PatternTerm::var("y"),
    ));

    if let Err(e) = query.prepare() {
        println!("✗ prepare: {}", e);
    }
    for diagnostic in query.diagnostics() {
        println!("  {}", diagnostic);
    }
    if let Err(e) = query.execute(store) {
        println!("✗ execute: {}", e);
    }
    Ok(())
}
