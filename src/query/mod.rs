//! Compiled query model
//!
//! A [`Query`] is filled by a front-end with raw select variables, triple
//! patterns, constraints and prefix declarations, then compiled in place:
//!
//! 1. prefixed names and relative IRIs are resolved ([`resolve`])
//! 2. variables are assigned table slots ([`binder`])
//! 3. the patterns are ordered for the join ([`executor::planner`])
//! 4. the constraints are conjoined into one expression
//!
//! A failed stage stops compilation and marks the query failed for good.
//! Execution then runs the backtracking join in [`executor`].

pub mod ast;
pub mod binder;
pub mod error;
pub mod executor;
pub mod resolve;
pub mod variables;

pub use ast::{BinaryOp, Expression, PatternTerm, Prefix, QueryTriple, UnaryOp};
pub use error::{Diagnostic, DiagnosticHandler, Locator, QueryError, QueryResult, Severity};
pub use executor::{
    OrderingStrategy, QueryPlanner, QueryResults, QuerySolution, ResultFormat, Solutions,
    TripleCursor, TripleSource,
};
pub use variables::{VarId, Variable, VariableTable};

use crate::config::EngineConfig;
use crate::registry::EngineFactory;
use binder::assign_variables;
use resolve::PrefixResolver;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Cloneable handle that stops a running execution at its next step
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn abort(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Lower the flag so the query can run again
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One query: raw parts from the front-end plus compiled artifacts
pub struct Query {
    factory: Arc<EngineFactory>,
    config: EngineConfig,
    query_string: Option<String>,

    selects: Vec<String>,
    select_all: bool,
    sources: Vec<String>,
    triples: Vec<QueryTriple>,
    constraints: Vec<Expression>,
    prefixes: Vec<Prefix>,
    base_uri: Option<String>,

    failed: bool,
    prepared: bool,
    /// Set once the compile stages have rewritten the triples into slots
    compiled: bool,
    initialized: bool,
    variables: VariableTable,
    /// Join order as indices into `triples`
    ordered_triples: Vec<usize>,
    constraint_expression: Option<Expression>,

    locator: Locator,
    diagnostics: Vec<Diagnostic>,
    handlers: FxHashMap<Severity, DiagnosticHandler>,
    abort: AbortHandle,
}

impl Query {
    /// Create a query for `factory` and run the language's `init`
    pub fn new(
        factory: Arc<EngineFactory>,
        config: EngineConfig,
        query_string: Option<&str>,
    ) -> QueryResult<Self> {
        let mut query = Self {
            factory: Arc::clone(&factory),
            config,
            query_string: query_string.map(str::to_string),
            selects: Vec::new(),
            select_all: false,
            sources: Vec::new(),
            triples: Vec::new(),
            constraints: Vec::new(),
            prefixes: Vec::new(),
            base_uri: None,
            failed: false,
            prepared: false,
            compiled: false,
            initialized: false,
            variables: VariableTable::new(),
            ordered_triples: Vec::new(),
            constraint_expression: None,
            locator: Locator::default(),
            diagnostics: Vec::new(),
            handlers: FxHashMap::default(),
            abort: AbortHandle::default(),
        };

        factory.language.init(&mut query, &factory.name)?;
        query.initialized = true;
        debug!("Created {} query", factory.name);
        Ok(query)
    }

    // Front-end building API

    pub fn add_select(&mut self, name: impl Into<String>) -> &mut Self {
        self.selects.push(name.into());
        self
    }

    pub fn set_select_all(&mut self, select_all: bool) -> &mut Self {
        self.select_all = select_all;
        self
    }

    /// Record a named graph to query; applied by `RdfStore::scoped`
    pub fn add_source(&mut self, graph: impl Into<String>) -> &mut Self {
        self.sources.push(graph.into());
        self
    }

    pub fn add_triple(&mut self, triple: QueryTriple) -> &mut Self {
        self.triples.push(triple);
        self
    }

    pub fn add_constraint(&mut self, constraint: Expression) -> &mut Self {
        self.constraints.push(constraint);
        self
    }

    /// Declare a prefix; a later declaration of the same name wins
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) -> &mut Self {
        self.prefixes.push(Prefix::new(prefix, namespace));
        self
    }

    pub fn set_base_uri(&mut self, base: impl Into<String>) -> &mut Self {
        self.base_uri = Some(base.into());
        self
    }

    pub fn set_query_string(&mut self, text: impl Into<String>) -> &mut Self {
        self.query_string = Some(text.into());
        self
    }

    /// Location attached to diagnostics reported from now on
    pub fn set_locator(&mut self, locator: Locator) -> &mut Self {
        self.locator = locator;
        self
    }

    /// Deliver diagnostics of `severity` to `handler`
    pub fn set_handler(&mut self, severity: Severity, handler: DiagnosticHandler) -> &mut Self {
        self.handlers.insert(severity, handler);
        self
    }

    // Accessors

    pub fn factory(&self) -> &EngineFactory {
        &self.factory
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }

    pub fn selects(&self) -> &[String] {
        &self.selects
    }

    pub fn is_select_all(&self) -> bool {
        self.select_all
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn triples(&self) -> &[QueryTriple] {
        &self.triples
    }

    pub fn constraints(&self) -> &[Expression] {
        &self.constraints
    }

    pub fn prefixes(&self) -> &[Prefix] {
        &self.prefixes
    }

    /// The query's own base, falling back to the engine's
    pub fn base_uri(&self) -> Option<&str> {
        self.base_uri.as_deref().or(self.config.base_uri.as_deref())
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    /// Join order as indices into [`triples`](Self::triples)
    pub fn ordering(&self) -> &[usize] {
        &self.ordered_triples
    }

    /// Patterns in join order
    pub fn ordered_triples(&self) -> impl Iterator<Item = &QueryTriple> {
        self.ordered_triples.iter().map(move |&i| &self.triples[i])
    }

    /// Conjunction of all constraints, once compiled
    pub fn constraint_expression(&self) -> Option<&Expression> {
        self.constraint_expression.as_ref()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    // Lifecycle

    /// Compile through the language's `prepare` hook
    pub fn prepare(&mut self) -> QueryResult<()> {
        if self.failed {
            return Err(QueryError::QueryNotReady);
        }
        if self.prepared {
            return Ok(());
        }

        let language = Arc::clone(&self.factory.language);
        match language.prepare(self) {
            Ok(()) => {
                self.prepared = true;
                Ok(())
            }
            Err(e) => {
                if !self.failed {
                    self.report_error(&e);
                }
                Err(e)
            }
        }
    }

    /// The standard compile pipeline
    ///
    /// Runs once per query. Later calls return `Ok(())` without touching the
    /// compiled state; a failed query answers `QueryNotReady`.
    pub fn compile(&mut self) -> QueryResult<()> {
        if self.failed {
            return Err(QueryError::QueryNotReady);
        }
        if self.compiled {
            return Ok(());
        }

        let result = self.run_compile_stages();
        match &result {
            Ok(()) => self.compiled = true,
            Err(e) => self.report_error(e),
        }
        result
    }

    fn run_compile_stages(&mut self) -> QueryResult<()> {
        let resolver = PrefixResolver::new(
            &self.prefixes,
            self.config.builtin_prefixes,
            self.base_uri(),
        );
        resolver.resolve_triples(&mut self.triples)?;
        for constraint in &mut self.constraints {
            resolver.resolve_expression(constraint)?;
        }

        let bindings = assign_variables(
            &self.selects,
            self.select_all,
            &mut self.triples,
            &mut self.constraints,
        )?;
        self.variables = bindings.table;
        for name in bindings.duplicate_selects {
            self.report(Severity::Warning, format!("Variable ?{} selected more than once", name));
        }

        self.ordered_triples = QueryPlanner::new(self.config.ordering).order(&self.triples);
        self.constraint_expression = self.constraints.iter().cloned().reduce(Expression::and);

        debug!(
            "Compiled query: {} patterns, {} variables, constraint: {}",
            self.triples.len(),
            self.variables.len(),
            self.constraint_expression
                .as_ref()
                .map_or_else(|| "none".to_string(), |c| c.to_string())
        );
        Ok(())
    }

    /// Start a join over `source`
    ///
    /// The join reads whatever `source` yields; graphs recorded with
    /// [`Query::add_source`] are not applied here. To restrict the join to
    /// them, pass `store.scoped(query.sources())` as the source.
    ///
    /// Rejects failed or unprepared queries with `QueryNotReady` before the
    /// store is touched. The abort flag is not lowered here; use
    /// [`AbortHandle::reset`] to run an aborted query again.
    pub fn execute<'a>(&'a mut self, source: &'a dyn TripleSource) -> QueryResult<Solutions<'a>> {
        if self.failed || !self.prepared {
            return Err(QueryError::QueryNotReady);
        }

        let language = Arc::clone(&self.factory.language);
        if let Err(e) = language.execute(self) {
            self.report_error(&e);
            return Err(e);
        }

        Ok(Solutions::new(
            &self.triples,
            &self.ordered_triples,
            self.constraint_expression.as_ref(),
            &mut self.variables,
            source,
            Arc::clone(&self.abort.0),
            self.config.verbose,
        ))
    }

    // Diagnostics

    /// Record an error with the severity its kind carries
    pub fn report_error(&mut self, error: &QueryError) {
        self.report(error.severity(), error.to_string());
    }

    /// Record a diagnostic and hand it to the handler for its severity
    pub fn report(&mut self, severity: Severity, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            severity,
            message: message.into(),
            locator: self.locator.clone(),
        };

        if severity.invalidates() {
            warn!("{}", diagnostic);
            self.failed = true;
        } else {
            debug!("{}", diagnostic);
        }

        if let Some(handler) = self.handlers.get_mut(&severity) {
            handler(&diagnostic);
        }
        self.diagnostics.push(diagnostic);
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("language", &self.factory.name)
            .field("selects", &self.selects)
            .field("select_all", &self.select_all)
            .field("sources", &self.sources)
            .field("triples", &self.triples)
            .field("constraints", &self.constraints)
            .field("prefixes", &self.prefixes)
            .field("failed", &self.failed)
            .field("prepared", &self.prepared)
            .finish_non_exhaustive()
    }
}

impl Drop for Query {
    fn drop(&mut self) {
        if self.initialized {
            let language = Arc::clone(&self.factory.language);
            language.terminate(self);
        }
    }
}
