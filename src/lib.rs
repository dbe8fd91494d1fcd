//! Initializer Lowering Engine
//!
//! This crate lowers C#-like object/collection/indexer initializer
//! expressions into two artifacts:
//! - **Semantic tree**: a fully resolved operation tree with every implicit
//!   conversion, argument match, and receiver made explicit (`semantic`
//!   module)
//! - **Flow graph**: an order-preserving basic-block graph in which every
//!   intermediate receiver, index, and conditionally evaluated operand is
//!   captured into a numbered slot exactly once (`flow` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use initflow::{lower_initializer_expression, TypeCatalog};
//! use initflow::syntax::{Entry, Expr, InitializerStatement};
//!
//! let mut catalog = TypeCatalog::new();
//! let f = catalog.declare_class("F");
//! catalog.add_field(f, "Field", initflow::binder::types::INT32);
//!
//! let stmt = InitializerStatement::declaration(
//!     "f",
//!     Expr::new_init("F", vec![], vec![Entry::assign("Field", Expr::int(2))]),
//! );
//! let lowered = lower_initializer_expression(&stmt, &catalog);
//! println!("{}", initflow::render::render_flow_graph(&lowered.graph));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod binder;
pub mod flow;
pub mod model;
pub mod plan;
pub mod render;
pub mod semantic;
pub mod syntax;

pub use binder::{Binder, LowerError, TypeCatalog};
pub use flow::{FlowBuilder, FlowGraph};
pub use semantic::Operation;

/// The result of lowering one initializer expression.
#[derive(Debug)]
pub struct LoweredInitializer {
    /// The semantic operation tree.
    pub operation: Operation,
    /// The control-flow graph with flow captures.
    pub graph: FlowGraph,
    /// Diagnostics collected during resolution, in discovery order.
    pub diagnostics: Vec<LowerError>,
}

/// Lower a statement-level initializer expression.
///
/// Resolution never aborts: failures surface as diagnostics and
/// `Invalid`-marked nodes while sibling entries keep their shape. The
/// function holds no shared state and may be called concurrently for
/// independent expressions.
pub fn lower_initializer_expression(
    stmt: &syntax::InitializerStatement,
    binder: &dyn Binder,
) -> LoweredInitializer {
    let mut diagnostics = Vec::new();
    let root = model::Resolver::new(binder, &mut diagnostics).resolve_statement(stmt);
    let plan = plan::plan(&root);
    let operation = semantic::build(&root, binder);
    let target_local = stmt.local.as_ref().map(|name| {
        let ty = stmt
            .local_ty
            .clone()
            .unwrap_or_else(|| binder.type_info(root.ty).name.clone());
        (ty, name.clone())
    });
    let graph = FlowBuilder::build(&root, &plan, binder, target_local);
    LoweredInitializer { operation, graph, diagnostics }
}
