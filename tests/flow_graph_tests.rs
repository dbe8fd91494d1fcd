//! Flow Graph Tests
//!
//! Asserts the rendered control-flow graph for lowered initializer
//! expressions: receiver captures, capture-owning regions, branch arm
//! blocks, and their merge points.

use initflow::binder::types::{BOOL, INT32, STRING};
use initflow::binder::ParamSpec;
use initflow::render::render_flow_graph;
use initflow::syntax::{ConstValue, Entry, Expr, InitializerStatement, SwitchArm};
use initflow::{lower_initializer_expression, LoweredInitializer, TypeCatalog};

fn lower(catalog: &TypeCatalog, stmt: InitializerStatement) -> LoweredInitializer {
    lower_initializer_expression(&stmt, catalog)
}

fn graph(catalog: &TypeCatalog, stmt: InitializerStatement) -> String {
    render_flow_graph(&lower(catalog, stmt).graph)
}

fn assert_graph(actual: &str, expected: &str) {
    assert_eq!(actual.trim_end(), expected.trim());
}

// =============================================================================
// SINGLE BLOCK
// =============================================================================

mod single_block {
    use super::*;

    #[test]
    fn test_simple_creation_with_field_assignment() {
        let mut cat = TypeCatalog::new();
        let f = cat.declare_class("F");
        cat.add_field(f, "Field", INT32);
        let actual = graph(
            &cat,
            InitializerStatement::declaration_typed(
                "F",
                "f",
                Expr::new_init("F", vec![], vec![Entry::assign("Field", Expr::int(2))]),
            ),
        );
        assert_graph(
            &actual,
            r#"
Block[B0] - Entry
    Statements (0)
    Next (Regular) Block[B1]
        Entering: {R1}

.locals {R1}
{
    Locals: [F f]
    CaptureIds: [0]
    Block[B1] - Block
        Predecessors: [B0]
        Statements (3)
            FlowCapture: 0 (Syntax: 'new F() { Field = 2 }')
              Value:
                ObjectCreation (Constructor: F..ctor()) (Type: F) (Syntax: 'new F() { Field = 2 }')
                  Arguments(0):

            SimpleAssignment (Type: System.Int32) (Syntax: 'Field = 2')
              Left:
                FieldReference (Field: F.Field) (Type: System.Int32) (Syntax: 'Field')
                  Instance:
                    FlowCaptureReference: 0 (Type: F) (Syntax: 'new F() { Field = 2 }')
              Right:
                Literal (Type: System.Int32, Constant: 2) (Syntax: '2')

            SimpleAssignment (Type: F) (Syntax: 'f = new F() { Field = 2 }')
              Left:
                LocalReference: f (Type: F) (Syntax: 'f')
              Right:
                FlowCaptureReference: 0 (Type: F) (Syntax: 'new F() { Field = 2 }')

        Next (Regular) Block[B2]
            Leaving: {R1}

}
Block[B2] - Exit
    Predecessors: [B1]
    Statements (0)
"#,
        );
    }

    #[test]
    fn test_creation_without_initializer_stays_inline() {
        let mut cat = TypeCatalog::new();
        cat.declare_class("F");
        let actual = graph(
            &cat,
            InitializerStatement::expression(Expr::new_obj("F", vec![])),
        );
        // No initializer list, so the receiver never needs a capture.
        assert!(!actual.contains("FlowCapture"));
        assert!(!actual.contains("CaptureIds"));
        assert!(actual.contains("ExpressionStatement (Type: null) (Syntax: 'new F()')"));
    }

    #[test]
    fn test_collection_adds_keep_source_order() {
        let mut cat = TypeCatalog::new();
        let c = cat.declare_class("C");
        cat.add_add_method(c, vec![ParamSpec::new("item", INT32)]);
        let lowered = lower(
            &cat,
            InitializerStatement::declaration(
                "c",
                Expr::new_init(
                    "C",
                    vec![],
                    vec![
                        Entry::add(Expr::int(1)),
                        Entry::add(Expr::int(2)),
                        Entry::add(Expr::int(3)),
                    ],
                ),
            ),
        );
        // Receiver capture, three adds, final assignment — one block.
        assert_eq!(lowered.graph.blocks.len(), 3);
        assert_eq!(lowered.graph.blocks[1].statements.len(), 5);
        let actual = render_flow_graph(&lowered.graph);
        let p1 = actual.find("Constant: 1").unwrap();
        let p2 = actual.find("Constant: 2").unwrap();
        let p3 = actual.find("Constant: 3").unwrap();
        assert!(p1 < p2 && p2 < p3);
    }
}

// =============================================================================
// NESTED REGIONS
// =============================================================================

mod nested_regions {
    use super::*;

    #[test]
    fn test_nested_creation_opens_inner_region() {
        let mut cat = TypeCatalog::new();
        let b = cat.declare_class("B");
        cat.add_field(b, "Field", BOOL);
        let f = cat.declare_class("F");
        cat.add_property(f, "Property2", b);
        let actual = graph(
            &cat,
            InitializerStatement::declaration_typed(
                "F",
                "f",
                Expr::new_target_typed(
                    vec![],
                    vec![Entry::assign(
                        "Property2",
                        Expr::new_init("B", vec![], vec![Entry::assign("Field", Expr::bool(true))]),
                    )],
                ),
            ),
        );
        assert_graph(
            &actual,
            r#"
Block[B0] - Entry
    Statements (0)
    Next (Regular) Block[B1]
        Entering: {R1}

.locals {R1}
{
    Locals: [F f]
    CaptureIds: [0]
    Block[B1] - Block
        Predecessors: [B0]
        Statements (1)
            FlowCapture: 0 (Syntax: 'new() { Property2 = new B() { Field = true } }')
              Value:
                ObjectCreation (Constructor: F..ctor()) (Type: F) (Syntax: 'new() { Property2 = new B() { Field = true } }')
                  Arguments(0):

        Next (Regular) Block[B2]
            Entering: {R2}

    .locals {R2}
    {
        CaptureIds: [1]
        Block[B2] - Block
            Predecessors: [B1]
            Statements (3)
                FlowCapture: 1 (Syntax: 'new B() { Field = true }')
                  Value:
                    ObjectCreation (Constructor: B..ctor()) (Type: B) (Syntax: 'new B() { Field = true }')
                      Arguments(0):

                SimpleAssignment (Type: System.Boolean) (Syntax: 'Field = true')
                  Left:
                    FieldReference (Field: B.Field) (Type: System.Boolean) (Syntax: 'Field')
                      Instance:
                        FlowCaptureReference: 1 (Type: B) (Syntax: 'new B() { Field = true }')
                  Right:
                    Literal (Type: System.Boolean, Constant: True) (Syntax: 'true')

                SimpleAssignment (Type: B) (Syntax: 'Property2 = new B() { Field = true }')
                  Left:
                    PropertyReference (Property: F.Property2) (Type: B) (Syntax: 'Property2')
                      Instance:
                        FlowCaptureReference: 0 (Type: F) (Syntax: 'new() { Property2 = new B() { Field = true } }')
                  Right:
                    FlowCaptureReference: 1 (Type: B) (Syntax: 'new B() { Field = true }')

            Next (Regular) Block[B3]
                Leaving: {R2}

    }
    Block[B3] - Block
        Predecessors: [B2]
        Statements (1)
            SimpleAssignment (Type: F) (Syntax: 'f = new() { Property2 = new B() { Field = true } }')
              Left:
                LocalReference: f (Type: F) (Syntax: 'f')
              Right:
                FlowCaptureReference: 0 (Type: F) (Syntax: 'new() { Property2 = new B() { Field = true } }')

        Next (Regular) Block[B4]
            Leaving: {R1}

}
Block[B4] - Exit
    Predecessors: [B3]
    Statements (0)
"#,
        );
    }

    #[test]
    fn test_member_initializer_captures_receiver_access() {
        let mut cat = TypeCatalog::new();
        let g = cat.declare_class("G");
        cat.add_field(g, "Inner", INT32);
        let f = cat.declare_class("F");
        cat.add_property(f, "X", g);
        let actual = graph(
            &cat,
            InitializerStatement::expression(Expr::new_init(
                "F",
                vec![],
                vec![Entry::assign_nested("X", vec![Entry::assign("Inner", Expr::int(1))])],
            )),
        );
        // The member access itself is captured inside a child region.
        assert!(actual.contains(".locals {R2}"));
        assert!(actual.contains("CaptureIds: [1]"));
        assert!(actual.contains("FlowCapture: 1 (Syntax: 'X')"));
        assert!(actual.contains("PropertyReference (Property: F.X)"));
        assert!(actual.contains("FieldReference (Field: G.Inner)"));
        assert!(actual.contains("Leaving: {R2}"));
    }

    #[test]
    fn test_indexer_nested_initializer_captures_element_access() {
        let mut cat = TypeCatalog::new();
        let e = cat.declare_class("E");
        cat.add_field(e, "X", INT32);
        let c = cat.declare_class("C");
        cat.add_indexer(c, vec![ParamSpec::new("i", INT32)], e);
        let actual = graph(
            &cat,
            InitializerStatement::expression(Expr::new_init(
                "C",
                vec![],
                vec![Entry::index_nested(
                    vec![Expr::int(0)],
                    vec![Entry::assign("X", Expr::int(1))],
                )],
            )),
        );
        assert!(actual.contains(".locals {R2}"));
        assert!(actual.contains("FlowCapture: 1 (Syntax: '[0]')"));
        assert!(actual.contains("IndexerReference (Indexer: C.this[]) (Type: E) (Syntax: '[0]')"));
        assert!(actual.contains("FieldReference (Field: E.X)"));
    }
}

// =============================================================================
// CONDITIONAL VALUES
// =============================================================================

mod conditional_values {
    use super::*;

    #[test]
    fn test_ternary_value_splits_into_arm_blocks() {
        let mut cat = TypeCatalog::new();
        let f = cat.declare_class("F");
        cat.add_field(f, "A", INT32);
        cat.declare_local("b", BOOL);
        let actual = graph(
            &cat,
            InitializerStatement::expression(Expr::new_init(
                "F",
                vec![],
                vec![Entry::assign(
                    "A",
                    Expr::ternary(Expr::local("b"), Expr::int(1), Expr::int(2)),
                )],
            )),
        );
        assert_graph(
            &actual,
            r#"
Block[B0] - Entry
    Statements (0)
    Next (Regular) Block[B1]
        Entering: {R1}

.locals {R1}
{
    CaptureIds: [0]
    Block[B1] - Block
        Predecessors: [B0]
        Statements (1)
            FlowCapture: 0 (Syntax: 'new F() { A = b ? 1 : 2 }')
              Value:
                ObjectCreation (Constructor: F..ctor()) (Type: F) (Syntax: 'new F() { A = b ? 1 : 2 }')
                  Arguments(0):

        Next (Regular) Block[B2]
            Entering: {R2}

    .locals {R2}
    {
        CaptureIds: [1]
        Block[B2] - Block
            Predecessors: [B1]
            Statements (0)
            Jump if False (Regular) to Block[B4]
                LocalReference: b (Type: System.Boolean) (Syntax: 'b')

            Next (Regular) Block[B3]

        Block[B3] - Block
            Predecessors: [B2]
            Statements (1)
                FlowCapture: 1 (Syntax: '1')
                  Value:
                    Literal (Type: System.Int32, Constant: 1) (Syntax: '1')

            Next (Regular) Block[B5]

        Block[B4] - Block
            Predecessors: [B2]
            Statements (1)
                FlowCapture: 1 (Syntax: '2')
                  Value:
                    Literal (Type: System.Int32, Constant: 2) (Syntax: '2')

            Next (Regular) Block[B5]

        Block[B5] - Block
            Predecessors: [B3, B4]
            Statements (1)
                SimpleAssignment (Type: System.Int32) (Syntax: 'A = b ? 1 : 2')
                  Left:
                    FieldReference (Field: F.A) (Type: System.Int32) (Syntax: 'A')
                      Instance:
                        FlowCaptureReference: 0 (Type: F) (Syntax: 'new F() { A = b ? 1 : 2 }')
                  Right:
                    FlowCaptureReference: 1 (Type: System.Int32) (Syntax: 'b ? 1 : 2')

            Next (Regular) Block[B6]
                Leaving: {R2}

    }
    Block[B6] - Block
        Predecessors: [B5]
        Statements (1)
            ExpressionStatement (Type: null) (Syntax: 'new F() { A = b ? 1 : 2 }')
              Expression:
                FlowCaptureReference: 0 (Type: F) (Syntax: 'new F() { A = b ? 1 : 2 }')

        Next (Regular) Block[B7]
            Leaving: {R1}

}
Block[B7] - Exit
    Predecessors: [B6]
    Statements (0)
"#,
        );
    }

    #[test]
    fn test_coalesce_tests_null_on_captured_value() {
        let mut cat = TypeCatalog::new();
        let f = cat.declare_class("F");
        cat.add_property(f, "Name", STRING);
        cat.declare_local("s", STRING);
        let actual = graph(
            &cat,
            InitializerStatement::expression(Expr::new_init(
                "F",
                vec![],
                vec![Entry::assign("Name", Expr::coalesce(Expr::local("s"), Expr::str("d")))],
            )),
        );
        // The operand is captured once, then tested.
        assert!(actual.contains("FlowCapture: 1 (Syntax: 's')"));
        assert!(actual.contains("Jump if True (Regular) to Block[B4]"));
        assert!(actual.contains("IsNull (Type: System.Boolean) (Syntax: 's')"));
        // Both arms write the same reserved id.
        assert_eq!(actual.matches("FlowCapture: 2 (Syntax:").count(), 2);
        // The not-null arm re-reads the operand capture.
        assert!(actual.contains("FlowCaptureReference: 1 (Type: System.String) (Syntax: 's')"));
        assert!(actual.contains(r#"Literal (Type: System.String, Constant: "d") (Syntax: '"d"')"#));
        // The consumer reads the merged result.
        assert!(actual.contains("FlowCaptureReference: 2 (Type: System.String) (Syntax: 's ?? \"d\"')"));
    }
}

// =============================================================================
// SWITCH VALUES
// =============================================================================

mod switch_values {
    use super::*;

    fn switch_catalog() -> TypeCatalog {
        let mut cat = TypeCatalog::new();
        let f = cat.declare_class("F");
        cat.add_field(f, "A", INT32);
        cat.declare_local("i", INT32);
        cat
    }

    #[test]
    fn test_switch_with_discard_chains_tests_and_merges() {
        let cat = switch_catalog();
        let actual = graph(
            &cat,
            InitializerStatement::expression(Expr::new_init(
                "F",
                vec![],
                vec![Entry::assign(
                    "A",
                    Expr::switch(
                        Expr::local("i"),
                        vec![
                            SwitchArm::constant(ConstValue::Int(1), Expr::int(10)),
                            SwitchArm::constant(ConstValue::Int(2), Expr::int(20)),
                            SwitchArm::discard(Expr::int(0)),
                        ],
                    ),
                )],
            )),
        );
        // Scrutinee captured once, tested per constant arm.
        assert!(actual.contains("FlowCapture: 1 (Syntax: 'i')"));
        assert_eq!(actual.matches("ConstantPatternTest").count(), 2);
        assert!(actual.contains("Jump if False (Regular) to Block[B4]"));
        assert!(actual.contains("Jump if False (Regular) to Block[B6]"));
        // Three arms write the same reserved id and meet at one merge block.
        assert_eq!(actual.matches("FlowCapture: 2 (Syntax:").count(), 3);
        assert!(actual.contains("Predecessors: [B3, B5, B6]"));
        assert!(!actual.contains("Next (Throw)"));
    }

    #[test]
    fn test_switch_without_discard_throws_on_no_match() {
        let cat = switch_catalog();
        let actual = graph(
            &cat,
            InitializerStatement::expression(Expr::new_init(
                "F",
                vec![],
                vec![Entry::assign(
                    "A",
                    Expr::switch(
                        Expr::local("i"),
                        vec![SwitchArm::constant(ConstValue::Int(1), Expr::int(10))],
                    ),
                )],
            )),
        );
        assert!(actual.contains("Next (Throw) Block[null]"));
        assert!(actual.contains("MatchFailure (Type: null) (Syntax: 'i switch { 1 => 10 }')"));
        // Only the matching arm reaches the merge block.
        assert!(actual.contains("Predecessors: [B3]"));
    }
}

// =============================================================================
// EVALUATION-ORDER CAPTURES
// =============================================================================

mod evaluation_order {
    use super::*;

    #[test]
    fn test_values_before_a_branching_sibling_are_captured() {
        let mut cat = TypeCatalog::new();
        let c = cat.declare_class("C");
        cat.add_add_method(
            c,
            vec![ParamSpec::new("a", INT32), ParamSpec::new("b", INT32)],
        );
        cat.declare_local("x", INT32);
        cat.declare_local("flag", BOOL);
        let actual = graph(
            &cat,
            InitializerStatement::expression(Expr::new_init(
                "C",
                vec![],
                vec![Entry::add_many(vec![
                    Expr::local("x"),
                    Expr::ternary(Expr::local("flag"), Expr::int(1), Expr::int(2)),
                ])],
            )),
        );
        // `x` is captured before control can split.
        let x_capture = actual.find("FlowCapture: 1 (Syntax: 'x')").unwrap();
        let jump = actual.find("Jump if False").unwrap();
        assert!(x_capture < jump);
        // The call reads both captures in argument order.
        let r1 = actual.find("FlowCaptureReference: 1 (Type: System.Int32) (Syntax: 'x')").unwrap();
        let r2 = actual
            .find("FlowCaptureReference: 2 (Type: System.Int32) (Syntax: 'flag ? 1 : 2')")
            .unwrap();
        assert!(r1 < r2);
        assert!(actual.contains("Invocation (Method: C.Add)"));
    }

    #[test]
    fn test_constant_before_branching_sibling_stays_inline() {
        let mut cat = TypeCatalog::new();
        let c = cat.declare_class("C");
        cat.add_add_method(
            c,
            vec![ParamSpec::new("a", INT32), ParamSpec::new("b", INT32)],
        );
        cat.declare_local("flag", BOOL);
        let actual = graph(
            &cat,
            InitializerStatement::expression(Expr::new_init(
                "C",
                vec![],
                vec![Entry::add_many(vec![
                    Expr::int(7),
                    Expr::ternary(Expr::local("flag"), Expr::int(1), Expr::int(2)),
                ])],
            )),
        );
        // Constants are re-emitted at the use site, never captured.
        assert!(!actual.contains("FlowCapture: 1 (Syntax: '7')"));
        assert!(actual.contains("Literal (Type: System.Int32, Constant: 7) (Syntax: '7')"));
    }
}
