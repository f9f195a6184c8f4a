use std::collections::{BTreeSet, HashMap};

use tarn_ast::{DeclId, FunId, LineIndex, Module, NodeRef};
use tarn_sema::{CallGraph, SymbolTable};

use crate::*;

fn analyse(source: &str) -> (Module, LineIndex, SymbolTable, CallGraph) {
    let (module, errors) = tarn_parser::parse(source);
    assert!(errors.is_empty(), "parse errors: {errors:?}");
    let lines = LineIndex::new(source);
    let symbols = SymbolTable::build(&module).unwrap();
    let graph = CallGraph::build(&module, &symbols).unwrap();
    (module, lines, symbols, graph)
}

fn fun(module: &Module, name: &str) -> FunId {
    module
        .funs
        .iter()
        .find(|(_, f)| f.name(module) == name)
        .map(|(id, _)| id)
        .unwrap()
}

fn local(module: &Module, fun: FunId, name: &str) -> DeclId {
    module.funs[fun]
        .locals
        .iter()
        .copied()
        .find(|&d| module.decls[d].name == name)
        .unwrap()
}

const IDENT_SEED: &str = "\
ident(p) {
 return p;
}

main() {
  var x, y;
  x = ident(42);
  y = ident(&x);
  return *x;
}";

#[test]
fn ident_solved_alone_keeps_a_shared_type_variable() {
    let (module, lines, symbols, _) = analyse(IDENT_SEED);
    let ident = fun(&module, "ident");

    let mut unifier = Unifier::default();
    unifier.add(collect(&module, &lines, &symbols, ident));
    unifier.solve().unwrap();

    let decl = module.funs[ident].name_decl;
    let signature = unifier.resolve(&node_term(&module, &lines, NodeRef::Decl(decl)));
    match signature {
        Term::Fun(params, ret) => {
            assert_eq!(params.len(), 1);
            assert!(matches!(params[0], Term::Var(_)));
            assert_eq!(params[0], *ret);
        }
        other => panic!("expected a function term, got {other}"),
    }
}

#[test]
fn ident_seed_collects_exactly_nine_constraints() {
    let (module, lines, symbols, graph) = analyse(IDENT_SEED);
    let ident = fun(&module, "ident");
    let main = fun(&module, "main");

    let mut unifier = Unifier::default();
    unifier.add(collect(&module, &lines, &symbols, ident));
    unifier.solve().unwrap();
    let solved = HashMap::from([(ident, unifier)]);

    let mut fresh = 0;
    let out = collect_poly_with(&module, &lines, &symbols, &graph, &solved, &mut fresh, main);
    let rendered: BTreeSet<String> = out.collected.iter().map(|c| c.to_string()).collect();
    let expected: BTreeSet<String> = [
        "⟦&x@8:12⟧ = ⭡⟦x@6:6⟧",
        "⟦(*x)@9:9⟧ = int",
        "⟦42@7:12⟧ = int",
        "⟦ident@1:0⟧ = (⟦&x@8:12⟧) -> ⟦ident(&x)@8:6⟧",
        "⟦ident@1:0⟧ = (⟦42@7:12⟧) -> ⟦ident(42)@7:6⟧",
        "⟦main@5:0⟧ = () -> ⟦(*x)@9:9⟧",
        "⟦x@6:6⟧ = ⟦ident(42)@7:6⟧",
        "⟦x@6:6⟧ = ⭡⟦(*x)@9:9⟧",
        "⟦y@6:9⟧ = ⟦ident(&x)@8:6⟧",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect();
    assert_eq!(rendered, expected);
}

#[test]
fn solver_sequence_instantiates_each_call_site() {
    let (module, lines, symbols, graph) = analyse(IDENT_SEED);
    let ident = fun(&module, "ident");
    let main = fun(&module, "main");

    let mut unifier = Unifier::default();
    unifier.add(collect(&module, &lines, &symbols, ident));
    unifier.solve().unwrap();
    let solved = HashMap::from([(ident, unifier)]);

    let mut fresh = 0;
    let out = collect_poly_with(&module, &lines, &symbols, &graph, &solved, &mut fresh, main);
    assert_eq!(out.collected.len(), out.solver.len());

    let rewritten: Vec<(&Constraint, &Constraint)> = out
        .collected
        .iter()
        .zip(&out.solver)
        .filter(|(c, s)| c != s)
        .collect();
    assert_eq!(rewritten.len(), 2, "one rewrite per call site");
    for (collected, solver) in &rewritten {
        assert_eq!(collected.rhs, solver.rhs);
        assert!(matches!(solver.lhs, Term::Fun(..)));
        assert!(solver.lhs.to_string().contains('α'));
    }
    // Each site gets its own fresh copy of the skeleton.
    assert_ne!(rewritten[0].1.lhs, rewritten[1].1.lhs);
}

#[test]
fn collection_is_deterministic() {
    let (module, lines, symbols, graph) = analyse(IDENT_SEED);
    let main = fun(&module, "main");

    let first: Vec<String> = collect_poly(&module, &lines, &symbols, &graph, main)
        .collected
        .iter()
        .map(|c| c.to_string())
        .collect();
    let second: Vec<String> = collect_poly(&module, &lines, &symbols, &graph, main)
        .collected
        .iter()
        .map(|c| c.to_string())
        .collect();
    assert_eq!(first, second);
}

#[test]
fn ident_seed_fails_full_solving() {
    // x is bound to int through the first call but dereferenced in the
    // return, so whole-program solving must reject.
    let (module, lines, symbols, graph) = analyse(IDENT_SEED);
    let err = check(&module, &lines, &symbols, &graph).unwrap_err();
    assert!(matches!(err, TypeError::Mismatch { .. }));
}

#[test]
fn call_sites_resolve_independently() {
    let source = "\
ident(p) {
  return p;
}

main() {
  var a, p, q;
  a = 7;
  p = alloc 9;
  q = ident(p);
  a = ident(42);
  return a;
}";
    let (module, lines, symbols, graph) = analyse(source);
    let main = fun(&module, "main");
    let types = check(&module, &lines, &symbols, &graph).unwrap();

    let a = NodeRef::Decl(local(&module, main, "a"));
    let q = NodeRef::Decl(local(&module, main, "q"));
    assert_eq!(types.type_of(&module, &lines, main, a), Some(Term::Int));
    assert_eq!(
        types.type_of(&module, &lines, main, q),
        Some(Term::reference(Term::Int))
    );
}

#[test]
fn deref_use_forces_a_reference_operand() {
    let source = "\
main() {
  var x, y;
  x = alloc 0;
  y = *x;
  return y;
}";
    let (module, lines, symbols, graph) = analyse(source);
    let main = fun(&module, "main");
    let types = check(&module, &lines, &symbols, &graph).unwrap();

    let x = NodeRef::Decl(local(&module, main, "x"));
    let y = NodeRef::Decl(local(&module, main, "y"));
    assert_eq!(
        types.type_of(&module, &lines, main, x),
        Some(Term::reference(Term::Int))
    );
    assert_eq!(types.type_of(&module, &lines, main, y), Some(Term::Int));
}

#[test]
fn address_of_own_cell_is_an_infinite_type() {
    let source = "\
main() {
  var x;
  x = &x;
  return 0;
}";
    let (module, lines, symbols, graph) = analyse(source);
    let err = check(&module, &lines, &symbols, &graph).unwrap_err();
    assert!(matches!(err, TypeError::InfiniteType { .. }));
}

#[test]
fn returning_a_pointer_from_main_is_a_mismatch() {
    let source = "\
main() {
  var x;
  x = alloc 1;
  return x;
}";
    let (module, lines, symbols, graph) = analyse(source);
    let err = check(&module, &lines, &symbols, &graph).unwrap_err();
    match err {
        TypeError::Mismatch { lhs, rhs } => {
            let shapes = [lhs.to_string(), rhs.to_string()];
            assert!(shapes.contains(&"int".to_owned()));
            assert!(shapes.iter().any(|s| s.starts_with('⭡')));
        }
        other => panic!("expected a mismatch, got {other}"),
    }
}

#[test]
fn main_parameters_are_integers() {
    let source = "\
main(p) {
  return p;
}";
    let (module, lines, symbols, graph) = analyse(source);
    let main = fun(&module, "main");
    let types = check(&module, &lines, &symbols, &graph).unwrap();
    assert_eq!(
        types.signature(&module, &lines, main),
        Some(Term::fun(vec![Term::Int], Term::Int))
    );
}

#[test]
fn self_recursion_solves_monomorphically() {
    let source = "\
f(n) {
  var r;
  if (n > 0) {
    r = f(n - 1);
  } else {
    r = 1;
  }
  return r;
}

main() {
  var a;
  a = f(10);
  return a;
}";
    let (module, lines, symbols, graph) = analyse(source);
    let f = fun(&module, "f");
    let main = fun(&module, "main");
    let types = check(&module, &lines, &symbols, &graph).unwrap();

    assert_eq!(
        types.signature(&module, &lines, f),
        Some(Term::fun(vec![Term::Int], Term::Int))
    );
    let a = NodeRef::Decl(local(&module, main, "a"));
    assert_eq!(types.type_of(&module, &lines, main, a), Some(Term::Int));
}

#[test]
fn mutual_recursion_shares_one_solving_unit() {
    let source = "\
even(n) {
  var r;
  if (n > 0) {
    r = odd(n - 1);
  } else {
    r = 1;
  }
  return r;
}

odd(n) {
  var r;
  if (n > 0) {
    r = even(n - 1);
  } else {
    r = 0;
  }
  return r;
}

main() {
  var a;
  a = even(9);
  return a;
}";
    let (module, lines, symbols, graph) = analyse(source);
    let even = fun(&module, "even");
    let odd = fun(&module, "odd");
    let types = check(&module, &lines, &symbols, &graph).unwrap();

    assert_eq!(
        types.signature(&module, &lines, even),
        Some(Term::fun(vec![Term::Int], Term::Int))
    );
    assert_eq!(
        types.signature(&module, &lines, odd),
        Some(Term::fun(vec![Term::Int], Term::Int))
    );
}

#[test]
fn control_flow_and_io_are_integer_typed() {
    let source = "\
main() {
  var n, s;
  n = input;
  s = 0;
  while (n > 0) {
    s = s + n;
    n = n - 1;
  }
  output s;
  return s;
}";
    let (module, lines, symbols, graph) = analyse(source);
    let main = fun(&module, "main");
    let types = check(&module, &lines, &symbols, &graph).unwrap();
    let n = NodeRef::Decl(local(&module, main, "n"));
    assert_eq!(types.type_of(&module, &lines, main, n), Some(Term::Int));
}

#[test]
fn equality_comparison_equates_its_operands() {
    let source = "\
main() {
  var x, y, z;
  x = alloc 0;
  y = alloc 1;
  z = x == y;
  return z;
}";
    let (module, lines, symbols, graph) = analyse(source);
    let main = fun(&module, "main");
    let types = check(&module, &lines, &symbols, &graph).unwrap();
    let z = NodeRef::Decl(local(&module, main, "z"));
    assert_eq!(types.type_of(&module, &lines, main, z), Some(Term::Int));

    // The operands still compare as values, not as integers.
    let x = NodeRef::Decl(local(&module, main, "x"));
    assert_eq!(
        types.type_of(&module, &lines, main, x),
        Some(Term::reference(Term::Int))
    );
}

#[test]
fn store_through_pointer_types_the_pointee() {
    let source = "\
main() {
  var p;
  p = alloc 0;
  *p = 7;
  return *p;
}";
    let (module, lines, symbols, graph) = analyse(source);
    let main = fun(&module, "main");
    let types = check(&module, &lines, &symbols, &graph).unwrap();
    let p = NodeRef::Decl(local(&module, main, "p"));
    assert_eq!(
        types.type_of(&module, &lines, main, p),
        Some(Term::reference(Term::Int))
    );
}

#[test]
fn check_module_reports_name_errors() {
    let source = "\
main() {
  return y;
}";
    let (module, errors) = tarn_parser::parse(source);
    assert!(errors.is_empty());
    let lines = LineIndex::new(source);
    let err = check_module(&module, &lines).unwrap_err();
    assert!(matches!(err, CheckError::Sema(_)));
}
