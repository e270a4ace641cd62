// Constant folding and deferred-expression construction
// Every builder returns a value when its inputs are known, or a function of `@` otherwise

use indexmap::IndexMap;
use tracing::trace;

use crate::ast::Indexer;
use crate::binops::Binop;
use crate::evaluator::{apply_indexers, CurJson, CurJsonExpr, Operand};
use crate::functions::{ArgFunction, UMINUS};
use crate::parser::ParserError;
use crate::value::{Dtype, JNode};

/// `left op right`, applied right away when both sides are constants.
pub fn compile_binop(op: &'static Binop, left: Operand, right: Operand) -> Result<Operand, ParserError> {
    if let (Operand::Const(l), Operand::Const(r)) = (&left, &right) {
        let folded = op.call(l, r)?;
        trace!(op = op.name, "folded binop");
        return Ok(Operand::Const(folded));
    }
    let dtype = op.result_type(left.dtype(), right.dtype());
    Ok(Operand::Deferred(CurJson::new(
        dtype,
        CurJsonExpr::Binop { op, left, right },
    )))
}

/// Function call after arity and static type checks.
pub fn compile_function(func: &'static ArgFunction, args: Vec<Operand>) -> Result<Operand, ParserError> {
    func.signature.validate_arg_count(func.name, args.len())?;
    for (position, arg) in args.iter().enumerate() {
        func.signature.check_static(func.name, position, arg.dtype())?;
    }

    if args.iter().all(|arg| !arg.is_deferred()) {
        let values: Vec<JNode> = args.iter().filter_map(|arg| arg.as_const().cloned()).collect();
        trace!(func = func.name, "folded function call");
        return Ok(Operand::Const(func.call(values)?));
    }

    let arg_types: Vec<Dtype> = args.iter().map(Operand::dtype).collect();
    Ok(Operand::Deferred(CurJson::new(
        func.result_type(&arg_types),
        CurJsonExpr::Function { func, args },
    )))
}

pub fn compile_uminus(operand: Operand) -> Result<Operand, ParserError> {
    compile_function(&UMINUS, vec![operand])
}

/// `base` followed by its indexers.
///
/// Expressions inside indexers see the indexed value as `@`, so a constant
/// base always folds, whatever the indexers contain.
pub fn compile_index(base: Operand, indexers: Vec<Indexer>) -> Result<Operand, ParserError> {
    if indexers.is_empty() {
        return Ok(base);
    }
    match base {
        Operand::Const(node) => Ok(Operand::Const(apply_indexers(&node, &indexers)?)),
        Operand::Deferred(_) => Ok(Operand::Deferred(CurJson::new(
            Dtype::UNKNOWN,
            CurJsonExpr::Index { base, indexers },
        ))),
    }
}

pub fn compile_array(items: Vec<Operand>) -> Operand {
    if items.iter().any(Operand::is_deferred) {
        return Operand::Deferred(CurJson::new(Dtype::ARR, CurJsonExpr::Array(items)));
    }
    let values = items
        .into_iter()
        .filter_map(|item| match item {
            Operand::Const(node) => Some(node),
            Operand::Deferred(_) => None,
        })
        .collect();
    Operand::Const(JNode::array(values))
}

pub fn compile_object(pairs: Vec<(String, Operand)>) -> Operand {
    if pairs.iter().any(|(_, value)| value.is_deferred()) {
        return Operand::Deferred(CurJson::new(Dtype::OBJ, CurJsonExpr::Object(pairs)));
    }
    let mut map = IndexMap::with_capacity(pairs.len());
    for (key, value) in pairs {
        if let Operand::Const(node) = value {
            map.insert(key, node);
        }
    }
    Operand::Const(JNode::object(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Selector;
    use crate::binops::{ADD, GREATER_THAN};
    use crate::evaluator::EvaluatorError;
    use crate::functions::lookup;
    use crate::jnode;

    fn konst(node: JNode) -> Operand {
        Operand::Const(node)
    }

    #[test]
    fn test_binop_folds_constants() {
        let op = compile_binop(&ADD, konst(jnode!(1)), konst(jnode!(2))).unwrap();
        assert_eq!(op.as_const(), Some(&jnode!(3)));
    }

    #[test]
    fn test_binop_defers_on_current() {
        let op = compile_binop(&GREATER_THAN, Operand::current(), konst(jnode!(2))).unwrap();
        assert!(op.is_deferred());
        assert_eq!(op.dtype(), Dtype::UNKNOWN);
        assert_eq!(op.resolve(&jnode!(3)).unwrap(), jnode!(true));
    }

    #[test]
    fn test_fold_error_surfaces_as_evaluation() {
        let err = compile_binop(&ADD, konst(jnode!(1)), konst(jnode!("a"))).unwrap_err();
        assert!(matches!(err, ParserError::Evaluation(EvaluatorError::TypeError { .. })));
    }

    #[test]
    fn test_function_checks() {
        let len = lookup("len").unwrap();
        assert!(matches!(
            compile_function(len, vec![]),
            Err(ParserError::ArgCount { min: 1, max: 1, actual: 0, .. })
        ));
        assert!(matches!(
            compile_function(len, vec![konst(jnode!(1))]),
            Err(ParserError::ArgType { position: 0, .. })
        ));
        let folded = compile_function(len, vec![konst(jnode!([1, 2]))]).unwrap();
        assert_eq!(folded.as_const(), Some(&jnode!(2)));
    }

    #[test]
    fn test_function_result_types() {
        let s_len = lookup("s_len").unwrap();
        let deferred = compile_function(s_len, vec![Operand::current()]).unwrap();
        assert_eq!(deferred.dtype(), Dtype::UNKNOWN);

        let sum = lookup("sum").unwrap();
        let deferred = compile_function(sum, vec![Operand::current()]).unwrap();
        assert_eq!(deferred.dtype(), Dtype::FLOAT);

        // a float result cannot feed a function that wants a container
        assert!(matches!(
            compile_function(lookup("len").unwrap(), vec![deferred]),
            Err(ParserError::ArgType { .. })
        ));
    }

    #[test]
    fn test_uminus_folds() {
        let op = compile_uminus(konst(jnode!(3))).unwrap();
        assert_eq!(op.as_const(), Some(&jnode!(-3)));
    }

    #[test]
    fn test_index_on_constant_base_folds() {
        let base = konst(jnode!({"a": [1, 2, 3]}));
        let op = compile_index(
            base,
            vec![
                Indexer::Select(vec![Selector::Key("a".to_string())]),
                Indexer::Select(vec![Selector::Index(-1)]),
            ],
        )
        .unwrap();
        assert_eq!(op.as_const(), Some(&jnode!(3)));
    }

    #[test]
    fn test_containers() {
        let arr = compile_array(vec![konst(jnode!(1)), konst(jnode!("x"))]);
        assert_eq!(arr.as_const(), Some(&jnode!([1, "x"])));

        let obj = compile_object(vec![("a".to_string(), Operand::current())]);
        assert_eq!(obj.dtype(), Dtype::OBJ);
        assert_eq!(obj.resolve(&jnode!(5)).unwrap(), jnode!({"a": 5}));
    }
}
