// Function signature validation and type checking
// Arity bounds plus one accepted-type mask per argument position

use crate::evaluator::EvaluatorError;
use crate::parser::ParserError;
use crate::value::Dtype;

/// Function signature
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    pub result_type: Dtype,
    pub min_args: usize,
    pub max_args: usize,
    /// Accepted types per position; `input_types.len() == max_args`.
    pub input_types: &'static [Dtype],
}

impl Signature {
    pub const fn new(
        result_type: Dtype,
        min_args: usize,
        max_args: usize,
        input_types: &'static [Dtype],
    ) -> Self {
        Signature {
            result_type,
            min_args,
            max_args,
            input_types,
        }
    }

    /// Validate argument count
    pub fn validate_arg_count(&self, name: &str, actual: usize) -> Result<(), ParserError> {
        if actual < self.min_args || actual > self.max_args {
            return Err(ParserError::ArgCount {
                name: name.to_string(),
                min: self.min_args,
                max: self.max_args,
                actual,
            });
        }
        Ok(())
    }

    /// Accepted types at `position`; anything past the declared list is
    /// unconstrained.
    pub fn accepts(&self, position: usize) -> Dtype {
        self.input_types
            .get(position)
            .copied()
            .unwrap_or(Dtype::ANYTHING)
    }

    /// Compile-time check of an argument whose type is already known.
    ///
    /// A deferred argument (`Dtype::UNKNOWN`) always passes; it is checked
    /// again once it has a value.
    pub fn check_static(&self, name: &str, position: usize, found: Dtype) -> Result<(), ParserError> {
        let expected = self.accepts(position);
        if found == Dtype::UNKNOWN || found.intersects(expected) {
            return Ok(());
        }
        Err(ParserError::ArgType {
            name: name.to_string(),
            position,
            expected,
            found,
        })
    }

    /// Runtime check of a resolved argument.
    pub fn check_runtime(&self, name: &str, position: usize, found: Dtype) -> Result<(), EvaluatorError> {
        let expected = self.accepts(position);
        if found.intersects(expected) {
            return Ok(());
        }
        Err(EvaluatorError::type_error(
            name,
            format!(
                "argument {} must be {}, got {}",
                position + 1,
                expected,
                found
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STR_ARG: Dtype = Dtype::STR.or(Dtype::ITERABLE);
    const SIG: Signature = Signature::new(Dtype::STR, 1, 2, &[STR_ARG, Dtype::INT]);

    #[test]
    fn test_signature_validation() {
        // Valid: 1 required arg provided
        assert!(SIG.validate_arg_count("f", 1).is_ok());

        // Valid: both args provided
        assert!(SIG.validate_arg_count("f", 2).is_ok());

        // Invalid: too few args
        assert!(SIG.validate_arg_count("f", 0).is_err());

        // Invalid: too many args
        assert!(matches!(
            SIG.validate_arg_count("f", 3),
            Err(ParserError::ArgCount { actual: 3, .. })
        ));
    }

    #[test]
    fn test_static_type_check() {
        assert!(SIG.check_static("f", 0, Dtype::ARR).is_ok());
        assert!(SIG.check_static("f", 1, Dtype::UNKNOWN).is_ok());
        assert!(matches!(
            SIG.check_static("f", 1, Dtype::STR),
            Err(ParserError::ArgType { position: 1, .. })
        ));
    }

    #[test]
    fn test_runtime_type_check() {
        assert!(SIG.check_runtime("f", 0, Dtype::STR).is_ok());
        let err = SIG.check_runtime("f", 1, Dtype::FLOAT).unwrap_err();
        assert_eq!(err.to_string(), "Type error in f: argument 2 must be int, got float");
    }
}
