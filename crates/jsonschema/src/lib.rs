//! A JSON Schema validation engine for Rust.
//!
//! This crate implements the evaluation core of JSON Schema: schema resource resolution
//! (`$id`, `$anchor`, `$ref`, `$recursiveRef`), the per-dialect keyword dispatcher, and
//! the annotation/error collection model, for the Draft 6, Draft 7, and Draft 2019-09
//! dialects.
//!
//! # Validation
//!
//! For simple use cases where you need to validate an instance against a schema once, use
//! [`is_valid`]:
//!
//! ```rust
//! use serde_json::json;
//!
//! let schema = json!({"type": "string"});
//! let instance = json!("Hello, world!");
//!
//! assert!(jsonschema::is_valid(&schema, &instance));
//! ```
//!
//! For repeated validation against the same schema, compile a [`Validator`] once and reuse it:
//!
//! ```rust
//! use serde_json::json;
//!
//! let schema = json!({"type": "string"});
//! let validator = jsonschema::validator_for(&schema)
//!     .expect("Invalid schema");
//!
//! assert!(validator.is_valid(&json!("Hello, world!")));
//! assert!(!validator.is_valid(&json!(42)));
//!
//! let instance = json!(42);
//! if let Err(errors) = validator.validate(&instance) {
//!     for error in errors {
//!         eprintln!("Error: {error} at {}", error.instance_path);
//!     }
//! }
//! ```
//!
//! # Configuration
//!
//! [`options()`] returns a builder for configuring the dialect, retrieval, and format
//! behavior used during compilation:
//!
//! ```rust
//! use jsonschema::Draft;
//! use serde_json::json;
//!
//! let schema = json!({"type": "string"});
//! let validator = jsonschema::options()
//!     .with_draft(Draft::Draft7)
//!     .build(&schema)
//!     .expect("Invalid schema");
//! ```
//!
//! # Reference resolution
//!
//! By default, `$ref` targets that are not already known are resolved from the local
//! filesystem and, when the `resolve-http` feature is enabled, over HTTP. A custom
//! [`Retrieve`] implementation can be registered via [`ValidationOptions::with_retriever`]
//! to serve resources from an in-memory map or any other source.
//!
//! # Annotations and errors
//!
//! [`Validator::apply`] evaluates a schema without raising on the first failure and
//! returns an [`Output`], from which the raw, locator-keyed annotation and error maps can
//! be read. Serializing to the draft's "basic" wire format (see [`BasicOutput`]) is one
//! possible rendering of those maps, not the engine's native representation.
//!
//! # Custom keywords
//!
//! Domain-specific keywords can be registered with [`ValidationOptions::with_keyword`] by
//! implementing the [`Keyword`] trait.
//!
//! # Custom formats
//!
//! Additional `format` checkers can be registered with [`ValidationOptions::with_format`].
//! Custom checkers only run on string instances and only when format assertion is enabled
//! for the active dialect.
mod compiler;
mod content_encoding;
mod content_media_type;
mod ecma;
pub mod error;
mod keywords;
mod node;
pub mod options;
pub mod output;
pub mod paths;
pub mod primitive_type;
pub(crate) mod properties;
mod retriever;
mod validator;

pub use error::{ErrorIterator, ValidationError};
pub use keywords::custom::Keyword;
pub use options::ValidationOptions;
pub use output::{BasicOutput, Output};
pub use referencing::{Draft, Resource, Retrieve, Uri, Vocabulary};
pub use retriever::{SchemaResolver, SchemaResolverError};
pub use validator::Validator;

use serde_json::Value;

/// Create a default [`ValidationOptions`] for configuring JSON Schema validation.
#[must_use]
#[inline]
pub fn options() -> ValidationOptions {
    Validator::options()
}

/// A shortcut for validating `instance` against `schema`. The dialect is detected
/// automatically from `$schema`, falling back to Draft 7.
///
/// ```rust
/// use jsonschema::is_valid;
/// use serde_json::json;
///
/// let schema = json!({"maxLength": 5});
/// let instance = json!("foo");
/// assert!(is_valid(&schema, &instance));
/// ```
///
/// This function panics if an invalid schema is passed. Use [`validator_for`] if the
/// schema is not known to be valid ahead of time.
#[must_use]
#[inline]
pub fn is_valid(schema: &Value, instance: &Value) -> bool {
    let validator = Validator::new(schema).expect("Invalid schema");
    validator.is_valid(instance)
}

/// Compile `schema` into a reusable [`Validator`], detecting the dialect automatically.
#[inline]
pub fn validator_for(schema: &Value) -> Result<Validator, ValidationError<'static>> {
    Validator::new(schema)
}

#[cfg(test)]
pub(crate) mod tests_util {
    use super::Validator;
    use crate::ValidationError;
    use serde_json::Value;

    pub(crate) fn is_not_valid_with(validator: &Validator, instance: &Value) {
        assert!(
            !validator.is_valid(instance),
            "{instance} should not be valid (via is_valid)",
        );
        assert!(
            validator.validate(instance).is_err(),
            "{instance} should not be valid (via validate)",
        );
        assert!(
            !validator.apply(instance).basic().is_valid(),
            "{instance} should not be valid (via apply)",
        );
    }

    pub(crate) fn is_not_valid(schema: &Value, instance: &Value) {
        let validator = crate::validator_for(schema).unwrap();
        is_not_valid_with(&validator, instance)
    }

    pub(crate) fn is_not_valid_with_draft(draft: crate::Draft, schema: &Value, instance: &Value) {
        let validator = crate::options().with_draft(draft).build(schema).unwrap();
        is_not_valid_with(&validator, instance)
    }

    pub(crate) fn expect_errors(schema: &Value, instance: &Value, errors: &[&str]) {
        assert_eq!(
            crate::validator_for(schema)
                .expect("Should be a valid schema")
                .validate(instance)
                .expect_err(&format!("{instance} should not be valid"))
                .map(|e| e.to_string())
                .collect::<Vec<String>>(),
            errors
        )
    }

    pub(crate) fn is_valid_with(validator: &Validator, instance: &Value) {
        if let Err(mut errors) = validator.validate(instance) {
            let first = errors.next().expect("Errors iterator is empty");
            panic!(
                "{instance} should be valid (via validate). Error: {first} at {}",
                first.instance_path
            );
        }
        assert!(
            validator.is_valid(instance),
            "{instance} should be valid (via is_valid)",
        );
        assert!(
            validator.apply(instance).basic().is_valid(),
            "{instance} should be valid (via apply)",
        );
    }

    pub(crate) fn is_valid(schema: &Value, instance: &Value) {
        let validator = crate::validator_for(schema).unwrap();
        is_valid_with(&validator, instance);
    }

    pub(crate) fn is_valid_with_draft(draft: crate::Draft, schema: &Value, instance: &Value) {
        let validator = crate::options().with_draft(draft).build(schema).unwrap();
        is_valid_with(&validator, instance)
    }

    pub(crate) fn validate(schema: &Value, instance: &Value) -> ValidationError<'static> {
        let validator = crate::validator_for(schema).unwrap();
        validator
            .validate(instance)
            .expect_err("Should be an error")
            .next()
            .expect("Should be an error")
            .into_owned()
    }

    pub(crate) fn assert_schema_path(schema: &Value, instance: &Value, expected: &str) {
        let error = validate(schema, instance);
        assert_eq!(error.schema_path.to_string(), expected)
    }

    pub(crate) fn assert_schema_paths(schema: &Value, instance: &Value, expected: &[&str]) {
        let validator = crate::validator_for(schema).unwrap();
        let errors = validator.validate(instance).expect_err("Should be an error");
        for (error, schema_path) in errors.zip(expected) {
            assert_eq!(error.schema_path.to_string(), *schema_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{is_valid, Draft};
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn test_is_valid() {
        let schema = json!({"minLength": 5});
        let valid = json!("foobar");
        let invalid = json!("foo");
        assert!(is_valid(&schema, &valid));
        assert!(!is_valid(&schema, &invalid));
    }

    #[test_case(Draft::Draft6)]
    #[test_case(Draft::Draft7)]
    #[test_case(Draft::Draft201909)]
    fn meta_schemas(draft: Draft) {
        for schema in [json!({"enum": [0, 0.0]}), json!({"enum": []})] {
            assert!(crate::options().with_draft(draft).build(&schema).is_ok())
        }
    }

    #[test]
    fn incomplete_escape_in_pattern() {
        let schema = json!({"pattern": "\\u"});
        assert!(crate::validator_for(&schema).is_err())
    }
}
