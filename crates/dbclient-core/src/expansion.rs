//! Rewrites a command template against a binding set
//!
//! Bindings are processed in insertion order against the progressively
//! rewritten text. For each binding only the first placeholder that
//! references it is considered:
//!
//! - unreferenced bindings are skipped
//! - scalars become one parameter named like the binding; the text is unchanged
//! - an empty sequence replaces the placeholder with `(NULL)`
//! - a sequence of K values replaces the placeholder with K generated
//!   placeholders `(@p_name_0, @p_name_1, ...)` and attaches K parameters
//!
//! When the template already wraps the placeholder in parentheses, as in
//! `IN (@ids)`, the generated list reuses them instead of adding a second pair.

use crate::parameter::names_eq;
use crate::placeholder::find_placeholder;
use crate::{BindingSet, DbCommand, ParameterBinding, PlaceholderMatch, Value};

/// Replacement text for an empty sequence
pub const EMPTY_SEQUENCE_LITERAL: &str = "NULL";

/// Attach the parameters for `bindings` to `command` and return the rewritten text
pub fn expand_into(template: &str, bindings: &BindingSet, command: &mut dyn DbCommand) -> String {
    let mut sql = template.to_string();
    let prefix = generated_prefix(bindings);

    for binding in bindings {
        let Some(placeholder) = find_placeholder(&sql, binding.name()) else {
            tracing::debug!(binding = %binding.name(), "binding not referenced, skipping");
            continue;
        };

        match binding.value() {
            Value::Array(items) => {
                let list = expand_sequence(&prefix, binding, items, &placeholder, command);
                let replacement = if is_parenthesized(&sql, &placeholder) {
                    list
                } else {
                    format!("({})", list)
                };
                sql.replace_range(placeholder.range.clone(), &replacement);
            }
            value => {
                let mut parameter = command.create_parameter();
                binding.apply_to_parameter(&mut parameter);
                parameter.name = binding.name().to_string();
                parameter.value = value.clone();
                command.add_parameter(parameter);
                tracing::trace!(binding = %binding.name(), "scalar binding attached");
            }
        }
    }

    sql
}

fn expand_sequence(
    prefix: &str,
    binding: &ParameterBinding,
    items: &[Value],
    placeholder: &PlaceholderMatch,
    command: &mut dyn DbCommand,
) -> String {
    if items.is_empty() {
        tracing::debug!(binding = %binding.name(), "empty sequence replaced with NULL");
        return EMPTY_SEQUENCE_LITERAL.to_string();
    }

    let mut tokens = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let mut parameter = command.create_parameter();
        binding.apply_to_parameter(&mut parameter);
        parameter.name = format!("{}_{}_{}", prefix, binding.name(), index);
        parameter.value = item.clone();
        tokens.push(format!("{}{}", placeholder.marker, parameter.name));
        command.add_parameter(parameter);
    }

    tracing::debug!(
        binding = %binding.name(),
        count = items.len(),
        "sequence binding expanded"
    );
    tokens.join(", ")
}

/// Whether the placeholder is the only thing between a pair of parentheses
fn is_parenthesized(sql: &str, placeholder: &PlaceholderMatch) -> bool {
    sql[..placeholder.range.start].trim_end().ends_with('(')
        && sql[placeholder.range.end..].trim_start().starts_with(')')
}

/// Prefix for generated parameter names within one build.
///
/// Generated names look like `<prefix>_<binding>_<index>`. They can only
/// collide with a declared binding that itself starts with `<prefix>_`, so
/// the first of `p`, `p1`, `p2`, ... that no binding starts with is used.
pub fn generated_prefix(bindings: &BindingSet) -> String {
    let mut counter = 0usize;
    loop {
        let prefix = if counter == 0 {
            "p".to_string()
        } else {
            format!("p{}", counter)
        };
        let lead = format!("{}_", prefix);
        let collides = bindings.iter().any(|binding| {
            binding
                .name()
                .get(..lead.len())
                .is_some_and(|start| names_eq(start, &lead))
        });
        if !collides {
            return prefix;
        }
        counter += 1;
    }
}
