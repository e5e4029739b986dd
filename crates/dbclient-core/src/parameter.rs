//! Named parameter bindings and the low-level parameters built from them

use crate::placeholder::is_placeholder_name;
use crate::{DbClientError, Result, Value};
use serde::{Deserialize, Serialize};

/// Marker characters a placeholder may start with
pub const PLACEHOLDER_MARKERS: [char; 3] = ['@', ':', '?'];

/// Provider-neutral SQL type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DbType {
    Boolean,
    Int32,
    Int64,
    Double,
    Decimal,
    String,
    AnsiString,
    Binary,
    Guid,
    Date,
    Time,
    DateTime,
    Json,
}

/// Direction of a parameter relative to the command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParameterDirection {
    #[default]
    Input,
    Output,
    InputOutput,
    ReturnValue,
}

/// Provider-specific metadata carried by a binding.
///
/// The same hint is applied to every parameter generated from one binding,
/// so an expanded sequence keeps the type, size and direction of the
/// original declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeHint {
    pub db_type: Option<DbType>,
    pub size: Option<usize>,
    pub direction: ParameterDirection,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
}

impl TypeHint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(db_type: DbType) -> Self {
        Self {
            db_type: Some(db_type),
            ..Self::default()
        }
    }

    pub fn db_type(mut self, db_type: DbType) -> Self {
        self.db_type = Some(db_type);
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn direction(mut self, direction: ParameterDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn precision(mut self, precision: u8, scale: u8) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    /// Copy this metadata onto a low-level parameter
    pub fn apply_to(&self, parameter: &mut DbParameter) {
        parameter.db_type = self.db_type;
        parameter.size = self.size;
        parameter.direction = self.direction;
        parameter.precision = self.precision;
        parameter.scale = self.scale;
    }
}

/// A low-level parameter attached to a driver command
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DbParameter {
    /// Name without the placeholder marker
    pub name: String,
    pub value: Value,
    pub db_type: Option<DbType>,
    pub size: Option<usize>,
    pub direction: ParameterDirection,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
}

impl DbParameter {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    /// Case-insensitive name comparison
    pub fn is_named(&self, name: &str) -> bool {
        names_eq(&self.name, name)
    }
}

/// A named value intended to be substituted into a command template
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBinding {
    name: String,
    value: Value,
    type_hint: TypeHint,
}

impl ParameterBinding {
    /// Create a binding.
    ///
    /// A single leading placeholder marker is accepted and dropped, so
    /// `"@ids"` and `"ids"` declare the same binding.
    pub fn new(name: &str, value: impl Into<Value>, type_hint: TypeHint) -> Result<Self> {
        let name = name
            .strip_prefix(|c: char| PLACEHOLDER_MARKERS.contains(&c))
            .unwrap_or(name);

        if name.is_empty() {
            return Err(DbClientError::InvalidBinding(
                "binding name must not be empty".into(),
            ));
        }
        if !is_placeholder_name(name) {
            return Err(DbClientError::InvalidBinding(format!(
                "binding name '{}' must contain only letters, digits and underscores",
                name
            )));
        }

        Ok(Self {
            name: name.to_string(),
            value: value.into(),
            type_hint,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn type_hint(&self) -> &TypeHint {
        &self.type_hint
    }

    /// Apply this binding's metadata to a driver parameter
    pub fn apply_to_parameter(&self, parameter: &mut DbParameter) {
        self.type_hint.apply_to(parameter);
    }
}

/// Parameter and binding names compare without regard to case
pub(crate) fn names_eq(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Ordered collection of bindings with unique, case-insensitive names
#[derive(Debug, Clone, Default)]
pub struct BindingSet {
    bindings: Vec<ParameterBinding>,
}

impl BindingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a binding, failing if its name is already declared
    pub fn add(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        type_hint: TypeHint,
    ) -> Result<&mut Self> {
        let binding = ParameterBinding::new(name, value, type_hint)?;
        self.insert(binding)?;
        Ok(self)
    }

    /// Append a binding with no type metadata
    pub fn add_value(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.add(name, value, TypeHint::default())
    }

    /// Append an already constructed binding
    pub fn insert(&mut self, binding: ParameterBinding) -> Result<()> {
        if self.contains(binding.name()) {
            return Err(DbClientError::DuplicateBinding(binding.name().to_string()));
        }
        tracing::trace!(binding = %binding.name(), "binding declared");
        self.bindings.push(binding);
        Ok(())
    }

    /// Remove every binding
    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    pub fn get(&self, name: &str) -> Option<&ParameterBinding> {
        self.bindings
            .iter()
            .find(|b| names_eq(b.name(), name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, ParameterBinding> {
        self.bindings.iter()
    }
}

impl<'a> IntoIterator for &'a BindingSet {
    type Item = &'a ParameterBinding;
    type IntoIter = std::slice::Iter<'a, ParameterBinding>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl TryFrom<Vec<ParameterBinding>> for BindingSet {
    type Error = DbClientError;

    fn try_from(bindings: Vec<ParameterBinding>) -> Result<Self> {
        let mut set = BindingSet::new();
        for binding in bindings {
            set.insert(binding)?;
        }
        Ok(set)
    }
}
