//! Field schema registry.
//!
//! Every filterable field is declared once in a [`FieldSpec`] table. The
//! process-wide [`Registry::global`] holds the sample metadata and VAF
//! record fields; [`Registry::new`] builds registries from other tables.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use thiserror::Error;

use crate::lookup::Lookup;

/// Primitive type of a filterable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Number,
    Date,
    Choice,
    Boolean,
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::Date => "date",
            FieldKind::Choice => "choice",
            FieldKind::Boolean => "boolean",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity a field belongs to.
///
/// Queries run against VAF records; metadata fields live on the record's
/// parent sample and are reached through the `metadata` relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Metadata,
    Record,
}

impl Namespace {
    /// Name of the relation traversed to reach this namespace from a record.
    pub fn relation(self) -> Option<&'static str> {
        match self {
            Namespace::Metadata => Some("metadata"),
            Namespace::Record => None,
        }
    }

    /// Key prefix that pins a field name to this namespace.
    pub fn prefix(self) -> Option<&'static str> {
        match self {
            Namespace::Metadata => Some("metadata__"),
            Namespace::Record => None,
        }
    }
}

/// Location of a field relative to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldPath {
    /// Relation to traverse first, if the field is not on the record itself.
    pub relation: Option<&'static str>,
    pub column: &'static str,
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.relation {
            Some(relation) => write!(f, "{relation}__{}", self.column),
            None => f.write_str(self.column),
        }
    }
}

/// Schema declaration of one filterable field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub namespace: Namespace,
    pub kind: FieldKind,
    /// Lookups a client may apply to this field.
    pub lookups: &'static [Lookup],
    /// Accepted values for choice fields, uppercase.
    pub choices: Option<&'static [&'static str]>,
}

impl FieldSpec {
    /// Declares a field with the default lookups for its kind.
    pub const fn new(name: &'static str, namespace: Namespace, kind: FieldKind) -> Self {
        FieldSpec {
            name,
            namespace,
            kind,
            lookups: Lookup::defaults_for(kind),
            choices: None,
        }
    }

    pub const fn text(name: &'static str, namespace: Namespace) -> Self {
        FieldSpec::new(name, namespace, FieldKind::Text)
    }

    pub const fn number(name: &'static str, namespace: Namespace) -> Self {
        FieldSpec::new(name, namespace, FieldKind::Number)
    }

    pub const fn date(name: &'static str, namespace: Namespace) -> Self {
        FieldSpec::new(name, namespace, FieldKind::Date)
    }

    pub const fn boolean(name: &'static str, namespace: Namespace) -> Self {
        FieldSpec::new(name, namespace, FieldKind::Boolean)
    }

    pub const fn choice(
        name: &'static str,
        namespace: Namespace,
        choices: &'static [&'static str],
    ) -> Self {
        let mut spec = FieldSpec::new(name, namespace, FieldKind::Choice);
        spec.choices = Some(choices);
        spec
    }

    /// Restricts the field to the given lookups.
    pub const fn with_lookups(mut self, lookups: &'static [Lookup]) -> Self {
        self.lookups = lookups;
        self
    }

    pub fn path(&self) -> FieldPath {
        FieldPath {
            relation: self.namespace.relation(),
            column: self.name,
        }
    }
}

/// Errors raised while building a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("field '{name}' is declared twice in the {namespace:?} namespace")]
    DuplicateField { name: &'static str, namespace: Namespace },

    #[error("choice field '{0}' declares no choices")]
    MissingChoices(&'static str),
}

/// Read-only table of filterable fields.
#[derive(Debug, Clone)]
pub struct Registry {
    fields: Vec<FieldSpec>,
    by_name: HashMap<&'static str, Vec<usize>>,
}

/// Pathogens a sample can be tagged with.
pub const PATHOGENS: &[&str] = &["SARS-COV-2", "MPXV", "INFLUENZA"];

static GLOBAL: Lazy<Registry> = Lazy::new(|| {
    use Namespace::{Metadata, Record};

    Registry::new(vec![
        FieldSpec::text("sample_id", Metadata),
        FieldSpec::text("site_code", Metadata),
        FieldSpec::choice("pathogen", Metadata, PATHOGENS),
        FieldSpec::text("bam_path", Metadata),
        FieldSpec::date("collection_date", Metadata),
        FieldSpec::date("published_date", Metadata),
        FieldSpec::number("num_reads", Metadata),
        FieldSpec::number("mean_coverage", Metadata),
        FieldSpec::number("mean_entropy", Metadata),
        FieldSpec::text("references", Metadata),
        FieldSpec::boolean("suppressed", Metadata),
        FieldSpec::text("reference", Record),
        FieldSpec::number("position", Record),
        FieldSpec::number("coverage", Record),
        FieldSpec::number("num_a", Record),
        FieldSpec::number("num_c", Record),
        FieldSpec::number("num_g", Record),
        FieldSpec::number("num_t", Record),
        FieldSpec::number("num_ds", Record),
        FieldSpec::number("pc_a", Record),
        FieldSpec::number("pc_c", Record),
        FieldSpec::number("pc_g", Record),
        FieldSpec::number("pc_t", Record),
        FieldSpec::number("pc_ds", Record),
        FieldSpec::number("entropy", Record),
        FieldSpec::number("secondary_entropy", Record),
    ])
    .unwrap_or_else(|err| panic!("built-in field table is invalid: {err}"))
});

impl Registry {
    /// Builds a registry, rejecting duplicate names within a namespace.
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self, SchemaError> {
        let mut by_name: HashMap<&'static str, Vec<usize>> = HashMap::new();
        for (i, spec) in fields.iter().enumerate() {
            if spec.kind == FieldKind::Choice && spec.choices.is_none() {
                return Err(SchemaError::MissingChoices(spec.name));
            }
            let slots = by_name.entry(spec.name).or_default();
            if slots.iter().any(|&j| fields[j].namespace == spec.namespace) {
                return Err(SchemaError::DuplicateField {
                    name: spec.name,
                    namespace: spec.namespace,
                });
            }
            slots.push(i);
        }
        Ok(Registry { fields, by_name })
    }

    /// The VAF database field table.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Resolves a client-supplied field name.
    ///
    /// `metadata__name` only resolves in the metadata namespace. A bare name
    /// resolves in the record namespace first, then in the metadata one.
    pub fn resolve(&self, name: &str) -> Option<&FieldSpec> {
        let metadata = Namespace::Metadata;
        if let Some(bare) = metadata.prefix().and_then(|p| name.strip_prefix(p)) {
            return self.lookup(metadata, bare);
        }
        self.lookup(Namespace::Record, name)
            .or_else(|| self.lookup(Namespace::Metadata, name))
    }

    /// Returns `true` if `lookup` is declared for the field and has meaning
    /// for its kind.
    pub fn is_lookup_allowed(&self, spec: &FieldSpec, lookup: Lookup) -> bool {
        lookup.applies_to(spec.kind) && spec.lookups.contains(&lookup)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn lookup(&self, namespace: Namespace, name: &str) -> Option<&FieldSpec> {
        self.by_name
            .get(name)?
            .iter()
            .map(|&i| &self.fields[i])
            .find(|spec| spec.namespace == namespace)
    }
}
