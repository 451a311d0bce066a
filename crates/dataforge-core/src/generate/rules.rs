//! # Special Field Rules
//!
//! A rule pairs a column matcher with a value generator. Rules are consulted
//! in declaration order and the first one that matches the column *and*
//! produces a non-null value wins.
//!
//! Two ordered lists exist: field rules for ordinary columns and foreign
//! rules for foreign-key columns. A foreign rule overrides referential
//! selection, which is how a schema's lookup ids get pinned to a known value.

use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::Rng;
use regex::{Regex, RegexBuilder};

use crate::generate::providers::{weighted_pick, FakeKind};
use crate::generate::value::Value;
use crate::schema::types::{Column, DataType};

/// How a rule recognizes a column name or type.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// `*`: matches everything.
    Any,
    /// Case-insensitive regular expression, searched anywhere in the text.
    Pattern(Regex),
    /// Case-insensitive literal substring, used when the text is not a valid regex.
    Contains(String),
}

impl Matcher {
    pub fn parse(text: &str) -> Self {
        if text == "*" {
            return Matcher::Any;
        }
        match RegexBuilder::new(text).case_insensitive(true).build() {
            Ok(re) => Matcher::Pattern(re),
            Err(_) => Matcher::Contains(text.to_lowercase()),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        match self {
            Matcher::Any => true,
            Matcher::Pattern(re) => re.is_match(text),
            Matcher::Contains(needle) => text.to_lowercase().contains(needle.as_str()),
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Any => write!(f, "*"),
            Matcher::Pattern(re) => write!(f, "/{}/", re.as_str()),
            Matcher::Contains(s) => write!(f, "~{}", s),
        }
    }
}

/// Generator supplied in-process by a library caller.
pub type CustomGenerator = Arc<dyn Fn(&Column, &mut StdRng) -> Option<Value> + Send + Sync>;

/// Where a rule's value comes from.
#[derive(Clone)]
pub enum Generator {
    Literal(Value),
    OneOf {
        values: Vec<Value>,
        weights: Option<Vec<f64>>,
    },
    IntRange {
        min: i64,
        max: i64,
    },
    Fake(FakeKind),
    /// A random member of the column's enum type. Yields nothing for non-enum columns.
    EnumMember,
    Custom(CustomGenerator),
}

impl Generator {
    pub fn custom(
        f: impl Fn(&Column, &mut StdRng) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        Generator::Custom(Arc::new(f))
    }

    /// Produce one candidate value. `None` means the rule did not apply.
    pub fn generate(&self, column: &Column, rng: &mut StdRng) -> Option<Value> {
        match self {
            Generator::Literal(v) => Some(v.clone()),
            Generator::OneOf { values, weights } => {
                weighted_pick(values, weights.as_deref(), rng).cloned()
            }
            Generator::IntRange { min, max } => {
                (min <= max).then(|| Value::Int(rng.random_range(*min..=*max)))
            }
            Generator::Fake(kind) => Some(kind.generate(rng)),
            Generator::EnumMember => {
                let members = column.enum_values.as_deref().unwrap_or_default();
                weighted_pick(members, None, rng).map(|m| Value::text(m.as_str()))
            }
            Generator::Custom(f) => f(column, rng),
        }
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Generator::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            Generator::OneOf { values, weights } => f
                .debug_struct("OneOf")
                .field("values", values)
                .field("weights", weights)
                .finish(),
            Generator::IntRange { min, max } => f
                .debug_struct("IntRange")
                .field("min", min)
                .field("max", max)
                .finish(),
            Generator::Fake(kind) => f.debug_tuple("Fake").field(kind).finish(),
            Generator::EnumMember => write!(f, "EnumMember"),
            Generator::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// One configured (matcher, generator) pair.
#[derive(Debug, Clone)]
pub struct SpecialFieldRule {
    pub name: Option<Matcher>,
    pub data_type: Option<Matcher>,
    /// Restrict the rule to one table. `None` applies everywhere.
    pub table: Option<String>,
    pub generator: Generator,
}

impl SpecialFieldRule {
    pub fn for_name(pattern: &str, generator: Generator) -> Self {
        Self {
            name: Some(Matcher::parse(pattern)),
            data_type: None,
            table: None,
            generator,
        }
    }

    pub fn for_type(pattern: &str, generator: Generator) -> Self {
        Self {
            name: None,
            data_type: Some(Matcher::parse(pattern)),
            table: None,
            generator,
        }
    }

    pub fn in_table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    /// `(name matches OR type matches) AND table scope allows`.
    ///
    /// The type matcher sees both the normalized type name and the raw
    /// database type, so `tinyint` and `smallint` both work as patterns.
    pub fn matches(&self, table: &str, column: &Column) -> bool {
        if let Some(scope) = &self.table {
            if scope != table {
                return false;
            }
        }

        let name_hit = self
            .name
            .as_ref()
            .is_some_and(|m| m.matches(&column.name));
        let type_hit = self.data_type.as_ref().is_some_and(|m| {
            m.matches(&column.data_type.to_string()) || m.matches(&column.raw_type)
        });
        name_hit || type_hit
    }
}

/// The two ordered rule lists consulted by the pipeline.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub field: Vec<SpecialFieldRule>,
    pub foreign: Vec<SpecialFieldRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules for the given kind of column, in consultation order.
    pub fn for_column(&self, is_foreign_key: bool) -> &[SpecialFieldRule] {
        if is_foreign_key {
            &self.foreign
        } else {
            &self.field
        }
    }

    /// Index of the first rule matching the column, ignoring what it would generate.
    pub fn first_match(&self, table: &str, column: &Column, is_foreign_key: bool) -> Option<usize> {
        self.for_column(is_foreign_key)
            .iter()
            .position(|rule| rule.matches(table, column))
    }

    /// Append another set's rules after this one's, keeping precedence.
    pub fn extend(&mut self, other: RuleSet) {
        self.field.extend(other.field);
        self.foreign.extend(other.foreign);
    }

    /// Default field rules: common column names first, then one fallback per
    /// logical type. No foreign rules are built in.
    pub fn builtin() -> Self {
        use FakeKind as K;
        use Generator::Fake;

        // Short words are anchored on underscores so "city" skips "capacity"
        // and "state" skips "statement".
        let by_name = [
            (r"first_?name", K::FirstName),
            (r"last_?name|surname", K::LastName),
            (r"e_?mail", K::SafeEmail),
            (r"password|passwd", K::Password),
            (r"mobile|phone", K::Phone),
            (r"gender", K::Gender),
            (r"ipv6", K::Ipv6),
            (r"ip(v4)?_?address|ipv4", K::Ipv4),
            (r"address", K::Address),
            (r"(^|_)city($|_)", K::City),
            (r"(^|_)(state|province)($|_)", K::State),
            (r"(^|_)country($|_)", K::Country),
            (r"zip_?code|postal", K::Zipcode),
            (r"company", K::Company),
            (r"job_?title", K::JobTitle),
            (r"(^|_)(website|url)($|_)", K::Url),
            (r"user_?agent", K::UserAgent),
            (r"username|login", K::Username),
            (r"description|summary", K::Sentence),
            (r"name", K::Name),
        ];

        let mut field: Vec<SpecialFieldRule> = by_name
            .into_iter()
            .map(|(pattern, kind)| SpecialFieldRule::for_name(pattern, Fake(kind)))
            .collect();

        // Checked against both the normalized and the raw type; order matters
        // where one name contains another (bigint before int, timestamp before time).
        let by_type = [
            (r"enum", None),
            (r"uuid", Some(K::Uuid)),
            (r"^(tinyint|bool|bit)", Some(K::Boolean)),
            (r"bigint|int8|bigserial", Some(K::BigInt)),
            (r"smallint|int2", Some(K::SmallInt)),
            (r"^(int|mediumint|serial)", Some(K::Integer)),
            (r"numeric|decimal", Some(K::Decimal)),
            (r"real|float|double", Some(K::Float)),
            (r"timestamp|datetime", Some(K::Datetime)),
            (r"date", Some(K::Date)),
            (r"time", Some(K::Time)),
            (r"json", Some(K::Json)),
            (r"text|clob", Some(K::Paragraph)),
            (r"char", Some(K::Word)),
            (r"binary|blob|bytea", Some(K::Bytes)),
        ];

        field.extend(by_type.into_iter().map(|(pattern, kind)| {
            let generator = match kind {
                Some(kind) => Fake(kind),
                None => Generator::EnumMember,
            };
            SpecialFieldRule::for_type(pattern, generator)
        }));

        // Bare "id" columns that are not database-assigned get a uuid string.
        field.insert(
            0,
            SpecialFieldRule {
                name: Some(Matcher::parse(r"^id$")),
                data_type: None,
                table: None,
                generator: Generator::custom(|column, rng| {
                    if !column.data_type.is_string() && column.data_type != DataType::Uuid {
                        return None;
                    }
                    Some(FakeKind::Uuid.generate(rng))
                }),
            },
        );

        Self {
            field,
            foreign: Vec::new(),
        }
    }
}
