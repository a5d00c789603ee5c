//! SOQL query construction.
//!
//! [`SoqlQuery`] is the general builder (aliases, nested conditions, grouping,
//! count transform). [`SelectQuery`] and [`SelectQueryRaw`] are the simpler
//! single-object forms whose string form is ready to drop into a `?q=` query
//! parameter.

mod condition;
mod select;

use std::fmt;

pub use condition::{
    escape_soql_string, validate_operator, Condition, ConditionField, ConditionGroup,
    ConditionItem, Conjunction, SoqlValue,
};
pub use select::{encode_for_url, SelectQuery, SelectQueryRaw};

use crate::errors::Result;

/// Anything that can be sent to the query endpoint.
pub trait SoqlStatement: Send + Sync {
    /// Query text with literal spaces.
    fn soql(&self) -> String;

    /// Query text encoded for the `q` parameter (spaces as `+`).
    fn url_encoded(&self) -> String {
        encode_for_url(&self.soql())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("ASC"),
            SortDirection::Desc => f.write_str("DESC"),
        }
    }
}

/// A computed select item: an aggregate or a child-relationship subquery.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Raw(String),
    Subquery(Box<SoqlQuery>),
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Raw(expr) => f.write_str(expr),
            Expression::Subquery(query) => write!(f, "({})", query),
        }
    }
}

impl From<&str> for Expression {
    fn from(value: &str) -> Self {
        Self::Raw(value.to_string())
    }
}

impl From<String> for Expression {
    fn from(value: String) -> Self {
        Self::Raw(value)
    }
}

impl From<SoqlQuery> for Expression {
    fn from(value: SoqlQuery) -> Self {
        Self::Subquery(Box::new(value))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Table {
    name: String,
    alias: Option<String>,
}

/// General SOQL builder.
///
/// ```
/// use sfsync_core::soql::SoqlQuery;
///
/// let query = SoqlQuery::select("Account", "a")
///     .add_field("a", "Id")
///     .fields("a", ["Name"]);
/// assert_eq!(query.to_string(), "SELECT a.Id, a.Name FROM Account a");
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SoqlQuery {
    tables: Vec<Table>,
    fields: Vec<String>,
    expressions: Vec<Expression>,
    conditions: ConditionGroup,
    group_by: Vec<String>,
    having: ConditionGroup,
    order_by: Vec<(String, SortDirection)>,
    range: Option<(usize, usize)>,
    for_update: bool,
}

fn qualify(alias: &str, field: &str) -> String {
    if alias.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", alias, field)
    }
}

impl SoqlQuery {
    /// Start a query on `table`. An empty alias means none.
    pub fn select(table: &str, alias: &str) -> Self {
        Self::default().table(table, alias)
    }

    pub fn table(mut self, name: &str, alias: &str) -> Self {
        self.tables.push(Table {
            name: name.to_string(),
            alias: (!alias.is_empty()).then(|| alias.to_string()),
        });
        self
    }

    pub fn add_field(mut self, alias: &str, field: &str) -> Self {
        let qualified = qualify(alias, field);
        if !self.fields.contains(&qualified) {
            self.fields.push(qualified);
        }
        self
    }

    pub fn fields<I, S>(self, alias: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        fields
            .into_iter()
            .fold(self, |query, field| query.add_field(alias, field.as_ref()))
    }

    pub fn add_expression(mut self, expression: impl Into<Expression>) -> Self {
        self.expressions.push(expression.into());
        self
    }

    /// AND a condition onto the WHERE clause.
    pub fn condition(
        mut self,
        field: impl Into<ConditionField>,
        value: impl Into<SoqlValue>,
        operator: Option<&str>,
    ) -> Result<Self> {
        self.conditions.push(Condition::new(field, value, operator)?);
        Ok(self)
    }

    /// Add a raw WHERE snippet (no operator).
    pub fn where_raw(mut self, snippet: &str) -> Self {
        self.conditions.push(Condition::raw(snippet));
        self
    }

    /// Add a nested group (e.g. an OR group) to the WHERE clause.
    pub fn condition_group(mut self, group: ConditionGroup) -> Self {
        self.conditions.push_group(group);
        self
    }

    pub fn is_null(self, field: &str) -> Self {
        self.null_check(field, "=")
    }

    pub fn is_not_null(self, field: &str) -> Self {
        self.null_check(field, "!=")
    }

    fn null_check(mut self, field: &str, operator: &str) -> Self {
        self.conditions.push(Condition {
            field: ConditionField::Column(field.to_string()),
            operator: Some(operator.to_string()),
            value: Some(SoqlValue::Null),
        });
        self
    }

    pub fn order_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.order_by.push((field.to_string(), direction));
        self
    }

    /// `LIMIT len OFFSET start`.
    pub fn range(mut self, start: usize, len: usize) -> Self {
        self.range = Some((start, len));
        self
    }

    pub fn group_by(mut self, field: &str) -> Self {
        if !self.group_by.iter().any(|f| f == field) {
            self.group_by.push(field.to_string());
        }
        self
    }

    pub fn having(
        mut self,
        field: impl Into<ConditionField>,
        value: impl Into<SoqlValue>,
        operator: Option<&str>,
    ) -> Result<Self> {
        self.having.push(Condition::new(field, value, operator)?);
        Ok(self)
    }

    pub fn for_update(mut self, enabled: bool) -> Self {
        self.for_update = enabled;
        self
    }

    /// Derived query counting the rows this one would return.
    ///
    /// Keeps grouped fields and expressions referenced by HAVING, drops
    /// everything else and the ordering, then appends `COUNT()`.
    pub fn count_query(&self) -> Self {
        let mut count = self.clone();
        let having = self.having.to_string();

        count.fields.retain(|field| count.group_by.contains(field));
        count.expressions.retain(|expr| match expr {
            Expression::Raw(raw) => !having.is_empty() && having.contains(raw.as_str()),
            Expression::Subquery(_) => false,
        });
        count.order_by.clear();
        count.expressions.push(Expression::Raw("COUNT()".to_string()));
        count
    }

    fn select_list(&self) -> String {
        let items: Vec<String> = self
            .fields
            .iter()
            .cloned()
            .chain(self.expressions.iter().map(|e| e.to_string()))
            .collect();
        if items.is_empty() {
            "Id".to_string()
        } else {
            items.join(", ")
        }
    }
}

impl fmt::Display for SoqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables = self
            .tables
            .iter()
            .map(|t| match &t.alias {
                Some(alias) => format!("{} {}", t.name, alias),
                None => t.name.clone(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "SELECT {} FROM {}", self.select_list(), tables)?;

        if !self.conditions.is_empty() {
            write!(f, " WHERE {}", self.conditions)?;
        }
        if !self.group_by.is_empty() {
            write!(f, " GROUP BY {}", self.group_by.join(", "))?;
        }
        if !self.having.is_empty() {
            write!(f, " HAVING {}", self.having)?;
        }
        if !self.order_by.is_empty() {
            let order = self
                .order_by
                .iter()
                .map(|(field, dir)| format!("{} {}", field, dir))
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, " ORDER BY {}", order)?;
        }
        if let Some((start, len)) = self.range {
            write!(f, " LIMIT {} OFFSET {}", len, start)?;
        }
        if self.for_update {
            f.write_str(" FOR UPDATE")?;
        }
        Ok(())
    }
}

impl SoqlStatement for SoqlQuery {
    fn soql(&self) -> String {
        self.to_string()
    }
}
