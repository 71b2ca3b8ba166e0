use anyhow::{Result, bail};
use keel_sql::DataType;
use sea_query::backend::{
    EscapeBuilder, OperLeftAssocDecider, PrecedenceDecider, QuotedBuilder, TableRefBuilder,
};
use sea_query::prepare::SqlWriter;
use sea_query::{BinOper, Oper, Quote, SimpleExpr, SubQueryStatement, Value, Values};

/// A rendered statement: SQL with positional `?` placeholders and the
/// storage-native values bound to them, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Statement text.
    pub sql: String,

    /// Bound parameters.
    pub params: Vec<DataType>,
}

/// `SeaQuery` backend rendering `?` placeholders and pushing every value as
/// a bound parameter.
pub struct QueryBuilder {
    pub quote: Quote,
    pub placeholder: &'static str, // "?" or "$"
    pub numbered: bool,            // false for "?", true for "$1, $2, ..."
}

impl Default for QueryBuilder {
    // the storage engine binds positional "?" markers
    fn default() -> Self {
        Self {
            quote: Quote::new(b'"'),
            placeholder: "?",
            numbered: false,
        }
    }
}

impl QuotedBuilder for QueryBuilder {
    fn quote(&self) -> Quote {
        self.quote
    }
}

impl EscapeBuilder for QueryBuilder {}

impl TableRefBuilder for QueryBuilder {}

impl OperLeftAssocDecider for QueryBuilder {
    fn well_known_left_associative(&self, op: &BinOper) -> bool {
        // Copied from sea-query 0.32.7 backend/query_builder.rs `common_well_known_left_associative`
        matches!(
            op,
            BinOper::And | BinOper::Or | BinOper::Add | BinOper::Sub | BinOper::Mul | BinOper::Mod
        )
    }
}

impl PrecedenceDecider for QueryBuilder {
    fn inner_expr_well_known_greater_precedence(
        &self, _inner: &SimpleExpr, _outer_oper: &Oper,
    ) -> bool {
        // Conservative approach that forces parentheses
        false
    }
}

impl sea_query::backend::QueryBuilder for QueryBuilder {
    fn prepare_query_statement(&self, query: &SubQueryStatement, sql: &mut dyn SqlWriter) {
        match query {
            SubQueryStatement::SelectStatement(s) => self.prepare_select_statement(s, sql),
            SubQueryStatement::InsertStatement(s) => self.prepare_insert_statement(s, sql),
            SubQueryStatement::UpdateStatement(s) => self.prepare_update_statement(s, sql),
            SubQueryStatement::DeleteStatement(s) => self.prepare_delete_statement(s, sql),
            SubQueryStatement::WithStatement(s) => self.prepare_with_query(s, sql),
        }
    }

    fn prepare_value(&self, value: &Value, sql: &mut dyn SqlWriter) {
        sql.push_param(value.clone(), self);
    }

    fn placeholder(&self) -> (&str, bool) {
        (self.placeholder, self.numbered)
    }
}

// Outbound conversion (internal use only)
pub fn to_sea_value(value: DataType) -> Value {
    match value {
        DataType::Null => Value::BigInt(None),
        DataType::Integer(v) => Value::BigInt(Some(v)),
        DataType::Real(v) => Value::Double(Some(v)),
        DataType::Text(v) => Value::String(Some(Box::new(v))),
        DataType::Blob(v) => Value::Bytes(Some(Box::new(v))),
    }
}

pub fn values_to_datatypes(values: Values) -> Result<Vec<DataType>> {
    values.into_iter().map(value_to_datatype).collect()
}

fn value_to_datatype(value: Value) -> Result<DataType> {
    let data_type = match value {
        Value::BigInt(Some(v)) => DataType::Integer(v),
        Value::Double(Some(v)) => DataType::Real(v),
        Value::String(Some(v)) => DataType::Text(*v),
        Value::Bytes(Some(v)) => DataType::Blob(*v),
        Value::BigInt(None) | Value::Double(None) | Value::String(None) | Value::Bytes(None) => {
            DataType::Null
        }
        _ => {
            bail!("unsupported values require explicit conversion before building the query")
        }
    };
    Ok(data_type)
}
