//! Query text → [`Query`]
//!
//! A query is an EDN map:
//!
//! ```text
//! {:find [e name]
//!  :in [min-age]
//!  :where [[e :name name]
//!          [e :age age]
//!          [(>= age min-age)]]
//!  :order-by [[name :asc]]
//!  :limit 10}
//! ```
//!
//! Every symbol other than `_` is a logic variable. Shape problems are
//! reported here so a malformed query never reaches the store.

use std::collections::HashSet;
use std::fmt;

use crate::edn::{self, Keyword, Value};
use crate::id::DocumentId;

use super::QueryError;

/// A logic variable, named by its symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(String);

impl Var {
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One position of a clause
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Var(Var),
    /// `_`, matches anything and binds nothing
    Blank,
    Const(Value),
}

impl Term {
    fn from_value(value: Value) -> Self {
        match value {
            Value::Symbol(s) if s == "_" => Term::Blank,
            Value::Symbol(s) => Term::Var(Var(s)),
            other => Term::Const(other),
        }
    }

    pub fn var(&self) -> Option<&Var> {
        match self {
            Term::Var(v) => Some(v),
            _ => None,
        }
    }
}

/// Comparison operator of a predicate clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Op {
    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "=" => Some(Op::Eq),
            "not=" => Some(Op::NotEq),
            "<" => Some(Op::Lt),
            "<=" => Some(Op::Le),
            ">" => Some(Op::Gt),
            ">=" => Some(Op::Ge),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::NotEq => "not=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// `[e a v]` or `[e a]`
    Pattern {
        entity: Term,
        attribute: Keyword,
        value: Term,
    },
    /// `[(op x y)]`
    Predicate { op: Op, left: Term, right: Term },
}

impl Clause {
    /// Variables this clause can bind
    fn binds(&self) -> impl Iterator<Item = &Var> {
        let terms: Vec<&Term> = match self {
            Clause::Pattern { entity, value, .. } => vec![entity, value],
            Clause::Predicate { .. } => Vec::new(),
        };
        terms.into_iter().filter_map(Term::var)
    }

    /// Every variable mentioned by this clause
    pub fn vars(&self) -> Vec<&Var> {
        let terms = match self {
            Clause::Pattern { entity, value, .. } => [entity, value],
            Clause::Predicate { left, right, .. } => [left, right],
        };
        terms.into_iter().filter_map(Term::var).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// A parsed find/where query
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub find: Vec<Var>,
    pub inputs: Vec<Var>,
    pub clauses: Vec<Clause>,
    pub order_by: Vec<(Var, Direction)>,
    pub limit: Option<usize>,
}

/// Parse and validate query text
pub fn parse_query(text: &str) -> Result<Query, QueryError> {
    let entries = match edn::parse(text)? {
        Value::Map(entries) => entries,
        other => {
            return Err(parse_error(format!(
                "query must be a map, got a {}",
                other.type_name()
            )))
        }
    };

    let mut find = None;
    let mut inputs = Vec::new();
    let mut clauses = None;
    let mut order_by = Vec::new();
    let mut limit = None;

    for (key, value) in entries {
        let Some(key) = key.as_keyword().map(Keyword::name) else {
            return Err(parse_error(format!("query keys must be keywords, got {}", key)));
        };
        match key {
            "find" => find = Some(parse_find(value)?),
            "in" => inputs = parse_inputs(value)?,
            "where" => clauses = Some(parse_where(value)?),
            "order-by" => order_by = parse_order_by(value)?,
            "limit" => limit = Some(parse_limit(value)?),
            other => return Err(parse_error(format!("unknown query key :{}", other))),
        }
    }

    let find = find.ok_or_else(|| parse_error(":find is required"))?;
    let clauses = clauses.ok_or_else(|| parse_error(":where is required"))?;
    let query = Query {
        find,
        inputs,
        clauses,
        order_by,
        limit,
    };
    check_bindings(&query)?;
    Ok(query)
}

fn parse_error(message: impl Into<String>) -> QueryError {
    QueryError::Parse(message.into())
}

fn parse_find(value: Value) -> Result<Vec<Var>, QueryError> {
    let Value::Vector(items) = value else {
        return Err(parse_error(":find must be a vector of variables"));
    };
    if items.is_empty() {
        return Err(parse_error(":find must name at least one variable"));
    }
    items
        .into_iter()
        .map(|item| match Term::from_value(item.clone()) {
            Term::Var(var) => Ok(var),
            _ => Err(parse_error(format!("find element {} is not a variable", item))),
        })
        .collect()
}

fn parse_inputs(value: Value) -> Result<Vec<Var>, QueryError> {
    let Value::Vector(items) = value else {
        return Err(parse_error(":in must be a vector of variables"));
    };
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|item| match Term::from_value(item.clone()) {
            Term::Var(var) if seen.insert(var.clone()) => Ok(var),
            Term::Var(var) => Err(parse_error(format!("input {} is declared twice", var))),
            _ => Err(parse_error(format!("input {} is not a variable", item))),
        })
        .collect()
}

fn parse_where(value: Value) -> Result<Vec<Clause>, QueryError> {
    let Value::Vector(items) = value else {
        return Err(parse_error(":where must be a vector of clauses"));
    };
    if items.is_empty() {
        return Err(parse_error(":where must contain at least one clause"));
    }
    items.into_iter().map(parse_clause).collect()
}

fn parse_clause(value: Value) -> Result<Clause, QueryError> {
    let mut items = match value {
        Value::Vector(items) => items,
        other => return Err(parse_error(format!("clause {} is not a vector", other))),
    };

    if let [Value::List(call)] = items.as_slice() {
        return parse_predicate(call);
    }

    let clause_text = Value::Vector(items.clone()).to_string();
    if !(2..=3).contains(&items.len()) {
        return Err(parse_error(format!(
            "pattern {} must have 2 or 3 elements",
            clause_text
        )));
    }

    let value = if items.len() == 3 {
        items.pop().map(Term::from_value).unwrap_or(Term::Blank)
    } else {
        Term::Blank
    };
    let attribute = match items.pop() {
        Some(Value::Keyword(kw)) => kw,
        _ => {
            return Err(parse_error(format!(
                "attribute in {} must be a keyword",
                clause_text
            )))
        }
    };
    let entity = items.pop().map(Term::from_value).unwrap_or(Term::Blank);
    if let Term::Const(value) = &entity {
        DocumentId::from_value(value.clone()).map_err(|e| {
            parse_error(format!("entity in {} is not an identifier: {}", clause_text, e))
        })?;
    }

    Ok(Clause::Pattern {
        entity,
        attribute,
        value,
    })
}

fn parse_predicate(call: &[Value]) -> Result<Clause, QueryError> {
    let call_text = Value::List(call.to_vec()).to_string();
    let [op, left, right] = call else {
        return Err(parse_error(format!(
            "predicate {} must have exactly two arguments",
            call_text
        )));
    };
    let op = op
        .as_symbol()
        .and_then(Op::from_symbol)
        .ok_or_else(|| parse_error(format!("unknown predicate in {}", call_text)))?;

    let left = Term::from_value(left.clone());
    let right = Term::from_value(right.clone());
    if left == Term::Blank || right == Term::Blank {
        return Err(parse_error(format!("predicate {} cannot use _", call_text)));
    }
    Ok(Clause::Predicate { op, left, right })
}

fn parse_order_by(value: Value) -> Result<Vec<(Var, Direction)>, QueryError> {
    let Value::Vector(items) = value else {
        return Err(parse_error(":order-by must be a vector of [var :asc|:desc]"));
    };
    items
        .into_iter()
        .map(|item| {
            let text = item.to_string();
            let Value::Vector(pair) = item else {
                return Err(parse_error(format!("order-by entry {} must be a vector", text)));
            };
            let (var, direction) = match pair.as_slice() {
                [var] => (var, Direction::Asc),
                [var, Value::Keyword(dir)] => match dir.name() {
                    "asc" => (var, Direction::Asc),
                    "desc" => (var, Direction::Desc),
                    _ => {
                        return Err(parse_error(format!(
                            "order-by direction in {} must be :asc or :desc",
                            text
                        )))
                    }
                },
                _ => return Err(parse_error(format!("malformed order-by entry {}", text))),
            };
            match Term::from_value(var.clone()) {
                Term::Var(var) => Ok((var, direction)),
                _ => Err(parse_error(format!("order-by entry {} must name a variable", text))),
            }
        })
        .collect()
}

fn parse_limit(value: Value) -> Result<usize, QueryError> {
    match value {
        Value::Int(n) if n >= 0 => usize::try_from(n)
            .map_err(|_| parse_error(format!(":limit {} is too large", n))),
        other => Err(parse_error(format!(
            ":limit must be a non-negative integer, got {}",
            other
        ))),
    }
}

/// Static checks that every variable can be bound
fn check_bindings(query: &Query) -> Result<(), QueryError> {
    let bound: HashSet<&Var> = query
        .clauses
        .iter()
        .flat_map(Clause::binds)
        .chain(query.inputs.iter())
        .collect();
    let mentioned: HashSet<&Var> = query.clauses.iter().flat_map(Clause::vars).collect();

    if let Some(var) = query.find.iter().find(|v| !bound.contains(v)) {
        return Err(parse_error(format!(
            "find variable {} is not bound by any clause",
            var
        )));
    }
    if let Some(var) = query.inputs.iter().find(|v| !mentioned.contains(v)) {
        return Err(parse_error(format!(
            "input {} is not used by any clause",
            var
        )));
    }
    if let Some((var, _)) = query.order_by.iter().find(|(v, _)| !query.find.contains(v)) {
        return Err(parse_error(format!(
            "order-by variable {} is not in :find",
            var
        )));
    }
    Ok(())
}
