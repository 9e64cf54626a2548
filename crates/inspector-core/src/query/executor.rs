//! Clause evaluation
//!
//! Patterns are joined left to right over a set of partial bindings. A
//! predicate waits until every variable it mentions has been bound, then
//! filters the bindings in place. Identical store scans are fetched once
//! per query.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::deadline::Deadline;
use crate::edn::{Keyword, Value};
use crate::id::DocumentId;
use crate::storage::{DocumentStore, Triple, TriplePattern};

use super::parser::{Clause, Direction, Op, Query, Term, Var};
use super::{Cell, QueryError, Row};

type Binding = HashMap<Var, Value>;

/// Scan cache key: canonical text of each constrained position
type ScanKey = (Option<String>, String, Option<String>);

struct Scanner<'s, S: ?Sized> {
    store: &'s S,
    cache: HashMap<ScanKey, Vec<Triple>>,
}

impl<'s, S: DocumentStore + ?Sized> Scanner<'s, S> {
    fn scan(&mut self, pattern: TriplePattern) -> Result<&[Triple], QueryError> {
        let key = (
            pattern.entity.as_ref().map(|id| id.as_str().to_string()),
            pattern.attribute.name().to_string(),
            pattern.value.as_ref().map(Value::to_string),
        );
        if !self.cache.contains_key(&key) {
            let triples = self.store.triples(&pattern)?;
            self.cache.insert(key.clone(), triples);
        }
        Ok(self.cache.get(&key).map(Vec::as_slice).unwrap_or_default())
    }
}

/// Evaluate a parsed query
pub fn run<S>(
    store: &S,
    query: &Query,
    params: &[Value],
    deadline: Deadline,
) -> Result<Vec<Row>, QueryError>
where
    S: DocumentStore + ?Sized,
{
    if params.len() != query.inputs.len() {
        return Err(QueryError::Execution(format!(
            "query expects {} parameter(s), got {}",
            query.inputs.len(),
            params.len()
        )));
    }
    check_attributes(store, query)?;

    let mut bound: HashSet<Var> = query.inputs.iter().cloned().collect();
    let mut bindings: Vec<Binding> = vec![query
        .inputs
        .iter()
        .cloned()
        .zip(params.iter().cloned())
        .collect()];

    let mut pending: Vec<&Clause> = Vec::new();
    let mut scanner = Scanner {
        store,
        cache: HashMap::new(),
    };

    for clause in &query.clauses {
        match clause {
            Clause::Pattern {
                entity,
                attribute,
                value,
            } => {
                bindings = join(&mut scanner, entity, attribute, value, bindings, deadline)?;
                bound.extend(clause.vars().into_iter().cloned());
            }
            Clause::Predicate { .. } => pending.push(clause),
        }
        bindings = apply_ready(&mut pending, &bound, bindings, deadline)?;
    }

    if let Some(Clause::Predicate { op, left, right }) = pending.first() {
        let unbound = [left, right]
            .into_iter()
            .filter_map(Term::var)
            .find(|v| !bound.contains(*v))
            .map(|v| v.to_string())
            .unwrap_or_default();
        return Err(QueryError::Execution(format!(
            "predicate {} uses unbound variable {}",
            op.symbol(),
            unbound
        )));
    }

    let mut rows = project(query, bindings, deadline)?;
    sort_rows(query, &mut rows);
    if let Some(limit) = query.limit {
        rows.truncate(limit);
    }
    Ok(rows)
}

fn check_attributes<S>(store: &S, query: &Query) -> Result<(), QueryError>
where
    S: DocumentStore + ?Sized,
{
    for clause in &query.clauses {
        if let Clause::Pattern { attribute, .. } = clause {
            if !store.has_attribute(attribute)? {
                return Err(QueryError::Execution(format!(
                    "unknown attribute {}",
                    attribute
                )));
            }
        }
    }
    Ok(())
}

/// Extend every binding with the facts matching one pattern
fn join<S>(
    scanner: &mut Scanner<'_, S>,
    entity: &Term,
    attribute: &Keyword,
    value: &Term,
    bindings: Vec<Binding>,
    deadline: Deadline,
) -> Result<Vec<Binding>, QueryError>
where
    S: DocumentStore + ?Sized,
{
    let mut joined = Vec::new();
    for binding in bindings {
        if deadline.expired() {
            return Err(QueryError::Timeout);
        }

        let entity_id = match resolve(entity, &binding) {
            // a bound value that cannot name a document matches nothing
            Some(v) => match DocumentId::from_value(v.clone()) {
                Ok(id) => Some(id),
                Err(_) => continue,
            },
            None => None,
        };
        // numbers compare by value, not text, so they are matched in `unify`
        let value_filter = resolve(value, &binding)
            .filter(|v| !matches!(v, Value::Int(_) | Value::Float(_)))
            .cloned();
        let pattern = TriplePattern {
            entity: entity_id,
            attribute: attribute.clone(),
            value: value_filter,
        };

        for triple in scanner.scan(pattern)? {
            let mut next = binding.clone();
            if unify(&mut next, entity, triple.entity.to_value())
                && unify(&mut next, value, triple.value.clone())
            {
                joined.push(next);
            }
        }
    }
    Ok(joined)
}

/// The value a term stands for under `binding`, if determined
fn resolve<'a>(term: &'a Term, binding: &'a Binding) -> Option<&'a Value> {
    match term {
        Term::Var(var) => binding.get(var),
        Term::Const(value) => Some(value),
        Term::Blank => None,
    }
}

fn unify(binding: &mut Binding, term: &Term, value: Value) -> bool {
    match term {
        Term::Blank => true,
        Term::Const(expected) => same_value(expected, &value),
        Term::Var(var) => match binding.get(var) {
            Some(existing) => same_value(existing, &value),
            None => {
                binding.insert(var.clone(), value);
                true
            }
        },
    }
}

fn same_value(a: &Value, b: &Value) -> bool {
    match a.compare(b) {
        Some(ord) => ord == Ordering::Equal,
        None => a.to_string() == b.to_string(),
    }
}

/// Run every pending predicate whose variables are all bound
fn apply_ready(
    pending: &mut Vec<&Clause>,
    bound: &HashSet<Var>,
    mut bindings: Vec<Binding>,
    deadline: Deadline,
) -> Result<Vec<Binding>, QueryError> {
    let (ready, waiting): (Vec<&Clause>, Vec<&Clause>) = pending
        .drain(..)
        .partition(|clause| clause.vars().iter().all(|v| bound.contains(*v)));
    *pending = waiting;

    for clause in ready {
        let Clause::Predicate { op, left, right } = clause else {
            continue;
        };
        let mut kept = Vec::with_capacity(bindings.len());
        for binding in bindings {
            if deadline.expired() {
                return Err(QueryError::Timeout);
            }
            let (Some(l), Some(r)) = (resolve(left, &binding), resolve(right, &binding)) else {
                continue;
            };
            if evaluate(*op, l, r)? {
                kept.push(binding);
            }
        }
        bindings = kept;
    }
    Ok(bindings)
}

fn evaluate(op: Op, left: &Value, right: &Value) -> Result<bool, QueryError> {
    match op {
        Op::Eq => Ok(same_value(left, right)),
        Op::NotEq => Ok(!same_value(left, right)),
        _ => {
            let ord = left.compare(right).ok_or_else(|| {
                QueryError::Execution(format!(
                    "cannot compare {} {} with {} {}",
                    left.type_name(),
                    left,
                    right.type_name(),
                    right
                ))
            })?;
            Ok(match op {
                Op::Lt => ord == Ordering::Less,
                Op::Le => ord != Ordering::Greater,
                Op::Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            })
        }
    }
}

/// Bindings → distinct rows in `:find` order
fn project(
    query: &Query,
    bindings: Vec<Binding>,
    deadline: Deadline,
) -> Result<Vec<Row>, QueryError> {
    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    for mut binding in bindings {
        if deadline.expired() {
            return Err(QueryError::Timeout);
        }
        let values = query
            .find
            .iter()
            .map(|var| {
                binding.remove(var).ok_or_else(|| {
                    QueryError::Execution(format!("variable {} was never bound", var))
                })
            })
            .collect::<Result<Vec<Value>, _>>()?;

        let key: Vec<String> = values.iter().map(Value::to_string).collect();
        if seen.insert(key) {
            rows.push(values.into_iter().map(Cell::new).collect());
        }
    }
    Ok(rows)
}

fn sort_rows(query: &Query, rows: &mut [Row]) {
    let keys: Vec<(usize, Direction)> = query
        .order_by
        .iter()
        .filter_map(|(var, dir)| query.find.iter().position(|v| v == var).map(|i| (i, *dir)))
        .collect();
    if keys.is_empty() {
        return;
    }

    rows.sort_by(|a, b| {
        keys.iter().fold(Ordering::Equal, |acc, (i, dir)| {
            acc.then_with(|| {
                let ord = a[*i].value.total_cmp(&b[*i].value);
                match dir {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            })
        })
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{execute, QueryResult};
    use crate::storage::SqliteStore;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn put(store: &SqliteStore, id: &str, pairs: &[(&str, Value)]) {
        let attrs: BTreeMap<Keyword, Value> = pairs
            .iter()
            .map(|(k, v)| (Keyword::new(*k), v.clone()))
            .collect();
        store
            .put_document(&DocumentId::from_edn_text(id).unwrap(), attrs)
            .unwrap();
    }

    fn people() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        put(
            &store,
            "{:person-id 1}",
            &[
                ("name", Value::string("Nathanial")),
                ("age", Value::Int(41)),
                ("friend", Value::string("ada")),
            ],
        );
        put(
            &store,
            "{:person-id 2}",
            &[("name", Value::string("Grace")), ("age", Value::Int(35))],
        );
        put(
            &store,
            "\"ada\"",
            &[("name", Value::string("Ada")), ("age", Value::Float(36.5))],
        );
        store
    }

    fn query(store: &SqliteStore, text: &str) -> QueryResult {
        execute(store, text, &[], Deadline::none()).unwrap()
    }

    fn column(result: &QueryResult, i: usize) -> Vec<String> {
        result.rows.iter().map(|r| r[i].render()).collect()
    }

    #[test]
    fn test_join_through_value_position() {
        let store = people();
        let result = query(
            &store,
            "{:find [n fname] :where [[p :friend f] [p :name n] [f :name fname]]}",
        );
        assert_eq!(column(&result, 0), vec!["\"Nathanial\""]);
        assert_eq!(column(&result, 1), vec!["\"Ada\""]);
    }

    #[test]
    fn test_predicates_wait_for_bindings() {
        let store = people();
        // predicate written before the pattern that binds its variable
        let result = query(
            &store,
            "{:find [n] :where [[(> age 36)] [p :age age] [p :name n]] :order-by [[n :asc]]}",
        );
        assert_eq!(column(&result, 0), vec!["\"Ada\"", "\"Nathanial\""]);
    }

    #[test]
    fn test_input_parameters() {
        let store = people();
        let result = execute(
            &store,
            "{:find [p] :in [n] :where [[p :name n]]}",
            &[Value::string("Grace")],
            Deadline::none(),
        )
        .unwrap();
        assert_eq!(column(&result, 0), vec!["{:person-id 2}"]);
        assert_eq!(
            result.rows[0][0].href().as_deref(),
            Some("/doc/_%7B%3Aperson-id%202%7D")
        );
    }

    #[test]
    fn test_numeric_constants_match_by_value() {
        let store = people();
        let by_pattern = query(&store, "{:find [n] :where [[p :age 41.0] [p :name n]]}");
        let by_predicate = query(
            &store,
            "{:find [n] :where [[p :age a] [(= a 41.0)] [p :name n]]}",
        );
        assert_eq!(column(&by_pattern, 0), vec!["\"Nathanial\""]);
        assert_eq!(column(&by_pattern, 0), column(&by_predicate, 0));

        let result = execute(
            &store,
            "{:find [n] :in [age] :where [[p :age age] [p :name n]]}",
            &[Value::Int(35)],
            Deadline::none(),
        )
        .unwrap();
        assert_eq!(column(&result, 0), vec!["\"Grace\""]);
    }

    #[test]
    fn test_param_count_mismatch() {
        let store = people();
        let err = execute(
            &store,
            "{:find [p] :in [n] :where [[p :name n]]}",
            &[],
            Deadline::none(),
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::Execution(msg) if msg.contains("expects 1")));
    }

    #[test]
    fn test_unknown_attribute() {
        let store = people();
        let err = execute(&store, "{:find [p] :where [[p :salary s]]}", &[], Deadline::none())
            .unwrap_err();
        assert!(matches!(err, QueryError::Execution(msg) if msg.contains(":salary")));
    }

    #[test]
    fn test_predicate_over_unbound_variable() {
        let store = people();
        let err = execute(
            &store,
            "{:find [p] :where [[p :age a] [(< a b)]]}",
            &[],
            Deadline::none(),
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::Execution(msg) if msg.contains("unbound variable b")));
    }

    #[test]
    fn test_incomparable_operands() {
        let store = people();
        let err = execute(
            &store,
            "{:find [p] :where [[p :name n] [(< n 3)]]}",
            &[],
            Deadline::none(),
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::Execution(msg) if msg.contains("cannot compare")));
    }

    #[test]
    fn test_duplicate_rows_removed() {
        let store = people();
        let result = query(&store, "{:find [a] :where [[p :name n] [p :age a] [(not= a 0)] [_ :name]]}");
        assert_eq!(result.rows.len(), 3);
    }

    #[test]
    fn test_order_by_and_limit() {
        let store = people();
        let result = query(
            &store,
            "{:find [n a] :where [[p :name n] [p :age a]] :order-by [[a :desc]] :limit 2}",
        );
        assert_eq!(column(&result, 0), vec!["\"Nathanial\"", "\"Ada\""]);
        assert_eq!(column(&result, 1), vec!["41", "36.5"]);
    }

    #[test]
    fn test_constant_entity_and_equality() {
        let store = people();
        let result = query(&store, "{:find [a] :where [[\"ada\" :age a] [(= a 36.5)]]}");
        assert_eq!(column(&result, 0), vec!["36.5"]);

        // numeric equality crosses int and float
        let result = query(&store, "{:find [p] :where [[p :age a] [(= a 41.0)]]}");
        assert_eq!(column(&result, 0), vec!["{:person-id 1}"]);
    }

    #[test]
    fn test_empty_result() {
        let store = people();
        let result = query(&store, "{:find [p] :where [[p :name \"Nobody\"]]}");
        assert!(result.rows.is_empty());
        assert_eq!(result.columns, vec!["p"]);
    }

    #[test]
    fn test_expired_deadline_times_out() {
        let store = people();
        let err = execute(
            &store,
            "{:find [p] :where [[p :name n]]}",
            &[],
            Deadline::after(Duration::ZERO),
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::Timeout));
    }

    #[test]
    fn test_same_membership_across_runs() {
        let store = people();
        let text = "{:find [p n] :where [[p :name n]]}";
        let first = query(&store, text);
        let second = query(&store, text);
        assert_eq!(first, second);
    }
}
