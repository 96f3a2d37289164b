//! Cursor and offset pagination over one [`Select`].
//!
//! A [`Paginator`] is built per list call. It validates the pagination rules
//! against the record schema, applies ordering and either a keyset range
//! predicate or `LIMIT/OFFSET` to the query, and turns the fetched rows into a
//! [`ListResult`].
//!
//! Cursor mode fetches one row beyond the limit to learn whether more rows
//! follow. Walking backward flips every key's direction in SQL and reverses
//! the rows in memory afterwards, so callers always see the requested order.

use tracing::debug;

use pagestore_core::cursor;
use pagestore_core::error::AppError;
use pagestore_core::result::AppResult;
use pagestore_core::schema::{Field, Schema};
use pagestore_core::traits::Record;
use pagestore_core::types::{
    Cursor, ListResult, PageInfo, PageMode, PaginationRule, SortDirection, SqlValue, ValueType,
};

use crate::sql::{CompareOp, Operand, Predicate, Select, Statement};

/// One pagination rule resolved against the schema.
#[derive(Debug)]
struct Key<'a> {
    rule: &'a PaginationRule,
    field: &'static Field,
    expr: String,
    direction: SortDirection,
    value_type: ValueType,
}

impl Key<'_> {
    fn operand(&self) -> Operand {
        match &self.rule.null_replacement {
            Some(replacement) => Operand::Coalesce(self.expr.clone(), replacement.clone()),
            None => Operand::Column(self.expr.clone()),
        }
    }

    /// Value of this key on `record`, for cursor encoding.
    fn value_of<T: Record>(&self, record: &T) -> AppResult<SqlValue> {
        let value = record.value(self.field.name).ok_or_else(|| {
            AppError::invalid_model(format!("record has no value for '{}'", self.field.name))
        })?;
        let Some(custom) = &self.rule.custom_type else {
            return Ok(value);
        };
        let nested = match &value {
            SqlValue::Json(Some(json)) => json.get(&custom.meta),
            _ => None,
        };
        Ok(nested
            .and_then(|json| SqlValue::from_json(custom.value_type, json))
            .unwrap_or_else(|| SqlValue::null(custom.value_type)))
    }
}

/// Pagination state of one list request.
#[derive(Debug)]
pub struct Paginator<'a> {
    keys: Vec<Key<'a>>,
    mode: PageMode,
    limit: u64,
}

impl<'a> Paginator<'a> {
    /// Validate `rules` against `schema` and the request parameters.
    ///
    /// `order` is the direction for rules that do not fix their own. Nothing
    /// here touches the database, so misconfiguration fails before any query.
    pub fn new(
        schema: &'static Schema,
        rules: &'a [PaginationRule],
        mode: PageMode,
        limit: u64,
        order: Option<SortDirection>,
    ) -> AppResult<Self> {
        if rules.is_empty() {
            return Err(AppError::no_rule());
        }
        if limit == 0 {
            return Err(AppError::invalid_limit("limit must be greater than zero"));
        }
        if let PageMode::Offset { page: 0 } = mode {
            return Err(AppError::invalid_limit("page must be at least 1"));
        }

        let default_order = order.unwrap_or_default();
        let keys = rules
            .iter()
            .map(|rule| {
                let field = schema.field(&rule.key).ok_or_else(|| {
                    AppError::invalid_model(format!(
                        "pagination key '{}' is not a field of '{}'",
                        rule.key, schema.table
                    ))
                })?;
                Ok(Key {
                    rule,
                    field,
                    expr: rule
                        .sql_repr
                        .clone()
                        .unwrap_or_else(|| field.column.to_string()),
                    direction: rule.order.unwrap_or(default_order),
                    value_type: rule
                        .custom_type
                        .as_ref()
                        .map(|c| c.value_type)
                        .unwrap_or(field.value_type),
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self { keys, mode, limit })
    }

    /// Whether this request walks backward from a `before` cursor.
    pub fn is_backward(&self) -> bool {
        matches!(&self.mode, PageMode::Cursor(cursor) if cursor.is_backward())
    }

    /// Add ordering, paging and, for a cursor request, the range predicate.
    ///
    /// Fails with `InvalidCursor` when the request's token does not decode.
    pub fn apply(&self, select: &mut Select) -> AppResult<()> {
        let backward = self.is_backward();
        for key in &self.keys {
            let direction = if backward {
                key.direction.flip()
            } else {
                key.direction
            };
            select.order_by(key.operand(), direction);
        }

        match &self.mode {
            PageMode::Cursor(cursor) => {
                select.limit(self.limit.saturating_add(1));
                if let Some(token) = cursor.token() {
                    let values = self.decode(token)?;
                    select.filter(self.range(&values, backward));
                }
            }
            PageMode::Offset { page } => {
                select
                    .limit(self.limit)
                    .offset((page - 1).saturating_mul(self.limit));
            }
        }
        Ok(())
    }

    /// The `COUNT(*)` statement an offset request needs, rendered from the
    /// filtered query. Cursor requests never count.
    pub fn count_query(&self, select: &Select) -> Option<Statement> {
        match self.mode {
            PageMode::Offset { .. } => Some(select.count_statement()),
            PageMode::Cursor(_) => None,
        }
    }

    /// Build the page from the fetched rows. `total` is the count for an
    /// offset request.
    pub fn finish<T: Record>(&self, mut rows: Vec<T>, total: Option<u64>) -> AppResult<ListResult<T>> {
        let cursor = match &self.mode {
            PageMode::Offset { page } => {
                let total = total.ok_or_else(|| {
                    AppError::internal("offset pagination finished without a total")
                })?;
                return Ok(ListResult {
                    items: rows,
                    pagination: PageInfo::offset(*page, self.limit, total),
                });
            }
            PageMode::Cursor(cursor) => cursor,
        };

        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
        let has_more = rows.len() > limit;
        rows.truncate(limit);
        let backward = cursor.is_backward();
        if backward {
            rows.reverse();
        }

        let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
            return Ok(ListResult {
                items: rows,
                pagination: PageInfo::empty_cursor(),
            });
        };

        let next_cursor = if backward || has_more {
            Some(self.encode(last)?)
        } else {
            None
        };
        let prev_cursor = if matches!(cursor, Cursor::After(_)) || (backward && has_more) {
            Some(self.encode(first)?)
        } else {
            None
        };

        debug!(
            rows = rows.len(),
            has_more,
            backward,
            "Finished cursor page"
        );
        Ok(ListResult {
            items: rows,
            pagination: PageInfo::Cursor {
                next_cursor,
                prev_cursor,
            },
        })
    }

    /// Encode the cursor token of `record`.
    pub fn encode<T: Record>(&self, record: &T) -> AppResult<String> {
        let values = self
            .keys
            .iter()
            .map(|key| key.value_of(record))
            .collect::<AppResult<Vec<_>>>()?;
        Ok(cursor::encode_values(&values))
    }

    fn decode(&self, token: &str) -> AppResult<Vec<SqlValue>> {
        let types: Vec<ValueType> = self.keys.iter().map(|k| k.value_type).collect();
        let mut values = cursor::decode(token, &types)?;
        // a null slot was either NULL or a zero value when encoded
        for (value, key) in values.iter_mut().zip(&self.keys) {
            if !value.is_null() {
                continue;
            }
            let substitute = match &key.rule.null_replacement {
                Some(replacement) => Some(replacement.clone()),
                None => SqlValue::zero(key.value_type),
            };
            if let Some(substitute) = substitute {
                *value = substitute;
            }
        }
        Ok(values)
    }

    /// `(k1 > v1) OR (k1 = v1 AND k2 > v2) OR ...`, with each comparison
    /// following the key's effective SQL direction.
    fn range(&self, values: &[SqlValue], backward: bool) -> Predicate {
        let branches = (0..self.keys.len())
            .map(|i| {
                let mut terms: Vec<Predicate> = self.keys[..i]
                    .iter()
                    .zip(values)
                    .map(|(key, value)| Predicate::compare(key.operand(), CompareOp::Eq, value.clone()))
                    .collect();
                let key = &self.keys[i];
                let ascending = (key.direction == SortDirection::Asc) != backward;
                let op = if ascending { CompareOp::Gt } else { CompareOp::Lt };
                terms.push(Predicate::compare(key.operand(), op, values[i].clone()));
                if terms.len() == 1 {
                    terms.remove(0)
                } else {
                    Predicate::and(terms)
                }
            })
            .collect();
        Predicate::or(branches)
    }
}
