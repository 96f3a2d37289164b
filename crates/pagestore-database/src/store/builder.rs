//! Store configuration.

use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::Arc;

use pagestore_core::config::ListingConfig;
use pagestore_core::error::AppError;
use pagestore_core::result::AppResult;
use pagestore_core::types::{FilterRule, PaginationRule, ValueType};

use crate::executor::Executor;
use crate::filter::FilterCompiler;
use crate::sql::Predicate;

use super::relation::Relation;
use super::{Store, StoreInner, StoredRecord};

/// Collects the rules of a [`Store`] and validates them once in
/// [`StoreBuilder::build`].
pub struct StoreBuilder<T: StoredRecord> {
    filter_rules: Vec<FilterRule>,
    pagination_rules: Vec<PaginationRule>,
    default_filters: Vec<Predicate>,
    relations: HashMap<String, Arc<dyn Relation<T>>>,
    listing: ListingConfig,
    _record: PhantomData<fn() -> T>,
}

impl<T: StoredRecord> Default for StoreBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: StoredRecord> StoreBuilder<T> {
    /// A builder with no rules and default listing limits.
    pub fn new() -> Self {
        Self {
            filter_rules: Vec::new(),
            pagination_rules: Vec::new(),
            default_filters: Vec::new(),
            relations: HashMap::new(),
            listing: ListingConfig::default(),
            _record: PhantomData,
        }
    }

    /// Allow filtering on one field.
    pub fn filter_rule(mut self, rule: FilterRule) -> Self {
        self.filter_rules.push(rule);
        self
    }

    /// Allow filtering on several fields.
    pub fn filter_rules(mut self, rules: impl IntoIterator<Item = FilterRule>) -> Self {
        self.filter_rules.extend(rules);
        self
    }

    /// Append a pagination key. Keys sort in the order they are added.
    pub fn pagination_rule(mut self, rule: PaginationRule) -> Self {
        self.pagination_rules.push(rule);
        self
    }

    /// A predicate ANDed into every read, update and delete.
    pub fn default_filter(mut self, predicate: Predicate) -> Self {
        self.default_filters.push(predicate);
        self
    }

    /// Register a relation that list calls can request by `name`.
    pub fn relation(mut self, name: impl Into<String>, relation: impl Relation<T> + 'static) -> Self {
        self.relations.insert(name.into(), Arc::new(relation));
        self
    }

    /// Listing limits and filter strictness.
    pub fn listing(mut self, listing: ListingConfig) -> Self {
        self.listing = listing;
        self
    }

    /// Validate the configuration against `T::schema()` and bind the store
    /// to `executor`.
    pub fn build(self, executor: Arc<dyn Executor>) -> AppResult<Store<T>> {
        let schema = T::schema();
        schema.validate()?;

        let mut seen = HashSet::new();
        for rule in &self.filter_rules {
            let Some(field) = schema.field_by_column(&rule.column) else {
                return Err(AppError::invalid_rule(format!(
                    "filter '{}' refers to unknown column '{}' of '{}'",
                    rule.field, rule.column, schema.table
                )));
            };
            if !compatible(rule.value_type, field.value_type) {
                return Err(AppError::invalid_rule(format!(
                    "filter '{}' is typed {:?} but column '{}' is {:?}",
                    rule.field, rule.value_type, rule.column, field.value_type
                )));
            }
            if rule.ops.is_empty() {
                return Err(AppError::invalid_rule(format!(
                    "filter '{}' permits no operations",
                    rule.field
                )));
            }
            if !seen.insert(rule.field.as_str()) {
                return Err(AppError::invalid_rule(format!(
                    "filter '{}' is declared twice",
                    rule.field
                )));
            }
        }

        for rule in &self.pagination_rules {
            let field = schema.field(&rule.key).ok_or_else(|| {
                AppError::invalid_model(format!(
                    "pagination key '{}' is not a field of '{}'",
                    rule.key, schema.table
                ))
            })?;
            if rule.custom_type.is_some()
                && (field.value_type != ValueType::Json || rule.sql_repr.is_none())
            {
                return Err(AppError::invalid_model(format!(
                    "pagination key '{}' with a custom type needs a JSON field and a SQL expression",
                    rule.key
                )));
            }
        }

        let listing = self.listing;
        if listing.default_limit == 0
            || listing.each_page_size == 0
            || listing.default_limit > listing.max_limit
        {
            return Err(AppError::configuration(format!(
                "invalid listing limits: default {}, max {}, each {}",
                listing.default_limit, listing.max_limit, listing.each_page_size
            )));
        }

        Ok(Store {
            executor,
            inner: Arc::new(StoreInner {
                schema,
                compiler: FilterCompiler::new().reject_unknown(listing.reject_unknown_filters),
                filter_rules: self.filter_rules,
                pagination_rules: self.pagination_rules,
                default_filters: self.default_filters,
                relations: self.relations,
                listing,
            }),
        })
    }
}

/// Timestamp rules only differ in how literals are read, so either fits a
/// timestamp column.
fn compatible(rule: ValueType, column: ValueType) -> bool {
    use ValueType::{Timestamp, TimestampMillis};
    match (rule, column) {
        (Timestamp | TimestampMillis, Timestamp | TimestampMillis) => true,
        (rule, column) => rule == column,
    }
}
