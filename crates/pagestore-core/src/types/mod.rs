//! Core type definitions used across the Pagestore workspace.

pub mod filter;
pub mod pagination;
pub mod sorting;
pub mod value;

pub use filter::{Condition, FilterOp, FilterRule};
pub use pagination::{
    Cursor, CustomType, ListOptions, ListResult, PageInfo, PageMode, PaginationRule,
};
pub use sorting::SortDirection;
pub use value::{SqlValue, ValueType};
