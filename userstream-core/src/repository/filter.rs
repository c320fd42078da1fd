//! Attribute filters for user queries
//!
//! Filters arrive as `column -> [values]` (for example from a query string).
//! Values for one column are OR-ed together, columns are AND-ed. Column names
//! are checked against a fixed list and every value is bound as a parameter.

use std::collections::BTreeMap;
use std::str::FromStr;

use sqlx::{Postgres, QueryBuilder};

use crate::{Error, Result};

/// Filterable column of the `users` table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UserColumn {
    Id,
    FirstName,
    LastName,
    EmailAddress,
    CreatedAt,
    DeletedAt,
    MergedAt,
    ParentUserId,
}

impl UserColumn {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::EmailAddress => "email_address",
            Self::CreatedAt => "created_at",
            Self::DeletedAt => "deleted_at",
            Self::MergedAt => "merged_at",
            Self::ParentUserId => "parent_user_id",
        }
    }

    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        !matches!(self, Self::FirstName | Self::LastName | Self::EmailAddress)
    }
}

impl FromStr for UserColumn {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "id" => Ok(Self::Id),
            "first_name" => Ok(Self::FirstName),
            "last_name" => Ok(Self::LastName),
            "email_address" => Ok(Self::EmailAddress),
            "created_at" => Ok(Self::CreatedAt),
            "deleted_at" => Ok(Self::DeletedAt),
            "merged_at" => Ok(Self::MergedAt),
            "parent_user_id" => Ok(Self::ParentUserId),
            other => Err(format!("Unknown filter column: {other}")),
        }
    }
}

/// Value bound for a filter condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Int(i64),
    String(String),
}

/// Set of attribute filters; empty matches every user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    conditions: BTreeMap<UserColumn, Vec<FilterValue>>,
}

impl UserFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter from raw `column -> values` pairs.
    ///
    /// Fails on an unknown column or a non-integer value for a numeric column.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut filter = Self::new();
        for (column, value) in pairs {
            let column = UserColumn::from_str(column.as_ref()).map_err(Error::InvalidInput)?;
            filter = filter.push(column, value.as_ref())?;
        }
        Ok(filter)
    }

    /// Add one accepted value for a column
    pub fn push(mut self, column: UserColumn, raw: &str) -> Result<Self> {
        let value = if column.is_numeric() {
            let parsed = raw.trim().parse::<i64>().map_err(|_| {
                Error::InvalidInput(format!(
                    "Filter {} expects an integer, got {raw:?}",
                    column.as_str()
                ))
            })?;
            FilterValue::Int(parsed)
        } else {
            FilterValue::String(raw.to_string())
        };
        self.conditions.entry(column).or_default().push(value);
        Ok(self)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Append ` WHERE ...` (or nothing) to a query under construction
    pub fn apply(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        for (idx, (column, values)) in self.conditions.iter().enumerate() {
            qb.push(if idx == 0 { " WHERE " } else { " AND " });
            qb.push(column.as_str());
            qb.push(" IN (");
            let mut separated = qb.separated(", ");
            for value in values {
                match value {
                    FilterValue::Int(i) => separated.push_bind(*i),
                    FilterValue::String(s) => separated.push_bind(s.clone()),
                };
            }
            separated.push_unseparated(")");
        }
    }
}
