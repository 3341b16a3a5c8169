//! Partial `UPDATE` builder: only the fields a client sent are written.

use sqlx::{postgres::PgRow, FromRow, PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

pub struct UpdateSet<'args> {
    qb: QueryBuilder<'args, Postgres>,
}

impl<'args> UpdateSet<'args> {
    /// Every update bumps `updated_at`, so the `SET` list is never empty.
    pub fn new(table: &str) -> Self {
        UpdateSet {
            qb: QueryBuilder::new(format!("UPDATE {table} SET updated_at = NOW()")),
        }
    }

    pub fn set<T>(&mut self, column: &str, value: T) -> &mut Self
    where
        T: 'args + sqlx::Encode<'args, Postgres> + sqlx::Type<Postgres> + Send,
    {
        self.qb.push(", ");
        self.qb.push(column);
        self.qb.push(" = ");
        self.qb.push_bind(value);
        self
    }

    /// Writes `value` only when the client supplied it.
    pub fn set_some<T>(&mut self, column: &str, value: Option<T>) -> &mut Self
    where
        T: 'args + sqlx::Encode<'args, Postgres> + sqlx::Type<Postgres> + Send,
    {
        if let Some(v) = value {
            self.set(column, v);
        }
        self
    }

    /// Absent leaves the column alone, `Some(None)` writes `NULL`.
    pub fn set_nullable<T>(&mut self, column: &str, value: Option<Option<T>>) -> &mut Self
    where
        T: 'args + sqlx::Encode<'args, Postgres> + sqlx::Type<Postgres> + Send,
    {
        if let Some(v) = value {
            self.set(column, v);
        }
        self
    }

    /// `UPDATE … WHERE id = $n RETURNING *`; `None` if no row has that id.
    pub async fn apply<'e, T, E>(mut self, id: Uuid, executor: E) -> sqlx::Result<Option<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
        E: PgExecutor<'e>,
    {
        self.qb.push(" WHERE id = ");
        self.qb.push_bind(id);
        self.qb.push(" RETURNING *");
        self.qb.build_query_as::<T>().fetch_optional(executor).await
    }

    #[cfg(test)]
    fn sql(&self) -> &str {
        self.qb.sql()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_supplied_columns_are_written() {
        let mut set = UpdateSet::new("users");
        set.set_some("city", Some("Pune".to_string()))
            .set_some::<String>("phone", None)
            .set("profile_visible", false);
        assert_eq!(
            set.sql(),
            "UPDATE users SET updated_at = NOW(), city = $1, profile_visible = $2"
        );
    }

    #[test]
    fn explicit_null_is_written() {
        let mut set = UpdateSet::new("teams");
        set.set_nullable::<String>("logo_url", Some(None))
            .set_nullable::<String>("city", None);
        assert_eq!(set.sql(), "UPDATE teams SET updated_at = NOW(), logo_url = $1");
    }
}
