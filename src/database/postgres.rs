//! Postgres implementation of the graph store.
//!
//! Entity rows are read and written generically from the `Entity` column
//! tables; parameters travel as `serde_json::Value` and are cast to their
//! column type in SQL. Every multi-statement mutation runs in one transaction.
use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{
    postgres::{PgArguments, PgRow},
    FromRow, PgConnection, PgPool, Row,
};
use uuid::Uuid;

use crate::database::models::{Authority, Entity, MenuGroup, MenuItem, Role, User};
use crate::database::repository::{Repository, StoreError, StoreResult};
use crate::database::store::{EdgeKind, EdgeReplacement, GraphStore};
use crate::filter::{Page, PageRequest, Specification};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}

fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}

fn insert_sql<T: Entity>() -> String {
    let columns: Vec<String> = T::COLUMNS.iter().map(|c| format!("\"{}\"", c.name)).collect();
    let placeholders: Vec<String> = T::COLUMNS
        .iter()
        .enumerate()
        .map(|(i, c)| format!("${}::{}", i + 1, c.sql_type))
        .collect();
    format!(
        "INSERT INTO \"{}\" ({}) VALUES ({}) RETURNING *",
        T::TABLE,
        columns.join(", "),
        placeholders.join(", ")
    )
}

fn update_sql<T: Entity>() -> String {
    let assignments: Vec<String> = T::COLUMNS
        .iter()
        .enumerate()
        .map(|(i, c)| format!("\"{}\" = ${}::{}", c.name, i + 1, c.sql_type))
        .collect();
    format!(
        "UPDATE \"{}\" SET {}, \"updated_at\" = now() WHERE \"id\" = ${} RETURNING *",
        T::TABLE,
        assignments.join(", "),
        T::COLUMNS.len() + 1
    )
}

fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

async fn insert_row<T>(conn: &mut PgConnection, record: &T) -> StoreResult<T>
where
    T: Entity + for<'r> FromRow<'r, PgRow>,
{
    let sql = insert_sql::<T>();
    let values = record.values();
    let mut q = sqlx::query_as::<_, T>(&sql);
    for v in values.iter() {
        q = bind_param_query_as(q, v);
    }
    Ok(q.fetch_one(&mut *conn).await?)
}

async fn update_row<T>(conn: &mut PgConnection, record: &T) -> StoreResult<T>
where
    T: Entity + for<'r> FromRow<'r, PgRow>,
{
    let sql = update_sql::<T>();
    let values = record.values();
    let mut q = sqlx::query_as::<_, T>(&sql);
    for v in values.iter() {
        q = bind_param_query_as(q, v);
    }
    q.bind(record.id())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| StoreError::not_found::<T>(record.external_id()))
}

/// Storage ids of `targets`, sorted, locked against concurrent deletes.
/// NotFound lists every id that does not resolve.
async fn resolve_targets(conn: &mut PgConnection, edge: EdgeKind, targets: &[Uuid]) -> StoreResult<Vec<i64>> {
    let wanted = dedup(targets);
    let sql = format!(
        "SELECT id, external_id FROM {} WHERE external_id = ANY($1) FOR SHARE",
        edge.target_table()
    );
    let found: Vec<(i64, Uuid)> = sqlx::query_as(&sql).bind(&wanted).fetch_all(&mut *conn).await?;
    let resolved: HashSet<Uuid> = found.iter().map(|(_, ext)| *ext).collect();
    let unresolved: Vec<String> = wanted
        .iter()
        .filter(|ext| !resolved.contains(ext))
        .map(Uuid::to_string)
        .collect();
    if !unresolved.is_empty() {
        return Err(StoreError::NotFound(format!(
            "{} not found: {}",
            edge.target_label(),
            unresolved.join(", ")
        )));
    }

    let mut target_ids: Vec<i64> = found.into_iter().map(|(id, _)| id).collect();
    target_ids.sort_unstable();
    Ok(target_ids)
}

async fn write_edges(conn: &mut PgConnection, edge: EdgeKind, owner_id: i64, target_ids: &[i64]) -> StoreResult<()> {
    let sql = format!("DELETE FROM {} WHERE {} = $1", edge.table(), edge.owner_column());
    sqlx::query(&sql).bind(owner_id).execute(&mut *conn).await?;

    let sql = format!(
        "INSERT INTO {} ({}, {}) SELECT $1, UNNEST($2::bigint[])",
        edge.table(),
        edge.owner_column(),
        edge.target_column()
    );
    sqlx::query(&sql)
        .bind(owner_id)
        .bind(target_ids)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn roles_of(conn: &mut PgConnection, user_id: i64) -> StoreResult<Vec<Role>> {
    Ok(sqlx::query_as(
        "SELECT r.* FROM roles r JOIN user_roles ur ON ur.role_id = r.id \
         WHERE ur.user_id = $1 ORDER BY r.id",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?)
}

#[async_trait]
impl<T> Repository<T> for PgStore
where
    T: Entity + for<'r> FromRow<'r, PgRow>,
{
    async fn find(&self, external_id: Uuid) -> StoreResult<T> {
        let sql = format!("SELECT * FROM \"{}\" WHERE \"external_id\" = $1", T::TABLE);
        sqlx::query_as::<_, T>(&sql)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found::<T>(external_id))
    }

    async fn find_all(&self, spec: &Specification, page: PageRequest) -> StoreResult<Page<T>> {
        let filter = spec.to_sql(0);

        let count_sql = format!(
            "SELECT COUNT(*) AS count FROM \"{}\" WHERE {}",
            T::TABLE,
            filter.query
        );
        let mut count_query = sqlx::query(&count_sql);
        for p in filter.params.iter() {
            count_query = bind_param_query(count_query, p);
        }
        let total: i64 = count_query.fetch_one(&self.pool).await?.try_get("count")?;

        let n = filter.params.len();
        let select_sql = format!(
            "SELECT * FROM \"{}\" WHERE {} ORDER BY \"id\" LIMIT ${} OFFSET ${}",
            T::TABLE,
            filter.query,
            n + 1,
            n + 2
        );
        let mut select_query = sqlx::query_as::<_, T>(&select_sql);
        for p in filter.params.iter() {
            select_query = bind_param_query_as(select_query, p);
        }
        let rows = select_query
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(rows, total, page))
    }

    async fn insert(&self, record: T) -> StoreResult<T> {
        let mut conn = self.pool.acquire().await?;
        insert_row(&mut conn, &record).await
    }

    async fn update(&self, record: T) -> StoreResult<T> {
        let mut conn = self.pool.acquire().await?;
        update_row(&mut conn, &record).await
    }

    async fn delete(&self, external_id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let lookup = format!(
            "SELECT \"id\" FROM \"{}\" WHERE \"external_id\" = $1 FOR UPDATE",
            T::TABLE
        );
        let id: i64 = sqlx::query_scalar(&lookup)
            .bind(external_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::not_found::<T>(external_id))?;

        for reference in T::REFERENCED_BY {
            let sql = format!(
                "SELECT EXISTS (SELECT 1 FROM \"{}\" WHERE \"{}\" = $1)",
                reference.table, reference.column
            );
            let referenced: bool = sqlx::query_scalar(&sql).bind(id).fetch_one(&mut *tx).await?;
            if referenced {
                return Err(StoreError::Conflict(format!(
                    "{} {} is still referenced by a {}",
                    T::LABEL,
                    external_id,
                    reference.label
                )));
            }
        }

        for reference in T::OWNS {
            let sql = format!("DELETE FROM \"{}\" WHERE \"{}\" = $1", reference.table, reference.column);
            sqlx::query(&sql).bind(id).execute(&mut *tx).await?;
        }

        let sql = format!("DELETE FROM \"{}\" WHERE \"id\" = $1", T::TABLE);
        sqlx::query(&sql).bind(id).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl GraphStore for PgStore {
    async fn authority_keys(&self) -> StoreResult<HashSet<(String, String)>> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT resource, action FROM authorities")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().collect())
    }

    async fn insert_authorities(&self, batch: Vec<Authority>) -> StoreResult<usize> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0usize;

        for authority in batch.iter() {
            let result = sqlx::query(
                "INSERT INTO authorities (external_id, name, resource, action, method, description, service) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) ON CONFLICT DO NOTHING",
            )
            .bind(authority.external_id)
            .bind(&authority.name)
            .bind(&authority.resource)
            .bind(&authority.action)
            .bind(&authority.method)
            .bind(&authority.description)
            .bind(&authority.service)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn authorities_for_service(&self, service: &str) -> StoreResult<Vec<Authority>> {
        Ok(sqlx::query_as("SELECT * FROM authorities WHERE service = $1 ORDER BY id")
            .bind(service)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_authority_by_name(&self, name: &str) -> StoreResult<Option<Authority>> {
        Ok(sqlx::query_as("SELECT * FROM authorities WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_role_by_code(&self, code: &str) -> StoreResult<Option<Role>> {
        Ok(sqlx::query_as("SELECT * FROM roles WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn count_menu_groups(&self) -> StoreResult<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM menu_groups")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn replace_edges(
        &self,
        edge: EdgeKind,
        owner: Uuid,
        targets: &[Uuid],
        expected_version: Option<i32>,
    ) -> StoreResult<EdgeReplacement> {
        let mut tx = self.pool.begin().await?;

        // Lock the owner row so concurrent replacements serialize
        let owner_row: Option<(i64, Option<i32>)> = if edge.is_versioned() {
            let sql = format!(
                "SELECT id, version FROM {} WHERE external_id = $1 FOR UPDATE",
                edge.owner_table()
            );
            sqlx::query_as::<_, (i64, i32)>(&sql)
                .bind(owner)
                .fetch_optional(&mut *tx)
                .await?
                .map(|(id, version)| (id, Some(version)))
        } else {
            let sql = format!("SELECT id FROM {} WHERE external_id = $1 FOR UPDATE", edge.owner_table());
            sqlx::query_scalar::<_, i64>(&sql)
                .bind(owner)
                .fetch_optional(&mut *tx)
                .await?
                .map(|id| (id, None))
        };
        let (owner_id, version) = owner_row
            .ok_or_else(|| StoreError::NotFound(format!("{} {} not found", edge.owner_label(), owner)))?;

        if let (Some(expected), Some(current)) = (expected_version, version) {
            if expected != current {
                return Err(StoreError::Conflict(format!(
                    "{} {} was modified concurrently (expected version {}, found {})",
                    edge.owner_label(),
                    owner,
                    expected,
                    current
                )));
            }
        }

        let target_ids = resolve_targets(&mut tx, edge, targets).await?;
        write_edges(&mut tx, edge, owner_id, &target_ids).await?;

        let version = if edge.is_versioned() {
            let sql = format!(
                "UPDATE {} SET version = version + 1, updated_at = now() WHERE id = $1 RETURNING version",
                edge.owner_table()
            );
            Some(sqlx::query_scalar::<_, i32>(&sql).bind(owner_id).fetch_one(&mut *tx).await?)
        } else {
            None
        };

        tx.commit().await?;

        Ok(EdgeReplacement { owner_id, version, target_ids })
    }

    async fn save_user_with_roles(&self, user: User, roles: &[Uuid]) -> StoreResult<(User, Vec<Role>)> {
        let mut tx = self.pool.begin().await?;
        let role_ids = resolve_targets(&mut tx, EdgeKind::UserRoles, roles).await?;
        let user = if user.id == 0 {
            insert_row(&mut tx, &user).await?
        } else {
            update_row(&mut tx, &user).await?
        };
        write_edges(&mut tx, EdgeKind::UserRoles, user.id, &role_ids).await?;
        let roles = roles_of(&mut tx, user.id).await?;
        tx.commit().await?;
        Ok((user, roles))
    }

    async fn insert_role_with_authorities(&self, role: Role, authorities: &[Uuid]) -> StoreResult<Role> {
        let mut tx = self.pool.begin().await?;
        let authority_ids = resolve_targets(&mut tx, EdgeKind::RoleAuthorities, authorities).await?;
        let role = insert_row(&mut tx, &role).await?;
        write_edges(&mut tx, EdgeKind::RoleAuthorities, role.id, &authority_ids).await?;
        tx.commit().await?;
        Ok(role)
    }

    async fn insert_menu_group_with_items(
        &self,
        group: MenuGroup,
        items: Vec<(MenuItem, Vec<Uuid>)>,
    ) -> StoreResult<(MenuGroup, Vec<MenuItem>)> {
        let mut tx = self.pool.begin().await?;
        let group = insert_row(&mut tx, &group).await?;

        let mut stored = Vec::with_capacity(items.len());
        for (mut item, authorities) in items {
            let authority_ids = resolve_targets(&mut tx, EdgeKind::MenuItemAuthorities, &authorities).await?;
            item.menu_group_id = Some(group.id);
            let item = insert_row(&mut tx, &item).await?;
            write_edges(&mut tx, EdgeKind::MenuItemAuthorities, item.id, &authority_ids).await?;
            stored.push(item);
        }

        tx.commit().await?;
        Ok((group, stored))
    }

    async fn authorities_of(&self, edge: EdgeKind, owner_ids: &[i64]) -> StoreResult<Vec<Authority>> {
        if edge.target_table() != "authorities" {
            return Ok(vec![]);
        }
        let sql = format!(
            "SELECT a.* FROM authorities a WHERE EXISTS \
             (SELECT 1 FROM {} e WHERE e.authority_id = a.id AND e.{} = ANY($1)) ORDER BY a.id",
            edge.table(),
            edge.owner_column()
        );
        Ok(sqlx::query_as(&sql).bind(owner_ids).fetch_all(&self.pool).await?)
    }

    async fn roles_of_user(&self, user_id: i64) -> StoreResult<Vec<Role>> {
        let mut conn = self.pool.acquire().await?;
        roles_of(&mut conn, user_id).await
    }

    async fn menu_items_for_authorities(
        &self,
        authority_ids: &[i64],
        grouped: bool,
    ) -> StoreResult<Vec<MenuItem>> {
        let group_clause = if grouped { "IS NOT NULL" } else { "IS NULL" };
        let sql = format!(
            "SELECT mi.* FROM menu_items mi WHERE mi.menu_group_id {} AND EXISTS \
             (SELECT 1 FROM menu_item_authorities mia WHERE mia.menu_item_id = mi.id AND mia.authority_id = ANY($1)) \
             ORDER BY COALESCE(mi.sort_order, 0), mi.id",
            group_clause
        );
        Ok(sqlx::query_as(&sql).bind(authority_ids).fetch_all(&self.pool).await?)
    }

    async fn menu_groups_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<MenuGroup>> {
        Ok(sqlx::query_as(
            "SELECT * FROM menu_groups WHERE id = ANY($1) ORDER BY COALESCE(sort_order, 0), id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_menu_group_by_id(&self, id: i64) -> StoreResult<Option<MenuGroup>> {
        Ok(sqlx::query_as("SELECT * FROM menu_groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_sql_casts_every_column() {
        assert_eq!(
            insert_sql::<Role>(),
            "INSERT INTO \"roles\" (\"external_id\", \"name\", \"code\") VALUES ($1::uuid, $2::text, $3::text) RETURNING *"
        );
    }

    #[test]
    fn update_sql_binds_id_last() {
        assert_eq!(
            update_sql::<MenuGroup>(),
            "UPDATE \"menu_groups\" SET \"external_id\" = $1::uuid, \"name\" = $2::text, \"icon\" = $3::text, \
             \"sort_order\" = $4::int4, \"updated_at\" = now() WHERE \"id\" = $5 RETURNING *"
        );
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(dedup(&[a, b, a]), vec![a, b]);
    }
}
