use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    error::QueryError,
    schema::{Attribute, AttributeFilter, AttributeKind, Id, LinkedAttribute},
    store::{AttributeCatalog, Owner},
};

pub async fn list_attributes(
    owner: &Owner,
    kind: AttributeKind,
    filter: &AttributeFilter,
    pool: &Pool<Postgres>,
) -> Result<Vec<Attribute>, QueryError> {
    let table = kind.table();
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT a.* FROM {table} a WHERE a.user_id = "));
    query.push_bind(owner.user_id());

    if filter.assigned_only {
        let (link_table, link_column) = (kind.link_table(), kind.link_column());
        query.push(format!(
            " AND EXISTS (SELECT 1 FROM {link_table} m WHERE m.{link_column} = a.id)"
        ));
    }
    query.push(" ORDER BY a.name DESC, a.id DESC");

    let rows: Vec<Attribute> = query.build_query_as().fetch_all(pool).await?;

    Ok(rows)
}

pub async fn get_attribute(
    owner: &Owner,
    kind: AttributeKind,
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<Option<Attribute>, QueryError> {
    let row: Option<Attribute> = sqlx::query_as(&format!(
        "SELECT * FROM {} WHERE id = $1 AND user_id = $2",
        kind.table()
    ))
    .bind(id)
    .bind(owner.user_id())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn create_attribute(
    owner: &Owner,
    kind: AttributeKind,
    name: &str,
    pool: &Pool<Postgres>,
) -> Result<Attribute, QueryError> {
    let row: Attribute = sqlx::query_as(&format!(
        "INSERT INTO {} (user_id, name) VALUES ($1, $2) RETURNING *",
        kind.table()
    ))
    .bind(owner.user_id())
    .bind(name)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn rename_attribute(
    owner: &Owner,
    kind: AttributeKind,
    id: Id,
    name: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<Attribute>, QueryError> {
    let row: Option<Attribute> = sqlx::query_as(&format!(
        "UPDATE {} SET name = $1 WHERE id = $2 AND user_id = $3 RETURNING *",
        kind.table()
    ))
    .bind(name)
    .bind(id)
    .bind(owner.user_id())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Removes the row and, through the foreign key, its recipe links
pub async fn delete_attribute(
    owner: &Owner,
    kind: AttributeKind,
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, QueryError> {
    let query = sqlx::query(&format!(
        "DELETE FROM {} WHERE id = $1 AND user_id = $2",
        kind.table()
    ))
    .bind(id)
    .bind(owner.user_id())
    .execute(pool)
    .await?;

    Ok(query.rows_affected() > 0)
}

/// Linked attributes of every given recipe, keyed by recipe id and ordered by attribute id.
pub async fn list_linked_attributes(
    kind: AttributeKind,
    recipe_ids: &[Id],
    conn: &mut PgConnection,
) -> Result<HashMap<Id, Vec<Attribute>>, QueryError> {
    if recipe_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<LinkedAttribute> = sqlx::query_as(&format!(
        "
        SELECT m.recipe_id AS recipe_id, a.id AS id, a.user_id AS user_id, a.name AS name
        FROM {link_table} m
        INNER JOIN {table} a ON a.id = m.{link_column}
        WHERE m.recipe_id = ANY($1)
        ORDER BY a.id
    ",
        link_table = kind.link_table(),
        table = kind.table(),
        link_column = kind.link_column(),
    ))
    .bind(recipe_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut hashmap: HashMap<Id, Vec<Attribute>> = HashMap::new();
    rows.into_iter().for_each(|row| {
        hashmap.entry(row.recipe_id).or_default().push(row.into());
    });

    Ok(hashmap)
}

#[async_trait]
impl AttributeCatalog for PgConnection {
    async fn find_attribute(
        &mut self,
        owner: &Owner,
        kind: AttributeKind,
        name: &str,
    ) -> Result<Option<Id>, QueryError> {
        let row: Option<(Id,)> = sqlx::query_as(&format!(
            "SELECT id FROM {} WHERE user_id = $1 AND name = $2",
            kind.table()
        ))
        .bind(owner.user_id())
        .bind(name)
        .fetch_optional(&mut *self)
        .await?;

        Ok(row.map(|row| row.0))
    }

    async fn insert_attribute(
        &mut self,
        owner: &Owner,
        kind: AttributeKind,
        name: &str,
    ) -> Result<Id, QueryError> {
        let table = kind.table();
        let inserted: Option<(Id,)> = sqlx::query_as(&format!(
            "INSERT INTO {table} (user_id, name) VALUES ($1, $2) ON CONFLICT (user_id, name) DO NOTHING RETURNING id"
        ))
        .bind(owner.user_id())
        .bind(name)
        .fetch_optional(&mut *self)
        .await?;

        // A concurrent request may have inserted the same name first.
        match inserted {
            Some((id,)) => Ok(id),
            None => self
                .find_attribute(owner, kind, name)
                .await?
                .ok_or_else(|| QueryError::Conflict(format!("{table} {name:?} could not be created"))),
        }
    }

    async fn link_attribute(
        &mut self,
        kind: AttributeKind,
        recipe_id: Id,
        attribute_id: Id,
    ) -> Result<(), QueryError> {
        sqlx::query(&format!(
            "INSERT INTO {} (recipe_id, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            kind.link_table(),
            kind.link_column()
        ))
        .bind(recipe_id)
        .bind(attribute_id)
        .execute(&mut *self)
        .await?;

        Ok(())
    }

    async fn unlink_attributes(
        &mut self,
        kind: AttributeKind,
        recipe_id: Id,
    ) -> Result<(), QueryError> {
        sqlx::query(&format!(
            "DELETE FROM {} WHERE recipe_id = $1",
            kind.link_table()
        ))
        .bind(recipe_id)
        .execute(&mut *self)
        .await?;

        Ok(())
    }
}
