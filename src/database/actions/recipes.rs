use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use super::attributes::list_linked_attributes;
use crate::{
    error::QueryError,
    schema::{AttributeKind, Id, Recipe, RecipeChanges, RecipeDetail, RecipeDraft, RecipeFilter},
    store::{attach_attributes, replace_attributes, Owner},
};

const ATTRIBUTE_KINDS: [AttributeKind; 2] = [AttributeKind::Tag, AttributeKind::Ingredient];

/// Attaches the linked tags and ingredients to each recipe, keeping the row order.
async fn with_attributes(
    recipes: Vec<Recipe>,
    conn: &mut PgConnection,
) -> Result<Vec<RecipeDetail>, QueryError> {
    let ids: Vec<Id> = recipes.iter().map(|recipe| recipe.id).collect();
    let mut tags = list_linked_attributes(AttributeKind::Tag, &ids, conn).await?;
    let mut ingredients = list_linked_attributes(AttributeKind::Ingredient, &ids, conn).await?;

    Ok(recipes
        .into_iter()
        .map(|recipe| RecipeDetail {
            tags: tags.remove(&recipe.id).unwrap_or_default(),
            ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
            recipe,
        })
        .collect())
}

async fn detail(recipe: Recipe, conn: &mut PgConnection) -> Result<RecipeDetail, QueryError> {
    let mut rows = with_attributes(vec![recipe], conn).await?;
    rows.pop()
        .ok_or_else(|| QueryError::Conflict("recipe vanished while loading".into()))
}

pub async fn fetch_recipes(
    owner: &Owner,
    filter: &RecipeFilter,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeDetail>, QueryError> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.* FROM recipes r WHERE r.user_id = ");
    query.push_bind(owner.user_id());

    for kind in ATTRIBUTE_KINDS {
        if let Some(ids) = filter.ids(kind) {
            query.push(format!(
                " AND EXISTS (SELECT 1 FROM {} m WHERE m.recipe_id = r.id AND m.{} = ANY(",
                kind.link_table(),
                kind.link_column()
            ));
            query.push_bind(ids.to_vec());
            query.push("))");
        }
    }
    query.push(" ORDER BY r.id DESC");

    let mut conn = pool.acquire().await?;
    let rows: Vec<Recipe> = query.build_query_as().fetch_all(&mut *conn).await?;

    with_attributes(rows, &mut conn).await
}

pub async fn get_recipe(
    owner: &Owner,
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeDetail>, QueryError> {
    let mut conn = pool.acquire().await?;
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(owner.user_id())
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(recipe) => Ok(Some(detail(recipe, &mut conn).await?)),
        None => Ok(None),
    }
}

/// Inserts the recipe and reconciles its tags and ingredients in one transaction.
pub async fn create_recipe(
    owner: &Owner,
    draft: RecipeDraft,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, QueryError> {
    let mut tx = pool.begin().await?;

    let recipe: Recipe = sqlx::query_as(
        "
        INSERT INTO recipes (user_id, title, time_minutes, price, description, link)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
    ",
    )
    .bind(owner.user_id())
    .bind(&draft.title)
    .bind(draft.time_minutes)
    .bind(draft.price)
    .bind(&draft.description)
    .bind(&draft.link)
    .fetch_one(&mut *tx)
    .await?;

    for kind in ATTRIBUTE_KINDS {
        attach_attributes(&mut *tx, owner, kind, recipe.id, draft.attributes(kind)).await?;
    }

    let created = detail(recipe, &mut tx).await?;
    tx.commit().await?;

    Ok(created)
}

pub async fn update_recipe(
    owner: &Owner,
    id: Id,
    changes: RecipeChanges,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeDetail>, QueryError> {
    let mut tx = pool.begin().await?;

    let row: Option<Recipe> =
        sqlx::query_as("SELECT * FROM recipes WHERE id = $1 AND user_id = $2 FOR UPDATE")
            .bind(id)
            .bind(owner.user_id())
            .fetch_optional(&mut *tx)
            .await?;
    let Some(mut recipe) = row else {
        return Ok(None);
    };

    for kind in ATTRIBUTE_KINDS {
        if let Some(names) = changes.attributes(kind) {
            replace_attributes(&mut *tx, owner, kind, id, names).await?;
        }
    }

    changes.apply(&mut recipe);
    sqlx::query(
        "
        UPDATE recipes
        SET title = $1, time_minutes = $2, price = $3, description = $4, link = $5
        WHERE id = $6
    ",
    )
    .bind(&recipe.title)
    .bind(recipe.time_minutes)
    .bind(recipe.price)
    .bind(&recipe.description)
    .bind(&recipe.link)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let updated = detail(recipe, &mut tx).await?;
    tx.commit().await?;

    log::debug!("Updated recipe {id}");
    Ok(Some(updated))
}

/// Links cascade with the recipe; the tags and ingredients themselves stay.
pub async fn delete_recipe(owner: &Owner, id: Id, pool: &Pool<Postgres>) -> Result<bool, QueryError> {
    let query = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(owner.user_id())
        .execute(pool)
        .await?;

    Ok(query.rows_affected() > 0)
}

pub async fn set_recipe_image(
    owner: &Owner,
    id: Id,
    image: Option<String>,
    pool: &Pool<Postgres>,
) -> Result<Option<Option<String>>, QueryError> {
    let mut tx = pool.begin().await?;

    let previous: Option<(Option<String>,)> =
        sqlx::query_as("SELECT image FROM recipes WHERE id = $1 AND user_id = $2 FOR UPDATE")
            .bind(id)
            .bind(owner.user_id())
            .fetch_optional(&mut *tx)
            .await?;
    let Some((previous,)) = previous else {
        return Ok(None);
    };

    sqlx::query("UPDATE recipes SET image = $1 WHERE id = $2")
        .bind(image)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(Some(previous))
}
