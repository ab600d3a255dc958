pub mod attributes;
pub mod recipes;
pub mod users;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::QueryError,
    schema::{
        Attribute, AttributeFilter, AttributeKind, Id, NewUser, RecipeChanges, RecipeDetail,
        RecipeDraft, RecipeFilter, User,
    },
    store::{Owner, Store},
};

/// [`Store`] backed by a Postgres pool. The schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, QueryError> {
        users::register_user(user, &self.pool).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, QueryError> {
        users::get_user_by_email(&self.pool, email).await
    }

    async fn list_recipes(
        &self,
        owner: &Owner,
        filter: &RecipeFilter,
    ) -> Result<Vec<RecipeDetail>, QueryError> {
        recipes::fetch_recipes(owner, filter, &self.pool).await
    }

    async fn get_recipe(&self, owner: &Owner, id: Id) -> Result<Option<RecipeDetail>, QueryError> {
        recipes::get_recipe(owner, id, &self.pool).await
    }

    async fn create_recipe(
        &self,
        owner: &Owner,
        draft: RecipeDraft,
    ) -> Result<RecipeDetail, QueryError> {
        recipes::create_recipe(owner, draft, &self.pool).await
    }

    async fn update_recipe(
        &self,
        owner: &Owner,
        id: Id,
        changes: RecipeChanges,
    ) -> Result<Option<RecipeDetail>, QueryError> {
        recipes::update_recipe(owner, id, changes, &self.pool).await
    }

    async fn delete_recipe(&self, owner: &Owner, id: Id) -> Result<bool, QueryError> {
        recipes::delete_recipe(owner, id, &self.pool).await
    }

    async fn set_recipe_image(
        &self,
        owner: &Owner,
        id: Id,
        image: Option<String>,
    ) -> Result<Option<Option<String>>, QueryError> {
        recipes::set_recipe_image(owner, id, image, &self.pool).await
    }

    async fn list_attributes(
        &self,
        owner: &Owner,
        kind: AttributeKind,
        filter: &AttributeFilter,
    ) -> Result<Vec<Attribute>, QueryError> {
        attributes::list_attributes(owner, kind, filter, &self.pool).await
    }

    async fn get_attribute(
        &self,
        owner: &Owner,
        kind: AttributeKind,
        id: Id,
    ) -> Result<Option<Attribute>, QueryError> {
        attributes::get_attribute(owner, kind, id, &self.pool).await
    }

    async fn create_attribute(
        &self,
        owner: &Owner,
        kind: AttributeKind,
        name: &str,
    ) -> Result<Attribute, QueryError> {
        attributes::create_attribute(owner, kind, name, &self.pool).await
    }

    async fn rename_attribute(
        &self,
        owner: &Owner,
        kind: AttributeKind,
        id: Id,
        name: &str,
    ) -> Result<Option<Attribute>, QueryError> {
        attributes::rename_attribute(owner, kind, id, name, &self.pool).await
    }

    async fn delete_attribute(
        &self,
        owner: &Owner,
        kind: AttributeKind,
        id: Id,
    ) -> Result<bool, QueryError> {
        attributes::delete_attribute(owner, kind, id, &self.pool).await
    }
}
