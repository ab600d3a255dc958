//! Persistence seam shared by the Postgres and in-memory stores.
//!
//! Every recipe, tag and ingredient operation takes an [`Owner`]. An owner can
//! only be obtained from a verified session, so a handler cannot reach another
//! user's rows: records that belong to someone else are indistinguishable from
//! records that do not exist.

use std::sync::Arc;

use async_trait::async_trait;

use super::{
    error::QueryError,
    schema::{
        Attribute, AttributeFilter, AttributeKind, Id, NewUser, RecipeChanges, RecipeDetail,
        RecipeDraft, RecipeFilter, User,
    },
};
use crate::authentication::jwt::JwtSessionData;

/// The authenticated requester every query is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    user_id: Id,
}

impl Owner {
    pub fn from_session(session: &JwtSessionData) -> Self {
        Self {
            user_id: session.user_id,
        }
    }

    #[cfg(test)]
    pub(crate) fn of(user: &User) -> Self {
        Self { user_id: user.id }
    }

    pub fn user_id(&self) -> Id {
        self.user_id
    }
}

pub type DynStore = Arc<dyn Store>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, QueryError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, QueryError>;

    /// Recipes owned by `owner`, newest first, each listed once.
    async fn list_recipes(
        &self,
        owner: &Owner,
        filter: &RecipeFilter,
    ) -> Result<Vec<RecipeDetail>, QueryError>;

    async fn get_recipe(&self, owner: &Owner, id: Id) -> Result<Option<RecipeDetail>, QueryError>;

    async fn create_recipe(
        &self,
        owner: &Owner,
        draft: RecipeDraft,
    ) -> Result<RecipeDetail, QueryError>;

    async fn update_recipe(
        &self,
        owner: &Owner,
        id: Id,
        changes: RecipeChanges,
    ) -> Result<Option<RecipeDetail>, QueryError>;

    async fn delete_recipe(&self, owner: &Owner, id: Id) -> Result<bool, QueryError>;

    /// Stores a new image path and hands back the one it replaced. The outer
    /// `None` means the recipe does not exist for this owner.
    async fn set_recipe_image(
        &self,
        owner: &Owner,
        id: Id,
        image: Option<String>,
    ) -> Result<Option<Option<String>>, QueryError>;

    /// Attributes owned by `owner`, ordered by name descending, each listed once.
    async fn list_attributes(
        &self,
        owner: &Owner,
        kind: AttributeKind,
        filter: &AttributeFilter,
    ) -> Result<Vec<Attribute>, QueryError>;

    async fn get_attribute(
        &self,
        owner: &Owner,
        kind: AttributeKind,
        id: Id,
    ) -> Result<Option<Attribute>, QueryError>;

    async fn create_attribute(
        &self,
        owner: &Owner,
        kind: AttributeKind,
        name: &str,
    ) -> Result<Attribute, QueryError>;

    async fn rename_attribute(
        &self,
        owner: &Owner,
        kind: AttributeKind,
        id: Id,
        name: &str,
    ) -> Result<Option<Attribute>, QueryError>;

    async fn delete_attribute(
        &self,
        owner: &Owner,
        kind: AttributeKind,
        id: Id,
    ) -> Result<bool, QueryError>;
}

/// Lookup, creation and linking of owned, named attributes inside one unit of work.
#[async_trait]
pub trait AttributeCatalog: Send {
    async fn find_attribute(
        &mut self,
        owner: &Owner,
        kind: AttributeKind,
        name: &str,
    ) -> Result<Option<Id>, QueryError>;

    async fn insert_attribute(
        &mut self,
        owner: &Owner,
        kind: AttributeKind,
        name: &str,
    ) -> Result<Id, QueryError>;

    /// Linking an already linked attribute is a no-op.
    async fn link_attribute(
        &mut self,
        kind: AttributeKind,
        recipe_id: Id,
        attribute_id: Id,
    ) -> Result<(), QueryError>;

    async fn unlink_attributes(&mut self, kind: AttributeKind, recipe_id: Id)
        -> Result<(), QueryError>;
}

pub async fn get_or_create_attribute<C>(
    catalog: &mut C,
    owner: &Owner,
    kind: AttributeKind,
    name: &str,
) -> Result<Id, QueryError>
where
    C: AttributeCatalog + ?Sized,
{
    match catalog.find_attribute(owner, kind, name).await? {
        Some(id) => Ok(id),
        None => catalog.insert_attribute(owner, kind, name).await,
    }
}

/// Links every name to `recipe_id`, creating the owner's attribute on first use.
pub async fn attach_attributes<C>(
    catalog: &mut C,
    owner: &Owner,
    kind: AttributeKind,
    recipe_id: Id,
    names: &[String],
) -> Result<(), QueryError>
where
    C: AttributeCatalog + ?Sized,
{
    for name in names {
        let attribute_id = get_or_create_attribute(catalog, owner, kind, name).await?;
        catalog.link_attribute(kind, recipe_id, attribute_id).await?;
    }
    Ok(())
}

/// Drops every existing link of `kind` before attaching `names`.
pub async fn replace_attributes<C>(
    catalog: &mut C,
    owner: &Owner,
    kind: AttributeKind,
    recipe_id: Id,
    names: &[String],
) -> Result<(), QueryError>
where
    C: AttributeCatalog + ?Sized,
{
    catalog.unlink_attributes(kind, recipe_id).await?;
    attach_attributes(catalog, owner, kind, recipe_id, names).await
}
