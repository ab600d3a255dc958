use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    error::QueryError,
    schema::{
        Attribute, AttributeFilter, AttributeKind, Id, NewUser, Recipe, RecipeChanges,
        RecipeDetail, RecipeDraft, RecipeFilter, User,
    },
    store::{attach_attributes, replace_attributes, AttributeCatalog, Owner, Store},
};

#[derive(Debug, Clone)]
struct Table<T> {
    last_id: Id,
    rows: BTreeMap<Id, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            last_id: 0,
            rows: BTreeMap::new(),
        }
    }
}

impl<T> Table<T> {
    fn next_id(&mut self) -> Id {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Debug, Default, Clone)]
struct MemoryState {
    users: Table<User>,
    recipes: Table<Recipe>,
    tags: Table<Attribute>,
    ingredients: Table<Attribute>,
    /// (recipe_id, attribute_id)
    recipe_tags: BTreeSet<(Id, Id)>,
    recipe_ingredients: BTreeSet<(Id, Id)>,
    /// Number of links that may still be written before `link_attribute` fails.
    #[cfg(test)]
    link_budget: Option<usize>,
}

impl MemoryState {
    fn attributes(&self, kind: AttributeKind) -> &Table<Attribute> {
        match kind {
            AttributeKind::Tag => &self.tags,
            AttributeKind::Ingredient => &self.ingredients,
        }
    }

    fn attributes_mut(&mut self, kind: AttributeKind) -> &mut Table<Attribute> {
        match kind {
            AttributeKind::Tag => &mut self.tags,
            AttributeKind::Ingredient => &mut self.ingredients,
        }
    }

    fn links(&self, kind: AttributeKind) -> &BTreeSet<(Id, Id)> {
        match kind {
            AttributeKind::Tag => &self.recipe_tags,
            AttributeKind::Ingredient => &self.recipe_ingredients,
        }
    }

    fn links_mut(&mut self, kind: AttributeKind) -> &mut BTreeSet<(Id, Id)> {
        match kind {
            AttributeKind::Tag => &mut self.recipe_tags,
            AttributeKind::Ingredient => &mut self.recipe_ingredients,
        }
    }

    fn owned_recipe(&self, owner: &Owner, id: Id) -> Option<&Recipe> {
        self.recipes
            .rows
            .get(&id)
            .filter(|recipe| recipe.user_id == owner.user_id())
    }

    fn owned_attribute(&self, owner: &Owner, kind: AttributeKind, id: Id) -> Option<&Attribute> {
        self.attributes(kind)
            .rows
            .get(&id)
            .filter(|attribute| attribute.user_id == owner.user_id())
    }

    fn name_taken(&self, owner: &Owner, kind: AttributeKind, name: &str, except: Option<Id>) -> bool {
        self.attributes(kind).rows.values().any(|attribute| {
            attribute.user_id == owner.user_id()
                && attribute.name == name
                && Some(attribute.id) != except
        })
    }

    fn linked(&self, kind: AttributeKind, recipe_id: Id) -> Vec<Attribute> {
        let table = self.attributes(kind);
        self.links(kind)
            .range((recipe_id, Id::MIN)..=(recipe_id, Id::MAX))
            .filter_map(|(_, attribute_id)| table.rows.get(attribute_id).cloned())
            .collect()
    }

    fn detail(&self, recipe: &Recipe) -> RecipeDetail {
        RecipeDetail {
            recipe: recipe.clone(),
            tags: self.linked(AttributeKind::Tag, recipe.id),
            ingredients: self.linked(AttributeKind::Ingredient, recipe.id),
        }
    }

    fn matches(&self, recipe_id: Id, kind: AttributeKind, ids: Option<&[Id]>) -> bool {
        match ids {
            Some(ids) => self
                .links(kind)
                .range((recipe_id, Id::MIN)..=(recipe_id, Id::MAX))
                .any(|(_, attribute_id)| ids.contains(attribute_id)),
            None => true,
        }
    }
}

#[async_trait]
impl AttributeCatalog for MemoryState {
    async fn find_attribute(
        &mut self,
        owner: &Owner,
        kind: AttributeKind,
        name: &str,
    ) -> Result<Option<Id>, QueryError> {
        Ok(self
            .attributes(kind)
            .rows
            .values()
            .find(|attribute| attribute.user_id == owner.user_id() && attribute.name == name)
            .map(|attribute| attribute.id))
    }

    async fn insert_attribute(
        &mut self,
        owner: &Owner,
        kind: AttributeKind,
        name: &str,
    ) -> Result<Id, QueryError> {
        if self.name_taken(owner, kind, name, None) {
            return Err(QueryError::Conflict(format!("{} {name:?} already exists", kind.table())));
        }

        let table = self.attributes_mut(kind);
        let id = table.next_id();
        table.rows.insert(
            id,
            Attribute {
                id,
                user_id: owner.user_id(),
                name: name.to_string(),
            },
        );
        Ok(id)
    }

    async fn link_attribute(
        &mut self,
        kind: AttributeKind,
        recipe_id: Id,
        attribute_id: Id,
    ) -> Result<(), QueryError> {
        #[cfg(test)]
        if let Some(budget) = self.link_budget.as_mut() {
            if *budget == 0 {
                return Err(QueryError::Conflict("link budget exhausted".into()));
            }
            *budget -= 1;
        }

        self.links_mut(kind).insert((recipe_id, attribute_id));
        Ok(())
    }

    async fn unlink_attributes(
        &mut self,
        kind: AttributeKind,
        recipe_id: Id,
    ) -> Result<(), QueryError> {
        self.links_mut(kind).retain(|(r, _)| *r != recipe_id);
        Ok(())
    }
}

/// Process-local store. Writes that touch several rows run against a copy of
/// the state which replaces the original only once every step succeeded.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, QueryError> {
        let mut state = self.state.lock().await;
        if state.users.rows.values().any(|u| u.email == user.email) {
            return Err(QueryError::Conflict(format!("user {:?} already exists", user.email)));
        }

        let id = state.users.next_id();
        let user = User {
            id,
            email: user.email,
            name: user.name,
            password: user.password,
        };
        state.users.rows.insert(id, user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, QueryError> {
        let state = self.state.lock().await;
        Ok(state.users.rows.values().find(|u| u.email == email).cloned())
    }

    async fn list_recipes(
        &self,
        owner: &Owner,
        filter: &RecipeFilter,
    ) -> Result<Vec<RecipeDetail>, QueryError> {
        let state = self.state.lock().await;
        Ok(state
            .recipes
            .rows
            .values()
            .rev()
            .filter(|recipe| recipe.user_id == owner.user_id())
            .filter(|recipe| {
                state.matches(recipe.id, AttributeKind::Tag, filter.ids(AttributeKind::Tag))
                    && state.matches(
                        recipe.id,
                        AttributeKind::Ingredient,
                        filter.ids(AttributeKind::Ingredient),
                    )
            })
            .map(|recipe| state.detail(recipe))
            .collect())
    }

    async fn get_recipe(&self, owner: &Owner, id: Id) -> Result<Option<RecipeDetail>, QueryError> {
        let state = self.state.lock().await;
        Ok(state.owned_recipe(owner, id).map(|recipe| state.detail(recipe)))
    }

    async fn create_recipe(
        &self,
        owner: &Owner,
        draft: RecipeDraft,
    ) -> Result<RecipeDetail, QueryError> {
        let mut state = self.state.lock().await;
        // working copy, swapped in on success
        let mut working = state.clone();

        let id = working.recipes.next_id();
        let recipe = Recipe {
            id,
            user_id: owner.user_id(),
            title: draft.title.to_owned(),
            time_minutes: draft.time_minutes,
            price: draft.price,
            description: draft.description.to_owned(),
            link: draft.link.to_owned(),
            image: None,
        };
        working.recipes.rows.insert(id, recipe.clone());

        for kind in [AttributeKind::Tag, AttributeKind::Ingredient] {
            attach_attributes(&mut working, owner, kind, id, draft.attributes(kind)).await?;
        }

        let detail = working.detail(&recipe);
        *state = working;
        Ok(detail)
    }

    async fn update_recipe(
        &self,
        owner: &Owner,
        id: Id,
        changes: RecipeChanges,
    ) -> Result<Option<RecipeDetail>, QueryError> {
        let mut state = self.state.lock().await;
        let Some(mut recipe) = state.owned_recipe(owner, id).cloned() else {
            return Ok(None);
        };
        // working copy, swapped in on success
        let mut working = state.clone();

        for kind in [AttributeKind::Tag, AttributeKind::Ingredient] {
            if let Some(names) = changes.attributes(kind) {
                replace_attributes(&mut working, owner, kind, id, names).await?;
            }
        }
        changes.apply(&mut recipe);
        working.recipes.rows.insert(id, recipe.clone());

        let detail = working.detail(&recipe);
        *state = working;
        Ok(Some(detail))
    }

    async fn delete_recipe(&self, owner: &Owner, id: Id) -> Result<bool, QueryError> {
        let mut state = self.state.lock().await;
        if state.owned_recipe(owner, id).is_none() {
            return Ok(false);
        }

        state.recipes.rows.remove(&id);
        for kind in [AttributeKind::Tag, AttributeKind::Ingredient] {
            state.links_mut(kind).retain(|(r, _)| *r != id);
        }
        Ok(true)
    }

    async fn set_recipe_image(
        &self,
        owner: &Owner,
        id: Id,
        image: Option<String>,
    ) -> Result<Option<Option<String>>, QueryError> {
        let mut state = self.state.lock().await;
        if state.owned_recipe(owner, id).is_none() {
            return Ok(None);
        }

        Ok(state
            .recipes
            .rows
            .get_mut(&id)
            .map(|recipe| std::mem::replace(&mut recipe.image, image)))
    }

    async fn list_attributes(
        &self,
        owner: &Owner,
        kind: AttributeKind,
        filter: &AttributeFilter,
    ) -> Result<Vec<Attribute>, QueryError> {
        let state = self.state.lock().await;
        let links = state.links(kind);

        let mut rows: Vec<Attribute> = state
            .attributes(kind)
            .rows
            .values()
            .filter(|attribute| attribute.user_id == owner.user_id())
            .filter(|attribute| {
                !filter.assigned_only || links.iter().any(|(_, a)| *a == attribute.id)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.name.cmp(&a.name).then(b.id.cmp(&a.id)));

        Ok(rows)
    }

    async fn get_attribute(
        &self,
        owner: &Owner,
        kind: AttributeKind,
        id: Id,
    ) -> Result<Option<Attribute>, QueryError> {
        let state = self.state.lock().await;
        Ok(state.owned_attribute(owner, kind, id).cloned())
    }

    async fn create_attribute(
        &self,
        owner: &Owner,
        kind: AttributeKind,
        name: &str,
    ) -> Result<Attribute, QueryError> {
        let mut state = self.state.lock().await;
        let id = state.insert_attribute(owner, kind, name).await?;

        state
            .attributes(kind)
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| QueryError::Conflict(format!("{} {id} vanished", kind.table())))
    }

    async fn rename_attribute(
        &self,
        owner: &Owner,
        kind: AttributeKind,
        id: Id,
        name: &str,
    ) -> Result<Option<Attribute>, QueryError> {
        let mut state = self.state.lock().await;
        if state.owned_attribute(owner, kind, id).is_none() {
            return Ok(None);
        }
        if state.name_taken(owner, kind, name, Some(id)) {
            return Err(QueryError::Conflict(format!("{} {name:?} already exists", kind.table())));
        }

        Ok(state.attributes_mut(kind).rows.get_mut(&id).map(|attribute| {
            attribute.name = name.to_string();
            attribute.clone()
        }))
    }

    async fn delete_attribute(
        &self,
        owner: &Owner,
        kind: AttributeKind,
        id: Id,
    ) -> Result<bool, QueryError> {
        let mut state = self.state.lock().await;
        if state.owned_attribute(owner, kind, id).is_none() {
            return Ok(false);
        }

        state.attributes_mut(kind).rows.remove(&id);
        state.links_mut(kind).retain(|(_, a)| *a != id);
        Ok(true)
    }
}
