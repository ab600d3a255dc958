use warp::{
    http::StatusCode,
    multipart,
    reject::Rejection,
    reply::{self, Reply},
};

use super::{
    filters::AppState,
    images::{read_image_field, remove_image, save_image, validate_image},
};
use crate::{
    authentication::accounts::{login_user, register_user},
    database::{
        error::{ApiError, FieldErrors, QueryError},
        form::{Form, FormData},
        schema::{AttributeFilter, AttributeKind, Id, NewUser, RecipeChanges, RecipeDraft, RecipeFilter},
        serializers::{
            attribute_name, image_url, AttributeBody, AttributeQuery, RecipeBody,
            RecipeDetailBody, RecipeImageBody, RecipeQuery, TokenBody, UserBody,
        },
        store::Owner,
    },
};

fn json<T: serde::Serialize>(body: &T, status: StatusCode) -> reply::WithStatus<reply::Json> {
    reply::with_status(reply::json(body), status)
}

fn no_content() -> reply::WithStatus<&'static str> {
    reply::with_status("", StatusCode::NO_CONTENT)
}

pub async fn create_user(data: FormData, state: AppState) -> Result<impl Reply, Rejection> {
    let mut form = Form::from_data(data);
    let email = form.get_str("email", true, false);
    let password = form.get_str("password", true, false);
    let name = form.get_str("name", true, false);
    form.finish().map_err(ApiError::from)?;

    let (Some(email), Some(password), Some(name)) = (email, password, name) else {
        return Err(ApiError::BadRequest("Invalid data.".into()).into());
    };
    let user = NewUser::new(&email, &password, &name).map_err(ApiError::from)?;
    let user = register_user(state.store.as_ref(), user).await?;

    Ok(json(&UserBody::from(&user), StatusCode::CREATED))
}

pub async fn create_token(data: FormData, state: AppState) -> Result<impl Reply, Rejection> {
    let mut form = Form::from_data(data);
    let email = form.get_str("email", true, false);
    let password = form.get_str("password", true, false);
    form.finish().map_err(ApiError::from)?;

    let (Some(email), Some(password)) = (email, password) else {
        return Err(ApiError::BadRequest("Invalid data.".into()).into());
    };
    let token = login_user(state.store.as_ref(), &state.config, &email, &password).await?;

    Ok(json(&TokenBody { token }, StatusCode::OK))
}

pub async fn list_recipes(
    owner: Owner,
    query: RecipeQuery,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let filter = RecipeFilter::try_from(query).map_err(ApiError::from)?;
    let recipes = state
        .store
        .list_recipes(&owner, &filter)
        .await
        .map_err(ApiError::from)?;

    let body: Vec<RecipeBody> = recipes.iter().map(RecipeBody::from).collect();
    Ok(json(&body, StatusCode::OK))
}

pub async fn create_recipe(
    owner: Owner,
    data: FormData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let draft = RecipeDraft::from_data(data).map_err(ApiError::from)?;
    let recipe = state
        .store
        .create_recipe(&owner, draft)
        .await
        .map_err(ApiError::from)?;

    log::info!("User {} created recipe {}", owner.user_id(), recipe.recipe.id);
    Ok(json(&RecipeDetailBody::from(&recipe), StatusCode::CREATED))
}

pub async fn retrieve_recipe(id: Id, owner: Owner, state: AppState) -> Result<impl Reply, Rejection> {
    let recipe = state
        .store
        .get_recipe(&owner, id)
        .await
        .map_err(ApiError::from)?
        .ok_or(ApiError::NotFound)?;

    Ok(json(&RecipeDetailBody::from(&recipe), StatusCode::OK))
}

async fn update_recipe(
    id: Id,
    owner: Owner,
    data: FormData,
    partial: bool,
    state: AppState,
) -> Result<reply::WithStatus<reply::Json>, Rejection> {
    let changes = RecipeChanges::from_data(data, partial).map_err(ApiError::from)?;
    let recipe = state
        .store
        .update_recipe(&owner, id, changes)
        .await
        .map_err(ApiError::from)?
        .ok_or(ApiError::NotFound)?;

    Ok(json(&RecipeDetailBody::from(&recipe), StatusCode::OK))
}

pub async fn replace_recipe(
    id: Id,
    owner: Owner,
    data: FormData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    update_recipe(id, owner, data, false, state).await
}

pub async fn patch_recipe(
    id: Id,
    owner: Owner,
    data: FormData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    update_recipe(id, owner, data, true, state).await
}

pub async fn delete_recipe(id: Id, owner: Owner, state: AppState) -> Result<impl Reply, Rejection> {
    let deleted = state
        .store
        .delete_recipe(&owner, id)
        .await
        .map_err(ApiError::from)?;
    if !deleted {
        return Err(ApiError::NotFound.into());
    }

    log::info!("User {} deleted recipe {id}", owner.user_id());
    Ok(no_content())
}

/// Replaces the recipe image. The previous file is removed once the new path is stored.
pub async fn upload_recipe_image(
    id: Id,
    owner: Owner,
    form: multipart::FormData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let store = state.store.as_ref();
    let media_root = state.config.media_root.as_path();

    store
        .get_recipe(&owner, id)
        .await
        .map_err(ApiError::from)?
        .ok_or(ApiError::NotFound)?;

    let data = read_image_field(form).await?;
    let extension = validate_image(&data).map_err(ApiError::from)?;
    let path = save_image(media_root, &data, extension).await?;

    let previous = match store.set_recipe_image(&owner, id, Some(path.clone())).await {
        Ok(Some(previous)) => previous,
        Ok(None) => {
            remove_image(media_root, &path).await;
            return Err(ApiError::NotFound.into());
        }
        Err(e) => {
            remove_image(media_root, &path).await;
            return Err(ApiError::from(e).into());
        }
    };

    if let Some(previous) = previous.filter(|previous| *previous != path) {
        remove_image(media_root, &previous).await;
    }

    Ok(json(
        &RecipeImageBody {
            id,
            image: image_url(Some(&path)),
        },
        StatusCode::OK,
    ))
}

fn name_taken(kind: AttributeKind) -> FieldErrors {
    let label = match kind {
        AttributeKind::Tag => "tag",
        AttributeKind::Ingredient => "ingredient",
    };
    FieldErrors::single("name", &format!("A {label} with this name already exists."))
}

fn attribute_conflict(kind: AttributeKind, e: QueryError) -> ApiError {
    match e {
        QueryError::Conflict(_) => name_taken(kind).into(),
        e => e.into(),
    }
}

pub async fn list_attributes(
    kind: AttributeKind,
    owner: Owner,
    query: AttributeQuery,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let filter = AttributeFilter::try_from(query).map_err(ApiError::from)?;
    let attributes = state
        .store
        .list_attributes(&owner, kind, &filter)
        .await
        .map_err(ApiError::from)?;

    let body: Vec<AttributeBody> = attributes.iter().map(AttributeBody::from).collect();
    Ok(json(&body, StatusCode::OK))
}

pub async fn create_attribute(
    kind: AttributeKind,
    owner: Owner,
    data: FormData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let name = attribute_name(data).map_err(ApiError::from)?;
    let attribute = state
        .store
        .create_attribute(&owner, kind, &name)
        .await
        .map_err(|e| attribute_conflict(kind, e))?;

    Ok(json(&AttributeBody::from(&attribute), StatusCode::CREATED))
}

pub async fn retrieve_attribute(
    kind: AttributeKind,
    id: Id,
    owner: Owner,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let attribute = state
        .store
        .get_attribute(&owner, kind, id)
        .await
        .map_err(ApiError::from)?
        .ok_or(ApiError::NotFound)?;

    Ok(json(&AttributeBody::from(&attribute), StatusCode::OK))
}

async fn update_attribute(
    kind: AttributeKind,
    id: Id,
    owner: Owner,
    data: FormData,
    partial: bool,
    state: AppState,
) -> Result<reply::WithStatus<reply::Json>, Rejection> {
    let store = state.store.as_ref();

    // PATCH without a name leaves the row as it is.
    let attribute = if partial && !data.contains_key("name") {
        store.get_attribute(&owner, kind, id).await
    } else {
        let name = attribute_name(data).map_err(ApiError::from)?;
        store.rename_attribute(&owner, kind, id, &name).await
    };
    let attribute = attribute
        .map_err(|e| attribute_conflict(kind, e))?
        .ok_or(ApiError::NotFound)?;

    Ok(json(&AttributeBody::from(&attribute), StatusCode::OK))
}

pub async fn replace_attribute(
    kind: AttributeKind,
    id: Id,
    owner: Owner,
    data: FormData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    update_attribute(kind, id, owner, data, false, state).await
}

pub async fn patch_attribute(
    kind: AttributeKind,
    id: Id,
    owner: Owner,
    data: FormData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    update_attribute(kind, id, owner, data, true, state).await
}

pub async fn delete_attribute(
    kind: AttributeKind,
    id: Id,
    owner: Owner,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let deleted = state
        .store
        .delete_attribute(&owner, kind, id)
        .await
        .map_err(ApiError::from)?;
    if !deleted {
        return Err(ApiError::NotFound.into());
    }

    Ok(no_content())
}
