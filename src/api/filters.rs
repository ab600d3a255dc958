use std::{convert::Infallible, sync::Arc};

use warp::{reject::Rejection, reply::Reply, Filter};

use super::{handlers, rejection::handle_rejection};
use crate::{
    authentication::middleware::with_owner,
    config::Config,
    constants::{MAX_JSON_BODY_SIZE, MAX_UPLOAD_SIZE},
    database::{
        form::FormData,
        schema::{AttributeKind, Id},
        serializers::{AttributeQuery, RecipeQuery},
        store::DynStore,
    },
};

/// Shared handles every handler receives.
#[derive(Clone)]
pub struct AppState {
    pub store: DynStore,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: DynStore, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_body() -> impl Filter<Extract = (FormData,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_JSON_BODY_SIZE).and(warp::body::json())
}

fn user_routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let create = warp::path!("api" / "user" / "create")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::create_user);

    let token = warp::path!("api" / "user" / "token")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state))
        .and_then(handlers::create_token);

    create.or(token)
}

fn recipe_routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let owner = with_owner(state.config.clone());

    let list = warp::path!("api" / "recipe" / "recipes")
        .and(warp::get())
        .and(owner.clone())
        .and(warp::query::<RecipeQuery>())
        .and(with_state(state.clone()))
        .and_then(handlers::list_recipes);

    let create = warp::path!("api" / "recipe" / "recipes")
        .and(warp::post())
        .and(owner.clone())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::create_recipe);

    let retrieve = warp::path!("api" / "recipe" / "recipes" / Id)
        .and(warp::get())
        .and(owner.clone())
        .and(with_state(state.clone()))
        .and_then(handlers::retrieve_recipe);

    let replace = warp::path!("api" / "recipe" / "recipes" / Id)
        .and(warp::put())
        .and(owner.clone())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::replace_recipe);

    let patch = warp::path!("api" / "recipe" / "recipes" / Id)
        .and(warp::patch())
        .and(owner.clone())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::patch_recipe);

    let delete = warp::path!("api" / "recipe" / "recipes" / Id)
        .and(warp::delete())
        .and(owner.clone())
        .and(with_state(state.clone()))
        .and_then(handlers::delete_recipe);

    let upload_image = warp::path!("api" / "recipe" / "recipes" / Id / "upload-image")
        .and(warp::post())
        .and(owner)
        .and(warp::multipart::form().max_length(MAX_UPLOAD_SIZE))
        .and(with_state(state))
        .and_then(handlers::upload_recipe_image);

    list.or(create)
        .or(retrieve)
        .or(replace)
        .or(patch)
        .or(delete)
        .or(upload_image)
}

/// Tags and ingredients share their handlers; `segment` is the collection name in the URL.
fn attribute_routes(
    segment: &'static str,
    kind: AttributeKind,
    state: AppState,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let owner = with_owner(state.config.clone());
    let collection = warp::path("api")
        .and(warp::path("recipe"))
        .and(warp::path(segment))
        .map(move || kind);
    let index = collection.clone().and(warp::path::end());
    let item = collection.and(warp::path::param::<Id>()).and(warp::path::end());

    let list = index
        .clone()
        .and(warp::get())
        .and(owner.clone())
        .and(warp::query::<AttributeQuery>())
        .and(with_state(state.clone()))
        .and_then(handlers::list_attributes);

    let create = index
        .and(warp::post())
        .and(owner.clone())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::create_attribute);

    let retrieve = item
        .clone()
        .and(warp::get())
        .and(owner.clone())
        .and(with_state(state.clone()))
        .and_then(handlers::retrieve_attribute);

    let replace = item
        .clone()
        .and(warp::put())
        .and(owner.clone())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::replace_attribute);

    let patch = item
        .clone()
        .and(warp::patch())
        .and(owner.clone())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::patch_attribute);

    let delete = item
        .and(warp::delete())
        .and(owner)
        .and(with_state(state))
        .and_then(handlers::delete_attribute);

    list.or(create)
        .or(retrieve)
        .or(replace)
        .or(patch)
        .or(delete)
}

/// The complete API, including uploaded media under `/media/`.
pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let media = warp::path("media").and(warp::fs::dir(state.config.media_root.clone()));

    user_routes(state.clone())
        .or(recipe_routes(state.clone()))
        .or(attribute_routes("tags", AttributeKind::Tag, state.clone()))
        .or(attribute_routes("ingredients", AttributeKind::Ingredient, state))
        .or(media)
        .recover(handle_rejection)
        .with(warp::log("recipe_api"))
}
