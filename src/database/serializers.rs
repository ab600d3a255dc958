use serde::{Deserialize, Serialize};

use super::{
    error::FieldErrors,
    form::{Form, FormData},
    schema::{
        Attribute, AttributeFilter, AttributeKind, Id, Recipe, RecipeChanges, RecipeDetail,
        RecipeDraft, RecipeFilter, User,
    },
};
use crate::constants::{MEDIA_URL, PRICE_DECIMAL_PLACES};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AttributeBody {
    pub id: Id,
    pub name: String,
}

impl From<&Attribute> for AttributeBody {
    fn from(value: &Attribute) -> Self {
        Self {
            id: value.id,
            name: value.name.to_owned(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeBody {
    pub id: Id,
    pub title: String,
    pub time_minutes: i32,
    pub price: String,
    pub link: String,
    pub description: String,
    pub tags: Vec<AttributeBody>,
    pub ingredients: Vec<AttributeBody>,
}

impl From<&RecipeDetail> for RecipeBody {
    fn from(value: &RecipeDetail) -> Self {
        let recipe = &value.recipe;
        Self {
            id: recipe.id,
            title: recipe.title.to_owned(),
            time_minutes: recipe.time_minutes,
            price: format_price(recipe),
            link: recipe.link.to_owned(),
            description: recipe.description.to_owned(),
            tags: value.tags.iter().map(AttributeBody::from).collect(),
            ingredients: value.ingredients.iter().map(AttributeBody::from).collect(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeDetailBody {
    #[serde(flatten)]
    pub recipe: RecipeBody,
    pub image: Option<String>,
}

impl From<&RecipeDetail> for RecipeDetailBody {
    fn from(value: &RecipeDetail) -> Self {
        Self {
            recipe: RecipeBody::from(value),
            image: image_url(value.recipe.image.as_deref()),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeImageBody {
    pub id: Id,
    pub image: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserBody {
    pub email: String,
    pub name: String,
}

impl From<&User> for UserBody {
    fn from(value: &User) -> Self {
        Self {
            email: value.email.to_owned(),
            name: value.name.to_owned(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenBody {
    pub token: String,
}

fn format_price(recipe: &Recipe) -> String {
    let mut price = recipe.price;
    price.rescale(PRICE_DECIMAL_PLACES);
    price.to_string()
}

/// Maps a stored media path to the URL it is served under.
pub fn image_url(path: Option<&str>) -> Option<String> {
    path.map(|path| format!("{MEDIA_URL}{path}"))
}

impl RecipeDraft {
    pub fn from_data(data: FormData) -> Result<Self, FieldErrors> {
        let mut form = Form::from_data(data);

        let title = form.get_str("title", true, false);
        let time_minutes = form.get_number("time_minutes", true);
        let price = form.get_price("price", true);
        let description = form.get_text("description", false);
        let link = form.get_str("link", false, true);
        let tags = form.get_named_list(AttributeKind::Tag.field());
        let ingredients = form.get_named_list(AttributeKind::Ingredient.field());
        form.finish()?;

        match (title, time_minutes, price) {
            (Some(title), Some(time_minutes), Some(price)) => Ok(Self {
                title,
                time_minutes,
                price,
                description: description.unwrap_or_default(),
                link: link.unwrap_or_default(),
                tags: tags.unwrap_or_default(),
                ingredients: ingredients.unwrap_or_default(),
            }),
            _ => Err(FieldErrors::single("non_field_errors", "Invalid data.")),
        }
    }
}

impl RecipeChanges {
    /// `partial` is PATCH semantics; otherwise the required scalars must be present.
    pub fn from_data(data: FormData, partial: bool) -> Result<Self, FieldErrors> {
        let mut form = Form::from_data(data);
        let required = !partial;

        let changes = Self {
            title: form.get_str("title", required, false),
            time_minutes: form.get_number("time_minutes", required),
            price: form.get_price("price", required),
            description: form.get_text("description", false),
            link: form.get_str("link", false, true),
            tags: form.get_named_list(AttributeKind::Tag.field()),
            ingredients: form.get_named_list(AttributeKind::Ingredient.field()),
        };
        form.finish()?;

        Ok(changes)
    }
}

/// Reads the `name` of a tag or ingredient payload.
pub fn attribute_name(data: FormData) -> Result<String, FieldErrors> {
    let mut form = Form::from_data(data);
    let name = form.get_str("name", true, false);
    form.finish()?;

    name.ok_or_else(|| FieldErrors::single("name", "This field is required."))
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct RecipeQuery {
    pub tags: Option<String>,
    pub ingredients: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct AttributeQuery {
    pub assigned_only: Option<String>,
}

/// Parses a comma separated id list such as `"1,2,3"`.
pub fn params_to_ints(raw: &str) -> Option<Vec<Id>> {
    raw.split(',').map(|id| id.trim().parse::<Id>().ok()).collect()
}

impl TryFrom<RecipeQuery> for RecipeFilter {
    type Error = FieldErrors;

    fn try_from(value: RecipeQuery) -> Result<Self, Self::Error> {
        let mut errors = FieldErrors::new();
        let mut parse = |key: &str, raw: Option<String>| {
            let raw = raw.filter(|raw| !raw.is_empty())?;
            let ids = params_to_ints(&raw);
            if ids.is_none() {
                errors.add(key, "Expected a comma-separated list of numeric ids.");
            }
            ids
        };

        let tags = parse(AttributeKind::Tag.field(), value.tags);
        let ingredients = parse(AttributeKind::Ingredient.field(), value.ingredients);
        errors.into_result()?;

        Ok(Self { tags, ingredients })
    }
}

impl TryFrom<AttributeQuery> for AttributeFilter {
    type Error = FieldErrors;

    fn try_from(value: AttributeQuery) -> Result<Self, Self::Error> {
        let assigned_only = match value.assigned_only.as_deref().map(str::trim) {
            None | Some("") => false,
            Some(raw) => {
                let flag: i64 = raw.parse().map_err(|_| {
                    FieldErrors::single("assigned_only", "A valid integer is required.")
                })?;
                flag != 0
            }
        };

        Ok(Self { assigned_only })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;

    fn data(value: serde_json::Value) -> FormData {
        serde_json::from_value(value).unwrap()
    }

    fn detail() -> RecipeDetail {
        RecipeDetail {
            recipe: Recipe {
                id: 3,
                user_id: 1,
                title: "Sample Recipe".into(),
                time_minutes: 30,
                price: Decimal::new(5, 0),
                description: "Sample description".into(),
                link: "http://example.com/recipe.pdf".into(),
                image: Some("uploads/recipe/a.png".into()),
            },
            tags: vec![Attribute {
                id: 1,
                user_id: 1,
                name: "Vegan".into(),
            }],
            ingredients: vec![],
        }
    }

    #[test]
    fn detail_body_renders_price_and_image_url() {
        let body = serde_json::to_value(RecipeDetailBody::from(&detail())).unwrap();

        assert_eq!(body["price"], "5.00");
        assert_eq!(body["image"], "/media/uploads/recipe/a.png");
        assert_eq!(body["tags"], json!([{"id": 1, "name": "Vegan"}]));
        assert_eq!(body["ingredients"], json!([]));
    }

    #[test]
    fn list_body_has_no_image() {
        let body = serde_json::to_value(RecipeBody::from(&detail())).unwrap();
        assert!(body.get("image").is_none());
    }

    #[test]
    fn draft_defaults_optional_fields() {
        let draft = RecipeDraft::from_data(data(json!({
            "title": "New Recipe",
            "time_minutes": 45,
            "price": "10.00",
            "user": 99,
        })))
        .unwrap();

        assert_eq!(draft.description, "");
        assert_eq!(draft.link, "");
        assert!(draft.tags.is_empty());
    }

    #[test]
    fn full_update_requires_scalars_but_patch_does_not() {
        assert!(RecipeChanges::from_data(data(json!({"title": "x"})), false).is_err());

        let changes = RecipeChanges::from_data(data(json!({"title": "x"})), true).unwrap();
        assert_eq!(changes.title.as_deref(), Some("x"));
        assert_eq!(changes.tags, None);
    }

    #[test]
    fn recipe_query_parses_id_lists() {
        let filter = RecipeFilter::try_from(RecipeQuery {
            tags: Some("1, 2".into()),
            ingredients: None,
        })
        .unwrap();
        assert_eq!(filter.tags, Some(vec![1, 2]));
        assert_eq!(filter.ingredients, None);

        let errors = RecipeFilter::try_from(RecipeQuery {
            tags: Some("1,abc".into()),
            ingredients: Some("x".into()),
        })
        .unwrap_err();
        assert!(errors.get("tags").is_some());
        assert!(errors.get("ingredients").is_some());
    }

    #[test]
    fn empty_query_value_means_no_filter() {
        let filter = RecipeFilter::try_from(RecipeQuery {
            tags: Some(String::new()),
            ingredients: None,
        })
        .unwrap();
        assert_eq!(filter, RecipeFilter::default());
    }

    #[test]
    fn assigned_only_flag() {
        let parse = |raw: Option<&str>| {
            AttributeFilter::try_from(AttributeQuery {
                assigned_only: raw.map(str::to_string),
            })
        };
        assert!(!parse(None).unwrap().assigned_only);
        assert!(!parse(Some("0")).unwrap().assigned_only);
        assert!(parse(Some("1")).unwrap().assigned_only);
        assert!(parse(Some("yes")).is_err());
    }
}
