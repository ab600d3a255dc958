use rust_decimal::Decimal;
use serde::Serialize;

use super::error::FieldErrors;
use crate::{authentication::cryptography::hash_password, constants::PASSWORD_MIN_LENGTH};

pub type Id = i32;

/// The two owned, named sub-entities a recipe links to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Tag,
    Ingredient,
}

impl AttributeKind {
    pub fn table(&self) -> &'static str {
        match self {
            AttributeKind::Tag => "tags",
            AttributeKind::Ingredient => "ingredients",
        }
    }

    pub fn link_table(&self) -> &'static str {
        match self {
            AttributeKind::Tag => "recipe_tags",
            AttributeKind::Ingredient => "recipe_ingredients",
        }
    }

    pub fn link_column(&self) -> &'static str {
        match self {
            AttributeKind::Tag => "tag_id",
            AttributeKind::Ingredient => "ingredient_id",
        }
    }

    /// Payload key used for the nested list on a recipe
    pub fn field(&self) -> &'static str {
        match self {
            AttributeKind::Tag => "tags",
            AttributeKind::Ingredient => "ingredients",
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub name: String,
    pub password: String,
}

/// A validated user ready to be inserted. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password: String,
}

impl NewUser {
    pub fn new(email: &str, password: &str, name: &str) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();

        let email = normalize_email(email);
        if email.is_empty() {
            errors.add("email", "Users must have an email address.");
        } else if !is_valid_email(&email) {
            errors.add("email", "Enter a valid email address.");
        }
        if password.chars().count() < PASSWORD_MIN_LENGTH {
            errors.add(
                "password",
                &format!("Ensure this field has at least {PASSWORD_MIN_LENGTH} characters."),
            );
        }
        errors.into_result()?;

        let password = hash_password(password)
            .map_err(|_| FieldErrors::single("password", "Password could not be hashed."))?;

        Ok(Self {
            email,
            name: name.trim().to_string(),
            password,
        })
    }
}

/// Lower-cases the domain part of an email, leaving the local part intact.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// `local@domain.tld` shape: one `@`, no whitespace, a dotted domain with non-empty labels.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub id: Id,
    pub user_id: Id,
    pub name: String,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct LinkedAttribute {
    pub recipe_id: Id,
    pub id: Id,
    pub user_id: Id,
    pub name: String,
}

impl From<LinkedAttribute> for Attribute {
    fn from(value: LinkedAttribute) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            name: value.name,
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub id: Id,
    pub user_id: Id,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub description: String,
    pub link: String,
    pub image: Option<String>,
}

/// A recipe together with its linked tags and ingredients, each ordered by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDetail {
    pub recipe: Recipe,
    pub tags: Vec<Attribute>,
    pub ingredients: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDraft {
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub description: String,
    pub link: String,
    pub tags: Vec<String>,
    pub ingredients: Vec<String>,
}

/// Changes for an existing recipe. `None` leaves the stored value untouched;
/// `Some(vec![])` on a relation clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub tags: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
}

impl RecipeChanges {
    pub fn attributes(&self, kind: AttributeKind) -> Option<&[String]> {
        match kind {
            AttributeKind::Tag => self.tags.as_deref(),
            AttributeKind::Ingredient => self.ingredients.as_deref(),
        }
    }

    /// Copies the scalar fields onto `recipe`
    pub fn apply(&self, recipe: &mut Recipe) {
        if let Some(title) = &self.title {
            recipe.title = title.to_owned();
        }
        if let Some(time_minutes) = self.time_minutes {
            recipe.time_minutes = time_minutes;
        }
        if let Some(price) = self.price {
            recipe.price = price;
        }
        if let Some(description) = &self.description {
            recipe.description = description.to_owned();
        }
        if let Some(link) = &self.link {
            recipe.link = link.to_owned();
        }
    }
}

impl RecipeDraft {
    pub fn attributes(&self, kind: AttributeKind) -> &[String] {
        match kind {
            AttributeKind::Tag => &self.tags,
            AttributeKind::Ingredient => &self.ingredients,
        }
    }
}

/// Recipe listing filter; each set matches recipes linked to at least one id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<Id>>,
}

impl RecipeFilter {
    pub fn ids(&self, kind: AttributeKind) -> Option<&[Id]> {
        match kind {
            AttributeKind::Tag => self.tags.as_deref(),
            AttributeKind::Ingredient => self.ingredients.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttributeFilter {
    pub assigned_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authentication::cryptography::verify_password;

    #[test]
    fn email_domain_is_lowercased() {
        let samples = [
            ("test1@EXAMPLE.com", "test1@example.com"),
            ("Test2@Example.com", "Test2@example.com"),
            ("TEST3@EXAMPLE.COM", "TEST3@example.com"),
            ("test4@example.COM", "test4@example.com"),
        ];
        for (email, expected) in samples {
            assert_eq!(normalize_email(email), expected);
        }
    }

    #[test]
    fn new_user_without_email_is_rejected() {
        let errors = NewUser::new("", "test123", "").unwrap_err();
        assert!(errors.get("email").is_some());
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for email in ["plainaddress", "@example.com", "user@", "user@localhost", "a b@example.com", "user@example..com", "a@b@example.com"] {
            assert!(!is_valid_email(email), "{email}");
            let errors = NewUser::new(email, "testpass123", "Test").unwrap_err();
            assert!(errors.get("email").is_some(), "{email}");
        }
        assert!(is_valid_email("first.last+tag@mail.example.com"));
    }

    #[test]
    fn new_user_hashes_password() {
        let user = NewUser::new("test@example.com", "testpass123", "Test").unwrap();

        assert_eq!(user.email, "test@example.com");
        assert_ne!(user.password, "testpass123");
        assert!(verify_password("testpass123", &user.password).unwrap());
    }

    #[test]
    fn short_password_is_rejected() {
        let errors = NewUser::new("test@example.com", "pw", "").unwrap_err();
        assert!(errors.get("password").is_some());
    }

    #[test]
    fn changes_only_touch_present_fields() {
        let mut recipe = Recipe {
            id: 1,
            user_id: 1,
            title: "Original".into(),
            time_minutes: 10,
            price: Decimal::new(500, 2),
            description: String::new(),
            link: "https://example.com/original.pdf".into(),
            image: None,
        };
        let changes = RecipeChanges {
            title: Some("Updated".into()),
            ..Default::default()
        };

        changes.apply(&mut recipe);

        assert_eq!(recipe.title, "Updated");
        assert_eq!(recipe.link, "https://example.com/original.pdf");
        assert_eq!(recipe.time_minutes, 10);
    }
}
