//! Shared fixtures for unit tests: a seeded in-memory state.

use uuid::Uuid;

use crate::catalog::repo_types::{Ingredient, NewTag, Tag};
use crate::recipes::dto::{CreateRecipeRequest, IngredientAmount};
use crate::state::AppState;
use crate::store::Store;
use crate::users::repo_types::NewUser;

pub struct Fixture {
    pub state: AppState,
    pub author: Uuid,
    pub reader: Uuid,
    pub flour: Ingredient,
    pub flour_cup: Ingredient,
    pub egg: Ingredient,
    pub sugar: Ingredient,
    pub breakfast: Tag,
    pub dinner: Tag,
}

impl Fixture {
    pub async fn new() -> Self {
        let state = AppState::fake();
        let mut tx = state.store.begin().await.unwrap();

        let user = |username: &str| NewUser {
            id: None,
            email: format!("{username}@example.com"),
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
        };
        let author = tx.upsert_user(&user("author")).await.unwrap().id;
        let reader = tx.upsert_user(&user("reader")).await.unwrap().id;

        let flour = tx.insert_ingredient("flour", "g").await.unwrap();
        let flour_cup = tx.insert_ingredient("flour", "cup").await.unwrap();
        let egg = tx.insert_ingredient("egg", "unit").await.unwrap();
        let sugar = tx.insert_ingredient("sugar", "g").await.unwrap();

        let tag = |name: &str, color: &str| NewTag {
            name: name.to_string(),
            color: color.to_string(),
            slug: name.to_lowercase(),
        };
        let breakfast = tx.upsert_tag(&tag("Breakfast", "#E26C2D")).await.unwrap();
        let dinner = tx.upsert_tag(&tag("Dinner", "#8775D2")).await.unwrap();

        tx.commit().await.unwrap();

        Self {
            state,
            author,
            reader,
            flour,
            flour_cup,
            egg,
            sugar,
            breakfast,
            dinner,
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.state.store.as_ref()
    }

    pub fn recipe_request(&self, name: &str, lines: Vec<IngredientAmount>) -> CreateRecipeRequest {
        CreateRecipeRequest {
            name: name.to_string(),
            text: format!("How to make {name}"),
            cooking_time: 20,
            image: None,
            tags: vec![self.breakfast.id],
            ingredients: lines,
        }
    }
}

pub fn by_id(ingredient: &Ingredient, amount: i32) -> IngredientAmount {
    IngredientAmount {
        id: Some(ingredient.id),
        name: None,
        measurement_unit: None,
        amount,
    }
}

pub fn by_name(name: &str, measurement_unit: &str, amount: i32) -> IngredientAmount {
    IngredientAmount {
        id: None,
        name: Some(name.to_string()),
        measurement_unit: Some(measurement_unit.to_string()),
        amount,
    }
}
