use serde::{Deserialize, Serialize};

use crate::domain::FoodId;

/// A food entry as served by the REST collaborator. `id` is assigned by the
/// server on creation and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodRecord {
    pub id: FoodId,
    pub name: String,
    pub description: String,
    pub price: String,
    pub available: bool,
    pub image: String,
}

/// Creation input: a record minus the server-assigned `id` and minus
/// `available`, which the creator always submits as `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodDraft {
    pub name: String,
    pub description: String,
    pub price: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFoodRequest {
    pub name: String,
    pub description: String,
    pub price: String,
    pub image: String,
    pub available: bool,
}

impl FoodDraft {
    pub fn into_create_request(self) -> CreateFoodRequest {
        CreateFoodRequest {
            name: self.name,
            description: self.description,
            price: self.price,
            image: self.image,
            available: true,
        }
    }
}

/// Partial set of mutable fields. The id is not patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
}

impl FoodPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.image.is_none()
            && self.available.is_none()
    }

    pub fn availability(available: bool) -> Self {
        Self {
            available: Some(available),
            ..Self::default()
        }
    }
}

impl FoodRecord {
    /// Field-merge of `patch` over `self`. The id always comes from `self`.
    pub fn merged_with(&self, patch: &FoodPatch) -> FoodRecord {
        FoodRecord {
            id: self.id,
            name: patch.name.clone().unwrap_or_else(|| self.name.clone()),
            description: patch
                .description
                .clone()
                .unwrap_or_else(|| self.description.clone()),
            price: patch.price.clone().unwrap_or_else(|| self.price.clone()),
            available: patch.available.unwrap_or(self.available),
            image: patch.image.clone().unwrap_or_else(|| self.image.clone()),
        }
    }
}
