use serde::{Deserialize, Serialize};

use crate::utils::text::{contains_brand, contains_model, normalize};

/// Brand/model search terms.
///
/// Terms are trimmed and lower-cased on construction; that form goes into the
/// search URL. Matching against card names works on the normalized form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub brand: Option<String>,
    pub model: String,
}

impl Filter {
    pub fn new(brand: Option<&str>, model: &str) -> Self {
        let brand = brand
            .map(|b| b.trim().to_lowercase())
            .filter(|b| !b.is_empty());
        Self {
            brand,
            model: model.trim().to_lowercase(),
        }
    }

    /// True when no model constraint applies and every card passes the model check.
    pub fn is_unrestricted(&self) -> bool {
        normalize(&self.model).is_empty()
    }

    /// Applies the brand substring check and the whole-word model check to a card name.
    pub fn matches(&self, name: &str) -> bool {
        if let Some(brand) = &self.brand {
            if !contains_brand(name, brand) {
                return false;
            }
        }
        contains_model(name, &self.model)
    }
}
