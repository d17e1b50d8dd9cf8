//! Input rules for user-submitted data.

use std::collections::HashSet;

use foodgram_types::api::{RecipeWriteRequest, RegisterRequest};

use crate::error::ApiError;

pub const MAX_EMAIL_LEN: usize = 254;
pub const MAX_NAME_LEN: usize = 150;
pub const MAX_RECIPE_NAME_LEN: usize = 200;
pub const MIN_PASSWORD_LEN: usize = 8;
/// Upper bound for amounts and cooking times, the range of a SQL `INTEGER`
/// column in most databases.
pub const MAX_POSITIVE_INT: i64 = 2_147_483_647;

pub fn check_registration(req: &RegisterRequest) -> Result<(), ApiError> {
    check_email(&req.email)?;
    check_username(&req.username)?;
    check_length("first_name", &req.first_name, MAX_NAME_LEN)?;
    check_length("last_name", &req.last_name, MAX_NAME_LEN)?;
    check_password(&req.password)
}

pub fn check_email(email: &str) -> Result<(), ApiError> {
    check_length("email", email, MAX_EMAIL_LEN)?;
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        });
    if !valid {
        return Err(ApiError::validation("Enter a valid email address."));
    }
    Ok(())
}

/// Letters, digits and `_ . @ + -` only.
pub fn check_username(username: &str) -> Result<(), ApiError> {
    check_length("username", username, MAX_NAME_LEN)?;
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-');
    if !username.chars().all(allowed) {
        return Err(ApiError::validation(
            "username may contain only letters, digits and @/./+/-/_ characters.",
        ));
    }
    Ok(())
}

pub fn check_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters long."
        )));
    }
    Ok(())
}

/// Checks a recipe body. With `partial` set (PATCH) missing fields are fine;
/// otherwise every field must be present.
pub fn check_recipe(req: &RecipeWriteRequest, partial: bool) -> Result<(), ApiError> {
    if !partial {
        let missing = [
            ("ingredients", req.ingredients.is_none()),
            ("tags", req.tags.is_none()),
            ("name", req.name.is_none()),
            ("text", req.text.is_none()),
            ("cooking_time", req.cooking_time.is_none()),
        ];
        if let Some((field, _)) = missing.iter().find(|(_, absent)| *absent) {
            return Err(ApiError::validation(format!("{field} is required.")));
        }
    }

    if let Some(name) = &req.name {
        check_length("name", name, MAX_RECIPE_NAME_LEN)?;
    }
    if let Some(text) = &req.text {
        if text.trim().is_empty() {
            return Err(ApiError::validation("text may not be blank."));
        }
    }
    if let Some(cooking_time) = req.cooking_time {
        if !(1..=MAX_POSITIVE_INT).contains(&cooking_time) {
            return Err(ApiError::validation(format!(
                "cooking_time must be between 1 and {MAX_POSITIVE_INT}."
            )));
        }
    }
    if let Some(ingredients) = &req.ingredients {
        let mut seen = HashSet::new();
        for line in ingredients {
            if !(1..=MAX_POSITIVE_INT).contains(&line.amount) {
                return Err(ApiError::validation(format!(
                    "Ingredient amount must be between 1 and {MAX_POSITIVE_INT}."
                )));
            }
            if !seen.insert(line.id) {
                return Err(ApiError::validation(format!(
                    "Ingredient {} is listed more than once.",
                    line.id
                )));
            }
        }
    }
    Ok(())
}

/// Normalizes a tag color to uppercase `#RRGGBB`.
pub fn normalize_tag_color(color: &str) -> Result<String, ApiError> {
    let upper = color.trim().to_ascii_uppercase();
    let valid = upper.len() == 7
        && upper.starts_with('#')
        && upper[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(ApiError::validation(format!(
            "Tag color {color:?} is not a #RRGGBB hex value."
        )));
    }
    Ok(upper)
}

fn check_length(field: &str, value: &str, max: usize) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("{field} may not be blank.")));
    }
    if value.chars().count() > max {
        return Err(ApiError::validation(format!(
            "{field} must be at most {max} characters long."
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use foodgram_types::api::IngredientAmount;

    fn recipe() -> RecipeWriteRequest {
        RecipeWriteRequest {
            ingredients: Some(vec![IngredientAmount { id: 1, amount: 5 }]),
            tags: Some(vec![1]),
            name: Some("Soup".into()),
            text: Some("Boil water.".into()),
            cooking_time: Some(20),
        }
    }

    #[test]
    fn complete_recipe_passes() {
        assert!(check_recipe(&recipe(), false).is_ok());
    }

    #[test]
    fn zero_cooking_time_is_rejected() {
        let req = RecipeWriteRequest { cooking_time: Some(0), ..recipe() };
        assert!(matches!(check_recipe(&req, false), Err(ApiError::Validation(_))));
    }

    #[test]
    fn zero_amount_is_rejected() {
        let req = RecipeWriteRequest {
            ingredients: Some(vec![IngredientAmount { id: 1, amount: 0 }]),
            ..recipe()
        };
        assert!(matches!(check_recipe(&req, false), Err(ApiError::Validation(_))));
    }

    #[test]
    fn oversized_amount_and_cooking_time_are_rejected() {
        let req = RecipeWriteRequest {
            ingredients: Some(vec![IngredientAmount { id: 1, amount: i64::MAX }]),
            ..recipe()
        };
        assert!(matches!(check_recipe(&req, false), Err(ApiError::Validation(_))));

        let req = RecipeWriteRequest { cooking_time: Some(MAX_POSITIVE_INT + 1), ..recipe() };
        assert!(matches!(check_recipe(&req, false), Err(ApiError::Validation(_))));

        let req = RecipeWriteRequest {
            ingredients: Some(vec![IngredientAmount { id: 1, amount: MAX_POSITIVE_INT }]),
            ..recipe()
        };
        assert!(check_recipe(&req, false).is_ok());
    }

    #[test]
    fn duplicate_ingredient_ids_are_rejected() {
        let req = RecipeWriteRequest {
            ingredients: Some(vec![
                IngredientAmount { id: 3, amount: 1 },
                IngredientAmount { id: 3, amount: 2 },
            ]),
            ..recipe()
        };
        let err = check_recipe(&req, false).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn create_needs_every_field_but_update_does_not() {
        let req = RecipeWriteRequest { tags: None, ..recipe() };
        assert_eq!(check_recipe(&req, false).unwrap_err().to_string(), "tags is required.");

        let patch = RecipeWriteRequest { name: Some("New name".into()), ..Default::default() };
        assert!(check_recipe(&patch, true).is_ok());
    }

    #[test]
    fn usernames_follow_the_allowed_alphabet() {
        assert!(check_username("chef.bob+1@home").is_ok());
        assert!(check_username("шеф").is_ok());
        assert!(check_username("bad name").is_err());
        assert!(check_username("").is_err());
    }

    #[test]
    fn emails_need_a_domain() {
        assert!(check_email("cook@example.com").is_ok());
        assert!(check_email("cook@localhost").is_err());
        assert!(check_email("@example.com").is_err());
    }

    #[test]
    fn tag_colors_are_uppercased() {
        assert_eq!(normalize_tag_color("#e26c2d").unwrap(), "#E26C2D");
        assert!(normalize_tag_color("E26C2D").is_err());
        assert!(normalize_tag_color("#GGGGGG").is_err());
    }
}
