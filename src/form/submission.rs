use serde::{Deserialize, Serialize};

use crate::parser::{WishToken, MAX_WISHES};

/// A wish-form submission as stored in the students CSV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSubmission {
    pub timestamp: String,
    pub class: String,
    pub surname: String,
    pub first_name: String,
    /// Raw wish tokens in rank order, at most `MAX_WISHES`.
    pub wishes: Vec<String>,
}

/// Wish-form submission request from the frontend.
#[derive(Debug, Deserialize)]
pub struct WishFormRequest {
    pub class: String,
    pub surname: String,
    pub first_name: String,
    pub wishes: Vec<String>,
}

/// Validates a wish-form submission.
///
/// `company_count` bounds numeric wish tokens when the company table is
/// already loaded; literal company names are accepted as-is.
pub fn validate_submission(
    req: &WishFormRequest,
    company_count: Option<usize>,
) -> Result<(), String> {
    if req.class.trim().is_empty() {
        return Err("Class is required".to_string());
    }
    if req.surname.trim().is_empty() {
        return Err("Surname is required".to_string());
    }
    if req.first_name.trim().is_empty() {
        return Err("First name is required".to_string());
    }

    if req.wishes.len() > MAX_WISHES {
        return Err(format!("At most {} wishes are allowed", MAX_WISHES));
    }
    if req.wishes.iter().all(|w| w.trim().is_empty()) {
        return Err("At least one wish is required".to_string());
    }

    // Numeric wish tokens must point at an existing company row
    if let Some(count) = company_count {
        for wish in &req.wishes {
            if let Some(WishToken::Index(n)) = WishToken::parse(wish) {
                if n < 1 || n > count {
                    return Err(format!(
                        "Wish '{}' is not a valid company number (1-{})",
                        wish.trim(),
                        count
                    ));
                }
            }
        }
    }

    Ok(())
}
