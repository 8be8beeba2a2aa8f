use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo::User;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response returned after register or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
    pub message: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Full profile projection; `User` itself never serializes the hash.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
}

/// Partial profile update; absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub department: Option<String>,
    pub campus: Option<String>,
}

/// Directory search query string. `page` and `limit` are accepted as raw
/// strings so junk values fall back to defaults instead of a 400.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub category: Option<String>,
    pub query: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl SearchParams {
    pub fn page(&self) -> i64 {
        parse_or(self.page.as_deref(), 1).max(1)
    }

    pub fn limit(&self) -> i64 {
        parse_or(self.limit.as_deref(), 10).max(1)
    }

    /// Rows to skip for the requested page. Saturating so absurd page or
    /// limit values from the query string cannot overflow the multiply.
    pub fn offset(&self) -> i64 {
        self.page().saturating_sub(1).saturating_mul(self.limit())
    }
}

fn parse_or(value: Option<&str>, default: i64) -> i64 {
    value.and_then(|v| v.parse::<i64>().ok()).unwrap_or(default)
}

pub fn total_pages(total_count: i64, limit: i64) -> i64 {
    // limit is clamped to >= 1 before this is called
    (total_count + limit - 1) / limit
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<User>,
    pub total_count: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<&str>, limit: Option<&str>) -> SearchParams {
        SearchParams {
            category: Some("department".into()),
            query: Some("cs".into()),
            page: page.map(Into::into),
            limit: limit.map(Into::into),
        }
    }

    #[test]
    fn pagination_defaults_when_absent() {
        let p = params(None, None);
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), 10);
    }

    #[test]
    fn pagination_defaults_when_non_numeric() {
        let p = params(Some("two"), Some("lots"));
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), 10);
    }

    #[test]
    fn pagination_clamps_to_one() {
        let p = params(Some("0"), Some("-5"));
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), 1);
    }

    #[test]
    fn pagination_parses_numbers() {
        let p = params(Some("2"), Some("5"));
        assert_eq!(p.page(), 2);
        assert_eq!(p.limit(), 5);
    }

    #[test]
    fn offset_skips_previous_pages() {
        // 12 matches, page 2, limit 5 -> records 6..=10 start at offset 5
        let p = params(Some("2"), Some("5"));
        assert_eq!(p.offset(), 5);

        let first = params(None, None);
        assert_eq!(first.offset(), 0);
    }

    #[test]
    fn offset_saturates_on_extreme_page() {
        let max = i64::MAX.to_string();
        let p = params(Some(&max), Some("10"));
        let offset = p.offset();
        assert_eq!(offset, i64::MAX);
        assert!(offset >= 0);

        let q = params(Some(&max), Some(&max));
        assert_eq!(q.offset(), i64::MAX);
    }

    #[test]
    fn total_pages_is_ceiling_division() {
        assert_eq!(total_pages(12, 5), 3);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(0, 10), 0);
    }

    #[test]
    fn search_response_uses_camel_case_keys() {
        let res = SearchResponse {
            results: vec![],
            total_count: 12,
            total_pages: 3,
            current_page: 2,
        };
        let json = serde_json::to_string(&res).unwrap();
        assert!(json.contains("totalCount"));
        assert!(json.contains("totalPages"));
        assert!(json.contains("currentPage"));
    }
}
