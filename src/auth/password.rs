use super::AuthError;

const SPECIAL_CHARACTERS: &str = "!@#$%^&";

/// Hash a password with bcrypt. Runs on the blocking pool.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Compare a password against a stored bcrypt hash. A malformed hash never matches.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_string();
    let hash = hash.to_string();
    let matched = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(matched)
}

/// Parent password rules. Returns the message to show on failure.
pub fn validate_user_password(password: &str) -> Option<&'static str> {
    let length = password.chars().count();
    if length < 8 {
        return Some("Password must be longer than 8 characters");
    }
    if length > 72 {
        return Some("Password must be less than 72 characters");
    }
    if password.starts_with(' ') || password.ends_with(' ') {
        return Some("Password must not start or end with empty spaces");
    }

    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| SPECIAL_CHARACTERS.contains(c));
    if !(has_lower && has_upper && has_digit && has_special) {
        return Some(
            "Password must contain one upper case, lower case, number and special character",
        );
    }
    None
}

/// Member password rules
pub fn validate_member_password(password: &str) -> Option<&'static str> {
    let length = password.chars().count();
    if length <= 3 {
        return Some("Password must be 4 characters or more");
    }
    if length >= 11 {
        return Some("Password be less than 10 characters");
    }
    if password.starts_with(' ') || password.ends_with(' ') {
        return Some("Password must not start or end with empty spaces");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_password_rules() {
        assert_eq!(
            validate_user_password("AB123"),
            Some("Password must be longer than 8 characters")
        );
        assert_eq!(
            validate_user_password(&"Aa1!".repeat(19)),
            Some("Password must be less than 72 characters")
        );
        assert_eq!(
            validate_user_password(" Aa1!aaaa"),
            Some("Password must not start or end with empty spaces")
        );
        assert_eq!(
            validate_user_password("11AAaabb"),
            Some("Password must contain one upper case, lower case, number and special character")
        );
        assert_eq!(validate_user_password("11AAaa!!"), None);
    }

    #[test]
    fn member_password_rules() {
        assert_eq!(validate_member_password("abc"), Some("Password must be 4 characters or more"));
        assert_eq!(validate_member_password("abcdefghijk"), Some("Password be less than 10 characters"));
        assert_eq!(
            validate_member_password(" kid1"),
            Some("Password must not start or end with empty spaces")
        );
        assert_eq!(validate_member_password("kid1"), None);
        assert_eq!(validate_member_password("abcdefghij"), None);
    }

    #[tokio::test]
    async fn hash_round_trip() {
        let hash = hash_password("kid1", 4).await.unwrap();
        assert_ne!(hash, "kid1");
        assert!(verify_password("kid1", &hash).await.unwrap());
        assert!(!verify_password("kid2", &hash).await.unwrap());
        assert!(!verify_password("kid1", "not-a-hash").await.unwrap());
    }
}
