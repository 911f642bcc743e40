//! Name, ref, and path validation for the routes this crate owns (spec
//! §3 naming invariants): applied before a create/commit touches the
//! database so a malformed name never reaches `normalize()`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Must start with alphanumeric; dots are allowed since
/// `kohakuhub_db::repository::normalize` folds them away for uniqueness
/// rather than rejecting them outright.
static NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.-]*$").expect("valid regex"));

static REF_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9/_.-]*$").expect("valid regex"));

/// Path segments that would collide with the REST surface's own routes
/// (spec §6's `/api/...` tree) if allowed as a namespace or repo name.
static RESERVED_NAMES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "api", "git", "admin", "health", "metrics", "settings", "login", "logout", "signup",
        "register", "organizations", "orgs", "users", "repos", "repositories", "models",
        "datasets", "spaces", "tokens", "keys",
    ]
});

pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_PATH_LENGTH: usize = 4096;

/// Validates a repository or organization name.
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name cannot be empty".to_string());
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(format!("name must be at most {MAX_NAME_LENGTH} characters"));
    }
    if !NAME_REGEX.is_match(name) {
        return Err(
            "name must start with a letter or number and contain only letters, numbers, hyphens, underscores, and dots".to_string(),
        );
    }
    if RESERVED_NAMES.contains(&name.to_lowercase().as_str()) {
        return Err("this name is reserved".to_string());
    }
    Ok(())
}

/// Validates a git branch or tag name.
pub fn validate_ref_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("reference name cannot be empty".to_string());
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(format!("reference name must be at most {MAX_NAME_LENGTH} characters"));
    }
    if !REF_NAME_REGEX.is_match(name) {
        return Err("invalid reference name format".to_string());
    }
    if name.contains("..") || name.starts_with('/') || name.ends_with('/') || name.ends_with('.') {
        return Err("reference name contains invalid git sequences".to_string());
    }
    Ok(())
}

/// Validates a repo-relative path (spec §3: `/`-separated, no leading
/// slash, no `..`, no empty segments).
pub fn validate_path(path: &str) -> Result<(), String> {
    if path.len() > MAX_PATH_LENGTH {
        return Err(format!("path must be at most {MAX_PATH_LENGTH} characters"));
    }
    if path.starts_with('/') {
        return Err("path cannot start with '/'".to_string());
    }
    if path.contains('\0') {
        return Err("path cannot contain null bytes".to_string());
    }
    if path.split('/').any(|seg| seg.is_empty() || seg == "..") {
        return Err("path cannot contain '..' or empty segments".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_repo_names() {
        assert!(validate_name("my-repo").is_ok());
        assert!(validate_name("my_repo").is_ok());
        assert!(validate_name("bert.v2").is_ok());
        assert!(validate_name("MyRepo123").is_ok());
    }

    #[test]
    fn rejects_empty_reserved_and_malformed_names() {
        assert!(validate_name("").is_err());
        assert!(validate_name("-leading-dash").is_err());
        assert!(validate_name("has space").is_err());
        assert!(validate_name("api").is_err());
        assert!(validate_name("admin").is_err());
    }

    #[test]
    fn validates_ref_names() {
        assert!(validate_ref_name("main").is_ok());
        assert!(validate_ref_name("feature/test").is_ok());
        assert!(validate_ref_name("..").is_err());
        assert!(validate_ref_name("main/").is_err());
    }

    #[test]
    fn validates_paths() {
        assert!(validate_path("src/main.rs").is_ok());
        assert!(validate_path("/leading").is_err());
        assert!(validate_path("a/../b").is_err());
        assert!(validate_path("a//b").is_err());
    }
}
