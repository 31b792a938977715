use crate::error::{AppError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static USERNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9_.-]+$").unwrap()
});

/// 验证用户名格式
/// 用户名是资料的主键，创建后不可变更
pub fn validate_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(AppError::Validation("用户名不能为空".to_string()));
    }

    if username.chars().count() < 3 {
        return Err(AppError::Validation("用户名至少需要3个字符".to_string()));
    }

    if username.chars().count() > 30 {
        return Err(AppError::Validation("用户名不能超过30个字符".to_string()));
    }

    if !USERNAME_REGEX.is_match(username) {
        return Err(AppError::Validation("用户名只能包含字母、数字、点、下划线和连字符".to_string()));
    }

    Ok(())
}

/// 验证显示名称格式
pub fn validate_display_name(display_name: &str) -> Result<()> {
    if display_name.trim().is_empty() {
        return Err(AppError::Validation("显示名称不能为空".to_string()));
    }

    if display_name.chars().count() > 50 {
        return Err(AppError::Validation("显示名称不能超过50个字符".to_string()));
    }

    Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < 6 {
        return Err(AppError::Validation("密码至少需要6个字符".to_string()));
    }
    Ok(())
}

/// 验证文本内容（评论、回复、简介、视频描述）
pub fn validate_text(field: &str, text: &str, max_len: usize, allow_empty: bool) -> Result<()> {
    if !allow_empty && text.trim().is_empty() {
        return Err(AppError::Validation(format!("{}不能为空", field)));
    }

    if text.chars().count() > max_len {
        return Err(AppError::Validation(format!("{}不能超过{}个字符", field, max_len)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        // 有效用户名
        assert!(validate_username("user123").is_ok());
        assert!(validate_username("test_user").is_ok());
        assert!(validate_username("user-name").is_ok());
        assert!(validate_username("dance.queen").is_ok());

        // 无效用户名
        assert!(validate_username("").is_err());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("user@name").is_err());
        assert!(validate_username("user:name").is_err());
        assert!(validate_username(&"a".repeat(31)).is_err());
    }

    #[test]
    fn test_validate_display_name() {
        assert!(validate_display_name("John Doe").is_ok());
        assert!(validate_display_name("用户姓名").is_ok());

        assert!(validate_display_name("").is_err());
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_text() {
        assert!(validate_text("评论", "nice!", 10, false).is_ok());
        assert!(validate_text("评论", "  ", 10, false).is_err());
        assert!(validate_text("简介", "", 10, true).is_ok());
        assert!(validate_text("简介", &"x".repeat(11), 10, true).is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("hunter22").is_ok());
        assert!(validate_password("123").is_err());
    }
}
