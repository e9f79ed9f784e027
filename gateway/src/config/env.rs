//! Environment variable access for configuration loading.

use std::str::FromStr;

/// Read an environment variable, treating empty or whitespace-only values as unset.
pub(crate) fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read and parse an environment variable.
///
/// Returns `Ok(None)` when the variable is unset and an error naming the
/// variable when it is set but cannot be parsed.
pub(crate) fn parse_env<T>(name: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid value for {name} '{raw}': {e}")),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_env_var_blank_is_unset() {
        unsafe {
            env::set_var("VOICEBRIDGE_TEST_BLANK", "   ");
        }
        assert_eq!(env_var("VOICEBRIDGE_TEST_BLANK"), None);
        unsafe {
            env::remove_var("VOICEBRIDGE_TEST_BLANK");
        }
    }

    #[test]
    #[serial]
    fn test_parse_env() {
        unsafe {
            env::set_var("VOICEBRIDGE_TEST_NUM", " 42 ");
            env::set_var("VOICEBRIDGE_TEST_BAD", "forty-two");
        }
        assert_eq!(parse_env::<u32>("VOICEBRIDGE_TEST_NUM"), Ok(Some(42)));
        assert_eq!(parse_env::<u32>("VOICEBRIDGE_TEST_MISSING"), Ok(None));
        let err = parse_env::<u32>("VOICEBRIDGE_TEST_BAD").unwrap_err();
        assert!(err.contains("VOICEBRIDGE_TEST_BAD"));
        unsafe {
            env::remove_var("VOICEBRIDGE_TEST_NUM");
            env::remove_var("VOICEBRIDGE_TEST_BAD");
        }
    }
}
