//! Argument validation shared by the handlers.

use serde_json::Value;
use switchboard_core::error::ToolError;

/// True for values that count as "not provided": missing, null, false, zero,
/// NaN, or an empty string.
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64().is_none_or(|f| f == 0.0 || f.is_nan()),
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => false,
    }
}

/// Fail on the first blank field, in the order given.
pub fn require_fields(args: &Value, fields: &[&str]) -> Result<(), ToolError> {
    if !args.is_object() {
        return Err(ToolError::InvalidArguments(
            "Arguments must be a JSON object".into(),
        ));
    }
    match fields.iter().find(|f| is_blank(args.get(**f))) {
        Some(missing) => Err(ToolError::InvalidArguments(format!(
            "Missing required field: {missing}"
        ))),
        None => Ok(()),
    }
}

/// Check that `args[field]` is one of `allowed`.
pub fn require_one_of(args: &Value, field: &str, allowed: &[&str]) -> Result<(), ToolError> {
    let value = args.get(field).and_then(Value::as_str).unwrap_or_default();
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(ToolError::InvalidArguments(format!(
            "{field} must be one of: {}",
            allowed.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_values() {
        assert!(is_blank(None));
        assert!(is_blank(Some(&json!(null))));
        assert!(is_blank(Some(&json!(""))));
        assert!(is_blank(Some(&json!(0))));
        assert!(is_blank(Some(&json!(false))));
        assert!(!is_blank(Some(&json!("Ann"))));
        assert!(!is_blank(Some(&json!(30))));
        assert!(!is_blank(Some(&json!([]))));
    }

    #[test]
    fn reports_first_missing_field() {
        let args = json!({"a": "x", "c": ""});
        let err = require_fields(&args, &["a", "b", "c"]).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(m) if m == "Missing required field: b"));
    }

    #[test]
    fn non_object_arguments_rejected() {
        assert!(require_fields(&json!([1, 2]), &["a"]).is_err());
    }

    #[test]
    fn one_of_checks_membership() {
        let args = json!({"status": "considering"});
        assert!(require_one_of(&args, "status", &["purchased", "considering"]).is_ok());
        assert!(require_one_of(&args, "status", &["purchased"]).is_err());
        assert!(require_one_of(&json!({}), "status", &["purchased"]).is_err());
    }
}
