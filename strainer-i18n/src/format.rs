//! Message template interpolation
//!
//! Templates use `{field}` for the field's display name and the
//! positional printf-style markers `%v`, `%d` and `%s` for arguments.
//! Markers without a matching argument are left untouched.

/// Placeholder replaced by the field's display name.
pub const FIELD_PLACEHOLDER: &str = "{field}";

/// Fill a message template.
///
/// ```
/// use strainer_i18n::interpolate;
///
/// let msg = interpolate("{field} must be between %v and %v", "age", &["1".to_string(), "9".to_string()]);
/// assert_eq!(msg, "age must be between 1 and 9");
/// ```
pub fn interpolate(template: &str, field: &str, args: &[String]) -> String {
    let template = template.replace(FIELD_PLACEHOLDER, field);
    fill_positional(&template, args)
}

fn fill_positional(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut args = args.iter();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        match chars.peek().copied() {
            Some('v' | 'd' | 's') => {
                let verb = chars.next().unwrap_or('v');
                match args.next() {
                    Some(arg) => out.push_str(arg),
                    None => {
                        out.push('%');
                        out.push(verb);
                    }
                }
            }
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_placeholder() {
        assert_eq!(interpolate("{field} is required", "name", &[]), "name is required");
    }

    #[test]
    fn test_positional_arguments() {
        let args = vec!["3".to_string(), "10".to_string()];
        assert_eq!(
            interpolate("{field} length must be in %d - %d", "code", &args),
            "code length must be in 3 - 10"
        );
    }

    #[test]
    fn test_missing_arguments_stay_literal() {
        let args = vec!["3".to_string()];
        assert_eq!(interpolate("%v to %v", "x", &args), "3 to %v");
    }

    #[test]
    fn test_percent_without_verb() {
        assert_eq!(interpolate("100% of {field}", "quota", &[]), "100% of quota");
    }
}
