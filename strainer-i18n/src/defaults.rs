//! Builtin English messages

/// Key of the catch-all template used when nothing more specific exists.
pub const DEFAULT_KEY: &str = "_";

/// Key of the template used for filter failures.
pub const FILTER_KEY: &str = "_filter";

/// Builtin message templates keyed by canonical validator name.
pub(crate) const BUILTIN_MESSAGES: &[(&str, &str)] = &[
    (DEFAULT_KEY, "{field} did not pass validation"),
    (FILTER_KEY, "{field} data is invalid"),
    // required family
    ("required", "{field} is required and must not be empty"),
    ("requiredIf", "{field} is required when %v is %v"),
    ("requiredUnless", "{field} is required unless %v is %v"),
    ("requiredWith", "{field} is required when %v is present"),
    ("requiredWithAll", "{field} is required when %v are present"),
    ("requiredWithout", "{field} is required when %v is not present"),
    ("requiredWithoutAll", "{field} is required when none of %v are present"),
    // numeric range
    ("min", "{field} min value is %v"),
    ("max", "{field} max value is %v"),
    ("lt", "{field} value should be less than %v"),
    ("gt", "{field} value should be greater than %v"),
    ("between", "{field} value must be in the range %v - %v"),
    // length
    ("length", "{field} length must be %v"),
    ("minLength", "{field} value min length is %v"),
    ("maxLength", "{field} value max length is %v"),
    ("stringLength", "{field} length must be in the range %v - %v"),
    // sets and patterns
    ("enum", "{field} value must be one of %v"),
    ("notIn", "{field} value must not be one of %v"),
    ("regexp", "{field} must match pattern %v"),
    ("isEqual", "{field} value must be equal to %v"),
    ("notEqual", "{field} value must not be equal to %v"),
    // field comparison
    ("eqField", "{field} value must be equal to the field %v"),
    ("neField", "{field} value cannot be equal to the field %v"),
    ("gtField", "{field} value must be greater than the field %v"),
    ("gteField", "{field} value must be greater than or equal to the field %v"),
    ("ltField", "{field} value must be less than the field %v"),
    ("lteField", "{field} value must be less than or equal to the field %v"),
    // type checks
    ("isInt", "{field} value must be an integer"),
    ("isUint", "{field} value must be an unsigned integer"),
    ("isFloat", "{field} value must be a float"),
    ("isBool", "{field} value must be a bool"),
    ("isString", "{field} value must be a string"),
    ("isNumber", "{field} value must be a number"),
    ("isSlice", "{field} value must be an array"),
    ("isMap", "{field} value must be a map"),
    ("isInts", "{field} value must be an int array"),
    ("isStrings", "{field} value must be a string array"),
    // string formats
    ("isAlpha", "{field} value may contain only letters"),
    ("isAlphaNum", "{field} value may contain only letters and numbers"),
    ("isAlphaDash", "{field} value may contain only letters, numbers, dashes or underscores"),
    ("isEmail", "{field} value must be a valid email address"),
    ("isURL", "{field} value must be a valid URL"),
    ("isIP", "{field} value must be a valid IP address"),
    ("isIPv4", "{field} value must be a valid IPv4 address"),
    ("isIPv6", "{field} value must be a valid IPv6 address"),
    ("isUUID", "{field} value must be a valid UUID"),
    ("isJSON", "{field} value must be a valid JSON string"),
    ("contains", "{field} value must contain %v"),
    ("notContains", "{field} value must not contain %v"),
    ("startsWith", "{field} value must start with %v"),
    ("endsWith", "{field} value must end with %v"),
    // uploads
    ("isFile", "{field} must be an uploaded file"),
    ("isImage", "{field} must be an uploaded image file"),
    ("inMimeTypes", "{field} file mime type must be one of %v"),
];
