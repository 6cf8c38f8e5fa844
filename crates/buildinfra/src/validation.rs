//! Pure validators for profile fields.
//!
//! Every validator returns messages instead of failing; the reducer stores them in
//! the error map and submission refuses to proceed while any are present.
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};

use crate::models::form_errors::RowErrors;
use crate::models::profile::LIST_SEGMENT;
use crate::models::rows::{NodeSelectorRow, RowId, TolerationEffect, TolerationOperator, TolerationRow};
use crate::models::units::Unit;

/// Largest integer an f64 holds exactly.
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
pub const MAX_DECIMAL_PLACES: usize = 2;
pub const PROFILE_NAME_MAX_LENGTH: usize = 50;
pub const DESCRIPTION_MAX_LENGTH: usize = 350;
const LABEL_NAME_MAX_LENGTH: usize = 63;
const LABEL_PREFIX_MAX_LENGTH: usize = 253;

pub const REQUIRED_MESSAGE: &str = "This field is required";
pub const NOT_A_NUMBER_MESSAGE: &str = "Value must be a number";
pub const NOT_POSITIVE_MESSAGE: &str = "Value must be greater than 0";
pub const DECIMAL_PLACES_MESSAGE: &str = "Value cannot have more than 2 decimal places";
pub const UNKNOWN_UNIT_MESSAGE: &str = "Unknown unit";
pub const REQUEST_EXCEEDS_LIMIT_MESSAGE: &str = "Request should be less than or equal to limit";
pub const CANNOT_COMPUTE_MESSAGE: &str =
    "Unable to compute, please try a smaller value or a different unit";

lazy_static! {
    static ref PROFILE_NAME_RE: Regex = Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").unwrap();
    static ref LABEL_NAME_RE: Regex =
        Regex::new(r"^[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?$").unwrap();
    static ref DNS_SUBDOMAIN_RE: Regex =
        Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").unwrap();
    static ref NUMBER_RE: Regex =
        Regex::new(r"^[+-]?(?:\d+(?:\.(\d*))?|\.(\d+))(?:[eE]([+-]?\d+))?$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub message: Option<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            message: None,
        }
    }

    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self {
            is_valid: false,
            message: Some(message.into()),
        }
    }

    pub fn into_message(self) -> Option<String> {
        self.message
    }
}

impl From<Result<(), String>> for ValidationResult {
    fn from(result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::valid(),
            Err(message) => Self::invalid(message),
        }
    }
}

/// A numeric field as typed, together with its selected unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarInput {
    pub value: String,
    pub unit: Option<String>,
}

impl ScalarInput {
    pub fn new<V: Into<String>>(value: V, unit: Option<&str>) -> Self {
        Self {
            value: value.into(),
            unit: unit.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLimitValidation {
    pub request: ValidationResult,
    pub limit: ValidationResult,
}

/// Decimal places of a numeric literal, with the exponent applied, so
/// `1e-5` has five. `None` for text that is not a plain number.
fn decimal_places(value: &str) -> Option<usize> {
    let captures = NUMBER_RE.captures(value)?;
    let fraction = captures
        .get(1)
        .or_else(|| captures.get(2))
        .map_or(0, |digits| digits.as_str().len()) as i64;
    let exponent = match captures.get(3) {
        Some(exponent) => exponent.as_str().parse::<i64>().ok()?,
        None => 0,
    };
    Some(fraction.saturating_sub(exponent).max(0) as usize)
}

/// Parses a strictly positive number with at most two decimal places.
pub fn parse_positive_number(value: &str) -> Result<f64, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(REQUIRED_MESSAGE.to_string());
    }
    let number: f64 = value
        .parse()
        .ok()
        .filter(|number: &f64| number.is_finite())
        .ok_or_else(|| NOT_A_NUMBER_MESSAGE.to_string())?;
    if number <= 0.0 {
        return Err(NOT_POSITIVE_MESSAGE.to_string());
    }
    match decimal_places(value) {
        None => return Err(NOT_A_NUMBER_MESSAGE.to_string()),
        Some(places) if places > MAX_DECIMAL_PLACES => {
            return Err(DECIMAL_PLACES_MESSAGE.to_string())
        }
        Some(_) => {}
    }
    Ok(number)
}

fn find_unit<'a>(units: &'a [Unit], name: Option<&str>) -> Result<&'a Unit, String> {
    name.and_then(|name| units.iter().find(|unit| unit.name == name))
        .ok_or_else(|| UNKNOWN_UNIT_MESSAGE.to_string())
}

fn parse_with_unit<'a>(input: &ScalarInput, units: &'a [Unit]) -> Result<(f64, &'a Unit), String> {
    let number = parse_positive_number(&input.value)?;
    let unit = find_unit(units, input.unit.as_deref())?;
    Ok((number, unit))
}

/// Checks a request/limit pair. Request and limit share `units`.
pub fn validate_request_limit(
    request: &ScalarInput,
    limit: &ScalarInput,
    units: &[Unit],
) -> RequestLimitValidation {
    let (request_value, request_unit, limit_value, limit_unit) =
        match (parse_with_unit(request, units), parse_with_unit(limit, units)) {
            (Ok((request_value, request_unit)), Ok((limit_value, limit_unit))) => {
                (request_value, request_unit, limit_value, limit_unit)
            }
            (request, limit) => {
                return RequestLimitValidation {
                    request: request.map(|_| ()).into(),
                    limit: limit.map(|_| ()).into(),
                }
            }
        };

    let ratio = request_unit.conversion_factor / limit_unit.conversion_factor;
    let request_in_limit_unit = request_value * ratio;
    if !ratio.is_finite()
        || !request_in_limit_unit.is_finite()
        || request_in_limit_unit > MAX_SAFE_INTEGER
    {
        return RequestLimitValidation {
            request: ValidationResult::invalid(CANNOT_COMPUTE_MESSAGE),
            limit: ValidationResult::valid(),
        };
    }

    // Unit factors such as 0.001 are not exact in binary.
    let tolerance = limit_value.abs() * 1e-9;
    if request_in_limit_unit - limit_value > tolerance {
        return RequestLimitValidation {
            request: ValidationResult::invalid(REQUEST_EXCEEDS_LIMIT_MESSAGE),
            limit: ValidationResult::valid(),
        };
    }

    RequestLimitValidation {
        request: ValidationResult::valid(),
        limit: ValidationResult::valid(),
    }
}

/// Checks a single quantity: a positive number with a known unit.
pub fn validate_quantity(input: &ScalarInput, units: &[Unit]) -> ValidationResult {
    parse_with_unit(input, units).map(|_| ()).into()
}

pub fn validate_timeout(timeout: &ScalarInput, units: &[Unit]) -> ValidationResult {
    match parse_with_unit(timeout, units) {
        Ok((value, unit)) => {
            let seconds = value * unit.conversion_factor;
            if !seconds.is_finite() || seconds > MAX_SAFE_INTEGER {
                ValidationResult::invalid(CANNOT_COMPUTE_MESSAGE)
            } else {
                ValidationResult::valid()
            }
        }
        Err(message) => ValidationResult::invalid(message),
    }
}

pub fn validate_profile_name(name: &str) -> ValidationResult {
    if name.is_empty() {
        return ValidationResult::invalid("Profile name is required");
    }
    if name.chars().count() > PROFILE_NAME_MAX_LENGTH {
        return ValidationResult::invalid(format!(
            "Profile name cannot exceed {} characters",
            PROFILE_NAME_MAX_LENGTH
        ));
    }
    if !PROFILE_NAME_RE.is_match(name) {
        return ValidationResult::invalid(
            "Use only lowercase alphanumeric characters or '-', starting and ending with an alphanumeric character",
        );
    }
    if name == LIST_SEGMENT {
        return ValidationResult::invalid(format!("{} is a reserved profile name", name));
    }
    ValidationResult::valid()
}

pub fn validate_description(description: &str) -> ValidationResult {
    if description.chars().count() > DESCRIPTION_MAX_LENGTH {
        return ValidationResult::invalid(format!(
            "Description cannot exceed {} characters",
            DESCRIPTION_MAX_LENGTH
        ));
    }
    ValidationResult::valid()
}

/// Messages for a Kubernetes label key: `[prefix/]name`.
fn label_key_errors(key: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };

    if let Some(prefix) = prefix {
        if prefix.is_empty()
            || prefix.len() > LABEL_PREFIX_MAX_LENGTH
            || !DNS_SUBDOMAIN_RE.is_match(prefix)
        {
            errors.push(format!(
                "Key prefix must be a lowercase DNS subdomain of {} characters or less",
                LABEL_PREFIX_MAX_LENGTH
            ));
        }
    }

    if name.is_empty() {
        errors.push("Key name is required".to_string());
    } else {
        if name.len() > LABEL_NAME_MAX_LENGTH {
            errors.push(format!(
                "Key name must be {} characters or less",
                LABEL_NAME_MAX_LENGTH
            ));
        }
        if !LABEL_NAME_RE.is_match(name) {
            errors.push("Key name must consist of alphanumeric characters, '-', '_' or '.', and must start and end with an alphanumeric character".to_string());
        }
    }
    errors
}

/// Messages for a Kubernetes label value, which may be empty.
fn label_value_errors(value: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if value.is_empty() {
        return errors;
    }
    if value.len() > LABEL_NAME_MAX_LENGTH {
        errors.push(format!(
            "Value must be {} characters or less",
            LABEL_NAME_MAX_LENGTH
        ));
    }
    if !LABEL_NAME_RE.is_match(value) {
        errors.push("Value must consist of alphanumeric characters, '-', '_' or '.', and must start and end with an alphanumeric character".to_string());
    }
    errors
}

fn collapse(errors: BTreeMap<RowId, RowErrors>) -> Option<BTreeMap<RowId, RowErrors>> {
    if errors.is_empty() {
        None
    } else {
        Some(errors)
    }
}

/// Validates node selector rows. Returns `None` when every row is valid or empty.
pub fn validate_node_selectors(rows: &[NodeSelectorRow]) -> Option<BTreeMap<RowId, RowErrors>> {
    let mut key_counts: HashMap<&str, usize> = HashMap::new();
    for row in rows.iter().filter(|row| !row.key.is_empty()) {
        *key_counts.entry(row.key.as_str()).or_default() += 1;
    }

    let mut errors = BTreeMap::new();
    for row in rows {
        if row.is_empty() {
            continue;
        }

        let mut row_errors = RowErrors::default();
        if row.key.is_empty() {
            row_errors.key.push("Key is required".to_string());
        } else {
            row_errors.key = label_key_errors(&row.key);
            if key_counts.get(row.key.as_str()).copied().unwrap_or(0) > 1 {
                row_errors.key.push("Keys must be unique".to_string());
            }
        }
        row_errors.value = label_value_errors(&row.value);

        if !row_errors.is_empty() {
            errors.insert(row.id, row_errors);
        }
    }
    collapse(errors)
}

/// Validates toleration rows. Returns `None` when every row is valid or empty.
pub fn validate_tolerations(rows: &[TolerationRow]) -> Option<BTreeMap<RowId, RowErrors>> {
    let signature = |row: &TolerationRow| {
        (
            row.key.clone(),
            row.operator,
            row.value.clone(),
            row.effect,
        )
    };
    let mut signature_counts: HashMap<_, usize> = HashMap::new();
    for row in rows.iter().filter(|row| !row.is_empty()) {
        *signature_counts.entry(signature(row)).or_default() += 1;
    }

    let mut errors = BTreeMap::new();
    for row in rows {
        if row.is_empty() {
            continue;
        }

        let mut row_errors = RowErrors::default();
        if row.key.is_empty() {
            if row.operator != TolerationOperator::Exists {
                row_errors
                    .key
                    .push("Key is required unless the operator is Exists".to_string());
            }
        } else {
            row_errors.key = label_key_errors(&row.key);
        }
        if signature_counts.get(&signature(row)).copied().unwrap_or(0) > 1 {
            row_errors.key.push("Duplicate toleration".to_string());
        }

        if row.operator == TolerationOperator::Exists && !row.value.is_empty() {
            row_errors
                .value
                .push("Value must be empty when the operator is Exists".to_string());
        } else {
            row_errors.value = label_value_errors(&row.value);
        }

        if let Some(seconds) = row
            .toleration_seconds
            .as_deref()
            .map(str::trim)
            .filter(|seconds| !seconds.is_empty())
        {
            if row.effect != Some(TolerationEffect::NoExecute) {
                row_errors.value.push(
                    "Toleration seconds can only be set with the NoExecute effect".to_string(),
                );
            } else if seconds.parse::<u64>().is_err() {
                row_errors
                    .value
                    .push("Toleration seconds must be a non-negative integer".to_string());
            }
        }

        if !row_errors.is_empty() {
            errors.insert(row.id, row_errors);
        }
    }
    collapse(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::configuration::ConfigKey;
    use crate::models::units::UnitCatalog;

    fn cpu_units() -> Vec<Unit> {
        UnitCatalog::builtin()
            .units_for(ConfigKey::CpuLimit)
            .to_vec()
    }

    fn memory_units() -> Vec<Unit> {
        UnitCatalog::builtin()
            .units_for(ConfigKey::MemoryLimit)
            .to_vec()
    }

    #[test]
    fn test_request_within_limit_is_valid() {
        let result = validate_request_limit(
            &ScalarInput::new("0.5", Some("Core")),
            &ScalarInput::new("1", Some("Core")),
            &cpu_units(),
        );
        assert!(result.request.is_valid);
        assert!(result.limit.is_valid);
    }

    #[test]
    fn test_request_above_limit_marks_request() {
        let result = validate_request_limit(
            &ScalarInput::new("2", Some("Core")),
            &ScalarInput::new("1", Some("Core")),
            &cpu_units(),
        );
        assert_eq!(
            result.request,
            ValidationResult::invalid(REQUEST_EXCEEDS_LIMIT_MESSAGE)
        );
        assert!(result.limit.is_valid);
    }

    #[test]
    fn test_request_limit_across_units() {
        let cases = [
            ("500", "m", "0.5", "Core", true),
            ("300", "m", "0.3", "Core", true),
            ("1500", "m", "1", "Core", false),
            ("1", "Core", "999", "m", false),
        ];
        for (request, request_unit, limit, limit_unit, expected) in cases {
            let result = validate_request_limit(
                &ScalarInput::new(request, Some(request_unit)),
                &ScalarInput::new(limit, Some(limit_unit)),
                &cpu_units(),
            );
            assert_eq!(
                result.request.is_valid, expected,
                "{}{} <= {}{}",
                request, request_unit, limit, limit_unit
            );
            assert!(result.limit.is_valid);
        }

        let result = validate_request_limit(
            &ScalarInput::new("2", Some("Gi")),
            &ScalarInput::new("2048", Some("Mi")),
            &memory_units(),
        );
        assert!(result.request.is_valid);
    }

    #[test]
    fn test_each_side_checked_independently() {
        let result = validate_request_limit(
            &ScalarInput::new("", Some("Core")),
            &ScalarInput::new("-1", Some("Core")),
            &cpu_units(),
        );
        assert_eq!(result.request, ValidationResult::invalid(REQUIRED_MESSAGE));
        assert_eq!(result.limit, ValidationResult::invalid(NOT_POSITIVE_MESSAGE));

        let result = validate_request_limit(
            &ScalarInput::new("0.125", Some("Core")),
            &ScalarInput::new("abc", Some("Core")),
            &cpu_units(),
        );
        assert_eq!(result.request, ValidationResult::invalid(DECIMAL_PLACES_MESSAGE));
        assert_eq!(result.limit, ValidationResult::invalid(NOT_A_NUMBER_MESSAGE));

        let result = validate_request_limit(
            &ScalarInput::new("1e-5", Some("Core")),
            &ScalarInput::new("1.5e-3", Some("Core")),
            &cpu_units(),
        );
        assert_eq!(result.request, ValidationResult::invalid(DECIMAL_PLACES_MESSAGE));
        assert_eq!(result.limit, ValidationResult::invalid(DECIMAL_PLACES_MESSAGE));

        let result = validate_request_limit(
            &ScalarInput::new("1", Some("Ti")),
            &ScalarInput::new("1", None),
            &memory_units(),
        );
        assert_eq!(result.request, ValidationResult::invalid(UNKNOWN_UNIT_MESSAGE));
        assert_eq!(result.limit, ValidationResult::invalid(UNKNOWN_UNIT_MESSAGE));
    }

    #[test]
    fn test_exponent_counts_towards_decimal_places() {
        assert_eq!(parse_positive_number("1.5e1"), Ok(15.0));
        assert_eq!(parse_positive_number("2E3"), Ok(2000.0));
        assert_eq!(parse_positive_number("1.25"), Ok(1.25));
        assert_eq!(parse_positive_number(".5"), Ok(0.5));
        assert_eq!(
            parse_positive_number("1e-3"),
            Err(DECIMAL_PLACES_MESSAGE.to_string())
        );
        assert_eq!(
            parse_positive_number("inf"),
            Err(NOT_A_NUMBER_MESSAGE.to_string())
        );
    }

    #[test]
    fn test_overflowing_conversion_cannot_be_computed() {
        let result = validate_request_limit(
            &ScalarInput::new("9007199254740991", Some("Gi")),
            &ScalarInput::new("1", Some("Ki")),
            &memory_units(),
        );
        assert_eq!(result.request, ValidationResult::invalid(CANNOT_COMPUTE_MESSAGE));
        assert!(result.limit.is_valid);
    }

    #[test]
    fn test_timeout() {
        let units = UnitCatalog::builtin()
            .units_for(ConfigKey::Timeout)
            .to_vec();
        assert!(validate_timeout(&ScalarInput::new("90", Some("Minutes")), &units).is_valid);
        assert!(!validate_timeout(&ScalarInput::new("0", Some("Minutes")), &units).is_valid);
        assert_eq!(
            validate_timeout(&ScalarInput::new("9007199254740991", Some("Hours")), &units),
            ValidationResult::invalid(CANNOT_COMPUTE_MESSAGE)
        );
    }

    #[test]
    fn test_profile_name() {
        assert!(validate_profile_name("large-builds").is_valid);
        assert!(validate_profile_name("a").is_valid);
        assert!(!validate_profile_name("").is_valid);
        assert!(!validate_profile_name("Large").is_valid);
        assert!(!validate_profile_name("-large").is_valid);
        assert!(!validate_profile_name("large-").is_valid);
        assert!(!validate_profile_name(&"a".repeat(51)).is_valid);
        assert_eq!(
            validate_profile_name("list"),
            ValidationResult::invalid("list is a reserved profile name")
        );
        assert!(validate_profile_name("lists").is_valid);
        assert!(validate_description(&"a".repeat(350)).is_valid);
        assert!(!validate_description(&"a".repeat(351)).is_valid);
    }

    #[test]
    fn test_empty_node_selector_row_has_no_errors() {
        let rows = vec![NodeSelectorRow::empty(), NodeSelectorRow::new("kubernetes.io/arch", "arm64")];
        assert_eq!(validate_node_selectors(&rows), None);
    }

    #[test]
    fn test_node_selector_rules() {
        let duplicate_a = NodeSelectorRow::new("pool", "build");
        let duplicate_b = NodeSelectorRow::new("pool", "ci");
        let missing_key = NodeSelectorRow::new("", "value");
        let bad_chars = NodeSelectorRow::new("-pool", "bad value");
        let bad_prefix = NodeSelectorRow::new("Example.com/pool", "x");
        let rows = vec![
            duplicate_a.clone(),
            duplicate_b.clone(),
            missing_key.clone(),
            bad_chars.clone(),
            bad_prefix.clone(),
        ];

        let errors = validate_node_selectors(&rows).unwrap();
        assert_eq!(errors.len(), 5);
        assert_eq!(errors[&duplicate_a.id].key, vec!["Keys must be unique".to_string()]);
        assert_eq!(errors[&duplicate_b.id].key, vec!["Keys must be unique".to_string()]);
        assert_eq!(errors[&missing_key.id].key, vec!["Key is required".to_string()]);
        assert_eq!(errors[&bad_chars.id].key.len(), 1);
        assert_eq!(errors[&bad_chars.id].value.len(), 1);
        assert_eq!(errors[&bad_prefix.id].key.len(), 1);
        assert!(errors[&bad_prefix.id].value.is_empty());
    }

    #[test]
    fn test_toleration_rules() {
        let mut exists_without_key = TolerationRow::empty();
        exists_without_key.operator = TolerationOperator::Exists;
        exists_without_key.effect = Some(TolerationEffect::NoSchedule);
        exists_without_key.toleration_seconds = Some(" ".to_string());

        let mut equal_without_key = TolerationRow::empty();
        equal_without_key.value = "gpu".to_string();

        let mut exists_with_value = TolerationRow::empty();
        exists_with_value.key = "dedicated".to_string();
        exists_with_value.operator = TolerationOperator::Exists;
        exists_with_value.value = "ci".to_string();

        let mut seconds_without_no_execute = TolerationRow::empty();
        seconds_without_no_execute.key = "spot".to_string();
        seconds_without_no_execute.effect = Some(TolerationEffect::NoSchedule);
        seconds_without_no_execute.toleration_seconds = Some("30".to_string());

        let mut negative_seconds = TolerationRow::empty();
        negative_seconds.key = "evict".to_string();
        negative_seconds.effect = Some(TolerationEffect::NoExecute);
        negative_seconds.toleration_seconds = Some("-5".to_string());

        let rows = vec![
            exists_without_key.clone(),
            equal_without_key.clone(),
            exists_with_value.clone(),
            seconds_without_no_execute.clone(),
            negative_seconds.clone(),
        ];
        let errors = validate_tolerations(&rows).unwrap();

        assert!(!errors.contains_key(&exists_without_key.id));
        assert_eq!(errors[&equal_without_key.id].key.len(), 1);
        assert_eq!(errors[&exists_with_value.id].value.len(), 1);
        assert_eq!(errors[&seconds_without_no_execute.id].value.len(), 1);
        assert_eq!(errors[&negative_seconds.id].value.len(), 1);
    }

    #[test]
    fn test_duplicate_tolerations() {
        let mut first = TolerationRow::empty();
        first.key = "dedicated".to_string();
        first.value = "ci".to_string();
        let mut second = first.clone();
        second.id = uuid::Uuid::new_v4();

        let errors = validate_tolerations(&[first.clone(), second]).unwrap();
        assert_eq!(errors[&first.id].key, vec!["Duplicate toleration".to_string()]);
        assert_eq!(validate_tolerations(&[first]), None);
    }
}
