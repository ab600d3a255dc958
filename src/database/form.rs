use std::{collections::HashMap, str::FromStr};

use rust_decimal::Decimal;
use serde_json::Value;

use super::error::FieldErrors;
use crate::constants::{
    BLANK_FIELD, MAX_NAME_LENGTH, PRICE_DECIMAL_PLACES, PRICE_MAX_DIGITS, REQUIRED_FIELD,
};

pub type FormData = HashMap<String, Value>;

/// A decoded JSON object whose fields are read one by one, collecting a
/// message per offending field instead of failing on the first.
pub struct Form {
    inner: FormData,
    errors: FieldErrors,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self {
            inner: data,
            errors: FieldErrors::new(),
        }
    }

    pub fn error(&mut self, key: &str, message: &str) {
        self.errors.add(key, message);
    }

    /// Returns the present, non-null value or records the missing field.
    fn value(&mut self, key: &str, required: bool) -> Option<Value> {
        match self.inner.get(key) {
            Some(Value::Null) => {
                self.error(key, "This field may not be null.");
                None
            }
            Some(value) => Some(value.to_owned()),
            None => {
                if required {
                    self.error(key, REQUIRED_FIELD);
                }
                None
            }
        }
    }

    pub fn get_str(&mut self, key: &str, required: bool, allow_blank: bool) -> Option<String> {
        let value = self.value(key, required)?;
        let Some(text) = value.as_str() else {
            self.error(key, "Not a valid string.");
            return None;
        };

        let text = text.trim().to_string();
        if text.is_empty() && !allow_blank {
            self.error(key, BLANK_FIELD);
            return None;
        }
        if text.chars().count() > MAX_NAME_LENGTH {
            self.error(
                key,
                &format!("Ensure this field has no more than {MAX_NAME_LENGTH} characters."),
            );
            return None;
        }
        Some(text)
    }

    /// Free text without a length limit
    pub fn get_text(&mut self, key: &str, required: bool) -> Option<String> {
        let value = self.value(key, required)?;
        match value.as_str() {
            Some(text) => Some(text.to_string()),
            None => {
                self.error(key, "Not a valid string.");
                None
            }
        }
    }

    /// Accepts JSON numbers as well as numeric strings.
    pub fn get_number<T>(&mut self, key: &str, required: bool) -> Option<T>
    where
        T: FromStr,
    {
        let value = self.value(key, required)?;
        let raw = match &value {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.trim().to_string(),
            _ => String::new(),
        };

        match raw.parse() {
            Ok(number) => Some(number),
            Err(_) => {
                self.error(key, "A valid integer is required.");
                None
            }
        }
    }

    pub fn get_price(&mut self, key: &str, required: bool) -> Option<Decimal> {
        let value = self.value(key, required)?;
        let raw = match &value {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.trim().to_string(),
            _ => String::new(),
        };

        let Ok(price) = Decimal::from_str(&raw) else {
            self.error(key, "A valid number is required.");
            return None;
        };

        let price = price.normalize();
        let max_whole_digits = PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES;
        if price.scale() > PRICE_DECIMAL_PLACES {
            self.error(
                key,
                &format!(
                    "Ensure that there are no more than {PRICE_DECIMAL_PLACES} decimal places."
                ),
            );
            return None;
        }
        if price.trunc().abs() >= Decimal::from(10u64.pow(max_whole_digits)) {
            self.error(
                key,
                &format!(
                    "Ensure that there are no more than {max_whole_digits} digits before the decimal point."
                ),
            );
            return None;
        }
        Some(price.round_dp(PRICE_DECIMAL_PLACES))
    }

    /// Reads a list of `{"name": ...}` objects.
    pub fn get_named_list(&mut self, key: &str) -> Option<Vec<String>> {
        let value = self.value(key, false)?;
        let Some(entries) = value.as_array() else {
            self.error(key, "Expected a list of items.");
            return None;
        };

        let mut names = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            let name = entry
                .get("name")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|name| !name.is_empty());

            match name {
                Some(name) if name.chars().count() <= MAX_NAME_LENGTH => {
                    names.push(name.to_string())
                }
                Some(_) => self.error(
                    key,
                    &format!("Item {i}: name has more than {MAX_NAME_LENGTH} characters."),
                ),
                None => self.error(key, &format!("Item {i}: a non-blank name is required.")),
            }
        }
        Some(names)
    }

    pub fn finish(self) -> Result<(), FieldErrors> {
        self.errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn form(value: Value) -> Form {
        Form::from_data(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn missing_required_fields_are_all_reported() {
        let mut form = form(json!({}));
        assert_eq!(form.get_str("title", true, false), None);
        assert_eq!(form.get_number::<i32>("time_minutes", true), None);
        assert_eq!(form.get_str("link", false, true), None);

        let errors = form.finish().unwrap_err();
        assert_eq!(errors.get("title"), Some(&[REQUIRED_FIELD.to_string()][..]));
        assert!(errors.get("time_minutes").is_some());
        assert!(errors.get("link").is_none());
    }

    #[test]
    fn numbers_accept_strings_and_json_numbers() {
        let mut form = form(json!({"a": 30, "b": "45", "c": "soon"}));
        assert_eq!(form.get_number::<i32>("a", true), Some(30));
        assert_eq!(form.get_number::<i32>("b", true), Some(45));
        assert_eq!(form.get_number::<i32>("c", true), None);
        assert!(form.finish().is_err());
    }

    #[test]
    fn price_precision_is_enforced() {
        let mut form = form(json!({"a": "5.00", "b": 10.5, "c": "1.234", "d": "1000"}));
        assert_eq!(form.get_price("a", true), Some(Decimal::new(5, 0)));
        assert_eq!(form.get_price("b", true), Some(Decimal::new(105, 1)));
        assert_eq!(form.get_price("c", true), None);
        assert_eq!(form.get_price("d", true), None);

        let errors = form.finish().unwrap_err();
        assert!(errors.get("c").is_some());
        assert!(errors.get("d").is_some());
    }

    #[test]
    fn named_lists_keep_payload_order() {
        let mut form = form(json!({"tags": [{"name": "B"}, {"name": "A"}, {"name": "B"}]}));
        assert_eq!(
            form.get_named_list("tags"),
            Some(vec!["B".to_string(), "A".to_string(), "B".to_string()])
        );
        assert!(form.finish().is_ok());
    }

    #[test]
    fn empty_named_list_is_distinct_from_absent() {
        let mut form = form(json!({"tags": []}));
        assert_eq!(form.get_named_list("tags"), Some(vec![]));
        assert_eq!(form.get_named_list("ingredients"), None);
    }

    #[test]
    fn named_list_entries_need_a_name() {
        let mut form = form(json!({"tags": [{"label": "x"}, {"name": "  "}]}));
        form.get_named_list("tags");
        assert_eq!(form.finish().unwrap_err().get("tags").map(|e| e.len()), Some(2));
    }
}
