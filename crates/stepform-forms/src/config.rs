//! Per-form configuration.
//!
//! A form's configuration is declared by the server on the form's root
//! element as `data-*` attributes. [`FormConfig::from_data_attrs`] reads that
//! attribute map; the same structure also deserializes from camelCase JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use stepform_core::{Settings, StepformError, StepformResult};

/// What `backward()` does with the widgets of the step being left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackwardPolicy {
    /// Remove the step's widgets; revisiting the step fetches them again.
    #[default]
    Destroy,
    /// Hide the step's widgets and reuse them on the next `forward()`.
    Retain,
}

/// The configuration of one form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormConfig {
    /// The form's ID, unique per page.
    pub id: String,
    /// The server-side form class ID.
    pub cid: String,
    /// The form's weight among other forms on the page.
    pub weight: i64,
    /// Endpoint returning widget definitions for a step.
    pub get_widgets_ep: String,
    /// Endpoint validating a step.
    pub validation_ep: String,
    /// Native submission target.
    pub submit_ep: String,
    /// The number of steps.
    pub steps: usize,
    /// Emit the submit notification but never submit natively.
    pub prevent_submit: bool,
    /// The form is rendered inside a modal dialog.
    pub modal: bool,
    /// Refetch a step's widgets on every `forward()`.
    pub nocache: bool,
    /// See [`BackwardPolicy`].
    pub backward_policy: BackwardPolicy,
    /// Layout area names, in document order.
    pub areas: Vec<String>,
    /// Every `data-*` attribute of the form root, sent with each request.
    pub data: BTreeMap<String, String>,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            cid: String::new(),
            weight: 0,
            get_widgets_ep: "form/widgets".to_string(),
            validation_ep: "form/validate".to_string(),
            submit_ep: String::new(),
            steps: 1,
            prevent_submit: false,
            modal: false,
            nocache: false,
            backward_policy: BackwardPolicy::Destroy,
            areas: Settings::default().default_areas,
            data: BTreeMap::new(),
        }
    }
}

impl FormConfig {
    /// Creates a configuration with defaults for the given form ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Builds a configuration from the root element's data attributes.
    ///
    /// Keys are the attribute names without the `data-` prefix, in kebab
    /// case (`get-widgets-ep`, `prevent-submit`). Boolean attributes are
    /// true when their value is `"True"`. Areas come from the settings
    /// unless `areas` lists them comma-separated.
    ///
    /// # Errors
    ///
    /// Returns [`StepformError::ImproperlyConfigured`] if the ID is empty,
    /// if `steps` or `weight` is not an integer, if `steps` is zero, or if
    /// `backward-policy` is unknown.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::BTreeMap;
    /// use stepform_core::Settings;
    /// use stepform_forms::config::FormConfig;
    ///
    /// let attrs = BTreeMap::from([
    ///     ("cid".to_string(), "app.SignupForm".to_string()),
    ///     ("steps".to_string(), "3".to_string()),
    ///     ("modal".to_string(), "True".to_string()),
    /// ]);
    /// let config = FormConfig::from_data_attrs("signup", &attrs, &Settings::default()).unwrap();
    /// assert_eq!(config.steps, 3);
    /// assert!(config.modal);
    /// assert!(!config.prevent_submit);
    /// ```
    pub fn from_data_attrs(
        id: &str,
        attrs: &BTreeMap<String, String>,
        settings: &Settings,
    ) -> StepformResult<Self> {
        if id.is_empty() {
            return Err(StepformError::ImproperlyConfigured(
                "Form ID must not be empty".to_string(),
            ));
        }

        let flag = |key: &str| attrs.get(key).is_some_and(|v| v == "True");
        let text = |key: &str, default: &str| {
            attrs
                .get(key)
                .cloned()
                .unwrap_or_else(|| default.to_string())
        };

        let defaults = Self::default();
        let config = Self {
            id: id.to_string(),
            cid: text("cid", ""),
            weight: parse_attr(id, attrs, "weight", 0)?,
            get_widgets_ep: text("get-widgets-ep", &defaults.get_widgets_ep),
            validation_ep: text("validation-ep", &defaults.validation_ep),
            submit_ep: text("submit-ep", ""),
            steps: parse_attr(id, attrs, "steps", 1)?,
            prevent_submit: flag("prevent-submit"),
            modal: flag("modal"),
            nocache: flag("nocache"),
            backward_policy: match attrs.get("backward-policy").map(String::as_str) {
                None | Some("destroy") => BackwardPolicy::Destroy,
                Some("retain") => BackwardPolicy::Retain,
                Some(other) => {
                    return Err(StepformError::ImproperlyConfigured(format!(
                        "Form '{id}': unknown backward policy '{other}'"
                    )))
                }
            },
            areas: attrs.get("areas").map_or_else(
                || settings.default_areas.clone(),
                |raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|a| !a.is_empty())
                        .map(ToString::to_string)
                        .collect()
                },
            ),
            data: attrs.clone(),
        };

        config.check()?;
        Ok(config)
    }

    /// Checks the invariants every form relies on.
    ///
    /// # Errors
    ///
    /// Returns [`StepformError::ImproperlyConfigured`] on a zero step count
    /// or an empty ID.
    pub fn check(&self) -> StepformResult<()> {
        if self.id.is_empty() {
            return Err(StepformError::ImproperlyConfigured(
                "Form ID must not be empty".to_string(),
            ));
        }
        if self.steps == 0 {
            return Err(StepformError::ImproperlyConfigured(format!(
                "Form '{}' must have at least one step",
                self.id
            )));
        }
        Ok(())
    }
}

fn parse_attr<T: std::str::FromStr>(
    id: &str,
    attrs: &BTreeMap<String, String>,
    key: &str,
    default: T,
) -> StepformResult<T> {
    attrs.get(key).map_or(Ok(default), |raw| {
        raw.trim().parse().map_err(|_| {
            StepformError::ImproperlyConfigured(format!(
                "Form '{id}': attribute '{key}' must be an integer, got '{raw}'"
            ))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = FormConfig::from_data_attrs("f", &BTreeMap::new(), &Settings::default())
            .unwrap();
        assert_eq!(config.steps, 1);
        assert_eq!(config.get_widgets_ep, "form/widgets");
        assert_eq!(config.validation_ep, "form/validate");
        assert_eq!(config.backward_policy, BackwardPolicy::Destroy);
        assert_eq!(config.areas, vec!["hidden", "header", "body", "footer"]);
    }

    #[test]
    fn test_boolean_attrs_need_true_literal() {
        let config = FormConfig::from_data_attrs(
            "f",
            &attrs(&[("prevent-submit", "True"), ("nocache", "true")]),
            &Settings::default(),
        )
        .unwrap();
        assert!(config.prevent_submit);
        assert!(!config.nocache);
    }

    #[test]
    fn test_areas_and_policy() {
        let config = FormConfig::from_data_attrs(
            "f",
            &attrs(&[("areas", "hidden, body"), ("backward-policy", "retain")]),
            &Settings::default(),
        )
        .unwrap();
        assert_eq!(config.areas, vec!["hidden", "body"]);
        assert_eq!(config.backward_policy, BackwardPolicy::Retain);
        assert_eq!(config.data.len(), 2);
    }

    #[test]
    fn test_invalid_attrs_are_fatal() {
        let settings = Settings::default();
        for bad in [
            attrs(&[("steps", "two")]),
            attrs(&[("steps", "0")]),
            attrs(&[("weight", "heavy")]),
            attrs(&[("backward-policy", "cache")]),
        ] {
            let err = FormConfig::from_data_attrs("f", &bad, &settings).unwrap_err();
            assert!(err.is_fatal(), "{err}");
        }
        assert!(FormConfig::from_data_attrs("", &BTreeMap::new(), &settings).is_err());
    }

    #[test]
    fn test_json_camel_case() {
        let config: FormConfig = serde_json::from_str(
            r#"{"id": "order", "steps": 2, "getWidgetsEp": "shop/widgets", "backwardPolicy": "retain"}"#,
        )
        .unwrap();
        assert_eq!(config.id, "order");
        assert_eq!(config.get_widgets_ep, "shop/widgets");
        assert_eq!(config.validation_ep, "form/validate");
        assert_eq!(config.backward_policy, BackwardPolicy::Retain);
    }
}
