use serde::{Deserialize, Serialize};

/// How transitions between states with different parents are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionPolicy {
    /// Transitions must connect states sharing the same immediate parent.
    /// Cross-hierarchy transitions are errors,
    /// reported together with the scope they would have.
    #[default]
    SameParentOnly,
    /// Cross-hierarchy transitions are accepted,
    /// as long as exiting and entering their scope is legal.
    LcaScoped,
}

/// Options of a conversion.
///
/// Every field has a default, so any subset can be deserialized:
///
/// ```
/// # use scxc_scxml::{Options, TransitionPolicy};
/// let options: Options = serde_json::from_str(r#"{ "policy": "lca-scoped" }"#).expect("valid options");
/// assert_eq!(options.policy, TransitionPolicy::LcaScoped);
/// assert_eq!(options.fallback_state, "idle");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    pub policy: TransitionPolicy,
    /// Maximum edit distance for "did you mean" suggestions.
    pub suggestion_distance: usize,
    /// Id of the single state of the fallback machine.
    pub fallback_state: String,
    /// Id of the synthesized machine.
    /// Defaults to the `name` of the document, or `machine` if it has none.
    pub machine_id: Option<String>,
    /// Whether elements outside of the vocabulary are reported.
    pub warn_unknown_elements: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            policy: TransitionPolicy::default(),
            suggestion_distance: 2,
            fallback_state: String::from("idle"),
            machine_id: None,
            warn_unknown_elements: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() -> Result<(), serde_json::Error> {
        let options: Options = serde_json::from_str("{}")?;
        assert_eq!(options, Options::default());
        assert_eq!(options.policy, TransitionPolicy::SameParentOnly);
        assert_eq!(options.suggestion_distance, 2);
        assert!(options.warn_unknown_elements);
        Ok(())
    }

    #[test]
    fn overrides() -> Result<(), serde_json::Error> {
        let options: Options = serde_json::from_str(
            r#"{ "machine_id": "door", "fallback_state": "off", "warn_unknown_elements": false }"#,
        )?;
        assert_eq!(options.machine_id.as_deref(), Some("door"));
        assert_eq!(options.fallback_state, "off");
        assert!(!options.warn_unknown_elements);
        Ok(())
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<Options>(r#"{ "polcy": "lca-scoped" }"#).is_err());
    }
}
