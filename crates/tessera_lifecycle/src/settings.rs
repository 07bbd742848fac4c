use serde::{Deserialize, Serialize};
use tessera_core::DisplayAssignment;

/// Lifecycle controller configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleSettings {
    /// Assignment used when a scene reaches `Mapped` without one set.
    pub default_assignment: DisplayAssignment,
}

#[cfg(test)]
mod tests {
    use tessera_core::DisplayBufferId;

    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: LifecycleSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, LifecycleSettings::default());

        let settings: LifecycleSettings = serde_json::from_str(
            r#"{ "default_assignment": { "buffer": 4, "render_order": -2 } }"#,
        )
        .unwrap();
        assert_eq!(
            settings.default_assignment,
            DisplayAssignment::new(DisplayBufferId(4), -2)
        );
    }
}
