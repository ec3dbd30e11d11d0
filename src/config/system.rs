//! System configuration - root configuration structure.

use heapless::{FnvIndexMap, String};
use serde::Deserialize;

use super::motor::MotorConfig;
use super::rail::RailConfig;

/// Root configuration structure from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    /// Named motor configurations.
    pub motors: FnvIndexMap<String<32>, MotorConfig, 8>,

    /// Rail geometry for the host-side trajectory engine.
    #[serde(default)]
    pub rail: RailConfig,
}

impl SystemConfig {
    /// Get a motor configuration by name.
    pub fn motor(&self, name: &str) -> Option<&MotorConfig> {
        self.motors
            .iter()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v)
    }

    /// List all motor names.
    pub fn motor_names(&self) -> impl Iterator<Item = &str> {
        self.motors.keys().map(|s| s.as_str())
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            motors: FnvIndexMap::new(),
            rail: RailConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_motor_system() {
        let toml = r#"
[motors.x_axis]
name = "X Axis"
step_pin = 3
dir_pin = 2
pio = 0
sm = 0

[motors.y_axis]
name = "Y Axis"
step_pin = 5
dir_pin = 4
pio = 0
sm = 1

[rail]
step_x_m = 0.0000015625
"#;
        let config: SystemConfig = toml::from_str(toml).unwrap();

        assert!(config.motor("x_axis").is_some());
        assert!(config.motor("y_axis").is_some());
        assert!(config.motor("z_axis").is_none());

        let names: std::vec::Vec<_> = config.motor_names().collect();
        assert!(names.contains(&"x_axis"));
        assert!(names.contains(&"y_axis"));

        assert!((config.rail.step_x_m - 1.5625e-6).abs() < 1e-15);
    }

    #[test]
    fn rail_section_is_optional() {
        let toml = r#"
[motors.x_axis]
name = "X"
step_pin = 3
dir_pin = 2
"#;
        let config: SystemConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.rail.dir_bit0_sign, 1);
    }
}
