use serde::Serialize;
use std::collections::BTreeMap;

/// Provenance record for one run.
///
/// Models and biasing operators write their configuration here as named
/// parameters. Keys are free-form strings such as `"A' Mass [MeV]"`.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RunHeader {
    pub run_number: u32,
    pub description: String,
    int_parameters: BTreeMap<String, i64>,
    float_parameters: BTreeMap<String, f64>,
    string_parameters: BTreeMap<String, String>,
}

impl RunHeader {
    pub fn new(run_number: u32, description: impl Into<String>) -> Self {
        Self {
            run_number,
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn set_int_parameter(&mut self, name: impl Into<String>, value: i64) {
        self.int_parameters.insert(name.into(), value);
    }

    pub fn set_float_parameter(&mut self, name: impl Into<String>, value: f64) {
        self.float_parameters.insert(name.into(), value);
    }

    pub fn set_string_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.string_parameters.insert(name.into(), value.into());
    }

    pub fn int_parameter(&self, name: &str) -> Option<i64> {
        self.int_parameters.get(name).copied()
    }

    pub fn float_parameter(&self, name: &str) -> Option<f64> {
        self.float_parameters.get(name).copied()
    }

    pub fn string_parameter(&self, name: &str) -> Option<&str> {
        self.string_parameters.get(name).map(String::as_str)
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_round_trip_by_type() {
        let mut header = RunHeader::new(7, "dark brem test");
        header.set_int_parameter("Only One DB Per Event", 1);
        header.set_float_parameter("A' Mass [MeV]", 10.0);
        header.set_string_parameter("Dark Brem Vertex Library", "/libs/ap10");

        assert_eq!(header.int_parameter("Only One DB Per Event"), Some(1));
        assert_eq!(header.float_parameter("A' Mass [MeV]"), Some(10.0));
        assert_eq!(header.string_parameter("Dark Brem Vertex Library"), Some("/libs/ap10"));
        assert_eq!(header.float_parameter("Only One DB Per Event"), None);

        // later writes replace earlier ones
        header.set_float_parameter("A' Mass [MeV]", 20.0);
        assert_eq!(header.float_parameter("A' Mass [MeV]"), Some(20.0));
    }

    #[test]
    fn test_to_json() {
        let mut header = RunHeader::new(3, "json");
        header.set_float_parameter("BiasOperator::PhotoNuclear::Factor", 450.0);
        let json = header.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["run_number"], 3);
        assert_eq!(value["float_parameters"]["BiasOperator::PhotoNuclear::Factor"], 450.0);
    }
}
