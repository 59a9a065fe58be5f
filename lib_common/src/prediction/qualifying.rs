use serde::{Deserialize, Serialize};

/// One grid slot used as model input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualifyingEntry {
    pub driver_name: String,
    pub driver_code: String,
    pub qualifying_seconds: f64,
}

impl QualifyingEntry {
    pub fn new(driver_name: &str, driver_code: &str, qualifying_seconds: f64) -> Self {
        Self {
            driver_name: driver_name.to_string(),
            driver_code: driver_code.to_string(),
            qualifying_seconds,
        }
    }
}

/// Monaco 2025 qualifying, used when the configuration supplies no table.
pub fn default_grid() -> Vec<QualifyingEntry> {
    vec![
        QualifyingEntry::new("Lando Norris", "NOR", 75.096),
        QualifyingEntry::new("Oscar Piastri", "PIA", 75.180),
        QualifyingEntry::new("Max Verstappen", "VER", 75.481),
        QualifyingEntry::new("George Russell", "RUS", 75.546),
        QualifyingEntry::new("Yuki Tsunoda", "TSU", 75.670),
        QualifyingEntry::new("Alexander Albon", "ALB", 75.737),
        QualifyingEntry::new("Charles Leclerc", "LEC", 75.755),
        QualifyingEntry::new("Lewis Hamilton", "HAM", 75.973),
        QualifyingEntry::new("Pierre Gasly", "GAS", 75.980),
        QualifyingEntry::new("Carlos Sainz", "SAI", 76.062),
        QualifyingEntry::new("Fernando Alonso", "ALO", 76.4),
        QualifyingEntry::new("Lance Stroll", "STR", 76.5),
    ]
}
