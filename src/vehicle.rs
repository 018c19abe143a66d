/// Vehicle specifications for the VSP model
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EngineType {
    InternalCombustion,
    Hybrid,
    Electric,
}

impl EngineType {
    /// Parse a short engine code ("ice", "hev", "ev"); unknown codes fall back to combustion.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "hev" | "hybrid" => EngineType::Hybrid,
            "ev" | "electric" => EngineType::Electric,
            _ => EngineType::InternalCombustion,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            EngineType::InternalCombustion => "ice",
            EngineType::Hybrid => "hev",
            EngineType::Electric => "ev",
        }
    }
}

impl From<String> for EngineType {
    fn from(code: String) -> Self {
        EngineType::from_code(&code)
    }
}

impl From<EngineType> for String {
    fn from(engine: EngineType) -> Self {
        engine.code().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub engine: EngineType,
    pub weight_kg: f64,
    /// Aerodynamic drag term (Cd * A * rho / 2m)
    pub drag_term: f64,
    /// Combustion emission multiplier versus the reference sedan; 0 for electric
    pub emission_factor: f64,
}

impl VehicleSpec {
    pub fn compact() -> Self {
        VehicleSpec {
            name: "Compact (gasoline)".to_string(),
            engine: EngineType::InternalCombustion,
            weight_kg: 1100.0,
            drag_term: 0.000327,
            emission_factor: 0.85,
        }
    }

    pub fn sedan() -> Self {
        VehicleSpec {
            name: "Mid-size sedan (gasoline)".to_string(),
            engine: EngineType::InternalCombustion,
            weight_kg: 1500.0,
            drag_term: 0.000264,
            emission_factor: 1.0,
        }
    }

    pub fn suv() -> Self {
        VehicleSpec {
            name: "SUV (gasoline)".to_string(),
            engine: EngineType::InternalCombustion,
            weight_kg: 1900.0,
            drag_term: 0.000312,
            emission_factor: 1.3,
        }
    }

    pub fn light_truck() -> Self {
        VehicleSpec {
            name: "Light truck (diesel)".to_string(),
            engine: EngineType::InternalCombustion,
            weight_kg: 2500.0,
            drag_term: 0.000345,
            emission_factor: 1.6,
        }
    }

    pub fn hybrid() -> Self {
        VehicleSpec {
            name: "Hybrid sedan".to_string(),
            engine: EngineType::Hybrid,
            weight_kg: 1650.0,
            drag_term: 0.000264,
            emission_factor: 0.7,
        }
    }

    pub fn electric() -> Self {
        VehicleSpec {
            name: "Electric crossover".to_string(),
            engine: EngineType::Electric,
            weight_kg: 2050.0,
            drag_term: 0.000290,
            emission_factor: 0.0,
        }
    }

    /// Catalog lookup by menu key "1".."6"; anything else yields the sedan.
    pub fn from_selection(key: &str) -> Self {
        match key.trim() {
            "1" => Self::compact(),
            "3" => Self::suv(),
            "4" => Self::light_truck(),
            "5" => Self::hybrid(),
            "6" => Self::electric(),
            _ => Self::sedan(),
        }
    }

    pub fn catalog() -> Vec<(&'static str, VehicleSpec)> {
        vec![
            ("1", Self::compact()),
            ("2", Self::sedan()),
            ("3", Self::suv()),
            ("4", Self::light_truck()),
            ("5", Self::hybrid()),
            ("6", Self::electric()),
        ]
    }
}

impl Default for VehicleSpec {
    fn default() -> Self {
        Self::sedan()
    }
}
