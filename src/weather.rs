/// Weather snapshot and the resistance/auxiliary-load terms derived from it
use serde::{Deserialize, Serialize};

/// Condition labels that leave the road surface wet.
const WET_CONDITIONS: [&str; 4] = ["Rain", "Snow", "Drizzle", "Thunderstorm"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherState {
    pub temp_c: f64,
    pub humidity_pct: f64,
    pub condition: String,
    pub is_wet: bool,
}

impl WeatherState {
    /// Fixed comparison baseline: 20 °C, 50 %, dry.
    pub fn reference() -> Self {
        WeatherState {
            temp_c: 20.0,
            humidity_pct: 50.0,
            condition: "Clear".to_string(),
            is_wet: false,
        }
    }

    /// Neutral stand-in when no observation is available.
    pub fn default_observation() -> Self {
        WeatherState {
            condition: "Unknown".to_string(),
            ..Self::reference()
        }
    }

    /// Build a snapshot from an observation, deriving wetness from the condition label.
    pub fn from_observation(temp_c: f64, humidity_pct: f64, condition: &str) -> Self {
        WeatherState {
            temp_c,
            humidity_pct,
            condition: condition.to_string(),
            is_wet: WET_CONDITIONS.contains(&condition),
        }
    }

    /// Rain or snow raises rolling resistance.
    pub fn raises_rolling_resistance(&self) -> bool {
        self.is_wet
    }

    /// Wet surface, heat above 28 °C or cold below 5 °C.
    pub fn is_adverse(&self) -> bool {
        self.raises_rolling_resistance() || self.temp_c > 28.0 || self.temp_c < 5.0
    }

    /// Air conditioning or heating is expected to run.
    pub fn needs_climate_control(&self) -> bool {
        self.temp_c > 25.0 || self.temp_c < 10.0
    }

    pub fn factors(&self) -> WeatherFactors {
        WeatherFactors::from_weather(self)
    }
}

impl Default for WeatherState {
    fn default() -> Self {
        Self::default_observation()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeatherFactors {
    /// Air density relative to 20 °C
    pub k_air: f64,
    pub rolling_coeff: f64,
    /// kW per ton equivalent
    pub aux_load: f64,
}

impl WeatherFactors {
    pub fn from_weather(weather: &WeatherState) -> Self {
        let temp_c = weather.temp_c;
        let humidity = weather.humidity_pct;

        let k_air = (273.15 + 20.0) / (273.15 + temp_c);
        let rolling_coeff = if weather.is_wet { 0.018 } else { 0.015 };

        let mut aux_load = 0.0;
        if temp_c > 24.0 {
            let mut ac_load = (temp_c - 24.0) * 0.05;
            if humidity > 60.0 {
                ac_load *= 1.0 + (humidity - 60.0) * 0.01;
            }
            aux_load += ac_load.min(1.5);
        } else if weather.is_wet || humidity > 90.0 {
            aux_load += 0.2;
        } else if temp_c < 10.0 {
            aux_load += (10.0 - temp_c) * 0.02;
        }
        if weather.is_wet {
            aux_load += 0.1;
        }

        WeatherFactors {
            k_air,
            rolling_coeff,
            aux_load,
        }
    }
}
