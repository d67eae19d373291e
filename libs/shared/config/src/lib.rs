use std::env;
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

/// Doctor id used when `CLINIC_DOCTOR_ID` is not provided.
pub const DEFAULT_DOCTOR_ID: Uuid = Uuid::from_u128(0x6f1c_2b0e_9a4d_4c7e_8b15_3d2f_a0c4_e901);

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub server_port: u16,
    pub seed_demo_data: bool,
    pub booking_retry_max_attempts: u32,
    pub booking_retry_base_delay_ms: u64,
    doctor_id_explicit: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            doctor_id: DEFAULT_DOCTOR_ID,
            doctor_name: "Dr. Aylin".to_string(),
            server_port: 3000,
            seed_demo_data: true,
            booking_retry_max_attempts: 3,
            booking_retry_base_delay_ms: 1000,
            doctor_id_explicit: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let (doctor_id, doctor_id_explicit) = match env::var("CLINIC_DOCTOR_ID") {
            Ok(raw) => match Uuid::parse_str(raw.trim()) {
                Ok(id) => (id, true),
                Err(_) => {
                    warn!("CLINIC_DOCTOR_ID is not a valid UUID, using default doctor");
                    (defaults.doctor_id, false)
                }
            },
            Err(_) => {
                warn!("CLINIC_DOCTOR_ID not set, using default doctor");
                (defaults.doctor_id, false)
            }
        };

        let config = Self {
            doctor_id,
            doctor_name: env::var("CLINIC_DOCTOR_NAME")
                .unwrap_or_else(|_| {
                    warn!("CLINIC_DOCTOR_NAME not set, using default");
                    defaults.doctor_name.clone()
                }),
            server_port: parse_var("SERVER_PORT", defaults.server_port),
            seed_demo_data: parse_var("SEED_DEMO_DATA", defaults.seed_demo_data),
            booking_retry_max_attempts: parse_var(
                "BOOKING_RETRY_MAX_ATTEMPTS",
                defaults.booking_retry_max_attempts,
            ),
            booking_retry_base_delay_ms: parse_var(
                "BOOKING_RETRY_BASE_DELAY_MS",
                defaults.booking_retry_base_delay_ms,
            ),
            doctor_id_explicit,
        };

        if !config.is_configured() {
            warn!("Application not fully configured - running with the default doctor");
        }

        config
    }

    /// Builds a config for an explicit doctor, leaving everything else at defaults.
    pub fn for_doctor(doctor_id: Uuid, doctor_name: impl Into<String>) -> Self {
        Self {
            doctor_id,
            doctor_name: doctor_name.into(),
            doctor_id_explicit: true,
            ..Self::default()
        }
    }

    pub fn is_configured(&self) -> bool {
        self.doctor_id_explicit && !self.doctor_name.trim().is_empty()
    }
}

fn parse_var<T: FromStr + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value, using default", name);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_demo_doctor() {
        let config = AppConfig::default();
        assert_eq!(config.doctor_id, DEFAULT_DOCTOR_ID);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.booking_retry_max_attempts, 3);
        assert!(!config.is_configured());
    }

    #[test]
    fn explicit_doctor_counts_as_configured() {
        let id = Uuid::new_v4();
        let config = AppConfig::for_doctor(id, "Dr. Emre");
        assert_eq!(config.doctor_id, id);
        assert!(config.is_configured());
    }
}
