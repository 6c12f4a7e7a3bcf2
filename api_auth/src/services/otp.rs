use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        rand_core::{OsRng, RngCore},
    },
};
use common::{
    env_config::OtpConfig,
    error::{AppError, Res},
};

/// Six digit passcode, or the configured static code outside live mode.
pub fn generate_otp(config: &OtpConfig) -> String {
    if !config.live {
        return config.static_code.clone();
    }
    format!("{:06}", OsRng.next_u32() % 1_000_000)
}

pub fn hash_otp(otp: &str) -> Res<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(otp.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash OTP: {}", e)))
}

/// False for a wrong code and for an unparsable stored hash alike.
pub fn verify_otp(otp: &str, stored_hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(otp.as_bytes(), &parsed_hash)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_code_outside_live_mode() {
        let config = OtpConfig {
            live: false,
            static_code: "654321".to_string(),
        };
        assert_eq!(generate_otp(&config), "654321");
    }

    #[test]
    fn live_codes_are_six_digits() {
        let config = OtpConfig {
            live: true,
            static_code: "123456".to_string(),
        };
        for _ in 0..20 {
            let otp = generate_otp(&config);
            assert_eq!(otp.len(), 6);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn hash_verifies_only_the_original_code() {
        let hash = hash_otp("123456").unwrap();
        assert_ne!(hash, "123456");
        assert!(verify_otp("123456", &hash));
        assert!(!verify_otp("123457", &hash));
        assert!(!verify_otp("123456", "not a hash"));
    }
}
