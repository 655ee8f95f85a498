use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

#[derive(Debug)]
pub enum Error {
    HashingFailed,
}

pub fn hash(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| {
            tracing::error!("Failed to hash password: {}", err);
            Error::HashingFailed
        })
}

pub fn verify(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed_hash) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok(),
        Err(err) => {
            tracing::error!("Invalid stored password hash: {}", err);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_correct_password() {
        let hashed = hash("hunter2-but-longer").unwrap();
        assert!(verify("hunter2-but-longer", &hashed));
    }

    #[test]
    fn rejects_wrong_password() {
        let hashed = hash("correct horse battery staple").unwrap();
        assert!(!verify("incorrect horse", &hashed));
    }

    #[test]
    fn rejects_garbage_hash() {
        assert!(!verify("anything", "not-a-phc-string"));
    }
}
