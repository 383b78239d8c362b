//! Building the `Authorization` header for Statbank.
//!
//! The password is read through a [`PasswordPrompt`], sent once to the
//! [`CredentialEncryptor`], and dropped as soon as [`authenticate`] returns.
//! The resulting [`AuthHeader`] is handed to the transfer by reference and is
//! released when the caller lets it go out of scope.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{error, info};

use crate::contract::{CredentialEncryptor, PasswordPrompt};
use crate::error::{Result, StatbankError};

/// A ready `Basic <base64(user:ciphertext)>` header value.
///
/// Not `Clone`: sharing happens by reference, so the secret has exactly one owner.
pub struct AuthHeader(String);

impl AuthHeader {
    pub fn basic(loaduser: &str, ciphertext: &str) -> Self {
        let encoded = STANDARD.encode(format!("{loaduser}:{ciphertext}"));
        AuthHeader(format!("Basic {encoded}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthHeader(<redacted>)")
    }
}

/// Prompts for the password, encrypts it remotely and builds the header.
pub async fn authenticate<E, P>(encryptor: &E, prompt: &P, loaduser: &str) -> Result<AuthHeader>
where
    E: CredentialEncryptor + ?Sized,
    P: PasswordPrompt + ?Sized,
{
    if loaduser.trim().is_empty() {
        return Err(StatbankError::configuration("loaduser must be set"));
    }
    let password = prompt.prompt_password(loaduser)?;
    if password.is_empty() {
        error!(loaduser = %loaduser, "[AUTH] Empty password entered");
        return Err(StatbankError::auth("empty password"));
    }
    let ciphertext = encryptor.encrypt(&password).await.map_err(|e| {
        error!(loaduser = %loaduser, error = %e, "[AUTH] Password encryption failed");
        e
    })?;
    drop(password);
    let header = AuthHeader::basic(loaduser, &ciphertext);
    info!(loaduser = %loaduser, "[AUTH] Authorization header built");
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{MockCredentialEncryptor, MockPasswordPrompt};

    #[test]
    fn basic_header_encodes_user_and_ciphertext() {
        let header = AuthHeader::basic("SSB-person-456", "oDwXta3DXdEGYZ/FYIRovw==");
        assert_eq!(
            header.as_str(),
            "Basic U1NCLXBlcnNvbi00NTY6b0R3WHRhM0RYZEVHWVovRllJUm92dz09"
        );
    }

    #[test]
    fn debug_never_shows_the_secret() {
        let header = AuthHeader::basic("user", "secret-cipher");
        let shown = format!("{header:?}");
        assert!(!shown.contains("Basic"));
        assert!(!shown.contains("secret"));
    }

    #[tokio::test]
    async fn authenticate_encrypts_prompted_password_once() {
        let mut prompt = MockPasswordPrompt::new();
        prompt
            .expect_prompt_password()
            .times(1)
            .returning(|_| Ok("coConU7s6".to_string()));
        let mut encryptor = MockCredentialEncryptor::new();
        encryptor
            .expect_encrypt()
            .withf(|pw| pw == "coConU7s6")
            .times(1)
            .returning(|_| Ok("cipher".to_string()));

        let header = authenticate(&encryptor, &prompt, "LAST360").await.unwrap();
        assert_eq!(header.as_str(), AuthHeader::basic("LAST360", "cipher").as_str());
    }

    #[tokio::test]
    async fn encryption_failure_is_an_auth_error() {
        let mut prompt = MockPasswordPrompt::new();
        prompt
            .expect_prompt_password()
            .returning(|_| Ok("pw".to_string()));
        let mut encryptor = MockCredentialEncryptor::new();
        encryptor
            .expect_encrypt()
            .returning(|_| Err(StatbankError::auth("encryption service answered 401")));

        let err = authenticate(&encryptor, &prompt, "LAST360").await.unwrap_err();
        assert!(matches!(err, StatbankError::Auth(_)));
        assert!(!err.to_string().contains("pw"));
    }

    #[tokio::test]
    async fn empty_password_never_reaches_the_encryptor() {
        let mut prompt = MockPasswordPrompt::new();
        prompt.expect_prompt_password().returning(|_| Ok(String::new()));
        let mut encryptor = MockCredentialEncryptor::new();
        encryptor.expect_encrypt().times(0);

        let err = authenticate(&encryptor, &prompt, "LAST360").await.unwrap_err();
        assert!(matches!(err, StatbankError::Auth(_)));
    }
}
