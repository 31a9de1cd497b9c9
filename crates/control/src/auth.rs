use models::Role;
use tonic::Request;

use crate::Error;

const AUTHORIZATION_KEY: &str = "authorization";

fn bearer_token<T>(request: &Request<T>) -> Result<&str, Error> {
    request
        .metadata()
        .get(AUTHORIZATION_KEY)
        .and_then(|v| v.to_str().ok())
        .ok_or(Error::BadAuthentication)
}

/// Verifies the request carries a valid `Hub`-role token (§4.6
/// `check_from_hub`).
pub fn check_from_hub<T>(request: &Request<T>, public_key: &[u8; 32]) -> Result<tokens::ValidToken, Error> {
    let token = bearer_token(request)?;
    let valid = tokens::verify(token, public_key)?;
    if valid.body.role != Role::Hub {
        return Err(Error::BadAuthentication);
    }
    Ok(valid)
}

/// Verifies the request carries a valid `Manage`-role token, returning it so
/// its namespace can be used for a subsequent scope check (§4.6
/// `check_mgmt_allowed`).
pub fn check_mgmt_allowed<T>(
    request: &Request<T>,
    public_key: &[u8; 32],
) -> Result<tokens::ValidToken, Error> {
    let token = bearer_token(request)?;
    let valid = tokens::verify(token, public_key)?;
    if valid.body.role != Role::Manage {
        return Err(Error::BadAuthentication);
    }
    Ok(valid)
}

/// Verifies the request's authorization header equals the process's
/// bootstrap static token, used by `Register` and `IssueHubToken` before any
/// token authority exists for the caller to present a signed credential.
pub fn check_static_token<T>(request: &Request<T>, expected: &str) -> Result<(), Error> {
    let presented = bearer_token(request)?;
    if presented != expected {
        return Err(Error::BadAuthentication);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokens::{InMemoryKeySource, TokenAuthority, TokenBody};

    fn request_with_token(token: &str) -> Request<()> {
        let mut request = Request::new(());
        request
            .metadata_mut()
            .insert(AUTHORIZATION_KEY, token.parse().unwrap());
        request
    }

    #[test]
    fn accepts_matching_hub_token() {
        let authority = TokenAuthority::new(InMemoryKeySource::new(), "/control/keys");
        let pubkey = authority.public_key().unwrap();
        let token = authority.issue(&TokenBody::new(Role::Hub), "k1").unwrap();

        let request = request_with_token(&token);
        assert!(check_from_hub(&request, &pubkey).is_ok());
    }

    #[test]
    fn rejects_wrong_role() {
        let authority = TokenAuthority::new(InMemoryKeySource::new(), "/control/keys");
        let pubkey = authority.public_key().unwrap();
        let token = authority.issue(&TokenBody::new(Role::Manage), "k1").unwrap();

        let request = request_with_token(&token);
        assert!(check_from_hub(&request, &pubkey).is_err());
    }

    #[test]
    fn static_token_mismatch_is_rejected() {
        let request = request_with_token("wrong");
        assert!(check_static_token(&request, "correct").is_err());
    }

    #[test]
    fn missing_authorization_header_is_rejected() {
        let request = Request::new(());
        assert!(check_static_token(&request, "anything").is_err());
    }
}
