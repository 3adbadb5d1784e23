//! # Invocation Claims
//!
//! Every outbound invocation carries a compact Ed25519-signed token binding
//! its origin, target and payload:
//!
//! ```text
//! base64url({"typ":"jwt","alg":"Ed25519"})
//!   . base64url({"iat","iss","sub","jti","wascap":{target_url,origin_url,hash}})
//!   . base64url(ed25519(header "." payload))
//! ```
//!
//! The token has one fixed shape, so it is built directly rather than
//! through a general-purpose JWT library.

use crate::nkeys::{self, KeyPair};
use crate::{invocation_hash, CryptoError, TokenSignature};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use lattice_types::{Entity, HostData, Invocation};
use serde::{Deserialize, Serialize};

const TOKEN_TYPE: &str = "jwt";
const ALGORITHM: &str = "Ed25519";

/// The wascap extension of an invocation token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wascap {
    /// `wasmbus://{target_key}/{operation}`
    pub target_url: String,
    /// `wasmbus://{contract with ':' as '/'}/{link_name}/{origin_key}`
    pub origin_url: String,
    /// Uppercase hex SHA-256 of origin, target, operation and payload.
    pub hash: String,
}

/// Claims carried by an invocation token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationClaims {
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Issuer public key.
    pub iss: String,
    /// Call id.
    pub sub: String,
    /// Call id, repeated as the token id.
    pub jti: String,
    /// Invocation binding.
    pub wascap: Wascap,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    typ: String,
    alg: String,
}

/// URL naming the callee and operation.
pub fn target_url(target: &Entity, operation: &str) -> String {
    format!("wasmbus://{}/{}", target.public_key(), operation)
}

/// URL naming the caller. The link name comes from the signer, not the entity.
pub fn origin_url(origin: &Entity, link_name: &str) -> String {
    format!(
        "wasmbus://{}/{}/{}",
        origin.contract_id().replace(':', "/"),
        link_name,
        origin.public_key()
    )
}

/// Signs outbound invocations with the host-provided invocation seed.
#[derive(Debug)]
pub struct ClaimsSigner {
    key: KeyPair,
    link_name: String,
}

impl ClaimsSigner {
    /// Derive the signing key from an nkeys seed.
    pub fn new(seed: &str, link_name: impl Into<String>) -> Result<Self, CryptoError> {
        Ok(Self {
            key: KeyPair::from_seed(seed)?,
            link_name: link_name.into(),
        })
    }

    /// Signer for the provider described by `host`.
    pub fn from_host_data(host: &HostData) -> Result<Self, CryptoError> {
        Self::new(host.invocation_seed.reveal(), host.link_name())
    }

    /// Public key tokens are issued under.
    pub fn issuer(&self) -> String {
        self.key.public_key()
    }

    /// Claims for `invocation` under `call_id`.
    pub fn claims_for(&self, invocation: &Invocation, call_id: &str, issued_at: i64) -> InvocationClaims {
        let origin_url = origin_url(&invocation.origin, &self.link_name);
        let target_url = target_url(&invocation.target, &invocation.operation);
        let hash = invocation_hash(&origin_url, &target_url, &invocation.operation, &invocation.msg);
        InvocationClaims {
            iat: issued_at,
            iss: self.issuer(),
            sub: call_id.to_string(),
            jti: call_id.to_string(),
            wascap: Wascap {
                target_url,
                origin_url,
                hash,
            },
        }
    }

    /// Sign `invocation` and store the token in its `encoded_claims`.
    pub fn sign(&self, invocation: &mut Invocation, call_id: &str) -> Result<(), CryptoError> {
        let claims = self.claims_for(invocation, call_id, chrono::Utc::now().timestamp());
        invocation.encoded_claims = self.encode_token(&claims)?;
        Ok(())
    }

    fn encode_token(&self, claims: &InvocationClaims) -> Result<String, CryptoError> {
        let header = Header {
            typ: TOKEN_TYPE.to_string(),
            alg: ALGORITHM.to_string(),
        };
        let header = serde_json::to_vec(&header).map_err(|e| CryptoError::Signing(e.to_string()))?;
        let payload = serde_json::to_vec(claims).map_err(|e| CryptoError::Signing(e.to_string()))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let signature = self.key.signer().sign(signing_input.as_bytes());
        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature.as_bytes())
        ))
    }
}

/// Parse a token and check its signature against the issuer it names.
///
/// This proves only that the token is self-consistent; it does not decide
/// whether the issuer is trusted.
pub fn decode_token(token: &str) -> Result<InvocationClaims, CryptoError> {
    let mut parts = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(CryptoError::MalformedToken("expected three segments".to_string()));
    };

    let decode = |segment: &str| {
        URL_SAFE_NO_PAD
            .decode(segment)
            .map_err(|e| CryptoError::MalformedToken(e.to_string()))
    };

    let parsed: Header = serde_json::from_slice(&decode(header)?)
        .map_err(|e| CryptoError::MalformedToken(e.to_string()))?;
    if parsed.alg != ALGORITHM {
        return Err(CryptoError::MalformedToken(format!("unsupported alg {}", parsed.alg)));
    }
    let claims: InvocationClaims = serde_json::from_slice(&decode(payload)?)
        .map_err(|e| CryptoError::MalformedToken(e.to_string()))?;

    let signature = TokenSignature::from_slice(&decode(signature)?)?;
    let (_, issuer) = nkeys::decode_public_key(&claims.iss)?;
    let signing_input = &token[..header.len() + 1 + payload.len()];
    issuer.verify(signing_input.as_bytes(), &signature)?;

    Ok(claims)
}
