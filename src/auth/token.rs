use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// HS256 头部 (固定)
const TOKEN_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;
const MAX_TOKEN_LEN: usize = 4096;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("unsupported token algorithm")]
    UnsupportedAlgorithm,
    #[error("token signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid token claims: {0}")]
    Claims(String),
}

/// 令牌声明
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// 用户 ID
    #[serde(alias = "userId")]
    pub sub: String,
    pub email: String,
    #[serde(default = "default_role")]
    pub role: String,
    /// 已授权的受保护资源
    #[serde(default)]
    pub access: Vec<String>,
    /// 过期时间 (Unix 秒)
    pub exp: i64,
}

fn default_role() -> String {
    ROLE_USER.to_string()
}

#[derive(Debug, Deserialize)]
struct Header {
    alg: String,
}

/// 令牌签名与校验密钥
#[derive(Clone)]
pub struct TokenKeys {
    secret: Vec<u8>,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenKeys(***)")
    }
}

impl TokenKeys {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|_| TokenError::BadSignature)
    }

    /// 签发令牌 (供工具与测试使用)
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        let header_part = URL_SAFE_NO_PAD.encode(TOKEN_HEADER.as_bytes());
        let claims_bytes = serde_json::to_vec(claims).map_err(|e| TokenError::Claims(e.to_string()))?;
        let claims_part = URL_SAFE_NO_PAD.encode(claims_bytes);
        let signing_input = format!("{}.{}", header_part, claims_part);

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let sig_part = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{}.{}", signing_input, sig_part))
    }

    /// 校验签名与有效期, `now` 为当前 Unix 秒
    pub fn verify(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        if token.len() > MAX_TOKEN_LEN {
            return Err(TokenError::Malformed);
        }
        let parts: Vec<&str> = token.split('.').collect();
        let [header_part, claims_part, sig_part] = parts.as_slice() else {
            return Err(TokenError::Malformed);
        };

        let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|_| TokenError::Malformed)?;
        let header: Header = serde_json::from_slice(&header_bytes).map_err(|_| TokenError::Malformed)?;
        if header.alg != "HS256" {
            return Err(TokenError::UnsupportedAlgorithm);
        }

        let expected = URL_SAFE_NO_PAD.decode(sig_part).map_err(|_| TokenError::Malformed)?;
        let mut mac = self.mac()?;
        mac.update(header_part.as_bytes());
        mac.update(b".");
        mac.update(claims_part.as_bytes());
        mac.verify_slice(&expected).map_err(|_| TokenError::BadSignature)?;

        let claims_bytes = URL_SAFE_NO_PAD.decode(claims_part).map_err(|_| TokenError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&claims_bytes).map_err(|e| TokenError::Claims(e.to_string()))?;
        if claims.exp <= now {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(exp: i64) -> Claims {
        Claims {
            sub: "42".to_string(),
            email: "magasin@example.com".to_string(),
            role: ROLE_USER.to_string(),
            access: vec!["stock".to_string()],
            exp,
        }
    }

    #[test]
    fn signed_token_verifies() {
        let keys = TokenKeys::new("secret");
        let token = keys.sign(&claims(2_000)).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(keys.verify(&token, 1_000).unwrap(), claims(2_000));
    }

    #[test]
    fn expired_token_rejected() {
        let keys = TokenKeys::new("secret");
        let token = keys.sign(&claims(1_000)).unwrap();
        assert_eq!(keys.verify(&token, 1_000), Err(TokenError::Expired));
    }

    #[test]
    fn other_secret_rejected() {
        let token = TokenKeys::new("secret").sign(&claims(2_000)).unwrap();
        assert_eq!(TokenKeys::new("other").verify(&token, 1_000), Err(TokenError::BadSignature));
    }

    #[test]
    fn tampered_claims_rejected() {
        let keys = TokenKeys::new("secret");
        let token = keys.sign(&claims(2_000)).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let mut forged = claims(2_000);
        forged.role = ROLE_ADMIN.to_string();
        let forged_part = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let forged_token = format!("{}.{}.{}", parts[0], forged_part, parts[2]);
        assert_eq!(keys.verify(&forged_token, 1_000), Err(TokenError::BadSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        let keys = TokenKeys::new("secret");
        assert_eq!(keys.verify("abc", 0), Err(TokenError::Malformed));
        assert_eq!(keys.verify("a.b.c", 0), Err(TokenError::Malformed));
    }

    #[test]
    fn legacy_claims_default_role_and_access() {
        let raw = r#"{"userId":"7","email":"a@b.c","exp":10}"#;
        let claims: Claims = serde_json::from_str(raw).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.role, ROLE_USER);
        assert!(claims.access.is_empty());
    }
}
