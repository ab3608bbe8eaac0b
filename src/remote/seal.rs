//! Request-body sealing: compact JSON encrypted with the service's RSA public key (PKCS#1 v1.5), base64.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use serde::Serialize;

/// Public key the login endpoint expects the credential payload to be sealed with.
pub const LOGIN_PUBLIC_KEY_PEM: &str = "-----BEGIN PUBLIC KEY-----
MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEAvrzz4DGWHc6YmK0BZ30LM
qZvWTLOsuIzPJn9LrJ++5416UwqpnnR5DxI4NOAdwwAOv7aOdiZ6ny5u8BX5potv+c
B3evrcpw5HbxSbj1kUzfOv4VCnGSdPMRnx/i3DCaQN1ubliJrm/jfGBEVioTNkT+iN
xcZZYxazgP1PHJOpmUwu7LME+zdGSB+y0MIZasmKi6aVFBIHug83ku0lNpA+hdWTJu
+Unsl6cD58wf7fSF3zLbb9Cmy/kg+qcS0QzzBajSXh1UuRm+4KuQZfDRDuIagICtXv
rY/u2Ow3Kdw4YGqEMe+TLiuxFoCQO9smGCOi9sCFAVrC3DaGPhGYT422QIDAQAB
-----END PUBLIC KEY-----";

/// Parse a SubjectPublicKeyInfo PEM. Body lines may have any width (the service's key is not
/// wrapped at 64 columns, which strict PEM parsers reject).
pub fn parse_public_key(pem: &str) -> Result<RsaPublicKey> {
    let body: String = pem
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("-----"))
        .collect();
    let der = STANDARD
        .decode(body.as_bytes())
        .context("decode public key base64")?;
    RsaPublicKey::from_public_key_der(&der).context("parse RSA public key")
}

/// Encrypt the compact JSON encoding of `value` with `key` and return it base64-encoded.
pub fn seal_json_with<T: Serialize>(key: &RsaPublicKey, value: &T) -> Result<String> {
    let json = serde_json::to_vec(value).context("serialize sealed payload")?;
    let mut rng = rand::rngs::OsRng;
    let encrypted = key
        .encrypt(&mut rng, Pkcs1v15Encrypt, &json)
        .context("encrypt payload")?;
    Ok(STANDARD.encode(encrypted))
}

/// Seal `value` with [`LOGIN_PUBLIC_KEY_PEM`].
pub fn seal_json<T: Serialize>(value: &T) -> Result<String> {
    let key = parse_public_key(LOGIN_PUBLIC_KEY_PEM)?;
    seal_json_with(&key, value)
}
