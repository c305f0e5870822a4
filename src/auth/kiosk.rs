use crate::config::Config;
use crate::error::ApiError;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};
use subtle::ConstantTimeEq;

pub const KIOSK_KEY_HEADER: &str = "X-Kiosk-Key";

/// Proof that the request came from a registered kiosk device.
#[derive(Debug)]
pub struct KioskAccess;

fn check(req: &HttpRequest) -> Result<KioskAccess, ApiError> {
    let config = req.app_data::<Data<Config>>().ok_or_else(|| {
        tracing::error!("Config missing from app data");
        ApiError::Internal
    })?;

    let Some(expected) = config.kiosk_key.as_deref() else {
        return Err(ApiError::Unavailable("Kiosk mode is disabled"));
    };

    let provided = req
        .headers()
        .get(KIOSK_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or(ApiError::Unauthorized("Missing kiosk key"))?;

    if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(KioskAccess)
    } else {
        tracing::warn!("Kiosk request with invalid key");
        Err(ApiError::Unauthorized("Invalid kiosk key"))
    }
}

impl FromRequest for KioskAccess {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(check(req))
    }
}
