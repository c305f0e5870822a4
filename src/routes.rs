use crate::{
    api::{admin, employee, kiosk, punch},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

fn limiter_config(requests_per_min: u32) -> GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);

    GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_else(|| {
            tracing::warn!(requests_per_min, "Invalid rate limit, using governor defaults");
            GovernorConfig::default()
        })
}

fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    Governor::new(&limiter_config(requests_per_min))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = build_limiter(config.rate_protected_per_min);
    let kiosk_limiter = build_limiter(config.rate_protected_per_min);

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter)
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter)
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Kiosk devices authenticate with a shared key instead of a session.
    cfg.service(
        web::scope("/kiosk")
            .wrap(kiosk_limiter)
            .service(web::resource("/employees").route(web::get().to(kiosk::kiosk_employees)))
            .service(web::resource("/punch").route(web::post().to(kiosk::kiosk_punch))),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(web::resource("/session").route(web::get().to(handlers::session)))
            .service(
                web::scope("/punches")
                    // /punches
                    .service(
                        web::resource("")
                            .route(web::get().to(punch::list_punches))
                            .route(web::post().to(punch::create_punch)),
                    )
                    // /punches/allowed
                    .service(web::resource("/allowed").route(web::get().to(punch::allowed_punches))),
            )
            .service(
                web::scope("/admin")
                    // /admin/employees
                    .service(
                        web::resource("/employees")
                            .route(web::get().to(employee::list_employees))
                            .route(web::post().to(employee::create_employee)),
                    )
                    // /admin/employees/{id}/face
                    .service(
                        web::resource("/employees/{id}/face")
                            .route(web::put().to(employee::save_face)),
                    )
                    // /admin/punches
                    .service(web::resource("/punches").route(web::post().to(admin::manual_punch)))
                    // /admin/punches/{id}
                    .service(
                        web::resource("/punches/{id}")
                            .route(web::put().to(admin::edit_punch))
                            .route(web::delete().to(admin::delete_punch)),
                    )
                    .service(web::resource("/stats").route(web::get().to(admin::stats)))
                    .service(web::resource("/export").route(web::get().to(admin::export_csv))),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns new access_token + rotated refresh_token

// KIOSK
//  └─ X-Kiosk-Key: <KIOSK_KEY>

