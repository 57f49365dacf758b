use crate::{
    api::{access, access_log, employee, report},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let access_limiter = Arc::new(build_limiter(config.rate_access_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/access").service(
                    // kiosk-facing endpoint gets its own limiter
                    web::resource("/verify")
                        .wrap(access_limiter.clone())
                        .route(web::post().to(access::verify_access)),
                ),
            )
            .service(
                web::scope("/employees")
                    // /employees
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    // /employees/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::deactivate_employee)),
                    ),
            )
            .service(
                web::scope("/access-logs")
                    // /access-logs
                    .service(web::resource("").route(web::get().to(access_log::list_access_logs)))
                    // /access-logs/{id}/time
                    .service(
                        web::resource("/{id}/time")
                            .route(web::put().to(access_log::edit_entry_time)),
                    )
                    // /access-logs/{id}/history
                    .service(
                        web::resource("/{id}/history")
                            .route(web::get().to(access_log::edit_history)),
                    ),
            )
            .service(
                web::scope("/reports").service(
                    web::resource("/worked-hours").route(web::get().to(report::worked_hours)),
                ),
            )
            .service(
                web::scope("/kiosks")
                    .service(web::resource("").route(web::post().to(handlers::provision_kiosk))),
            ),
    );
}

// KIOSK FLOW
//  ├─ POST /auth/login (kiosk credentials)
//  └─ POST /api/v1/access/verify { image, action }
//       ├─ 200 entry appended (maybe with synthesized check-out)
//       ├─ 404 face/employee unknown
//       └─ 409 duplicate action
