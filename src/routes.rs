use crate::{
    api::{attendance, health, leave, schedule},
    auth::middleware::auth_middleware,
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

    let qr_limiter = Arc::new(build_limiter(config.rate_qr_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes: the kiosk display polls for fresh QR tokens, and the
    // health probe has no caller identity.
    cfg.service(web::resource("/health").route(web::get().to(health::health)));
    cfg.service(
        web::resource("/attendance/qr")
            .wrap(qr_limiter.clone())
            .route(web::get().to(attendance::generate_qr)),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(
                        web::resource("")
                            .route(web::get().to(attendance::all_attendance)),
                    )
                    // /attendance/check-in
                    .service(
                        web::resource("/check-in")
                            .route(web::post().to(attendance::check_in)),
                    )
                    // /attendance/user/{user_name}
                    .service(
                        web::resource("/user/{user_name}")
                            .route(web::get().to(attendance::attendance_by_user)),
                    )
                    // /attendance/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(attendance::attendance_by_id)),
                    ),
            )
            .service(
                web::scope("/schedule")
                    // /schedule
                    .service(
                        web::resource("")
                            .route(web::get().to(schedule::list_schedules))
                            .route(web::post().to(schedule::update_schedule)),
                    )
                    // /schedule/current
                    .service(
                        web::resource("/current")
                            .route(web::get().to(schedule::current_schedule)),
                    ),
            )
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave::leave_list))
                            .route(web::post().to(leave::create_leave)),
                    )
                    // /leave/history/{user_name}
                    .service(
                        web::resource("/history/{user_name}")
                            .route(web::get().to(leave::leave_history)),
                    )
                    // /leave/{id}
                    .service(web::resource("/{id}").route(web::get().to(leave::get_leave)))
                    // /leave/{id}/status
                    .service(
                        web::resource("/{id}/status").route(web::put().to(leave::decide_leave)),
                    )
                    // /leave/{id}/resubmit
                    .service(
                        web::resource("/{id}/resubmit")
                            .route(web::put().to(leave::resubmit_leave)),
                    ),
            ),
    );
}
