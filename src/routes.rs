use crate::{
    api::{admin, attendance, dashboard, employee, history, justification},
    auth::{activity::activity_middleware, handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    governor::middleware::NoOpMiddleware, Governor, GovernorConfigBuilder, PeerIpKeyExtractor,
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
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
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

    // Protected routes: rate limit, then auth, then the presence heartbeat.
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(activity_middleware))
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(
                web::scope("/attendance")
                    .service(web::resource("/week").route(web::get().to(attendance::week_view)))
                    .service(web::resource("/day").route(web::post().to(attendance::save_day)))
                    .service(web::resource("/check-in").route(web::post().to(attendance::check_in)))
                    .service(
                        web::resource("/check-out").route(web::post().to(attendance::check_out)),
                    )
                    .service(web::resource("/verify").route(web::post().to(attendance::verify)))
                    .service(web::resource("/pending").route(web::get().to(attendance::pending))),
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
                            .route(web::put().to(employee::update_employee)),
                    ),
            )
            .service(
                web::scope("/departments").service(
                    web::resource("")
                        .route(web::post().to(employee::create_department))
                        .route(web::get().to(employee::list_departments)),
                ),
            )
            .service(
                web::scope("/justifications")
                    .service(
                        web::resource("")
                            .route(web::get().to(justification::justification_list))
                            .route(web::post().to(justification::create_justification)),
                    )
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(justification::approve_justification)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(justification::reject_justification)),
                    ),
            )
            .service(web::resource("/dashboard").route(web::get().to(dashboard::dashboard)))
            .service(
                web::scope("/history")
                    .service(web::resource("").route(web::get().to(history::history)))
                    .service(
                        web::resource("/week/{week_start}")
                            .route(web::get().to(history::history_week)),
                    )
                    .service(
                        web::resource("/export/{week_start}/{fmt}")
                            .route(web::get().to(history::history_export)),
                    ),
            )
            .service(
                web::scope("/admin")
                    .service(web::resource("/backup").route(web::post().to(admin::backup)))
                    .service(web::resource("/sessions").route(web::get().to(admin::sessions))),
            ),
    );
}
