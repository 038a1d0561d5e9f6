use crate::{
    api::{attendance, clocking, employee, leave, payroll, planning},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond((60_000 / u64::from(requests_per_min)).max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("non-zero rate limit period and burst");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(build_limiter(config.rate_protected_per_min)) // rate limiting
            .service(
                web::scope("/employees")
                    // /employees
                    .service(
                        web::resource("")
                            .route(web::get().to(employee::list_employees))
                            .route(web::post().to(employee::create_employee)),
                    )
                    // /employees/{matricule}
                    .service(
                        web::resource("/{matricule}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    .service(
                        web::resource("/sync-off-days")
                            .route(web::post().to(attendance::sync_off_days_handler)),
                    )
                    .service(
                        web::resource("/{year}/{month}")
                            .route(web::get().to(attendance::month_grid)),
                    )
                    .service(
                        web::resource("/{matricule}/{year}/{month}/{day}")
                            .route(web::put().to(attendance::update_attendance)),
                    ),
            )
            .service(
                web::scope("/planning").service(
                    web::resource("/{matricule}/{year}/{month}/{day}")
                        .route(web::put().to(planning::update_shift)),
                ),
            )
            .service(
                web::scope("/payroll")
                    .service(
                        web::resource("/calculate/{year}/{month}")
                            .route(web::get().to(payroll::calculate_payroll)),
                    )
                    .service(
                        web::resource("/adjustments/{year}/{month}")
                            .route(web::get().to(payroll::list_adjustments)),
                    )
                    .service(
                        web::resource("/adjustments/{matricule}/{year}/{month}")
                            .route(web::put().to(payroll::update_adjustment)),
                    )
                    .service(web::resource("/export").route(web::post().to(payroll::export_payslips)))
                    .service(
                        web::resource("/statistics").route(web::get().to(payroll::statistics)),
                    ),
            )
            .service(
                web::scope("/clock")
                    .service(web::resource("/in").route(web::post().to(clocking::clock_in)))
                    .service(web::resource("/out").route(web::post().to(clocking::clock_out)))
                    .service(
                        web::resource("/today/{matricule}")
                            .route(web::get().to(clocking::today_record)),
                    )
                    .service(web::resource("/history").route(web::get().to(clocking::history))),
            )
            .service(
                web::scope("/leave")
                    .service(web::resource("/accrue").route(web::post().to(leave::accrue_leave))),
            ),
    );
}
