//! App Router

use salvo::Router;

use crate::{abandoned_carts, carts, events, tenants};

/// Catalog event ingestion; tenants travel inside each event.
pub(crate) fn events_router() -> Router {
    Router::with_path("events/{stream}").post(events::handler)
}

/// Tenant-scoped API routes.
pub(crate) fn app_router() -> Router {
    Router::new()
        .hoop(tenants::middleware)
        .push(
            Router::with_path("customers/{customer}/cart")
                .get(carts::get::handler)
                .put(carts::sync::handler)
                .delete(carts::clear::handler)
                .push(Router::with_path("validate").post(carts::validate::handler))
                .push(
                    Router::with_path("remove-unavailable")
                        .post(carts::remove_unavailable::handler),
                )
                .push(Router::with_path("accept-prices").post(carts::accept_prices::handler))
                .push(
                    Router::with_path("items")
                        .post(carts::items::create::handler)
                        .push(
                            Router::with_path("{item}")
                                .put(carts::items::update::handler)
                                .delete(carts::items::delete::handler),
                        ),
                ),
        )
        .push(
            Router::with_path("abandoned-carts")
                .get(abandoned_carts::index::handler)
                .push(Router::with_path("stats").get(abandoned_carts::stats::handler))
                .push(
                    Router::with_path("settings")
                        .get(abandoned_carts::get_settings::handler)
                        .put(abandoned_carts::update_settings::handler),
                )
                .push(Router::with_path("detect").post(abandoned_carts::detect::handler))
                .push(
                    Router::with_path("send-reminders")
                        .post(abandoned_carts::send_reminders::handler),
                )
                .push(Router::with_path("recovered").post(abandoned_carts::recovered::handler))
                .push(Router::with_path("expire").post(abandoned_carts::expire::handler))
                .push(
                    Router::with_path("attempts/{attempt}/status")
                        .put(abandoned_carts::update_attempt::handler),
                )
                .push(
                    Router::with_path("{id}")
                        .get(abandoned_carts::get::handler)
                        .delete(abandoned_carts::delete::handler),
                ),
        )
}
