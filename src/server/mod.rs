use crate::controller::RunController;
use ntex::web::{self, get, post, App};
use std::{net::SocketAddr, sync::Arc};

mod responders;

/// Starts a server that serves probes, metrics and the run control endpoints
pub async fn start_server(
    server_address: &SocketAddr,
    controller: Arc<RunController>,
) -> std::io::Result<()> {
    web::server(move || {
        App::new()
            .state(controller.clone())
            // ==== INTERNAL ==== //
            .route(
                "/internal/probe/readiness",
                get().to(responders::probe::readiness),
            )
            .route(
                "/internal/probe/liveness",
                get().to(responders::probe::liveness),
            )
            .route("/metrics", get().to(responders::metrics::metrics))
            // ==== RUN CONTROL ==== //
            .route("/run", get().to(responders::run::state))
            .route("/run/start", post().to(responders::run::start))
            .route("/run/stop", post().to(responders::run::stop))
            .route("/run/reset", post().to(responders::run::reset))
            .route("/blocks", get().to(responders::run::blocks))
    })
    .bind(server_address)?
    .run()
    .await
}
