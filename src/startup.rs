use actix_cors::Cors;
use actix_files::Files;
use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::path::PathBuf;
use tracing_actix_web::TracingLogger;

use crate::chat_client::ChatClient;
use crate::config::Settings;
use crate::ledger::Ledger;
use crate::routes::{
    handle_chat, handle_subscribe, health_check, json_config, INVALID_EMAIL_MESSAGE,
    INVALID_MESSAGE_MESSAGE,
};

pub struct Application {
    pub port: u16,
    pub server: Server,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, std::io::Error> {
        let ledger = Ledger::new(config.ledger.path.clone());

        // Not fatal: every subscription retries before touching the file.
        if let Err(err) = ledger.ensure_exists().await {
            tracing::error!("Failed to prepare the subscriber ledger: {:?}", err);
        }

        let chat_client = ChatClient::new(&config.chat)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?;

        let listener = TcpListener::bind(config.get_address())?;
        let port = listener.local_addr()?.port();
        let server = run(
            listener,
            ledger,
            chat_client,
            config.application.static_dir.clone(),
        )?;

        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stop(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn run(
    listener: TcpListener,
    ledger: Ledger,
    chat_client: ChatClient,
    static_dir: PathBuf,
) -> Result<Server, std::io::Error> {
    let ledger = web::Data::new(ledger);
    let chat_client = web::Data::new(chat_client);

    let server = HttpServer::new(move || {
        App::new()
            // 'wrap' method adds a middleware to the App. This specific middleware provide incoming
            // request logger
            .wrap(TracingLogger::default())
            // Any origin may call the API, as the bundled page or a foreign one.
            .wrap(Cors::permissive())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::resource("/api/subscribe")
                    .app_data(json_config(INVALID_EMAIL_MESSAGE))
                    .route(web::post().to(handle_subscribe)),
            )
            .service(
                web::resource("/api/chat")
                    .app_data(json_config(INVALID_MESSAGE_MESSAGE))
                    .route(web::post().to(handle_chat)),
            )
            .app_data(ledger.clone())
            .app_data(chat_client.clone())
            // Registered last so the API routes take precedence.
            .service(Files::new("/", static_dir.clone()).index_file("index.html"))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
