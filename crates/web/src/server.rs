use std::io;
use std::sync::Arc;

use pixel_http::codec::RequestDecoder;
use pixel_http::connection::HttpConnection;
use pixel_http::protocol::Response;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::app::{self, AppState};
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::mail::{LogMailer, Mailer};
use crate::router::RouteError;
use crate::store::{MemoryStore, Store};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("config must be set")]
    MissingConfig,

    #[error("can't build routes: {0}")]
    Route(#[from] RouteError),

    #[error("can't bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },
}

pub struct ServerBuilder {
    config: Option<Config>,
    store: Option<Arc<dyn Store>>,
    mailer: Option<Arc<dyn Mailer>>,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { config: None, store: None, mailer: None }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Defaults to an empty [`MemoryStore`].
    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Defaults to [`LogMailer`].
    pub fn mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn build(self) -> Result<Server, ServerError> {
        let config = Arc::new(self.config.ok_or(ServerError::MissingConfig)?);
        let store = self.store.unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let mailer = self.mailer.unwrap_or_else(|| Arc::new(LogMailer));

        let state = Arc::new(AppState::new(Arc::clone(&config), store, mailer));
        let dispatcher = Arc::new(app::dispatcher(state)?);
        Ok(Server { config, dispatcher })
    }
}

pub struct Server {
    config: Arc<Config>,
    dispatcher: Arc<Dispatcher<AppState>>,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Installs the log subscriber, binds the configured address and serves
    /// until the process ends.
    pub async fn start(self) -> Result<(), ServerError> {
        init_tracing(self.config.server.level());

        let addr = self.config.server.bind_addr.clone();
        let tcp_listener = TcpListener::bind(&addr).await.map_err(|source| ServerError::Bind { addr: addr.clone(), source })?;
        info!(%addr, "start listening");

        self.serve(tcp_listener).await;
        Ok(())
    }

    /// Accepts connections on `tcp_listener` forever, one task per connection.
    pub async fn serve(self, tcp_listener: TcpListener) {
        Response::prepare_canned();

        let read_timeout = self.config.server.read_timeout;
        let max_body_bytes = self.config.server.max_body_bytes;

        loop {
            let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let dispatcher = Arc::clone(&self.dispatcher);

            tokio::spawn(async move {
                let (reader, writer) = tcp_stream.into_split();
                let decoder = RequestDecoder::with_max_body_bytes(max_body_bytes);
                let connection = HttpConnection::with_decoder(reader, writer, decoder).with_read_timeout(read_timeout);
                match connection.process(dispatcher).await {
                    Ok(_) => {
                        debug!(%remote_addr, "finished process, connection shutdown");
                    }
                    Err(e) => {
                        error!(%remote_addr, cause = %e, "service has error, connection shutdown");
                    }
                }
            });
        }
    }
}

/// Installs the global fmt subscriber; a second call only logs.
pub fn init_tracing(level: Level) {
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        warn!(cause = %e, "tracing subscriber already installed");
    }
}
