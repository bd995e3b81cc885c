use crate::configuration::{Config, OutputFormat};
use crate::decoding::FlowDecoder;
use crate::dump::{Consumer, JsonDump, TextDump};
use crate::error_handling::types::*;
use crate::network::network_listener::{bind_socket, resolve_listen_addr};
use crate::network::{DispatchStats, Dispatcher, NetworkListener};
use crate::session_management::SessionStore;
use log::info;
use std::future::Future;
use std::sync::Arc;

/// Wires configuration, socket, session store, decoder and consumer together.
pub struct Controller {
    pub config: Config,
    sessions: Arc<SessionStore>,
}

impl Controller {
    pub fn new(config: Config) -> Result<Self, ControllerError> {
        config.validate()?;
        Ok(Self {
            config,
            sessions: Arc::new(SessionStore::new()),
        })
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Binds the configured address and dumps to stdout until `shutdown` completes.
    pub async fn run<F: Future<Output = ()>>(
        &self,
        shutdown: F,
    ) -> Result<DispatchStats, ControllerError> {
        let consumer: Box<dyn Consumer + Send> = match self.config.format {
            OutputFormat::Text => Box::new(TextDump::stdout()),
            OutputFormat::Json => Box::new(JsonDump::stdout()),
        };
        self.run_with(consumer, shutdown).await
    }

    /// Same as [`Controller::run`] with an explicit consumer.
    pub async fn run_with<C: Consumer, F: Future<Output = ()>>(
        &self,
        consumer: C,
        shutdown: F,
    ) -> Result<DispatchStats, ControllerError> {
        let addr = resolve_listen_addr(&self.config.addr).await?;
        let socket = bind_socket(addr, self.config.read_buffer).await?;

        let dispatcher = Dispatcher::new(
            self.sessions.clone(),
            FlowDecoder::new(),
            consumer,
            self.config.key_by,
        );
        let listener = NetworkListener::new(socket, dispatcher, self.config.max_datagram)
            .with_session_timeout(self.config.session_timeout());

        info!(
            "Dumping {:?} output, exporters keyed by {:?}",
            self.config.format, self.config.key_by
        );
        Ok(listener.run(shutdown).await)
    }
}
